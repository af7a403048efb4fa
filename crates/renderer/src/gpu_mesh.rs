//! wgpu-backed mesh sink.

use std::sync::Arc;

use engine_core::mesh::BasicVertex;
use wgpu::util::DeviceExt;

use crate::context::GpuContext;
use crate::scene::FramePass;
use crate::sink::{MeshSink, Topology};

/// Vertex and index buffers for one mesh. The vertex buffer is created with `COPY_DST` so
/// same-size updates go through `Queue::write_buffer` instead of a new allocation; the index
/// buffer is written once per allocation.
pub struct GpuMesh {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    label: String,
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
}

impl GpuMesh {
    pub fn new(ctx: &GpuContext, label: impl Into<String>) -> Self {
        Self {
            device: Arc::clone(&ctx.device),
            queue: Arc::clone(&ctx.queue),
            label: label.into(),
            vertex_buffer: None,
            index_buffer: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl MeshSink for GpuMesh {
    type Pass<'p> = FramePass<'p>;

    fn allocate(&mut self, vertices: &[BasicVertex], indices: &[u32]) {
        self.vertex_buffer = Some(self.device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Vertex Buffer", self.label)),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            },
        ));
        self.index_buffer = Some(self.device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Index Buffer", self.label)),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            },
        ));
    }

    fn write(&mut self, vertices: &[BasicVertex]) {
        let Some(vb) = &self.vertex_buffer else {
            panic!("GpuMesh `{}` written before allocation", self.label);
        };
        self.queue.write_buffer(vb, 0, bytemuck::cast_slice(vertices));
    }

    fn bind(&self, pass: &mut FramePass<'_>) {
        let (Some(vb), Some(ib)) = (&self.vertex_buffer, &self.index_buffer) else {
            panic!("GpuMesh `{}` bound before allocation", self.label);
        };
        let raw = pass.raw();
        raw.set_vertex_buffer(0, vb.slice(..));
        raw.set_index_buffer(ib.slice(..), wgpu::IndexFormat::Uint32);
    }

    fn draw(&self, pass: &mut FramePass<'_>, topology: Topology, index_count: u32) {
        pass.use_topology(topology);
        let instances = pass.instances();
        pass.raw().draw_indexed(0..index_count, 0, instances);
    }
}
