//! Offscreen frame rendering of lit meshes.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::camera::{Camera, CameraUniform};
use crate::context::GpuContext;
use crate::gpu_mesh::GpuMesh;
use crate::light::{Light, LightsUniform};
use crate::mesh::Mesh;
use crate::pipeline::MeshPipelines;
use crate::sink::Topology;
use crate::vertex::InstanceData;

/// Render pass wrapper handed to [`GpuMesh`]. Tracks the active pipeline so consecutive
/// draws with the same topology do not rebind it.
pub struct FramePass<'p> {
    pass: wgpu::RenderPass<'p>,
    pipelines: &'p MeshPipelines,
    current: Option<Topology>,
    instance_count: u32,
}

impl<'p> FramePass<'p> {
    pub(crate) fn raw(&mut self) -> &mut wgpu::RenderPass<'p> {
        &mut self.pass
    }

    pub(crate) fn use_topology(&mut self, topology: Topology) {
        if self.current != Some(topology) {
            self.pass.set_pipeline(self.pipelines.for_topology(topology));
            self.current = Some(topology);
        }
    }

    pub(crate) fn instances(&self) -> Range<u32> {
        0..self.instance_count
    }

    /// Bind per-instance transforms for the following draws.
    pub fn set_instances(&mut self, instances: &InstanceBuffer) {
        self.pass.set_vertex_buffer(1, instances.buffer.slice(..));
        self.instance_count = instances.len;
    }
}

/// Growable GPU buffer of [`InstanceData`].
pub struct InstanceBuffer {
    buffer: wgpu::Buffer,
    capacity: u32,
    len: u32,
}

impl InstanceBuffer {
    pub fn new(ctx: &GpuContext, instances: &[InstanceData]) -> Self {
        let data: Vec<InstanceData> = if instances.is_empty() {
            vec![InstanceData::default()]
        } else {
            instances.to_vec()
        };
        let buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Instance Buffer"),
                contents: bytemuck::cast_slice(&data),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
        Self {
            buffer,
            capacity: data.len() as u32,
            len: instances.len() as u32,
        }
    }

    /// Replace the instance list, growing the buffer only when it no longer fits.
    pub fn update(&mut self, ctx: &GpuContext, instances: &[InstanceData]) {
        if instances.len() as u32 > self.capacity {
            *self = Self::new(ctx, instances);
            return;
        }
        if !instances.is_empty() {
            ctx.queue
                .write_buffer(&self.buffer, 0, bytemuck::cast_slice(instances));
        }
        self.len = instances.len() as u32;
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// One mesh drawn with a set of instances.
pub struct DrawItem<'a> {
    pub mesh: &'a Mesh<GpuMesh>,
    pub instances: &'a InstanceBuffer,
    pub topology: Topology,
}

/// Owns the pipelines and per-frame uniforms and records frames into the context's
/// offscreen target.
pub struct SceneRenderer {
    pipelines: MeshPipelines,
    camera_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    pub clear_color: wgpu::Color,
}

impl SceneRenderer {
    pub fn new(ctx: &GpuContext) -> Self {
        let device = &ctx.device;
        let pipelines = MeshPipelines::new(device, ctx.supports_wireframe());

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let lights_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lights Buffer"),
            contents: bytemuck::cast_slice(&[LightsUniform::new(&[], 32.0)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &pipelines.frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights_buffer.as_entire_binding(),
                },
            ],
        });

        Self {
            pipelines,
            camera_buffer,
            lights_buffer,
            frame_bind_group,
            clear_color: wgpu::Color {
                r: 0.45,
                g: 0.65,
                b: 0.9,
                a: 1.0,
            },
        }
    }

    pub fn update_camera(&self, ctx: &GpuContext, camera: &Camera) {
        let mut uniform = CameraUniform::new();
        uniform.update(camera);
        ctx.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    pub fn update_lights(&self, ctx: &GpuContext, lights: &[Light], shininess: f32) {
        let uniform = LightsUniform::new(lights, shininess);
        ctx.queue
            .write_buffer(&self.lights_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    /// Clear the target and draw `items` in order, then submit.
    pub fn render(&self, ctx: &GpuContext, items: &[DrawItem<'_>]) {
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &ctx.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut frame = FramePass {
                pass,
                pipelines: &self.pipelines,
                current: None,
                instance_count: 0,
            };
            frame.raw().set_bind_group(0, &self.frame_bind_group, &[]);

            for item in items {
                if item.instances.is_empty() {
                    continue;
                }
                frame.set_instances(item.instances);
                item.mesh.bind(&mut frame);
                item.mesh.draw(&mut frame, item.topology);
            }
        }

        ctx.queue.submit(std::iter::once(encoder.finish()));
    }
}
