//! Render pipelines for lit meshes.

use crate::context::{COLOR_FORMAT, DEPTH_FORMAT};
use crate::sink::Topology;
use crate::vertex::{InstanceData, VertexLayout};
use engine_core::mesh::BasicVertex;

/// Frame bind group: camera at binding 0, lights at binding 1.
pub fn create_frame_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let uniform = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Frame Bind Group Layout"),
        entries: &[uniform(0), uniform(1)],
    })
}

fn create_mesh_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    polygon_mode: wgpu::PolygonMode,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[BasicVertex::layout(), InstanceData::layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: COLOR_FORMAT,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            // Terrain triangles wind counter-clockwise seen from above.
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: match polygon_mode {
                wgpu::PolygonMode::Fill => Some(wgpu::Face::Back),
                _ => None,
            },
            polygon_mode,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Filled pipeline plus the wireframe variant when the device supports line polygons.
pub struct MeshPipelines {
    pub frame_layout: wgpu::BindGroupLayout,
    fill: wgpu::RenderPipeline,
    wireframe: Option<wgpu::RenderPipeline>,
}

impl MeshPipelines {
    pub fn new(device: &wgpu::Device, wireframe_supported: bool) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Terrain Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/terrain.wgsl").into()),
        });
        let frame_layout = create_frame_bind_group_layout(device);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&frame_layout],
            push_constant_ranges: &[],
        });

        let fill = create_mesh_pipeline(
            device,
            &layout,
            &shader,
            wgpu::PolygonMode::Fill,
            "Mesh Fill Pipeline",
        );
        let wireframe = wireframe_supported.then(|| {
            create_mesh_pipeline(
                device,
                &layout,
                &shader,
                wgpu::PolygonMode::Line,
                "Mesh Wireframe Pipeline",
            )
        });
        if wireframe.is_none() {
            log::warn!("Line polygon mode unavailable, wireframe draws fall back to fill");
        }

        Self {
            frame_layout,
            fill,
            wireframe,
        }
    }

    pub fn for_topology(&self, topology: Topology) -> &wgpu::RenderPipeline {
        match topology {
            Topology::Triangles => &self.fill,
            Topology::Lines => self.wireframe.as_ref().unwrap_or(&self.fill),
        }
    }
}
