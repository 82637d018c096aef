//! Instanced rendering of the flock.
//!
//! [`FlockRenderer`] draws `N` copies of a template mesh in a single
//! instanced draw call. Per-instance state (position, velocity) is read
//! straight from the simulation's storage buffers in the vertex stage, where
//! the model transform is derived; nothing is read back to the CPU.
//!
//! Geometry arrives in a second phase: the renderer is constructed without a
//! mesh (the host may still be loading assets) and becomes ready once
//! [`FlockRenderer::set_geometry`] is called. Updates before that are
//! no-ops.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::scene::{FrameContext, SceneNode};
use crate::shaders;
use crate::simulation::FlockSimulation;
use crate::state::Channel;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Immutable template geometry, instanced once per agent.
///
/// The mesh is modeled facing +Z; the vertex shader maps +Z onto each
/// agent's direction of travel.
pub struct TemplateMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl TemplateMesh {
    /// Procedural stand-in geometry: a four-faced dart pointing along +Z.
    ///
    /// Faces are unshared (each with its own outward flat normal) so the
    /// silhouette reads clearly at a distance.
    pub fn dart() -> Self {
        let nose = Vec3::new(0.0, 0.0, 5.0);
        let left = Vec3::new(-2.0, 0.0, -2.0);
        let right = Vec3::new(2.0, 0.0, -2.0);
        let top = Vec3::new(0.0, 1.6, -1.6);
        let centroid = (nose + left + right + top) / 4.0;

        let faces = [
            [nose, left, right],
            [nose, right, top],
            [nose, top, left],
            [left, top, right],
        ];

        let mut positions = Vec::with_capacity(12);
        let mut normals = Vec::with_capacity(12);
        for face in faces {
            let mut normal = (face[1] - face[0]).cross(face[2] - face[0]).normalize();
            let face_center = (face[0] + face[1] + face[2]) / 3.0;
            if normal.dot(face_center - centroid) < 0.0 {
                normal = -normal;
            }
            for vertex in face {
                positions.push(vertex.to_array());
                normals.push(normal.to_array());
            }
        }

        Self {
            indices: (0..positions.len() as u32).collect(),
            positions,
            normals,
        }
    }

    fn vertices(&self) -> Vec<MeshVertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .map(|(&position, &normal)| MeshVertex { position, normal })
            .collect()
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct MeshVertex {
    position: [f32; 3],
    normal: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
}

/// The per-mesh half of the renderer, built once geometry arrives.
struct DrawUnit {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

pub struct FlockRenderer {
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    /// One bind group per ping-pong parity of the simulation's state store.
    state_bind_groups: [wgpu::BindGroup; 2],
    pipeline_layout: wgpu::PipelineLayout,
    surface_format: wgpu::TextureFormat,
    draw: Option<DrawUnit>,
    agent_count: u32,
}

impl FlockRenderer {
    /// Bind to a simulation's state store. The store is shared read-only;
    /// the renderer never writes agent state.
    pub fn new(
        device: &wgpu::Device,
        simulation: &FlockSimulation,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::bytes_of(&CameraUniform {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let instance_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let state_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Agent State Bind Group Layout"),
            entries: &[instance_entry(0), instance_entry(1)],
        });

        let state = simulation.state();
        let state_bind_group_for = |parity: usize| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Agent State Bind Group"),
                layout: &state_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: state.slot(Channel::Position, parity).as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: state.slot(Channel::Velocity, parity).as_entire_binding(),
                    },
                ],
            })
        };
        let state_bind_groups = [state_bind_group_for(0), state_bind_group_for(1)];

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Flock Render Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &state_layout],
            push_constant_ranges: &[],
        });

        Self {
            camera_buffer,
            camera_bind_group,
            state_bind_groups,
            pipeline_layout,
            surface_format,
            draw: None,
            agent_count: simulation.agent_count(),
        }
    }

    /// Supply the template geometry, transitioning the renderer to ready.
    ///
    /// Accepted once; a second call is ignored with a warning.
    pub fn set_geometry(&mut self, device: &wgpu::Device, mesh: &TemplateMesh) {
        if self.draw.is_some() {
            log::warn!("template geometry already set, ignoring replacement");
            return;
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Template Vertex Buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Template Index Buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Flock Render Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::RENDER_SHADER.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Flock Render Pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x3, // position
                        },
                        wgpu::VertexAttribute {
                            offset: 12,
                            shader_location: 1,
                            format: wgpu::VertexFormat::Float32x3, // normal
                        },
                    ],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
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
        });

        self.draw = Some(DrawUnit {
            pipeline,
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        });
    }

    /// Whether geometry has been supplied.
    pub fn is_ready(&self) -> bool {
        self.draw.is_some()
    }

    pub fn update_camera(&self, queue: &wgpu::Queue, view_proj: Mat4) {
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniform {
                view_proj: view_proj.to_cols_array_2d(),
            }),
        );
    }

    /// Issue the instanced draw for the state slot holding current data.
    ///
    /// Must run after the simulation's step for the frame, with the parity
    /// it published; a not-yet-ready renderer draws nothing.
    pub fn draw(&self, parity: usize, render_pass: &mut wgpu::RenderPass<'_>) {
        let Some(unit) = &self.draw else {
            return;
        };

        render_pass.set_pipeline(&unit.pipeline);
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
        render_pass.set_bind_group(1, &self.state_bind_groups[parity], &[]);
        render_pass.set_vertex_buffer(0, unit.vertex_buffer.slice(..));
        render_pass.set_index_buffer(unit.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..unit.index_count, 0, 0..self.agent_count);
    }
}

impl SceneNode for FlockRenderer {
    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        self.update_camera(ctx.queue, ctx.view_proj);

        let mut render_pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Flock Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: ctx.color_view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: ctx.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.draw(ctx.state_parity, &mut render_pass);
    }
}

/// Create the depth texture matching the surface size.
pub fn create_depth_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dart_mesh_is_consistent() {
        let mesh = TemplateMesh::dart();
        assert_eq!(mesh.positions.len(), mesh.normals.len());
        assert_eq!(mesh.indices.len() % 3, 0);
        assert!(mesh
            .indices
            .iter()
            .all(|&i| (i as usize) < mesh.positions.len()));
    }

    #[test]
    fn test_dart_normals_are_unit_and_outward() {
        let mesh = TemplateMesh::dart();
        let centroid = mesh
            .positions
            .iter()
            .map(|p| Vec3::from_array(*p))
            .sum::<Vec3>()
            / mesh.positions.len() as f32;

        for tri in mesh.indices.chunks(3) {
            let normal = Vec3::from_array(mesh.normals[tri[0] as usize]);
            assert!((normal.length() - 1.0).abs() < 1e-4);

            let face_center = tri
                .iter()
                .map(|&i| Vec3::from_array(mesh.positions[i as usize]))
                .sum::<Vec3>()
                / 3.0;
            assert!(normal.dot(face_center - centroid) > 0.0);
        }
    }

    #[test]
    fn test_dart_points_along_positive_z() {
        let mesh = TemplateMesh::dart();
        let max_z = mesh.positions.iter().map(|p| p[2]).fold(f32::MIN, f32::max);
        let min_z = mesh.positions.iter().map(|p| p[2]).fold(f32::MAX, f32::min);
        assert!(max_z > -min_z, "nose should extend further than the tail");
    }

    #[test]
    fn test_mesh_vertex_layout() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 24);
    }
}
