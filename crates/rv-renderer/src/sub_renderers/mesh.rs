//! Mesh sub-renderer for loaded mesh resources.

use std::collections::HashMap;

use glam::Mat4;
use rv_core::mesh::{VisualGeometry, flat_shade};
use rv_core::{NodeId, Scene};

use crate::context::RenderContext;
use crate::pipeline::PipelineConfig;
use crate::traits::SubRenderer;
use crate::vertex::MeshVertex;

/// Color of geometries without a material
pub const DEFAULT_MESH_COLOR: [f32; 4] = [0.8, 0.8, 0.8, 1.0];

/// Per-geometry uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshUniform {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl MeshUniform {
    pub fn new(model: Mat4, geometry: &VisualGeometry) -> Self {
        let color = geometry
            .material
            .as_ref()
            .map(|m| m.color)
            .unwrap_or(DEFAULT_MESH_COLOR);
        Self {
            model: model.to_cols_array_2d(),
            color,
        }
    }
}

/// Flat shaded vertices and sequential indices of a geometry
pub fn flat_vertices(geometry: &VisualGeometry) -> (Vec<MeshVertex>, Vec<u32>) {
    let (positions, normals, indices) = flat_shade(&geometry.positions, &geometry.indices);
    let vertices = positions
        .into_iter()
        .zip(normals)
        .map(|(position, normal)| MeshVertex { position, normal })
        .collect();
    (vertices, indices)
}

struct GpuMeshPart {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl GpuMeshPart {
    fn destroy(self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        self.uniform_buffer.destroy();
    }
}

/// Renders the children of every populated mesh container in the scene.
pub struct MeshSubRenderer {
    enabled: bool,
    pipeline: Option<wgpu::RenderPipeline>,
    part_layout: Option<wgpu::BindGroupLayout>,
    /// Uploaded children per mesh node
    parts: HashMap<NodeId, Vec<GpuMeshPart>>,
    visible: Vec<NodeId>,
}

impl MeshSubRenderer {
    pub fn new() -> Self {
        Self {
            enabled: true,
            pipeline: None,
            part_layout: None,
            parts: HashMap::new(),
            visible: Vec::new(),
        }
    }

    /// Number of mesh nodes with uploaded geometry
    pub fn uploaded_count(&self) -> usize {
        self.parts.len()
    }

    fn upload_part(
        ctx: &RenderContext,
        layout: &wgpu::BindGroupLayout,
        geometry: &VisualGeometry,
        model: Mat4,
    ) -> GpuMeshPart {
        let (vertices, indices) = flat_vertices(geometry);
        let uniform_buffer = ctx.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Uniform Buffer"),
            contents: bytemuck::cast_slice(&[MeshUniform::new(model, geometry)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = ctx.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        GpuMeshPart {
            vertex_buffer: ctx.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            index_buffer: ctx.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: indices.len() as u32,
            uniform_buffer,
            bind_group,
        }
    }
}

impl Default for MeshSubRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SubRenderer for MeshSubRenderer {
    fn name(&self) -> &str {
        "mesh"
    }

    fn priority(&self) -> i32 {
        super::priorities::MESH
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn on_init(&mut self, ctx: &RenderContext) {
        let part_layout = ctx.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Mesh Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline = PipelineConfig::new(
            "Mesh",
            include_str!("../shaders/mesh.wgsl"),
            ctx.surface_format(),
            ctx.depth_format(),
            &[ctx.camera_bind_group_layout(), &part_layout],
        )
        .with_vertex_layouts(vec![MeshVertex::layout()])
        .with_cull_mode(None)
        .with_blend(wgpu::BlendState::ALPHA_BLENDING)
        .with_sample_count(ctx.sample_count())
        .build(ctx.device());

        self.pipeline = Some(pipeline);
        self.part_layout = Some(part_layout);
    }

    fn prepare(&mut self, ctx: &RenderContext, scene: &Scene) {
        // Drop nodes that left the scene
        let stale: Vec<NodeId> = self
            .parts
            .keys()
            .filter(|id| !scene.contains(**id))
            .copied()
            .collect();
        for id in stale {
            if let Some(parts) = self.parts.remove(&id) {
                parts.into_iter().for_each(GpuMeshPart::destroy);
            }
        }

        self.visible.clear();
        let Some(layout) = &self.part_layout else {
            return;
        };

        for (node_id, resource) in scene.meshes() {
            if !scene.is_visible(node_id) {
                continue;
            }
            let model = scene.world_transform(node_id);
            let resource = resource.lock();
            if !resource.is_populated() {
                continue;
            }

            match self.parts.get(&node_id) {
                Some(parts) => {
                    for (part, geometry) in parts.iter().zip(resource.children()) {
                        let uniform = MeshUniform::new(model, geometry);
                        ctx.write_buffer(&part.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
                    }
                }
                None => {
                    let parts: Vec<GpuMeshPart> = resource
                        .children()
                        .iter()
                        .map(|geometry| Self::upload_part(ctx, layout, geometry, model))
                        .collect();
                    tracing::debug!("Uploaded {} mesh parts for {}", parts.len(), resource.uri);
                    self.parts.insert(node_id, parts);
                }
            }
            self.visible.push(node_id);
        }
    }

    fn render<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, ctx: &'a RenderContext) {
        let Some(pipeline) = &self.pipeline else {
            return;
        };

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, ctx.camera_bind_group(), &[]);
        for part in self.visible.iter().filter_map(|id| self.parts.get(id)).flatten() {
            pass.set_bind_group(1, &part.bind_group, &[]);
            pass.set_vertex_buffer(0, part.vertex_buffer.slice(..));
            pass.set_index_buffer(part.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..part.index_count, 0, 0..1);
        }
    }

    fn on_destroy(&mut self) {
        for (_, parts) in self.parts.drain() {
            parts.into_iter().for_each(GpuMeshPart::destroy);
        }
        self.visible.clear();
    }
}
