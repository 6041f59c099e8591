//! Height map sub-renderer.
//!
//! Every height map in the scene gets a vertex/index buffer pair for its
//! plane, an R8 data texture holding its texels and a uniform buffer with its
//! model matrix and decode parameters. GPU resources are keyed by the ids of
//! the CPU-side geometry, texture and material, and destroyed when those ids
//! come through the [`ReleaseQueue`].

use std::collections::HashMap;

use glam::Mat4;
use rv_core::heightmap::{HEIGHT_SATURATION, HEIGHT_VALUE, HeightMap, HeightParams};
use rv_core::{ReleaseQueue, ResourceId, Scene};
use uuid::Uuid;

use crate::context::RenderContext;
use crate::pipeline::PipelineConfig;
use crate::traits::SubRenderer;
use crate::vertex::HeightMapVertex;

/// Per-height-map uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct HeightMapUniform {
    pub model: [[f32; 4]; 4],
    /// height_scale, min_height, max_height, offset
    pub params: [f32; 4],
    /// low_hue, high_hue, saturation, value
    pub hues: [f32; 4],
    /// texture width, texture height, encoding, unused
    pub dims: [u32; 4],
}

impl HeightMapUniform {
    pub fn new(model: Mat4, params: &HeightParams, width: u32, height: u32) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            params: [
                params.height_scale,
                params.min_height,
                params.max_height,
                params.encoding.offset(),
            ],
            hues: [params.low_hue, params.high_hue, HEIGHT_SATURATION, HEIGHT_VALUE],
            dims: [width, height, params.encoding.shader_id(), 0],
        }
    }
}

struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct GpuMaterial {
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug, Clone, Copy)]
struct DrawItem {
    geometry: Uuid,
    material: Uuid,
}

/// Renders displaced, hue coded height maps.
pub struct HeightMapSubRenderer {
    enabled: bool,
    release: ReleaseQueue,
    pipeline: Option<wgpu::RenderPipeline>,
    material_layout: Option<wgpu::BindGroupLayout>,
    geometries: HashMap<Uuid, GpuGeometry>,
    textures: HashMap<Uuid, GpuTexture>,
    materials: HashMap<Uuid, GpuMaterial>,
    draws: Vec<DrawItem>,
}

impl HeightMapSubRenderer {
    /// Creates a sub-renderer destroying the resources released into `release`.
    pub fn new(release: ReleaseQueue) -> Self {
        Self {
            enabled: true,
            release,
            pipeline: None,
            material_layout: None,
            geometries: HashMap::new(),
            textures: HashMap::new(),
            materials: HashMap::new(),
            draws: Vec::new(),
        }
    }

    /// Number of height maps drawn this frame
    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }

    /// Number of live GPU resources (geometries, textures, materials)
    pub fn resource_count(&self) -> usize {
        self.geometries.len() + self.textures.len() + self.materials.len()
    }

    fn destroy(&mut self, id: ResourceId) {
        match id {
            ResourceId::Geometry(id) => {
                if let Some(geometry) = self.geometries.remove(&id) {
                    geometry.vertex_buffer.destroy();
                    geometry.index_buffer.destroy();
                }
            }
            ResourceId::Texture(id) => {
                if let Some(texture) = self.textures.remove(&id) {
                    texture.texture.destroy();
                }
            }
            ResourceId::Material(id) => {
                if let Some(material) = self.materials.remove(&id) {
                    material.uniform_buffer.destroy();
                }
            }
        }
    }

    fn upload(&mut self, ctx: &RenderContext, layout: &wgpu::BindGroupLayout, map: &HeightMap, model: Mat4) {
        let geometry = &map.geometry;
        self.geometries.entry(geometry.id).or_insert_with(|| {
            let vertices = HeightMapVertex::from_plane(geometry);
            GpuGeometry {
                vertex_buffer: ctx.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Height Map Vertex Buffer"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                index_buffer: ctx.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Height Map Index Buffer"),
                    contents: bytemuck::cast_slice(&geometry.indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                index_count: geometry.indices.len() as u32,
            }
        });

        let texture = &map.texture;
        let gpu_texture = self.textures.entry(texture.id).or_insert_with(|| {
            let gpu = ctx.create_r8_texture(
                "Height Map Texture",
                texture.width,
                texture.height,
                &texture.texels,
            );
            let view = gpu.create_view(&wgpu::TextureViewDescriptor::default());
            GpuTexture { texture: gpu, view }
        });

        let uniform = HeightMapUniform::new(model, map.params(), texture.width, texture.height);
        match self.materials.get(&map.material.id) {
            Some(material) => {
                ctx.write_buffer(&material.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
            }
            None => {
                let uniform_buffer = ctx.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Height Map Uniform Buffer"),
                    contents: bytemuck::cast_slice(&[uniform]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                let bind_group = ctx.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Height Map Bind Group"),
                    layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: uniform_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&gpu_texture.view),
                        },
                    ],
                });
                tracing::debug!(
                    "Uploaded height map {} ({}x{})",
                    map.id,
                    texture.width,
                    texture.height
                );
                self.materials.insert(
                    map.material.id,
                    GpuMaterial {
                        uniform_buffer,
                        bind_group,
                    },
                );
            }
        }
    }
}

impl SubRenderer for HeightMapSubRenderer {
    fn name(&self) -> &str {
        "height_map"
    }

    fn priority(&self) -> i32 {
        super::priorities::HEIGHT_MAP
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn on_init(&mut self, ctx: &RenderContext) {
        let material_layout = ctx.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Height Map Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        // Double sided and alpha blended
        let pipeline = PipelineConfig::new(
            "Height Map",
            include_str!("../shaders/heightmap.wgsl"),
            ctx.surface_format(),
            ctx.depth_format(),
            &[ctx.camera_bind_group_layout(), &material_layout],
        )
        .with_vertex_layouts(vec![HeightMapVertex::layout()])
        .with_cull_mode(None)
        .with_blend(wgpu::BlendState::ALPHA_BLENDING)
        .with_sample_count(ctx.sample_count())
        .build(ctx.device());

        self.pipeline = Some(pipeline);
        self.material_layout = Some(material_layout);
    }

    fn prepare(&mut self, ctx: &RenderContext, scene: &Scene) {
        for id in self.release.drain() {
            self.destroy(id);
        }

        self.draws.clear();
        let Some(layout) = self.material_layout.take() else {
            return;
        };

        for (node_id, map) in scene.height_maps() {
            if !scene.is_visible(node_id) {
                continue;
            }
            self.upload(ctx, &layout, map, scene.world_transform(node_id));
            self.draws.push(DrawItem {
                geometry: map.geometry.id,
                material: map.material.id,
            });
        }

        self.material_layout = Some(layout);
    }

    fn render<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, ctx: &'a RenderContext) {
        let Some(pipeline) = &self.pipeline else {
            return;
        };

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, ctx.camera_bind_group(), &[]);
        for draw in &self.draws {
            let (Some(geometry), Some(material)) = (
                self.geometries.get(&draw.geometry),
                self.materials.get(&draw.material),
            ) else {
                continue;
            };
            pass.set_bind_group(1, &material.bind_group, &[]);
            pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
            pass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..geometry.index_count, 0, 0..1);
        }
    }

    fn on_destroy(&mut self) {
        for (_, geometry) in self.geometries.drain() {
            geometry.vertex_buffer.destroy();
            geometry.index_buffer.destroy();
        }
        for (_, texture) in self.textures.drain() {
            texture.texture.destroy();
        }
        for (_, material) in self.materials.drain() {
            material.uniform_buffer.destroy();
        }
        self.draws.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rv_core::heightmap::HeightEncoding;

    #[test]
    fn test_uniform_layout() {
        // mat4 + three vec4, 16-byte aligned for WGSL uniforms
        assert_eq!(std::mem::size_of::<HeightMapUniform>(), 112);
    }

    #[test]
    fn test_uniform_linear_params() {
        let params = HeightParams::default();
        let model = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0));
        let uniform = HeightMapUniform::new(model, &params, 4, 3);

        assert_eq!(uniform.params, [0.01, -128.0, 127.0, 128.0]);
        assert_eq!(uniform.hues[..2], [0.66, 0.0]);
        assert_eq!(uniform.dims, [4, 3, 0, 0]);
        assert_eq!(uniform.model[3][..3], [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_uniform_legacy_params() {
        let params = HeightParams {
            encoding: HeightEncoding::Legacy,
            ..Default::default()
        };
        let uniform = HeightMapUniform::new(Mat4::IDENTITY, &params, 2, 2);
        assert_eq!(uniform.params[3], 0.0);
        assert_eq!(uniform.dims[2], 1);
    }

    #[test]
    fn test_new_renderer_holds_nothing() {
        let renderer = HeightMapSubRenderer::new(ReleaseQueue::new());
        assert_eq!(renderer.name(), "height_map");
        assert_eq!(renderer.resource_count(), 0);
        assert_eq!(renderer.draw_count(), 0);
    }
}
