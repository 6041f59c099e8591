//! RV Renderer
//!
//! WGPU-based rendering of the height maps and meshes held in an
//! [`rv_core::Scene`].
//!
//! # Architecture
//!
//! - [`traits::SubRenderer`] - Trait for implementing renderers of one kind of content
//! - [`plugin::RendererRegistry`] - Priority ordered collection of sub-renderers
//! - [`context::RenderContext`] - GPU context and shared camera
//! - [`sub_renderers::HeightMapSubRenderer`] - Displaced, hue coded height maps
//! - [`sub_renderers::MeshSubRenderer`] - Loaded mesh resources
//!
//! # Example
//!
//! ```ignore
//! use rv_renderer::{RenderContext, RendererRegistry};
//! use rv_renderer::sub_renderers::{HeightMapSubRenderer, MeshSubRenderer};
//!
//! let ctx = RenderContext::new(device, queue, surface_format);
//! let mut registry = RendererRegistry::new();
//! registry.register(HeightMapSubRenderer::new(release_queue));
//! registry.register(MeshSubRenderer::new());
//! registry.init_all(&ctx);
//!
//! // Each frame
//! ctx.update_camera(&camera.uniform());
//! registry.prepare_all(&ctx, &scene.read());
//! registry.render_all(&mut pass, &ctx);
//! ```

pub mod camera;
pub mod context;
pub mod pipeline;
pub mod plugin;
pub mod sub_renderers;
pub mod traits;
pub mod vertex;

pub use camera::{Camera, CameraUniform};
pub use context::RenderContext;
pub use pipeline::PipelineConfig;
pub use plugin::RendererRegistry;
pub use traits::SubRenderer;
pub use vertex::{HeightMapVertex, MeshVertex};
