//! SubRenderer trait definition.

use rv_core::Scene;

use crate::context::RenderContext;

/// A sub-renderer that draws one kind of scene content.
///
/// Sub-renderers are executed in order of their priority (lower values
/// first). See [`crate::sub_renderers::priorities`].
pub trait SubRenderer: Send + Sync {
    /// Returns the unique name of this sub-renderer.
    fn name(&self) -> &str;

    /// Returns the render priority (lower = rendered first).
    fn priority(&self) -> i32;

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    /// Called when the render context is initialized.
    ///
    /// Use this to create pipelines and bind group layouts.
    fn on_init(&mut self, ctx: &RenderContext);

    /// Synchronize GPU resources with the scene.
    ///
    /// Called once per frame before the render pass.
    fn prepare(&mut self, ctx: &RenderContext, scene: &Scene);

    /// Issue draw calls for the content prepared this frame.
    fn render<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, ctx: &'a RenderContext);

    /// Called when the sub-renderer is being destroyed.
    fn on_destroy(&mut self) {}
}
