//! Registry of sub-renderers.

use rv_core::Scene;

use crate::context::RenderContext;
use crate::traits::SubRenderer;

/// Registry for managing sub-renderers.
///
/// The registry keeps sub-renderers in priority order and drives their
/// lifecycle (initialization, per-frame preparation, rendering, cleanup).
pub struct RendererRegistry {
    sub_renderers: Vec<Box<dyn SubRenderer>>,
    sorted: bool,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self {
            sub_renderers: Vec::new(),
            sorted: true,
        }
    }

    /// Registers a new sub-renderer.
    pub fn register<R: SubRenderer + 'static>(&mut self, renderer: R) {
        tracing::debug!("Registering sub-renderer '{}'", renderer.name());
        self.sub_renderers.push(Box::new(renderer));
        self.sorted = false;
    }

    /// Looks up a sub-renderer by name, e.g. to toggle it.
    pub fn get_mut<'a>(&'a mut self, name: &str) -> Option<&'a mut (dyn SubRenderer + 'a)> {
        for renderer in &mut self.sub_renderers {
            if renderer.name() == name {
                return Some(renderer.as_mut());
            }
        }
        None
    }

    /// Returns an iterator over all sub-renderers.
    pub fn iter(&self) -> impl Iterator<Item = &dyn SubRenderer> {
        self.sub_renderers.iter().map(|r| r.as_ref())
    }

    fn ensure_sorted(&mut self) {
        if !self.sorted {
            self.sub_renderers.sort_by_key(|r| r.priority());
            self.sorted = true;
        }
    }

    /// Initializes all sub-renderers with the given context.
    pub fn init_all(&mut self, ctx: &RenderContext) {
        self.ensure_sorted();
        for renderer in &mut self.sub_renderers {
            renderer.on_init(ctx);
        }
    }

    /// Prepares all enabled sub-renderers for rendering.
    pub fn prepare_all(&mut self, ctx: &RenderContext, scene: &Scene) {
        self.ensure_sorted();
        for renderer in &mut self.sub_renderers {
            if renderer.is_enabled() {
                renderer.prepare(ctx, scene);
            }
        }
    }

    /// Renders all enabled sub-renderers in priority order.
    pub fn render_all<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, ctx: &'a RenderContext) {
        for renderer in &self.sub_renderers {
            if renderer.is_enabled() {
                renderer.render(pass, ctx);
            }
        }
    }

    /// Destroys all sub-renderers.
    pub fn destroy_all(&mut self) {
        for renderer in &mut self.sub_renderers {
            renderer.on_destroy();
        }
        self.sub_renderers.clear();
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestRenderer {
        name: String,
        priority: i32,
        enabled: bool,
    }

    impl TestRenderer {
        fn new(name: &str, priority: i32) -> Self {
            Self {
                name: name.to_string(),
                priority,
                enabled: true,
            }
        }
    }

    impl SubRenderer for TestRenderer {
        fn name(&self) -> &str {
            &self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn set_enabled(&mut self, enabled: bool) {
            self.enabled = enabled;
        }

        fn on_init(&mut self, _ctx: &RenderContext) {}
        fn prepare(&mut self, _ctx: &RenderContext, _scene: &Scene) {}
        fn render<'a>(&'a self, _pass: &mut wgpu::RenderPass<'a>, _ctx: &'a RenderContext) {}
    }

    #[test]
    fn test_registry_ordering() {
        let mut registry = RendererRegistry::new();

        registry.register(TestRenderer::new("mesh", 100));
        registry.register(TestRenderer::new("height_map", 50));
        registry.register(TestRenderer::new("overlay", 200));

        registry.ensure_sorted();

        let names: Vec<&str> = registry.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["height_map", "mesh", "overlay"]);
    }

    #[test]
    fn test_registry_toggle() {
        let mut registry = RendererRegistry::new();
        registry.register(TestRenderer::new("mesh", 100));

        registry.register(TestRenderer::new("height_map", 50));

        if let Some(renderer) = registry.get_mut("mesh") {
            renderer.set_enabled(false);
        }
        assert!(registry.get_mut("points").is_none());

        let enabled: Vec<(&str, bool)> = registry.iter().map(|r| (r.name(), r.is_enabled())).collect();
        assert!(enabled.contains(&("mesh", false)));
        assert!(enabled.contains(&("height_map", true)));
    }
}
