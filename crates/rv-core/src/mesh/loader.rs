//! Extension-keyed mesh loader dispatch
//!
//! [`MeshLoader`] holds one handler per supported file extension. A handler
//! defers the actual fetch and parse onto the loader's [`TaskQueue`] and
//! invokes the caller's completion callback exactly once when the task has
//! run, whether or not the load succeeded. Failures go to the error hook;
//! they never reach the caller.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::fetch::{MeshFetcher, UriFetcher, join_uri};
use super::{Material, MeshError, MeshUnit, ParsedMesh, dae, obj, stl};
use crate::scene::SharedMeshResource;
use crate::task::TaskQueue;

/// Extensions with a built-in handler
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["dae", "obj", "stl"];

/// Completion callback of a load
pub type OnDone = Box<dyn FnOnce() + Send>;

/// Handler invoked for one extension: `(loader, container, uri, options, on_done)`
pub type LoaderFn = fn(&MeshLoader, SharedMeshResource, String, LoadOptions, OnDone);

/// Receives every load failure
pub type ErrorHook = Arc<dyn Fn(&MeshError) + Send + Sync>;

/// Configuration of the underlying format loader
#[derive(Clone)]
pub struct LoaderSettings {
    pub fetcher: Arc<dyn MeshFetcher>,
    pub unit: MeshUnit,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            fetcher: Arc::new(UriFetcher::new()),
            unit: MeshUnit::Meters,
        }
    }
}

impl std::fmt::Debug for LoaderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderSettings")
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

/// Options of a single load
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Override material
    pub material: Option<Material>,
    /// Format loader configuration
    pub loader: LoaderSettings,
}

impl LoadOptions {
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_loader(mut self, loader: LoaderSettings) -> Self {
        self.loader = loader;
        self
    }
}

/// Shared, replaceable error hook
#[derive(Clone)]
struct ErrorReporter {
    hook: Arc<RwLock<ErrorHook>>,
}

impl ErrorReporter {
    fn report(&self, error: &MeshError) {
        let hook = self.hook.read().clone();
        hook(error);
    }
}

fn default_error_hook() -> ErrorHook {
    Arc::new(|error: &MeshError| tracing::error!("Mesh load failed: {}", error))
}

/// Mesh loader dispatch table
pub struct MeshLoader {
    loaders: BTreeMap<String, LoaderFn>,
    queue: TaskQueue,
    errors: ErrorReporter,
}

impl MeshLoader {
    /// Create a loader with the STL, OBJ and DAE handlers
    pub fn new(queue: TaskQueue) -> Self {
        let mut loader = Self {
            loaders: BTreeMap::new(),
            queue,
            errors: ErrorReporter {
                hook: Arc::new(RwLock::new(default_error_hook())),
            },
        };
        loader.register("dae", load_dae);
        loader.register("obj", load_obj);
        loader.register("stl", load_stl);
        loader
    }

    /// Register a handler, replacing any handler for the same extension
    pub fn register(&mut self, extension: &str, handler: LoaderFn) -> Option<LoaderFn> {
        self.loaders.insert(extension.to_ascii_lowercase(), handler)
    }

    /// Handler for an extension
    pub fn handler(&self, extension: &str) -> Option<LoaderFn> {
        self.loaders.get(&extension.to_ascii_lowercase()).copied()
    }

    /// Extensions with a registered handler, sorted
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// Replace the hook every load failure is reported to
    pub fn set_error_hook(&self, hook: impl Fn(&MeshError) + Send + Sync + 'static) {
        *self.errors.hook.write() = Arc::new(hook);
    }

    /// Restore the default hook (logs with `tracing::error!`)
    pub fn reset_error_hook(&self) {
        *self.errors.hook.write() = default_error_hook();
    }

    /// Report an error through the current hook
    pub fn report_error(&self, error: &MeshError) {
        self.errors.report(error);
    }

    /// Load `uri` into `container`
    ///
    /// `on_done` runs exactly once, after this call returns, when the
    /// queue's pending tasks are run. Returns false if no handler matches the
    /// extension; the failure is still reported and `on_done` still runs.
    pub fn load(
        &self,
        container: SharedMeshResource,
        uri: impl Into<String>,
        options: LoadOptions,
        on_done: impl FnOnce() + Send + 'static,
    ) -> bool {
        let uri = uri.into();
        let extension = super::extension_of(&uri).unwrap_or_default();
        let on_done: OnDone = Box::new(on_done);

        match self.handler(&extension) {
            Some(handler) => {
                tracing::info!("Loading mesh {}", uri);
                handler(self, container, uri, options, on_done);
                true
            }
            None => {
                let errors = self.errors.clone();
                self.queue.spawn(move || {
                    errors.report(&MeshError::UnsupportedFormat(uri));
                    on_done();
                });
                false
            }
        }
    }

    /// Defer `parse` and populate `container` with its result
    fn spawn_load(
        &self,
        container: SharedMeshResource,
        uri: String,
        on_done: OnDone,
        parse: impl FnOnce(&str) -> Result<ParsedMesh, MeshError> + Send + 'static,
    ) {
        let errors = self.errors.clone();
        self.queue.spawn(move || {
            match parse(&uri) {
                Ok(parsed) => {
                    let mut resource = container.lock();
                    if resource.warnings {
                        for warning in &parsed.warnings {
                            tracing::warn!("{}: {}", uri, warning);
                        }
                    }
                    tracing::debug!("Loaded {} geometries from {}", parsed.children.len(), uri);
                    resource.populate(parsed.children);
                }
                Err(error) => errors.report(&error),
            }
            on_done();
        });
    }
}

impl std::fmt::Debug for MeshLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshLoader")
            .field("extensions", &self.loaders.keys().collect::<Vec<_>>())
            .field("queue", &self.queue)
            .finish()
    }
}

fn file_stem(uri: &str) -> &str {
    let file = uri.rsplit('/').next().unwrap_or(uri);
    file.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(file)
}

fn load_stl(
    loader: &MeshLoader,
    container: SharedMeshResource,
    uri: String,
    options: LoadOptions,
    on_done: OnDone,
) {
    loader.spawn_load(container, uri, on_done, move |uri| {
        let bytes = options.loader.fetcher.fetch(uri)?;
        let mut parsed = stl::parse_stl(&bytes, file_stem(uri), options.loader.unit)?;
        let material = options.material.unwrap_or_else(Material::stl_default);
        for child in &mut parsed.children {
            child.material = Some(material.clone());
        }
        Ok(parsed)
    });
}

fn load_obj(
    loader: &MeshLoader,
    container: SharedMeshResource,
    uri: String,
    options: LoadOptions,
    on_done: OnDone,
) {
    loader.spawn_load(container, uri, on_done, move |uri| {
        let fetcher = options.loader.fetcher.clone();
        let bytes = fetcher.fetch(uri)?;
        let load_material = |name: &str| fetcher.fetch(&join_uri(uri, name));
        obj::parse_obj(&bytes, options.loader.unit, &load_material)
    });
}

fn load_dae(
    loader: &MeshLoader,
    container: SharedMeshResource,
    uri: String,
    options: LoadOptions,
    on_done: OnDone,
) {
    loader.spawn_load(container, uri, on_done, move |uri| {
        let bytes = options.loader.fetcher.fetch(uri)?;
        let mut parsed = dae::parse_dae(&bytes, options.loader.unit)?;
        if let Some(material) = &options.material {
            for child in parsed.children.iter_mut().filter(|c| c.material.is_none()) {
                child.material = Some(material.clone());
            }
        }
        Ok(parsed)
    });
}
