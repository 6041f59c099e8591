//! rv-replay: drive the visualization helpers from recorded data
//!
//! ```text
//! rv-replay grid <frames.jsonl> [config.ron]
//! rv-replay mesh <uri> [config.ron]
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use rv_client::config::ConfigManager;
use rv_client::{ClientEvent, HeightMapClient, Ros, TfBuffer, Topic, ViewerConfig};
use rv_core::mesh::{LoadOptions, MeshLoader, MeshResource};
use rv_core::{ReleaseQueue, Scene, TaskQueue, Transform};
use serde::Deserialize;

const USAGE: &str = "usage: rv-replay grid <frames.jsonl> [config.ron]\n       rv-replay mesh <uri> [config.ron]";

#[derive(Debug, thiserror::Error)]
enum ReplayError {
    #[error("{0}")]
    Usage(&'static str),
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Client(#[from] rv_client::ClientError),
    #[error(transparent)]
    Ros(#[from] rv_client::RosError),
}

/// One entry of a tf2_msgs/TFMessage
#[derive(Debug, Deserialize)]
struct StampedTransform {
    child_frame_id: String,
    transform: Transform,
}

#[derive(Debug, Deserialize)]
struct TfMessage {
    transforms: Vec<StampedTransform>,
}

fn main() -> ExitCode {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rv_client=debug,rv_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(ReplayError::Usage(usage)) => {
            eprintln!("{usage}");
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), ReplayError> {
    let (command, target, config_path) = match args {
        [command, target] => (command, target, None),
        [command, target, config] => (command, target, Some(config)),
        _ => return Err(ReplayError::Usage(USAGE)),
    };

    let config = match config_path {
        Some(path) => ConfigManager::with_path(path).config().clone(),
        None => ConfigManager::new().config().clone(),
    };

    match command.as_str() {
        "grid" => replay_grid(Path::new(target), &config),
        "mesh" => load_mesh(target, &config),
        _ => Err(ReplayError::Usage(USAGE)),
    }
}

/// Feed recorded rosbridge text frames through a height map client
fn replay_grid(path: &Path, config: &ViewerConfig) -> Result<(), ReplayError> {
    let frames = std::fs::read_to_string(path).map_err(|source| ReplayError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let ros = Ros::new();
    let scene = Scene::shared();
    let released = ReleaseQueue::new();
    let tf = TfBuffer::new();

    let mut options = config.height_map.client_options();
    if config.height_map.use_tf {
        options.tf_client = Some(Arc::new(tf.clone()));
    }
    let client = HeightMapClient::new(&ros, scene.clone(), Arc::new(released.clone()), options)?;

    let tf_topic = Topic::new(&ros, "/tf", "tf2_msgs/TFMessage").with_compression(config.height_map.compression);
    if config.height_map.use_tf {
        let buffer = tf.clone();
        tf_topic.subscribe(move |msg| match serde_json::from_value::<TfMessage>(msg.clone()) {
            Ok(message) => {
                for stamped in message.transforms {
                    buffer.update(&stamped.child_frame_id, stamped.transform);
                }
            }
            Err(e) => tracing::warn!("Dropping TF message: {}", e),
        })?;
    }

    let scene_events = scene.clone();
    client.on(move |event| {
        if *event == ClientEvent::Change {
            let scene = scene_events.read();
            tracing::info!("Height maps on display: {}", scene.height_maps().count());
        }
    });

    for frame in ros.take_outgoing() {
        tracing::debug!("-> {}", frame);
    }

    let mut handled = 0;
    for (line_no, line) in frames.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match ros.handle_text(line) {
            Ok(()) => handled += 1,
            Err(e) => tracing::warn!("Line {}: {}", line_no + 1, e),
        }
        for id in released.drain() {
            tracing::info!("Released {:?}", id);
        }
    }

    client.dispose()?;
    for id in released.drain() {
        tracing::info!("Released {:?}", id);
    }
    tracing::info!("Replayed {} frames from {:?}", handled, path);
    Ok(())
}

/// Load a mesh and report its geometries
fn load_mesh(uri: &str, config: &ViewerConfig) -> Result<(), ReplayError> {
    let queue = TaskQueue::new();
    let loader = MeshLoader::new(queue.clone());
    let container = Arc::new(parking_lot::Mutex::new(
        MeshResource::new(uri).with_warnings(config.mesh.warnings),
    ));

    let options = LoadOptions {
        material: None,
        loader: config.mesh.loader_settings(),
    };
    loader.load(container.clone(), uri, options, || {
        tracing::debug!("Load finished");
    });
    queue.run_pending();

    let resource = container.lock();
    if !resource.is_populated() {
        tracing::warn!("Nothing loaded from {}", uri);
        return Ok(());
    }
    for child in resource.children() {
        let color = child.material.as_ref().map(|m| m.color);
        tracing::info!(
            "{}: {} triangles, bounds {:?}, color {:?}",
            child.name,
            child.triangle_count(),
            child.bounds(),
            color
        );
    }
    Ok(())
}
