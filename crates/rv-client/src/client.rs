//! Height map topic client
//!
//! Subscribes to an occupancy grid topic carrying elevation samples and keeps
//! exactly one [`HeightMap`] in the scene: each message replaces the map on
//! display. The previous map is detached and its GPU resources released
//! before the replacement is attached, then a single [`ClientEvent::Change`]
//! is emitted.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rv_core::{
    GridError, HeightMap, HeightParams, Node, NodeId, OCCUPANCY_GRID_TYPE, OccupancyGrid, Pose,
    ResourceSink, SharedScene,
};
use serde_json::Value;

use crate::events::{ClientEvent, EventEmitter, ListenerId};
use crate::ros::{Compression, Ros, RosError, Topic};
use crate::tf::{SceneNode, TfClient, normalize_frame_id};

/// Default topic of [`HeightMapClient`]
pub const DEFAULT_TOPIC: &str = "/map";

/// Height map client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid grid: {0}")]
    Grid(#[from] GridError),
    #[error("Malformed message: {0}")]
    Message(#[from] serde_json::Error),
    #[error("Root node {0} is no longer in the scene")]
    Detached(NodeId),
    #[error(transparent)]
    Ros(#[from] RosError),
}

/// Options of a [`HeightMapClient`]
#[derive(Clone)]
pub struct HeightMapClientOptions {
    pub topic: String,
    pub compression: Compression,
    /// Attach maps to a node tracking the message frame
    pub tf_client: Option<Arc<dyn TfClient>>,
    /// Parent of the displayed map; a new group under the scene root if None
    pub root: Option<NodeId>,
    /// Offset of the map within its frame
    pub offset_pose: Pose,
    pub params: HeightParams,
}

impl Default for HeightMapClientOptions {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            compression: Compression::default(),
            tf_client: None,
            root: None,
            offset_pose: Pose::default(),
            params: HeightParams::default(),
        }
    }
}

impl std::fmt::Debug for HeightMapClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeightMapClientOptions")
            .field("topic", &self.topic)
            .field("compression", &self.compression)
            .field("tf_client", &self.tf_client.is_some())
            .field("root", &self.root)
            .field("offset_pose", &self.offset_pose)
            .field("params", &self.params)
            .finish()
    }
}

#[derive(Default)]
struct DisplayState {
    /// Node of the height map on display
    current: Option<NodeId>,
    scene_node: Option<SceneNode>,
}

struct ClientInner {
    ros: Ros,
    scene: SharedScene,
    sink: Arc<dyn ResourceSink>,
    topic_name: String,
    compression: Compression,
    tf_client: Option<Arc<dyn TfClient>>,
    root: NodeId,
    offset_pose: Pose,
    params: HeightParams,
    topic: Mutex<Option<Topic>>,
    state: Mutex<DisplayState>,
    events: EventEmitter<ClientEvent>,
}

/// Displays the latest height map published on a topic
#[derive(Clone)]
pub struct HeightMapClient {
    inner: Arc<ClientInner>,
}

impl HeightMapClient {
    /// Create the client and subscribe to its topic
    ///
    /// Resources of replaced maps are released into `sink`.
    pub fn new(
        ros: &Ros,
        scene: SharedScene,
        sink: Arc<dyn ResourceSink>,
        options: HeightMapClientOptions,
    ) -> Result<Self, ClientError> {
        let root = match options.root {
            Some(root) => root,
            None => scene.write().add_to_root(Node::group("height_map_client")),
        };

        let client = Self {
            inner: Arc::new(ClientInner {
                ros: ros.clone(),
                scene,
                sink,
                topic_name: options.topic,
                compression: options.compression,
                tf_client: options.tf_client,
                root,
                offset_pose: options.offset_pose,
                params: options.params,
                topic: Mutex::new(None),
                state: Mutex::new(DisplayState::default()),
                events: EventEmitter::new(),
            }),
        };
        client.subscribe()?;
        Ok(client)
    }

    /// (Re)subscribe to the topic
    pub fn subscribe(&self) -> Result<(), ClientError> {
        self.unsubscribe()?;

        let topic = Topic::new(&self.inner.ros, &self.inner.topic_name, OCCUPANCY_GRID_TYPE)
            .with_queue_length(1)
            .with_compression(self.inner.compression);

        let weak: Weak<ClientInner> = Arc::downgrade(&self.inner);
        topic.subscribe(move |msg: &Value| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_message(msg);
            }
        })?;

        *self.inner.topic.lock() = Some(topic);
        Ok(())
    }

    /// Cancel the subscription. Does nothing before a subscription exists.
    pub fn unsubscribe(&self) -> Result<(), ClientError> {
        let topic = self.inner.topic.lock().take();
        if let Some(topic) = topic {
            topic.unsubscribe()?;
        }
        Ok(())
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner
            .topic
            .lock()
            .as_ref()
            .is_some_and(Topic::is_subscribed)
    }

    /// Replace the displayed map with one built from `grid`
    ///
    /// On error nothing changes and no event is emitted.
    pub fn process_message(&self, grid: &OccupancyGrid) -> Result<NodeId, ClientError> {
        self.inner.process_message(grid)
    }

    /// Unsubscribe and remove the displayed map and its frame node
    pub fn dispose(&self) -> Result<(), ClientError> {
        self.unsubscribe()?;
        let mut state = self.inner.state.lock();
        self.inner.retire(&mut state, None);
        Ok(())
    }

    /// Register a listener for [`ClientEvent`]s
    pub fn on(&self, listener: impl Fn(&ClientEvent) + Send + Sync + 'static) -> ListenerId {
        self.inner.events.on(listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.events.off(id)
    }

    pub fn events(&self) -> &EventEmitter<ClientEvent> {
        &self.inner.events
    }

    /// Node of the height map on display
    pub fn current(&self) -> Option<NodeId> {
        self.inner.state.lock().current
    }

    /// Node tracking the current message frame
    pub fn scene_node(&self) -> Option<NodeId> {
        self.inner.state.lock().scene_node.as_ref().map(SceneNode::id)
    }

    pub fn root(&self) -> NodeId {
        self.inner.root
    }

    pub fn topic_name(&self) -> &str {
        &self.inner.topic_name
    }
}

impl ClientInner {
    fn handle_message(&self, msg: &Value) {
        let result = serde_json::from_value::<OccupancyGrid>(msg.clone())
            .map_err(ClientError::from)
            .and_then(|grid| self.process_message(&grid));
        if let Err(e) = result {
            tracing::warn!("Dropping message on {}: {}", self.topic_name, e);
        }
    }

    fn process_message(&self, grid: &OccupancyGrid) -> Result<NodeId, ClientError> {
        let map = HeightMap::from_grid(grid, &self.params)?;
        if !self.scene.read().contains(self.root) {
            map.dispose(self.sink.as_ref());
            return Err(ClientError::Detached(self.root));
        }
        let frame_id = normalize_frame_id(&map.frame_id).to_string();

        let node_id = {
            let mut state = self.state.lock();
            self.retire(&mut state, Some(&frame_id));

            let parent = match &self.tf_client {
                Some(tf_client) => self.frame_node(&mut state, &frame_id, tf_client),
                None => Some(self.root),
            };
            let attached = match parent {
                Some(parent) => self.scene.write().add(parent, Node::height_map(map)),
                None => Err(Node::height_map(map)),
            };
            let node_id = match attached {
                Ok(node_id) => node_id,
                Err(mut node) => {
                    if let Some(map) = node.take_height_map() {
                        map.dispose(self.sink.as_ref());
                    }
                    return Err(ClientError::Detached(self.root));
                }
            };
            state.current = Some(node_id);
            node_id
        };

        tracing::debug!(
            "Displaying {}x{} height map in frame '{}'",
            grid.info.width,
            grid.info.height,
            frame_id
        );
        self.events.emit(&ClientEvent::Change);
        Ok(node_id)
    }

    /// Node tracking `frame_id`, created on first use
    fn frame_node(
        &self,
        state: &mut DisplayState,
        frame_id: &str,
        tf_client: &Arc<dyn TfClient>,
    ) -> Option<NodeId> {
        if let Some(node) = &state.scene_node {
            return Some(node.id());
        }
        let node = SceneNode::new(
            &self.scene,
            self.root,
            frame_id,
            tf_client.clone(),
            self.offset_pose,
        )?;
        let id = node.id();
        state.scene_node = Some(node);
        Some(id)
    }

    /// Detach the displayed map and release its resources
    ///
    /// The frame node is kept only if it tracks `keep_frame`.
    fn retire(&self, state: &mut DisplayState, keep_frame: Option<&str>) {
        let mut removed = Vec::new();
        if let Some(current) = state.current.take() {
            removed.extend(self.scene.write().remove_subtree(current));
        }

        let stale = state
            .scene_node
            .as_ref()
            .is_some_and(|node| Some(node.frame_id()) != keep_frame);
        if stale && let Some(node) = state.scene_node.take() {
            tracing::debug!("Dropping node for frame '{}'", node.frame_id());
            removed.extend(node.teardown());
        }

        for mut node in removed {
            if let Some(map) = node.take_height_map() {
                map.dispose(self.sink.as_ref());
            }
        }
    }
}

impl std::fmt::Debug for HeightMapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeightMapClient")
            .field("topic", &self.inner.topic_name)
            .field("root", &self.inner.root)
            .field("current", &self.current())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tf::TfBuffer;
    use glam::Vec3;
    use rv_core::{ReleaseQueue, ResourceId, Scene, Transform};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records each release with the number of height maps in the scene at that moment
    struct RecordingSink {
        scene: SharedScene,
        released: Mutex<Vec<(ResourceId, usize)>>,
    }

    impl ResourceSink for RecordingSink {
        fn release(&self, id: ResourceId) {
            let displayed = self.scene.read().height_maps().count();
            self.released.lock().push((id, displayed));
        }
    }

    fn grid(frame_id: &str, value: i8) -> OccupancyGrid {
        let mut grid = OccupancyGrid::new(2, 2, 0.5, vec![value; 4]);
        grid.header.frame_id = frame_id.to_string();
        grid
    }

    fn setup(options: HeightMapClientOptions) -> (Ros, SharedScene, Arc<RecordingSink>, HeightMapClient) {
        let ros = Ros::new();
        let scene = Scene::shared();
        let sink = Arc::new(RecordingSink {
            scene: scene.clone(),
            released: Mutex::new(Vec::new()),
        });
        let client = HeightMapClient::new(&ros, scene.clone(), sink.clone(), options).unwrap();
        (ros, scene, sink, client)
    }

    fn ops(ros: &Ros) -> Vec<Value> {
        ros.take_outgoing()
            .iter()
            .map(|f| serde_json::from_str(f).unwrap())
            .collect()
    }

    #[test]
    fn test_subscribes_with_grid_parameters() {
        let (ros, _scene, _sink, client) = setup(HeightMapClientOptions::default());
        assert!(client.is_subscribed());

        let sent = ops(&ros);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["op"], "subscribe");
        assert_eq!(sent[0]["topic"], "/map");
        assert_eq!(sent[0]["type"], "nav_msgs/OccupancyGrid");
        assert_eq!(sent[0]["queue_length"], 1);
        assert_eq!(sent[0]["compression"], "cbor");
    }

    #[test]
    fn test_resubscribe_unsubscribes_first() {
        let (ros, _scene, _sink, client) = setup(HeightMapClientOptions::default());
        ros.take_outgoing();
        client.subscribe().unwrap();

        let sent: Vec<String> = ops(&ros)
            .iter()
            .map(|v| v["op"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(sent, vec!["unsubscribe", "subscribe"]);
        assert_eq!(ros.subscriber_count("/map"), 1);
    }

    #[test]
    fn test_unsubscribe_twice_is_noop() {
        let (ros, _scene, _sink, client) = setup(HeightMapClientOptions::default());
        ros.take_outgoing();

        client.unsubscribe().unwrap();
        assert_eq!(ops(&ros).len(), 1);
        client.unsubscribe().unwrap();
        assert!(ros.take_outgoing().is_empty());
        assert!(!client.is_subscribed());
    }

    #[test]
    fn test_replacement_disposes_before_attach() {
        let (_ros, scene, sink, client) = setup(HeightMapClientOptions::default());

        let first = client.process_message(&grid("map", 1)).unwrap();
        assert!(sink.released.lock().is_empty());
        let first_ids = match &scene.read().get(first).unwrap().content {
            rv_core::NodeContent::HeightMap(map) => map.resource_ids(),
            _ => panic!("not a height map"),
        };

        let second = client.process_message(&grid("map", 2)).unwrap();
        assert_ne!(first, second);
        assert!(!scene.read().contains(first));
        assert_eq!(client.current(), Some(second));

        let released = sink.released.lock();
        // Texture, material and geometry of the first map, each once,
        // while no map was attached
        assert_eq!(released.len(), 3);
        for id in first_ids {
            assert_eq!(released.iter().filter(|(r, _)| *r == id).count(), 1);
        }
        assert!(released.iter().all(|(_, displayed)| *displayed == 0));
        assert_eq!(scene.read().height_maps().count(), 1);
    }

    #[test]
    fn test_change_emitted_once_per_message() {
        let (_ros, _scene, _sink, client) = setup(HeightMapClientOptions::default());
        let changes = Arc::new(AtomicUsize::new(0));
        let c = changes.clone();
        client.on(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        client.process_message(&grid("map", 0)).unwrap();
        client.process_message(&grid("map", 0)).unwrap();
        assert_eq!(changes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalid_grid_changes_nothing() {
        let (_ros, scene, sink, client) = setup(HeightMapClientOptions::default());
        let changes = Arc::new(AtomicUsize::new(0));
        let c = changes.clone();
        client.on(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let shown = client.process_message(&grid("map", 0)).unwrap();

        let broken = OccupancyGrid::new(3, 3, 0.5, vec![0; 4]);
        assert!(matches!(
            client.process_message(&broken),
            Err(ClientError::Grid(GridError::DataLength { .. }))
        ));
        assert_eq!(client.current(), Some(shown));
        assert!(scene.read().contains(shown));
        assert!(sink.released.lock().is_empty());
        assert_eq!(changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_publish_frame_reaches_scene() {
        let (ros, scene, _sink, client) = setup(HeightMapClientOptions::default());
        let frame = serde_json::json!({
            "op": "publish",
            "topic": "/map",
            "msg": {
                "header": {"frame_id": "map"},
                "info": {"resolution": 0.1, "width": 2, "height": 1},
                "data": [-5, 5],
            },
        });
        ros.handle_text(&frame.to_string()).unwrap();

        let current = client.current().unwrap();
        let scene = scene.read();
        assert_eq!(scene.parent(current), Some(client.root()));
        assert_eq!(scene.height_maps().count(), 1);
    }

    #[test]
    fn test_malformed_publish_is_dropped() {
        let (ros, _scene, _sink, client) = setup(HeightMapClientOptions::default());
        ros.handle_text(r#"{"op":"publish","topic":"/map","msg":{"data":"nope"}}"#)
            .unwrap();
        assert!(client.current().is_none());
    }

    #[test]
    fn test_tf_scene_node_reused_per_frame() {
        let tf = TfBuffer::new();
        let options = HeightMapClientOptions {
            tf_client: Some(Arc::new(tf.clone())),
            offset_pose: Pose::from_position(0.0, 0.0, 1.0),
            ..Default::default()
        };
        let (_ros, scene, _sink, client) = setup(options);

        let first = client.process_message(&grid("/odom", 0)).unwrap();
        let node = client.scene_node().unwrap();
        assert_eq!(scene.read().parent(first), Some(node));
        assert_eq!(scene.read().parent(node), Some(client.root()));
        // Hidden until the frame is known
        assert!(!scene.read().is_visible(first));

        tf.update("odom", Transform::from_translation(Vec3::X));
        assert!(scene.read().is_visible(first));
        let origin = scene.read().world_transform(node).w_axis;
        assert_eq!(origin.truncate(), Vec3::new(1.0, 0.0, 1.0));

        let second = client.process_message(&grid("odom", 0)).unwrap();
        assert_eq!(client.scene_node(), Some(node));
        assert_eq!(scene.read().parent(second), Some(node));
        assert_eq!(tf.subscriber_count("odom"), 1);
    }

    #[test]
    fn test_tf_frame_change_tears_down_node() {
        let tf = TfBuffer::new();
        let options = HeightMapClientOptions {
            tf_client: Some(Arc::new(tf.clone())),
            ..Default::default()
        };
        let (_ros, scene, sink, client) = setup(options);

        client.process_message(&grid("odom", 0)).unwrap();
        let old_node = client.scene_node().unwrap();
        client.process_message(&grid("map", 0)).unwrap();

        assert_ne!(client.scene_node(), Some(old_node));
        assert!(!scene.read().contains(old_node));
        assert_eq!(tf.subscriber_count("odom"), 0);
        assert_eq!(tf.subscriber_count("map"), 1);
        assert_eq!(sink.released.lock().len(), 3);
    }

    #[test]
    fn test_dispose_clears_display() {
        let tf = TfBuffer::new();
        let options = HeightMapClientOptions {
            tf_client: Some(Arc::new(tf.clone())),
            ..Default::default()
        };
        let (ros, scene, sink, client) = setup(options);
        client.process_message(&grid("map", 0)).unwrap();

        client.dispose().unwrap();
        assert!(client.current().is_none());
        assert!(client.scene_node().is_none());
        assert_eq!(scene.read().height_maps().count(), 0);
        assert_eq!(sink.released.lock().len(), 3);
        assert_eq!(tf.subscriber_count("map"), 0);
        assert_eq!(ros.subscriber_count("/map"), 0);
    }

    #[test]
    fn test_release_queue_sink() {
        let ros = Ros::new();
        let scene = Scene::shared();
        let queue = ReleaseQueue::new();
        let client = HeightMapClient::new(
            &ros,
            scene,
            Arc::new(queue.clone()),
            HeightMapClientOptions::default(),
        )
        .unwrap();
        client.process_message(&grid("map", 0)).unwrap();
        client.process_message(&grid("map", 0)).unwrap();
        assert_eq!(queue.drain().len(), 3);
    }
}
