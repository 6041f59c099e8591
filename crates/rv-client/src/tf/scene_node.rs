//! Scene group that follows a TF frame

use std::sync::Arc;

use parking_lot::Mutex;
use rv_core::{Node, NodeId, Pose, SharedScene, Transform};

use super::{TfClient, TfSubscription, normalize_frame_id};

/// Group node placed at `frame transform * pose`
///
/// The group stays hidden until the first transform of its frame arrives.
pub struct SceneNode {
    scene: SharedScene,
    node: NodeId,
    frame_id: String,
    pose: Pose,
    tf_client: Arc<dyn TfClient>,
    subscription: Mutex<Option<TfSubscription>>,
}

impl SceneNode {
    /// Create the group under `parent` and start tracking `frame_id`
    ///
    /// Returns None if `parent` is not in the scene.
    pub fn new(
        scene: &SharedScene,
        parent: NodeId,
        frame_id: &str,
        tf_client: Arc<dyn TfClient>,
        pose: Pose,
    ) -> Option<Self> {
        let frame_id = normalize_frame_id(frame_id).to_string();
        let group = Node::group(format!("tf:{frame_id}")).with_visible(false);
        let node = scene.write().add(parent, group).ok()?;

        // No scene lock held: a cached transform is delivered synchronously
        let tracked = scene.clone();
        let subscription = tf_client.subscribe(
            &frame_id,
            Arc::new(move |transform: &Transform| {
                let placed = transform.apply(&pose);
                let mut scene = tracked.write();
                scene.set_transform(node, placed.to_mat4());
                scene.set_visible(node, true);
            }),
        );

        Some(Self {
            scene: scene.clone(),
            node,
            frame_id,
            pose,
            tf_client,
            subscription: Mutex::new(Some(subscription)),
        })
    }

    pub fn id(&self) -> NodeId {
        self.node
    }

    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn is_tracking(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Attach a node to this group
    pub fn add(&self, node: Node) -> Option<NodeId> {
        self.scene.write().add(self.node, node).ok()
    }

    /// Detach one of this group's children, returning it with its descendants
    pub fn remove(&self, child: NodeId) -> Vec<Node> {
        let mut scene = self.scene.write();
        if scene.parent(child) != Some(self.node) {
            return Vec::new();
        }
        scene.remove_subtree(child)
    }

    /// Stop following the frame. The group keeps its last placement.
    pub fn unsubscribe_tf(&self) {
        if let Some(subscription) = self.subscription.lock().take() {
            self.tf_client.unsubscribe(&subscription);
            tracing::debug!("Stopped tracking frame '{}'", self.frame_id);
        }
    }

    /// Stop tracking and detach the group, returning the removed nodes
    pub fn teardown(self) -> Vec<Node> {
        self.unsubscribe_tf();
        self.scene.write().remove_subtree(self.node)
    }
}

impl Drop for SceneNode {
    fn drop(&mut self) {
        self.unsubscribe_tf();
    }
}

impl std::fmt::Debug for SceneNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneNode")
            .field("node", &self.node)
            .field("frame_id", &self.frame_id)
            .field("tracking", &self.is_tracking())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tf::TfBuffer;
    use approx::assert_relative_eq;
    use glam::Vec3;
    use rv_core::Scene;

    fn setup() -> (SharedScene, TfBuffer) {
        (Scene::shared(), TfBuffer::new())
    }

    #[test]
    fn test_hidden_until_first_transform() {
        let (scene, tf) = setup();
        let root = scene.read().root();
        let node = SceneNode::new(&scene, root, "/odom", Arc::new(tf.clone()), Pose::default()).unwrap();
        assert_eq!(node.frame_id(), "odom");
        assert!(!scene.read().is_visible(node.id()));

        tf.update("odom", Transform::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        let scene = scene.read();
        assert!(scene.is_visible(node.id()));
        let t = scene.world_transform(node.id()).w_axis;
        assert_relative_eq!(t.x, 1.0);
        assert_relative_eq!(t.y, 2.0);
        assert_relative_eq!(t.z, 3.0);
    }

    #[test]
    fn test_offset_pose_applied() {
        let (scene, tf) = setup();
        tf.update("map", Transform::from_translation(Vec3::X));
        let root = scene.read().root();
        let node = SceneNode::new(
            &scene,
            root,
            "map",
            Arc::new(tf.clone()),
            Pose::from_position(0.0, 0.0, 0.5),
        )
        .unwrap();

        // Cached transform applied immediately
        let t = scene.read().world_transform(node.id()).w_axis;
        assert_relative_eq!(t.x, 1.0);
        assert_relative_eq!(t.z, 0.5);
    }

    #[test]
    fn test_unsubscribe_freezes_placement() {
        let (scene, tf) = setup();
        let root = scene.read().root();
        let node = SceneNode::new(&scene, root, "map", Arc::new(tf.clone()), Pose::default()).unwrap();
        tf.update("map", Transform::from_translation(Vec3::X));

        node.unsubscribe_tf();
        assert!(!node.is_tracking());
        assert_eq!(tf.subscriber_count("map"), 0);
        tf.update("map", Transform::from_translation(Vec3::Y));
        assert_relative_eq!(scene.read().world_transform(node.id()).w_axis.x, 1.0);
    }

    #[test]
    fn test_add_remove_children() {
        let (scene, tf) = setup();
        let root = scene.read().root();
        let node = SceneNode::new(&scene, root, "map", Arc::new(tf.clone()), Pose::default()).unwrap();
        let child = node.add(Node::group("child")).unwrap();
        assert_eq!(scene.read().parent(child), Some(node.id()));

        // Only own children can be removed
        let stranger = scene.write().add_to_root(Node::group("stranger"));
        assert!(node.remove(stranger).is_empty());
        assert_eq!(node.remove(child).len(), 1);

        let group = node.id();
        let removed = node.teardown();
        assert_eq!(removed.len(), 1);
        assert!(!scene.read().contains(group));
        assert_eq!(tf.subscriber_count("map"), 0);
    }

    #[test]
    fn test_drop_stops_tracking() {
        let (scene, tf) = setup();
        let root = scene.read().root();
        let node = SceneNode::new(&scene, root, "map", Arc::new(tf.clone()), Pose::default()).unwrap();
        let group = node.id();
        assert_eq!(tf.subscriber_count("map"), 1);

        drop(node);
        assert_eq!(tf.subscriber_count("map"), 0);
        // Only the callback is released; the group stays where it was
        assert!(scene.read().contains(group));
        assert_eq!(Arc::strong_count(&scene), 1);
    }
}
