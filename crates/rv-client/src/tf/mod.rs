//! Coordinate frame tracking
//!
//! A [`TfClient`] delivers the latest transform of a frame to its
//! subscribers. [`TfBuffer`] is an in-memory client fed by the host;
//! [`SceneNode`] keeps a scene group aligned with a frame.

mod buffer;
mod scene_node;

pub use buffer::TfBuffer;
pub use scene_node::SceneNode;

use std::sync::Arc;

use rv_core::Transform;

/// Callback receiving a frame's transform
pub type TfCallback = Arc<dyn Fn(&Transform) + Send + Sync>;

/// Handle of a frame subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TfSubscription {
    pub frame_id: String,
    pub id: u64,
}

/// Source of frame transforms
pub trait TfClient: Send + Sync {
    /// Subscribe to a frame. If the frame's transform is already known the
    /// callback receives it before this returns.
    fn subscribe(&self, frame_id: &str, callback: TfCallback) -> TfSubscription;

    /// Cancel a subscription. Unknown subscriptions are ignored.
    fn unsubscribe(&self, subscription: &TfSubscription);
}

/// Frame id with any leading `/` removed
pub fn normalize_frame_id(frame_id: &str) -> &str {
    frame_id.trim_start_matches('/')
}
