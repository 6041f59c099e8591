//! Sans-IO rosbridge v2 connection handle
//!
//! [`Ros`] never touches a socket. Operations destined for the server are
//! queued as JSON text frames and collected by the host with
//! [`Ros::take_outgoing`]; frames received from the server are handed back
//! through [`Ros::handle_text`] (JSON) or [`Ros::handle_binary`] (CBOR) and
//! dispatched to the callbacks of subscribed [`Topic`]s.

mod compression;
mod protocol;
mod topic;

pub use compression::{Compression, decode_cbor};
pub use protocol::Operation;
pub use topic::Topic;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

/// Callback receiving the `msg` field of a publish operation
pub type MessageCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// rosbridge errors
#[derive(Debug, thiserror::Error)]
pub enum RosError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CBOR error: {0}")]
    Cbor(String),
    #[error("Malformed {op} operation: {reason}")]
    Malformed { op: String, reason: String },
}

#[derive(Default)]
struct RosInner {
    outgoing: Mutex<VecDeque<String>>,
    /// Topic name -> (subscription id, callback)
    subscribers: RwLock<HashMap<String, Vec<(String, MessageCallback)>>>,
    next_id: AtomicU64,
}

/// Cloneable rosbridge connection handle
#[derive(Clone, Default)]
pub struct Ros {
    inner: Arc<RosInner>,
}

impl Ros {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an operation for the server
    pub fn send(&self, op: &Operation) -> Result<(), RosError> {
        let frame = serde_json::to_string(op)?;
        tracing::trace!("Queued {}", frame);
        self.inner.outgoing.lock().push_back(frame);
        Ok(())
    }

    /// Collect the text frames queued since the last call
    pub fn take_outgoing(&self) -> Vec<String> {
        self.inner.outgoing.lock().drain(..).collect()
    }

    /// Allocate a connection-unique id for an operation
    pub(crate) fn next_id(&self, prefix: &str, topic: &str) -> String {
        let n = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}:{topic}:{n}")
    }

    pub(crate) fn add_subscriber(&self, topic: &str, id: String, callback: MessageCallback) {
        self.inner
            .subscribers
            .write()
            .entry(topic.to_string())
            .or_default()
            .push((id, callback));
    }

    pub(crate) fn remove_subscriber(&self, topic: &str, id: &str) -> bool {
        let mut subscribers = self.inner.subscribers.write();
        let Some(callbacks) = subscribers.get_mut(topic) else {
            return false;
        };
        let before = callbacks.len();
        callbacks.retain(|(sub_id, _)| sub_id != id);
        let removed = callbacks.len() != before;
        if callbacks.is_empty() {
            subscribers.remove(topic);
        }
        removed
    }

    /// Number of callbacks registered for a topic
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .subscribers
            .read()
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Handle a JSON text frame from the server
    pub fn handle_text(&self, frame: &str) -> Result<(), RosError> {
        let value: Value = serde_json::from_str(frame)?;
        self.handle_value(value)
    }

    /// Handle a CBOR binary frame from the server
    pub fn handle_binary(&self, frame: &[u8]) -> Result<(), RosError> {
        let value = decode_cbor(frame)?;
        self.handle_value(value)
    }

    fn handle_value(&self, value: Value) -> Result<(), RosError> {
        match value.get("op").and_then(Value::as_str) {
            Some("publish") => {
                let Operation::Publish { topic, msg } = serde_json::from_value(value)? else {
                    return Err(RosError::Malformed {
                        op: "publish".into(),
                        reason: "not a publish operation".into(),
                    });
                };
                self.dispatch(&topic, &msg);
                Ok(())
            }
            Some("status") => {
                let level = value.get("level").and_then(Value::as_str).unwrap_or("info");
                let msg = value.get("msg").and_then(Value::as_str).unwrap_or_default();
                tracing::info!("rosbridge status ({}): {}", level, msg);
                Ok(())
            }
            Some(op) => {
                tracing::debug!("Ignoring '{}' operation", op);
                Ok(())
            }
            None => Err(RosError::Malformed {
                op: "unknown".into(),
                reason: "missing 'op' field".into(),
            }),
        }
    }

    /// Deliver a message to every callback subscribed to `topic`
    pub fn dispatch(&self, topic: &str, msg: &Value) {
        // Clone the callbacks so they run without the lock held
        let callbacks: Vec<MessageCallback> = self
            .inner
            .subscribers
            .read()
            .get(topic)
            .map(|subs| subs.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default();

        if callbacks.is_empty() {
            tracing::debug!("No subscribers for {}", topic);
        }
        for callback in callbacks {
            callback(msg);
        }
    }
}

impl std::fmt::Debug for Ros {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ros")
            .field("outgoing", &self.inner.outgoing.lock().len())
            .field("topics", &self.inner.subscribers.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_publish_dispatches_to_topic() {
        let ros = Ros::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        ros.add_subscriber(
            "/map",
            "sub".into(),
            Arc::new(move |msg| {
                assert_eq!(msg["value"], 3);
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );

        ros.handle_text(r#"{"op":"publish","topic":"/map","msg":{"value":3}}"#)
            .unwrap();
        ros.handle_text(r#"{"op":"publish","topic":"/other","msg":{}}"#)
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_malformed_frames() {
        let ros = Ros::new();
        assert!(matches!(ros.handle_text("not json"), Err(RosError::Json(_))));
        assert!(matches!(
            ros.handle_text(r#"{"topic":"/map"}"#),
            Err(RosError::Malformed { .. })
        ));
        assert!(ros.handle_text(r#"{"op":"publish","msg":{}}"#).is_err());
        assert!(ros.handle_text(r#"{"op":"status","level":"warning","msg":"x"}"#).is_ok());
    }

    #[test]
    fn test_outgoing_drained_once() {
        let ros = Ros::new();
        ros.send(&Operation::Unsubscribe {
            id: "a".into(),
            topic: "/map".into(),
        })
        .unwrap();
        assert_eq!(ros.take_outgoing().len(), 1);
        assert!(ros.take_outgoing().is_empty());
    }

    #[test]
    fn test_callback_may_reenter_ros() {
        let ros = Ros::new();
        let inner = ros.clone();
        ros.add_subscriber(
            "/map",
            "sub".into(),
            Arc::new(move |_| {
                inner.remove_subscriber("/map", "sub");
            }),
        );
        ros.dispatch("/map", &Value::Null);
        assert_eq!(ros.subscriber_count("/map"), 0);
    }
}
