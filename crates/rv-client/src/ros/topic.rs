//! Topic subscription handle

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::{Compression, Operation, Ros, RosError};

/// A named topic on a rosbridge connection
pub struct Topic {
    ros: Ros,
    pub name: String,
    pub message_type: String,
    pub queue_length: u32,
    pub compression: Compression,
    /// Id of the active subscribe operation
    subscription: Mutex<Option<String>>,
}

impl Topic {
    pub fn new(ros: &Ros, name: impl Into<String>, message_type: impl Into<String>) -> Self {
        Self {
            ros: ros.clone(),
            name: name.into(),
            message_type: message_type.into(),
            queue_length: 0,
            compression: Compression::default(),
            subscription: Mutex::new(None),
        }
    }

    pub fn with_queue_length(mut self, queue_length: u32) -> Self {
        self.queue_length = queue_length;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Subscribe `callback` to incoming messages
    ///
    /// An existing subscription of this handle is replaced.
    pub fn subscribe(
        &self,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Result<(), RosError> {
        self.unsubscribe()?;

        let id = self.ros.next_id("subscribe", &self.name);
        self.ros.send(&Operation::Subscribe {
            id: id.clone(),
            topic: self.name.clone(),
            message_type: self.message_type.clone(),
            compression: self.compression,
            queue_length: self.queue_length,
        })?;
        self.ros.add_subscriber(&self.name, id.clone(), Arc::new(callback));
        tracing::info!(
            "Subscribed to {} ({}, {})",
            self.name,
            self.message_type,
            self.compression
        );
        *self.subscription.lock() = Some(id);
        Ok(())
    }

    /// Cancel the subscription. Does nothing when not subscribed.
    pub fn unsubscribe(&self) -> Result<bool, RosError> {
        let Some(id) = self.subscription.lock().take() else {
            return Ok(false);
        };
        self.ros.remove_subscriber(&self.name, &id);
        self.ros.send(&Operation::Unsubscribe {
            id,
            topic: self.name.clone(),
        })?;
        tracing::info!("Unsubscribed from {}", self.name);
        Ok(true)
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.lock().is_some()
    }
}

impl Drop for Topic {
    fn drop(&mut self) {
        if let Err(e) = self.unsubscribe() {
            tracing::warn!("Failed to unsubscribe from {}: {}", self.name, e);
        }
    }
}

impl std::fmt::Debug for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.name)
            .field("message_type", &self.message_type)
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}
