//! Explicit release of GPU-backed resources
//!
//! Textures, materials and generated geometry are not reclaimed when their
//! CPU-side owner is dropped: the owner hands their ids to a [`ResourceSink`]
//! and the renderer destroys the matching GPU objects.

use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

/// Identifies a GPU-backed resource owned by a scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Texture(Uuid),
    Material(Uuid),
    Geometry(Uuid),
}

impl ResourceId {
    pub fn uuid(&self) -> Uuid {
        match self {
            ResourceId::Texture(id) | ResourceId::Material(id) | ResourceId::Geometry(id) => *id,
        }
    }
}

/// Receives resources that must be released
pub trait ResourceSink: Send + Sync {
    fn release(&self, id: ResourceId);
}

/// Queue of released resources, drained by the renderer once per frame
#[derive(Debug, Clone, Default)]
pub struct ReleaseQueue {
    pending: Arc<Mutex<Vec<ResourceId>>>,
}

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every pending release
    pub fn drain(&self) -> Vec<ResourceId> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl ResourceSink for ReleaseQueue {
    fn release(&self, id: ResourceId) {
        tracing::debug!("Queued release of {:?}", id);
        self.pending.lock().push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_queue_drain() {
        let queue = ReleaseQueue::new();
        let shared = queue.clone();
        let id = Uuid::new_v4();

        shared.release(ResourceId::Texture(id));
        shared.release(ResourceId::Material(id));
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert_eq!(drained, vec![ResourceId::Texture(id), ResourceId::Material(id)]);
        assert!(queue.is_empty());
    }
}
