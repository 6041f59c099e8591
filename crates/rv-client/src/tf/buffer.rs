//! In-memory transform buffer

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rv_core::Transform;

use super::{TfCallback, TfClient, TfSubscription, normalize_frame_id};

#[derive(Default)]
struct BufferState {
    transforms: HashMap<String, Transform>,
    subscribers: HashMap<String, Vec<(u64, TfCallback)>>,
    next_id: u64,
}

/// Latest transform per frame, pushed by the host with [`TfBuffer::update`]
#[derive(Clone, Default)]
pub struct TfBuffer {
    state: Arc<RwLock<BufferState>>,
}

impl TfBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a frame's transform and notify its subscribers
    pub fn update(&self, frame_id: &str, transform: Transform) {
        let frame_id = normalize_frame_id(frame_id);
        let callbacks: Vec<TfCallback> = {
            let mut state = self.state.write();
            state.transforms.insert(frame_id.to_string(), transform);
            state
                .subscribers
                .get(frame_id)
                .map(|subs| subs.iter().map(|(_, cb)| cb.clone()).collect())
                .unwrap_or_default()
        };
        for callback in callbacks {
            callback(&transform);
        }
    }

    pub fn transform(&self, frame_id: &str) -> Option<Transform> {
        self.state
            .read()
            .transforms
            .get(normalize_frame_id(frame_id))
            .copied()
    }

    pub fn subscriber_count(&self, frame_id: &str) -> usize {
        self.state
            .read()
            .subscribers
            .get(normalize_frame_id(frame_id))
            .map_or(0, Vec::len)
    }
}

impl TfClient for TfBuffer {
    fn subscribe(&self, frame_id: &str, callback: TfCallback) -> TfSubscription {
        let frame_id = normalize_frame_id(frame_id).to_string();
        let (id, cached) = {
            let mut state = self.state.write();
            let id = state.next_id;
            state.next_id += 1;
            state
                .subscribers
                .entry(frame_id.clone())
                .or_default()
                .push((id, callback.clone()));
            (id, state.transforms.get(&frame_id).copied())
        };
        tracing::debug!("TF subscription {} to frame '{}'", id, frame_id);

        if let Some(transform) = cached {
            callback(&transform);
        }
        TfSubscription { frame_id, id }
    }

    fn unsubscribe(&self, subscription: &TfSubscription) {
        let mut state = self.state.write();
        if let Some(subs) = state.subscribers.get_mut(&subscription.frame_id) {
            subs.retain(|(id, _)| *id != subscription.id);
            if subs.is_empty() {
                state.subscribers.remove(&subscription.frame_id);
            }
        }
    }
}

impl std::fmt::Debug for TfBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("TfBuffer")
            .field("frames", &state.transforms.len())
            .field("subscribed_frames", &state.subscribers.len())
            .finish()
    }
}
