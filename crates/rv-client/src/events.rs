//! Minimal event emitter

use std::sync::Arc;

use parking_lot::RwLock;

/// Events emitted by the topic clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// The displayed content was replaced
    Change,
}

/// Handle of a registered listener
pub type ListenerId = u64;

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Listeners<E> {
    next_id: ListenerId,
    entries: Vec<(ListenerId, Listener<E>)>,
}

/// Broadcasts events to registered listeners
///
/// Listeners are invoked without any lock held, so they may register or
/// remove listeners themselves.
pub struct EventEmitter<E> {
    listeners: RwLock<Listeners<E>>,
}

impl<E> EventEmitter<E> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            }),
        }
    }

    pub fn on(&self, listener: impl Fn(&E) + Send + Sync + 'static) -> ListenerId {
        let mut listeners = self.listeners.write();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        id
    }

    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.entries.len();
        listeners.entries.retain(|(entry, _)| *entry != id);
        listeners.entries.len() != before
    }

    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self
            .listeners
            .read()
            .entries
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().entries.len()
    }
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_reaches_all_listeners() {
        let emitter = EventEmitter::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let c = count.clone();
            emitter.on(move |e: &ClientEvent| {
                assert_eq!(*e, ClientEvent::Change);
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        emitter.emit(&ClientEvent::Change);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_off() {
        let emitter: EventEmitter<ClientEvent> = EventEmitter::new();
        let id = emitter.on(|_| {});
        assert_eq!(emitter.listener_count(), 1);
        assert!(emitter.off(id));
        assert!(!emitter.off(id));
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn test_listener_may_register_listener() {
        let emitter = Arc::new(EventEmitter::<ClientEvent>::new());
        let inner = emitter.clone();
        emitter.on(move |_| {
            inner.on(|_| {});
        });
        emitter.emit(&ClientEvent::Change);
        assert_eq!(emitter.listener_count(), 2);
    }
}
