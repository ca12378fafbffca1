//! The set of live observers and the per-event fan-out over it.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

pub type ObserverId = u64;

/// One serialized event, shared by every observer queue it is pushed to.
pub type Frame = Arc<str>;

/// Result of one fan-out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    /// Observers removed because their queue was full or closed
    pub evicted: Vec<ObserverId>,
}

/// Owned by the hub task; nothing else holds an observer's sender.
#[derive(Debug, Default)]
pub struct ObserverSet {
    observers: HashMap<ObserverId, mpsc::Sender<Frame>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: ObserverId, tx: mpsc::Sender<Frame>) {
        self.observers.insert(id, tx);
    }

    /// Returns true only if the observer was present; repeated calls are no-ops.
    pub fn deregister(&mut self, id: ObserverId) -> bool {
        self.observers.remove(&id).is_some()
    }

    pub fn contains(&self, id: ObserverId) -> bool {
        self.observers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Queue `frame` for every observer without waiting on any of them. An observer whose queue
    /// is full (stalled peer) or closed (connection gone) is evicted; the others are unaffected.
    pub fn publish(&mut self, frame: &Frame) -> Delivery {
        let mut delivery = Delivery::default();
        for (id, tx) in &self.observers {
            match tx.try_send(Arc::clone(frame)) {
                Ok(()) => delivery.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(observer = id, "observer queue full; evicting");
                    delivery.evicted.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(observer = id, "observer channel closed; evicting");
                    delivery.evicted.push(*id);
                }
            }
        }
        for id in &delivery.evicted {
            self.observers.remove(id);
        }
        delivery
    }
}
