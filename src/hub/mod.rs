//! Broadcast hub: a single task owns the [`ObserverSet`]; everyone else talks to it through a
//! cloneable [`HubHandle`].
//!
//! Two channels feed the task. Membership changes travel on an unbounded control channel so a
//! deregistration can never be lost. Events travel on a bounded channel filled with `try_send`,
//! so the capture thread never waits on observers.

mod observers;

pub use observers::{Delivery, Frame, ObserverId, ObserverSet};

use crate::config::HubConfig;
use crate::event::Event;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PublishError {
    #[error("hub queue full; event not broadcast")]
    Full,
    #[error("hub stopped")]
    Closed,
}

enum Control {
    Register {
        id: ObserverId,
        tx: mpsc::Sender<Frame>,
    },
    Deregister(ObserverId),
    Count(oneshot::Sender<usize>),
}

pub struct BroadcastHub {
    control: mpsc::UnboundedReceiver<Control>,
    events: mpsc::Receiver<Event>,
    observers: ObserverSet,
}

impl BroadcastHub {
    pub fn new(config: &HubConfig) -> (Self, HubHandle) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::channel(config.queue_capacity.max(1));
        let hub = Self {
            control: control_rx,
            events: events_rx,
            observers: ObserverSet::new(),
        };
        let handle = HubHandle {
            control: control_tx,
            events: events_tx,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (hub, handle)
    }

    /// Serve until every handle is dropped.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                Some(cmd) = self.control.recv() => self.apply(cmd),
                Some(event) = self.events.recv() => self.broadcast(&event),
                else => break,
            }
        }
        tracing::debug!("broadcast hub stopped");
    }

    fn apply(&mut self, cmd: Control) {
        match cmd {
            Control::Register { id, tx } => {
                self.observers.register(id, tx);
                tracing::info!(observer = id, observers = self.observers.len(), "observer registered");
            }
            Control::Deregister(id) => {
                if self.observers.deregister(id) {
                    tracing::info!(observer = id, observers = self.observers.len(), "observer deregistered");
                }
            }
            Control::Count(reply) => {
                let _ = reply.send(self.observers.len());
            }
        }
    }

    fn broadcast(&mut self, event: &Event) {
        if self.observers.is_empty() {
            return;
        }
        let frame: Frame = match event.to_json() {
            Ok(json) => Arc::from(json),
            Err(e) => {
                tracing::warn!(event_id = %event.id, error = %e, "event serialization failed");
                return;
            }
        };
        let delivery = self.observers.publish(&frame);
        if !delivery.evicted.is_empty() {
            tracing::warn!(
                evicted = delivery.evicted.len(),
                observers = self.observers.len(),
                "slow or closed observers evicted"
            );
        }
    }
}

#[derive(Clone)]
pub struct HubHandle {
    control: mpsc::UnboundedSender<Control>,
    events: mpsc::Sender<Event>,
    next_id: Arc<AtomicU64>,
}

impl HubHandle {
    /// Add an observer with its own queue of `queue` frames. Returns `None` if the hub is gone.
    pub fn register(&self, queue: usize) -> Option<Registration> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(queue.max(1));
        self.control.send(Control::Register { id, tx }).ok()?;
        Some(Registration {
            id,
            rx,
            hub: self.clone(),
        })
    }

    /// Idempotent; the hub logs only the removal that actually happens.
    pub fn deregister(&self, id: ObserverId) {
        let _ = self.control.send(Control::Deregister(id));
    }

    /// Hand an event to the hub without blocking. Safe to call from any thread.
    pub fn publish(&self, event: Event) -> Result<(), PublishError> {
        self.events.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PublishError::Full,
            mpsc::error::TrySendError::Closed(_) => PublishError::Closed,
        })
    }

    pub async fn observer_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        if self.control.send(Control::Count(tx)).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

/// A registered observer's receiving end. Dropping it deregisters the observer, exactly once,
/// whichever way the connection ended.
pub struct Registration {
    id: ObserverId,
    rx: mpsc::Receiver<Frame>,
    hub: HubHandle,
}

impl Registration {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Next frame for this observer; `None` once the hub has evicted it or stopped.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.hub.deregister(self.id);
    }
}
