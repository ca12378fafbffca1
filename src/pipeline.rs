//! Capture loop: packet → features → vector → score → event → {audit log, hub}.
//! Runs on its own thread, one packet at a time.

use crate::capture::{Captured, PacketSource, RawPacket};
use crate::error::CaptureError;
use crate::event::{assemble, Event, Verdict};
use crate::features::{extract, Extraction, SkipReason, Vectorizer};
use crate::hub::{HubHandle, PublishError};
use crate::model::Scorer;
use crate::storage::EventLog;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, trace, warn};

#[derive(Debug, Default)]
pub struct PipelineStats {
    pub packets: AtomicU64,
    pub skipped_no_ip: AtomicU64,
    pub skipped_transport: AtomicU64,
    pub score_failures: AtomicU64,
    pub normal: AtomicU64,
    pub attacks: AtomicU64,
    pub log_failures: AtomicU64,
    pub broadcast_drops: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub packets: u64,
    pub skipped_no_ip: u64,
    pub skipped_transport: u64,
    pub score_failures: u64,
    pub normal: u64,
    pub attacks: u64,
    pub log_failures: u64,
    pub broadcast_drops: u64,
}

impl PipelineStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            packets: get(&self.packets),
            skipped_no_ip: get(&self.skipped_no_ip),
            skipped_transport: get(&self.skipped_transport),
            score_failures: get(&self.score_failures),
            normal: get(&self.normal),
            attacks: get(&self.attacks),
            log_failures: get(&self.log_failures),
            broadcast_drops: get(&self.broadcast_drops),
        }
    }
}

pub struct CaptureLoop {
    vectorizer: Vectorizer,
    scorer: Scorer,
    log: EventLog,
    hub: HubHandle,
    stats: Arc<PipelineStats>,
}

impl CaptureLoop {
    pub fn new(vectorizer: Vectorizer, scorer: Scorer, log: EventLog, hub: HubHandle) -> Self {
        Self {
            vectorizer,
            scorer,
            log,
            hub,
            stats: Arc::new(PipelineStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    /// Run one packet through the pipeline. `None` means it was skipped or failed scoring; in
    /// that case nothing was logged or broadcast.
    pub fn process(&mut self, packet: &RawPacket) -> Option<Event> {
        PipelineStats::bump(&self.stats.packets);

        let (meta, features) = match extract(packet) {
            Extraction::Features { meta, features } => (meta, features),
            Extraction::Skip(reason) => {
                match reason {
                    SkipReason::NoIpLayer => PipelineStats::bump(&self.stats.skipped_no_ip),
                    SkipReason::UnsupportedTransport => {
                        PipelineStats::bump(&self.stats.skipped_transport)
                    }
                }
                trace!(?reason, len = packet.len(), "packet skipped");
                return None;
            }
        };

        let vector = self.vectorizer.vectorize(&features);
        let score = match self.scorer.score(&vector) {
            Ok(score) => score,
            Err(e) => {
                PipelineStats::bump(&self.stats.score_failures);
                warn!(src = %meta.src_ip, dst = %meta.dst_ip, error = %e, "scoring failed; packet dropped");
                return None;
            }
        };

        let event = assemble(&meta, score);
        match event.verdict {
            Verdict::Normal => {
                PipelineStats::bump(&self.stats.normal);
                info!(
                    label = event.verdict.label(),
                    prediction = event.prediction,
                    src = %event.src,
                    dst = %event.dst,
                    protocol = event.protocol,
                    "prediction"
                );
            }
            Verdict::Attack => {
                PipelineStats::bump(&self.stats.attacks);
                warn!(
                    label = event.verdict.label(),
                    prediction = event.prediction,
                    src = %event.src,
                    dst = %event.dst,
                    protocol = event.protocol,
                    "prediction"
                );
            }
        }

        // Log first; broadcast goes ahead even when the write failed.
        if let Err(e) = self.log.append(&event) {
            PipelineStats::bump(&self.stats.log_failures);
            warn!(path = %self.log.path().display(), error = %e, "event log append failed");
        }
        match self.hub.publish(event.clone()) {
            Ok(()) => {}
            Err(PublishError::Full) => {
                PipelineStats::bump(&self.stats.broadcast_drops);
                warn!(event_id = %event.id, "hub queue full; event not broadcast");
            }
            Err(PublishError::Closed) => {
                PipelineStats::bump(&self.stats.broadcast_drops);
                trace!(event_id = %event.id, "hub stopped; event not broadcast");
            }
        }
        Some(event)
    }

    /// Pull packets until the source is exhausted, fails, or `stop` is set.
    pub fn run(&mut self, source: &mut dyn PacketSource, stop: &AtomicBool) -> Result<(), CaptureError> {
        info!(source = %source.describe(), "capture loop started");
        let result = self.drain(source, stop);
        let stats = self.stats.snapshot();
        match &result {
            Ok(()) => info!(?stats, "capture loop finished"),
            Err(e) => tracing::error!(?stats, error = %e, "capture source failed"),
        }
        result
    }

    fn drain(&mut self, source: &mut dyn PacketSource, stop: &AtomicBool) -> Result<(), CaptureError> {
        while !stop.load(Ordering::Relaxed) {
            match source.next_packet()? {
                Captured::Exhausted => {
                    info!("capture source exhausted");
                    break;
                }
                Captured::Idle => continue,
                Captured::Packet(packet) => {
                    self.process(&packet);
                }
            }
        }
        Ok(())
    }
}
