//! NIDS Agent — real-time network intrusion detection.
//!
//! Modular structure:
//! - [`capture`] — Raw packet sources (pcap replay, live interface)
//! - [`features`] — Per-packet feature extraction and vectorization
//! - [`model`] — Scaler + ONNX classifier scoring
//! - [`event`] — Verdicts and the audit/broadcast event record
//! - [`storage`] — Append-only JSON lines audit log
//! - [`hub`] — Broadcast hub owning the live observer set
//! - [`server`] — Websocket observer server
//! - [`pipeline`] — Capture loop tying the stages together
//! - [`logging`] — Structured diagnostic logging

pub mod config;
pub mod error;
pub mod capture;
pub mod features;
pub mod model;
pub mod event;
pub mod storage;
pub mod hub;
pub mod server;
pub mod pipeline;
pub mod logging;

pub use config::NidsConfig;
pub use error::{CaptureError, ModelError, NidsError};
pub use capture::{PacketSource, RawPacket};
pub use features::{extract, FeatureOrder, FeatureSet, FeatureVector, Vectorizer};
pub use model::{ModelArtifacts, Scorer};
pub use event::{Event, EventRecord, Verdict};
pub use storage::EventLog;
pub use hub::{BroadcastHub, HubHandle};
pub use server::ObserverServer;
pub use pipeline::CaptureLoop;
pub use logging::StructuredLogger;
