//! Agent configuration: model artifacts, capture source, observer server, audit log.

use crate::error::{NidsError, Result};
use crate::logging::StructuredLogger;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NidsConfig {
    /// Trained classifier, scaler and feature layout
    pub model: ModelConfig,
    /// Where packets come from
    pub capture: CaptureConfig,
    /// Observer websocket endpoint
    pub server: ServerConfig,
    /// Capture loop -> broadcast hub handoff
    pub hub: HubConfig,
    /// Append-only audit trail
    pub event_log: EventLogConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// ONNX classifier, single-row batch in, class label out
    pub model_path: PathBuf,
    /// Standard scaler coefficients: `{"mean": [..], "scale": [..]}`
    pub scaler_path: PathBuf,
    /// JSON array of feature names in training order
    pub feature_order_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Interface to bind; default device when unset
    pub interface: Option<String>,
    /// Replay packets from a pcap file instead of a live interface
    pub pcap_file: Option<PathBuf>,
    /// BPF filter expression
    pub filter: String,
    pub promiscuous: bool,
    pub snaplen: i32,
    /// Capture read timeout, lets the loop notice shutdown on quiet links
    pub read_timeout_ms: i32,
    /// Shut the whole process down when the capture source fails
    pub exit_on_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Upper bound on a single frame send to one observer
    pub send_timeout_ms: u64,
    /// Events queued per observer before it is evicted as stalled
    pub observer_queue: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Events queued between the capture thread and the hub task
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLogConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model/nids_classifier.onnx"),
            scaler_path: PathBuf::from("model/nids_scaler.json"),
            feature_order_path: PathBuf::from("model/nids_feature_columns.json"),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: None,
            pcap_file: None,
            filter: "ip".to_string(),
            promiscuous: true,
            snaplen: 65535,
            read_timeout_ms: 500,
            exit_on_error: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8765".to_string(),
            send_timeout_ms: 2000,
            observer_queue: 64,
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
        }
    }
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("nids_logs.json"),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl NidsConfig {
    /// Load from JSON file if present, otherwise defaults. A file that exists but does not
    /// parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str::<NidsConfig>(&data)
            .map_err(|e| NidsError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Process startup: load the file, apply env overrides and install the logger it
    /// configures. When the file cannot be used, the logger comes up with default settings so
    /// the failure is reported through tracing before the error is returned.
    pub fn load_for_startup(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(mut config) => {
                config.apply_env();
                StructuredLogger::init(config.log.json, &config.log.level);
                Ok(config)
            }
            Err(e) => {
                let log = LogConfig::default();
                StructuredLogger::init(log.json, &log.level);
                tracing::error!(config = %path.display(), error = %e, "failed to load configuration");
                Err(e)
            }
        }
    }

    /// Apply `NIDS_*` environment overrides on top of the loaded file.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(iface) = lookup("NIDS_INTERFACE") {
            self.capture.interface = Some(iface);
        }
        if let Some(file) = lookup("NIDS_PCAP_FILE") {
            self.capture.pcap_file = Some(PathBuf::from(file));
        }
        if let Some(addr) = lookup("NIDS_LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
    }
}
