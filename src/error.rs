//! Error types for the detection pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Scoring and model artifact errors.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to load artifact {path}: {reason}")]
    Artifact { path: PathBuf, reason: String },

    #[error("invalid feature vector length: expected {expected}, got {got}")]
    InvalidDimension { expected: usize, got: usize },

    #[error("non-finite value at feature index {0}")]
    NonFinite(usize),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("classifier returned no prediction")]
    EmptyPrediction,
}

/// Capture source errors. Any of these ends the capture activity.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("pcap error: {0}")]
    Pcap(String),

    #[error("unsupported link type: {0}")]
    UnsupportedLink(String),

    #[error("no capture source configured")]
    NoSource,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum NidsError {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NidsError>;
