//! Scoring adapter: external scaler + classifier behind capability traits.
//!
//! The pipeline only relies on `transform` and `predict`; [`OnnxClassifier`] and
//! [`StandardScaler`] are the artifact formats loaded at startup.

mod onnx;
mod scaler;

pub use onnx::OnnxClassifier;
pub use scaler::StandardScaler;

use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::event::Verdict;
use crate::features::{FeatureOrder, FeatureVector};
use ndarray::Array2;

/// Normalizes a batch of feature rows in place.
pub trait Scaler: Send + Sync {
    fn transform(&self, batch: &mut Array2<f32>) -> Result<(), ModelError>;
}

/// Predicts one integer class label per row.
pub trait Classifier: Send + Sync {
    fn predict(&self, batch: Array2<f32>) -> Result<Vec<i64>, ModelError>;
}

/// Classifier output for one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    /// Raw class label
    pub prediction: i64,
    pub verdict: Verdict,
}

pub struct Scorer {
    scaler: Box<dyn Scaler>,
    classifier: Box<dyn Classifier>,
    dim: usize,
}

impl Scorer {
    pub fn new(scaler: Box<dyn Scaler>, classifier: Box<dyn Classifier>, dim: usize) -> Self {
        Self {
            scaler,
            classifier,
            dim,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Scale and classify a single vector. Errors are per-packet; the caller drops the packet.
    pub fn score(&self, vector: &FeatureVector) -> Result<Score, ModelError> {
        if vector.len() != self.dim {
            return Err(ModelError::InvalidDimension {
                expected: self.dim,
                got: vector.len(),
            });
        }
        if let Some(i) = vector.as_slice().iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite(i));
        }

        let mut batch = Array2::from_shape_vec((1, self.dim), vector.values.clone())
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        self.scaler.transform(&mut batch)?;
        if let Some(i) = batch.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite(i));
        }

        let prediction = self
            .classifier
            .predict(batch)?
            .first()
            .copied()
            .ok_or(ModelError::EmptyPrediction)?;
        Ok(Score {
            prediction,
            verdict: Verdict::from_prediction(prediction),
        })
    }
}

/// Everything loaded from disk before capture starts.
pub struct ModelArtifacts {
    pub feature_order: FeatureOrder,
    pub scorer: Scorer,
}

impl ModelArtifacts {
    /// Load feature order, scaler and classifier. Any failure is fatal to startup.
    pub fn load(config: &ModelConfig) -> Result<Self, ModelError> {
        let feature_order = FeatureOrder::load(&config.feature_order_path)?;
        let scaler = StandardScaler::load(&config.scaler_path)?;
        if scaler.dim() != feature_order.len() {
            return Err(ModelError::Artifact {
                path: config.scaler_path.clone(),
                reason: format!(
                    "scaler has {} columns, feature order has {}",
                    scaler.dim(),
                    feature_order.len()
                ),
            });
        }
        let classifier = OnnxClassifier::load(&config.model_path)?;

        tracing::info!(
            features = feature_order.len(),
            model = %config.model_path.display(),
            "model artifacts loaded"
        );
        let dim = feature_order.len();
        Ok(Self {
            feature_order,
            scorer: Scorer::new(Box::new(scaler), Box::new(classifier), dim),
        })
    }
}
