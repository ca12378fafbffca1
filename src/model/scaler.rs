//! Standard scaler coefficients exported from training: `(x - mean) / scale` per column.

use super::Scaler;
use crate::error::ModelError;
use ndarray::{Array1, Array2, Axis};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ScalerFile {
    mean: Vec<f32>,
    scale: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: Array1<f32>,
    scale: Array1<f32>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f32>, scale: Vec<f32>) -> Result<Self, ModelError> {
        if mean.len() != scale.len() {
            return Err(ModelError::InvalidDimension {
                expected: mean.len(),
                got: scale.len(),
            });
        }
        // Constant columns have zero variance; leave them unscaled.
        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect::<Vec<_>>();
        Ok(Self {
            mean: Array1::from(mean),
            scale: Array1::from(scale),
        })
    }

    /// Pass-through scaler for `dim` columns.
    pub fn identity(dim: usize) -> Self {
        Self {
            mean: Array1::zeros(dim),
            scale: Array1::ones(dim),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let artifact_err = |reason: String| ModelError::Artifact {
            path: path.to_path_buf(),
            reason,
        };
        let data = std::fs::read_to_string(path).map_err(|e| artifact_err(e.to_string()))?;
        let file: ScalerFile =
            serde_json::from_str(&data).map_err(|e| artifact_err(e.to_string()))?;
        if file.mean.is_empty() {
            return Err(artifact_err("scaler has no columns".to_string()));
        }
        Self::new(file.mean, file.scale).map_err(|e| artifact_err(e.to_string()))
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }
}

impl Scaler for StandardScaler {
    fn transform(&self, batch: &mut Array2<f32>) -> Result<(), ModelError> {
        if batch.ncols() != self.dim() {
            return Err(ModelError::InvalidDimension {
                expected: self.dim(),
                got: batch.ncols(),
            });
        }
        for mut row in batch.axis_iter_mut(Axis(0)) {
            row -= &self.mean;
            row /= &self.scale;
        }
        Ok(())
    }
}
