//! ONNX Runtime classifier. Input: [1, feature_dim] f32, output: class label per row.
//! Gradient-boosted models exported with a `label` output give i64; regressors exported as
//! float are rounded to the nearest class.

use super::Classifier;
use crate::error::ModelError;
use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;

pub struct OnnxClassifier {
    session: Mutex<Session>,
    output_name: String,
}

impl OnnxClassifier {
    /// Load model from path. There is no no-op mode: a missing model is an error.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let artifact_err = |reason: String| ModelError::Artifact {
            path: path.to_path_buf(),
            reason,
        };
        if !path.exists() {
            return Err(artifact_err("model file not found".to_string()));
        }

        let session = Session::builder()
            .map_err(|e| artifact_err(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| artifact_err(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| artifact_err(e.to_string()))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| artifact_err("model declares no outputs".to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
            output_name,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, batch: Array2<f32>) -> Result<Vec<i64>, ModelError> {
        let input = Value::from_array(batch).map_err(|e| ModelError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::Inference("session lock poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        let output = outputs
            .get(self.output_name.as_str())
            .ok_or(ModelError::EmptyPrediction)?;

        let labels = match output.try_extract_tensor::<i64>() {
            Ok((_, data)) => data.to_vec(),
            Err(_) => {
                let (_, data) = output
                    .try_extract_tensor::<f32>()
                    .map_err(|e| ModelError::Inference(e.to_string()))?;
                data.iter().map(|v| v.round() as i64).collect()
            }
        };
        Ok(labels)
    }
}
