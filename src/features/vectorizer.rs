//! FeatureSet → FeatureVector in the classifier's training column order.

use super::{names, FeatureSet, FeatureVector};
use crate::error::ModelError;
use std::path::Path;
use std::sync::Arc;

/// Column order the classifier was trained with. Loaded once, read-only for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureOrder {
    names: Arc<[String]>,
}

impl FeatureOrder {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Load a JSON array of feature names.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let artifact_err = |reason: String| ModelError::Artifact {
            path: path.to_path_buf(),
            reason,
        };
        let data = std::fs::read_to_string(path).map_err(|e| artifact_err(e.to_string()))?;
        let names: Vec<String> =
            serde_json::from_str(&data).map_err(|e| artifact_err(e.to_string()))?;
        if names.is_empty() {
            return Err(artifact_err("feature order is empty".to_string()));
        }
        for name in names.iter().filter(|n| !names::is_known(n)) {
            tracing::warn!(feature = %name, "feature not produced by the extractor; it will always be 0");
        }
        Ok(Self::new(names))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

pub struct Vectorizer {
    order: FeatureOrder,
}

impl Vectorizer {
    pub fn new(order: FeatureOrder) -> Self {
        Self { order }
    }

    pub fn order(&self) -> &FeatureOrder {
        &self.order
    }

    /// One value per ordered name; names missing from the set contribute 0.
    pub fn vectorize(&self, features: &FeatureSet) -> FeatureVector {
        let values = self
            .order
            .names()
            .iter()
            .map(|name| features.get(name).unwrap_or(0) as f32)
            .collect();
        FeatureVector { values }
    }
}
