//! Per-packet feature extraction: raw frame → named attributes → fixed-order model vector.

mod extractor;
mod vectorizer;

pub use extractor::{extract, Extraction, PacketMeta, SkipReason};
pub use vectorizer::{FeatureOrder, Vectorizer};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Feature vocabulary. These strings are the column names the classifier was trained on.
pub mod names {
    pub const IP_IHL: &str = "IP_IHL";
    pub const IP_TTL: &str = "IP_TTL";
    pub const IP_LEN: &str = "IP_Len";
    pub const IP_FRAG: &str = "IP_Frag";
    pub const PROTO: &str = "Proto";
    pub const SRC_PORT: &str = "Src_Port";
    pub const DST_PORT: &str = "Dst_Port";
    pub const WINDOW: &str = "Window";
    pub const FLAGS: &str = "Flags";
    pub const PKT_LEN: &str = "Pkt_Len";

    pub const ALL: [&str; 10] = [
        IP_IHL, IP_TTL, IP_LEN, IP_FRAG, PROTO, SRC_PORT, DST_PORT, WINDOW, FLAGS, PKT_LEN,
    ];

    pub fn is_known(name: &str) -> bool {
        ALL.contains(&name)
    }
}

/// Named numeric attributes of one packet. Keys are drawn from [`names`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    values: BTreeMap<String, u32>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: u32) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Fixed-order model input, one value per entry of the loaded [`FeatureOrder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub values: Vec<f32>,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
