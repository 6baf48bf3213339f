//! Enricher output types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidentValue {
    pub value: serde_json::Value,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub fields: HashMap<String, ConfidentValue>,
}

impl EnrichmentResult {
    pub fn insert(&mut self, kind: &str, value: impl Into<serde_json::Value>, confidence: f64) {
        self.fields.insert(
            kind.to_string(),
            ConfidentValue {
                value: value.into(),
                confidence,
            },
        );
    }
}
