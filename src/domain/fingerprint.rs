//! Deduplication keys.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fingerprint {
    pub content_hash: String,
    pub description_hash: String,
    pub normalized_url: String,
    pub tokens: HashSet<String>,
    pub title: String,
    pub company: String,
    pub location: String,
}
