//! Extracted job records, pre- and post-pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job record as extracted by an engine adapter, before dedup/validate/enrich.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawJob {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub salary: Option<String>,
    pub posted_date: Option<DateTime<Utc>>,
    pub url: String,
    pub board_id: String,
    pub board_name: String,
    pub fetched_at: DateTime<Utc>,
    pub engine: crate::domain::board::EngineKind,
}

impl RawJob {
    /// A record is only emitted when title and company are present.
    pub fn has_required_fields(&self) -> bool {
        !self.title.trim().is_empty() && !self.company.trim().is_empty()
    }
}

/// A RawJob after dedup/validate/enrich, ready to hand to persistence.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeJob {
    pub raw: RawJob,
    pub fingerprint: crate::domain::fingerprint::Fingerprint,
    pub validation: crate::domain::validation::ValidationResult,
    pub enrichment: crate::domain::enrichment::EnrichmentResult,
}
