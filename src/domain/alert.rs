//! Telemetry alerts.

use crate::domain::validation::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub level: Severity,
    pub title: String,
    pub message: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub tags: HashMap<String, String>,
}

impl Alert {
    pub fn new(
        level: Severity,
        title: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<String>,
        tags: HashMap<String, String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            level,
            title: title.into(),
            message: message.into(),
            source: source.into(),
            created_at: Utc::now(),
            resolved_at: None,
            tags,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub tags: HashMap<String, String>,
}
