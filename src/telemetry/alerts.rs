//! Threshold evaluation and alert deduplication.

use crate::domain::{Alert, Severity};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct AlertThresholds {
    pub success_rate_warning: f64,
    pub success_rate_error: f64,
    pub response_time_warning_secs: f64,
    pub response_time_error_secs: f64,
    pub error_rate_error: f64,
    pub error_rate_critical: f64,
    pub quality_score_warning: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            success_rate_warning: 0.8,
            success_rate_error: 0.5,
            response_time_warning_secs: 10.0,
            response_time_error_secs: 30.0,
            error_rate_error: 0.1,
            error_rate_critical: 0.3,
            quality_score_warning: 0.7,
        }
    }
}

pub struct AlertStore {
    alerts: Mutex<Vec<Alert>>,
    dedup_window: ChronoDuration,
}

impl AlertStore {
    pub fn new() -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
            dedup_window: ChronoDuration::minutes(5),
        }
    }

    /// Raises an alert unless one with the same `(source, title)` was raised
    /// within the dedup window.
    pub fn raise(&self, level: Severity, title: impl Into<String>, message: impl Into<String>, source: impl Into<String>, tags: HashMap<String, String>) {
        let title = title.into();
        let source = source.into();
        let now = Utc::now();

        let mut alerts = self.alerts.lock().expect("lock poisoned");
        let duplicate = alerts.iter().any(|a| {
            a.source == source
                && a.title == title
                && now.signed_duration_since(a.created_at) <= self.dedup_window
        });
        if duplicate {
            return;
        }
        alerts.push(Alert::new(level, title, message, source, tags));
    }

    pub fn resolve(&self, id: &str) -> bool {
        let mut alerts = self.alerts.lock().expect("lock poisoned");
        if let Some(a) = alerts.iter_mut().find(|a| a.id == id) {
            a.resolved_at = Some(Utc::now());
            true
        } else {
            false
        }
    }

    pub fn list(&self, level: Option<Severity>, resolved: Option<bool>, since: Option<DateTime<Utc>>) -> Vec<Alert> {
        self.alerts
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|a| level.is_none_or(|l| a.level == l))
            .filter(|a| resolved.is_none_or(|r| a.is_resolved() == r))
            .filter(|a| since.is_none_or(|s| a.created_at >= s))
            .cloned()
            .collect()
    }
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluates the fixed threshold rules against newly inserted values,
/// raising alerts through `store` as thresholds cross.
pub fn evaluate_success_rate(store: &AlertStore, source: &str, rate: f64, thresholds: &AlertThresholds) {
    if rate < thresholds.success_rate_error {
        store.raise(Severity::Error, "Low success rate", format!("success rate {rate:.2} below error threshold"), source, HashMap::new());
    } else if rate < thresholds.success_rate_warning {
        store.raise(Severity::Warning, "Low success rate", format!("success rate {rate:.2} below warning threshold"), source, HashMap::new());
    }
}

pub fn evaluate_response_time(store: &AlertStore, source: &str, secs: f64, thresholds: &AlertThresholds) {
    if secs > thresholds.response_time_error_secs {
        store.raise(Severity::Error, "Slow responses", format!("response time {secs:.1}s above error threshold"), source, HashMap::new());
    } else if secs > thresholds.response_time_warning_secs {
        store.raise(Severity::Warning, "Slow responses", format!("response time {secs:.1}s above warning threshold"), source, HashMap::new());
    }
}

pub fn evaluate_error_rate(store: &AlertStore, source: &str, rate: f64, thresholds: &AlertThresholds) {
    if rate > thresholds.error_rate_critical {
        store.raise(Severity::Critical, "High error rate", format!("error rate {rate:.2} above critical threshold"), source, HashMap::new());
    } else if rate > thresholds.error_rate_error {
        store.raise(Severity::Error, "High error rate", format!("error rate {rate:.2} above error threshold"), source, HashMap::new());
    }
}

pub fn evaluate_quality_score(store: &AlertStore, source: &str, score: f64, thresholds: &AlertThresholds) {
    if score < thresholds.quality_score_warning {
        store.raise(Severity::Warning, "Low data quality", format!("quality score {score:.2} below warning threshold"), source, HashMap::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_within_window_is_suppressed() {
        let store = AlertStore::new();
        let thresholds = AlertThresholds::default();
        evaluate_success_rate(&store, "board-1", 0.3, &thresholds);
        evaluate_success_rate(&store, "board-1", 0.2, &thresholds);
        assert_eq!(store.list(None, None, None).len(), 1);
    }

    #[test]
    fn severity_escalates_past_error_threshold() {
        let store = AlertStore::new();
        let thresholds = AlertThresholds::default();
        evaluate_success_rate(&store, "board-2", 0.3, &thresholds);
        let alerts = store.list(None, None, None);
        assert_eq!(alerts[0].level, Severity::Error);
    }
}
