//! Aggregate dashboard snapshot.

use crate::domain::EngineKind;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
}

/// Composite of success/latency/error-rate into a single 0-100 score, then
/// bucketed: healthy >=80, degraded >=60, critical otherwise.
pub fn composite_health(success_rate: f64, avg_response_secs: f64, error_rate: f64) -> (f64, HealthStatus) {
    let success_component = success_rate * 100.0;
    let latency_component = (1.0 - (avg_response_secs / 30.0).min(1.0)) * 100.0;
    let error_component = (1.0 - error_rate.min(1.0)) * 100.0;
    let score = success_component * 0.5 + latency_component * 0.25 + error_component * 0.25;

    let status = if score >= 80.0 {
        HealthStatus::Healthy
    } else if score >= 60.0 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Critical
    };
    (score, status)
}

#[derive(Debug, Clone, Serialize)]
pub struct TopBoard {
    pub board_id: String,
    pub success_rate: f64,
    pub jobs_last_window: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub total_sessions: u64,
    pub success_rate: f64,
    pub avg_response_time_secs: f64,
    pub active_sessions: usize,
    pub top_boards: Vec<TopBoard>,
    pub engine_performance: HashMap<EngineKind, crate::domain::EngineMetrics>,
    pub health_score: f64,
    pub health_status: HealthStatus,
    /// Supplemented from the original monitoring dashboard: a rolling count
    /// of jobs scraped since local midnight UTC.
    pub jobs_scraped_today: u64,
    /// Supplemented: last session completion time per board.
    pub board_last_run: HashMap<String, chrono::DateTime<chrono::Utc>>,
}
