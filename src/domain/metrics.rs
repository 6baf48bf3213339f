//! Per-engine performance counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineMetrics {
    pub total_requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub ema_response_time_secs: f64,
    pub ema_success_rate: f64,
    pub jobs_scraped: u64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub error_histogram: HashMap<String, u64>,
}

impl EngineMetrics {
    const EMA_ALPHA: f64 = 0.2;

    pub fn record_success(&mut self, response_time_secs: f64, jobs: u64) {
        self.total_requests += 1;
        self.successes += 1;
        self.jobs_scraped += jobs;
        self.last_used_at = Some(Utc::now());
        self.update_emas(response_time_secs, 1.0);
    }

    pub fn record_failure(&mut self, error_kind: &str, response_time_secs: f64) {
        self.total_requests += 1;
        self.failures += 1;
        self.last_used_at = Some(Utc::now());
        *self.error_histogram.entry(error_kind.to_string()).or_insert(0) += 1;
        self.update_emas(response_time_secs, 0.0);
    }

    fn update_emas(&mut self, response_time_secs: f64, success_sample: f64) {
        if self.total_requests == 1 {
            self.ema_response_time_secs = response_time_secs;
            self.ema_success_rate = success_sample;
        } else {
            self.ema_response_time_secs = Self::EMA_ALPHA * response_time_secs
                + (1.0 - Self::EMA_ALPHA) * self.ema_response_time_secs;
            self.ema_success_rate =
                Self::EMA_ALPHA * success_sample + (1.0 - Self::EMA_ALPHA) * self.ema_success_rate;
        }
    }
}
