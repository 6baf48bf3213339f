//! Metric time series, thresholded alerts, and dashboard aggregates.

pub mod alerts;
pub mod dashboard;
pub mod ring_buffer;

use crate::domain::{Alert, EngineKind, EngineMetrics, MetricPoint, Severity};
use alerts::{AlertStore, AlertThresholds};
use chrono::{DateTime, Utc};
use dashboard::{composite_health, DashboardSnapshot, TopBoard};
use ring_buffer::RingBuffer;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

const SERIES_CAPACITY: usize = 1000;

struct Series {
    success_indicator: RingBuffer<MetricPoint>,
    response_time: RingBuffer<MetricPoint>,
    jobs_found: RingBuffer<MetricPoint>,
    ai_analysis_time: RingBuffer<MetricPoint>,
    quality_score: RingBuffer<MetricPoint>,
}

impl Series {
    fn new() -> Self {
        Self {
            success_indicator: RingBuffer::new(SERIES_CAPACITY),
            response_time: RingBuffer::new(SERIES_CAPACITY),
            jobs_found: RingBuffer::new(SERIES_CAPACITY),
            ai_analysis_time: RingBuffer::new(SERIES_CAPACITY),
            quality_score: RingBuffer::new(SERIES_CAPACITY),
        }
    }
}

pub struct Telemetry {
    series: Series,
    engine_metrics: Mutex<HashMap<EngineKind, EngineMetrics>>,
    alerts: AlertStore,
    thresholds: AlertThresholds,
    jobs_scraped_today: AtomicU64,
    today_marker: Mutex<DateTime<Utc>>,
    board_last_run: Mutex<HashMap<String, DateTime<Utc>>>,
}

fn point(value: f64, board: Option<&str>, engine: Option<&str>) -> MetricPoint {
    let mut tags = HashMap::new();
    if let Some(b) = board {
        tags.insert("board".to_string(), b.to_string());
    }
    if let Some(e) = engine {
        tags.insert("engine".to_string(), e.to_string());
    }
    MetricPoint {
        timestamp: Utc::now(),
        value,
        tags,
    }
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            series: Series::new(),
            engine_metrics: Mutex::new(HashMap::new()),
            alerts: AlertStore::new(),
            thresholds: AlertThresholds::default(),
            jobs_scraped_today: AtomicU64::new(0),
            today_marker: Mutex::new(Utc::now()),
            board_last_run: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_engine_success(&self, engine: EngineKind, response_time_secs: f64, jobs: u64) {
        self.series.success_indicator.push(point(1.0, None, Some(&engine.to_string())));
        self.series.response_time.push(point(response_time_secs, None, Some(&engine.to_string())));
        self.series.jobs_found.push(point(jobs as f64, None, Some(&engine.to_string())));
        self.roll_jobs_today(jobs);

        let mut metrics = self.engine_metrics.lock().expect("lock poisoned");
        metrics.entry(engine).or_default().record_success(response_time_secs, jobs);
        drop(metrics);

        alerts::evaluate_response_time(&self.alerts, &engine.to_string(), response_time_secs, &self.thresholds);
    }

    pub fn record_engine_failure(&self, engine: EngineKind, error_kind: &str, response_time_secs: f64) {
        self.series.success_indicator.push(point(0.0, None, Some(&engine.to_string())));
        self.series.response_time.push(point(response_time_secs, None, Some(&engine.to_string())));

        let mut metrics = self.engine_metrics.lock().expect("lock poisoned");
        let m = metrics.entry(engine).or_default();
        m.record_failure(error_kind, response_time_secs);
        let error_rate = if m.total_requests == 0 { 0.0 } else { m.failures as f64 / m.total_requests as f64 };
        let success_rate = m.ema_success_rate;
        drop(metrics);

        alerts::evaluate_success_rate(&self.alerts, &engine.to_string(), success_rate, &self.thresholds);
        alerts::evaluate_error_rate(&self.alerts, &engine.to_string(), error_rate, &self.thresholds);
    }

    pub fn record_quality_score(&self, board_id: &str, score: f64) {
        self.series.quality_score.push(point(score, Some(board_id), None));
        alerts::evaluate_quality_score(&self.alerts, board_id, score, &self.thresholds);
    }

    pub fn record_ai_analysis_time(&self, secs: f64) {
        self.series.ai_analysis_time.push(point(secs, None, None));
    }

    pub fn record_session_completed(&self, board_id: &str) {
        self.board_last_run.lock().expect("lock poisoned").insert(board_id.to_string(), Utc::now());
    }

    fn roll_jobs_today(&self, jobs: u64) {
        let now = Utc::now();
        let mut marker = self.today_marker.lock().expect("lock poisoned");
        if now.date_naive() != marker.date_naive() {
            self.jobs_scraped_today.store(0, Ordering::Relaxed);
            *marker = now;
        }
        self.jobs_scraped_today.fetch_add(jobs, Ordering::Relaxed);
    }

    pub fn alerts(&self) -> &AlertStore {
        &self.alerts
    }

    pub fn list_alerts(&self, level: Option<Severity>, resolved: Option<bool>, since: Option<DateTime<Utc>>) -> Vec<Alert> {
        self.alerts.list(level, resolved, since)
    }

    pub fn engine_performance(&self) -> HashMap<EngineKind, EngineMetrics> {
        self.engine_metrics.lock().expect("lock poisoned").clone()
    }

    pub fn response_time_points(&self, since: Option<DateTime<Utc>>) -> Vec<MetricPoint> {
        self.series
            .response_time
            .snapshot()
            .into_iter()
            .filter(|p| since.is_none_or(|s| p.timestamp >= s))
            .collect()
    }

    pub fn dashboard_snapshot(&self, top_boards: Vec<TopBoard>, active_sessions: usize) -> DashboardSnapshot {
        let success_points = self.series.success_indicator.snapshot();
        let total_sessions = success_points.len() as u64;
        let success_rate = if success_points.is_empty() {
            1.0
        } else {
            success_points.iter().map(|p| p.value).sum::<f64>() / success_points.len() as f64
        };

        let response_points = self.series.response_time.snapshot();
        let avg_response_time_secs = if response_points.is_empty() {
            0.0
        } else {
            response_points.iter().map(|p| p.value).sum::<f64>() / response_points.len() as f64
        };

        let error_rate = 1.0 - success_rate;
        let (health_score, health_status) = composite_health(success_rate, avg_response_time_secs, error_rate);

        DashboardSnapshot {
            total_sessions,
            success_rate,
            avg_response_time_secs,
            active_sessions,
            top_boards,
            engine_performance: self.engine_performance(),
            health_score,
            health_status,
            jobs_scraped_today: self.jobs_scraped_today.load(Ordering::Relaxed),
            board_last_run: self.board_last_run.lock().expect("lock poisoned").clone(),
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}
