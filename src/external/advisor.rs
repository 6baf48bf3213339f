//! AI advisor port: an opaque oracle with a deterministic fallback.

use crate::domain::EngineKind;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Confidence reported when the advisor is unavailable or returns an
/// incomplete result, distinct from an advisor-reported low confidence of 0.0.
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct BoardAnalysis {
    pub recommended_engine: EngineKind,
    pub complexity: f64,
    pub selectors: HashMap<String, Vec<String>>,
    pub anti_bot_measures: Vec<String>,
    pub rate_limit_recommendation_rpm: f64,
    pub requires_js: bool,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct ContentValidation {
    pub quality: f64,
    pub completeness: f64,
    pub relevance: f64,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    pub is_duplicate_likely: bool,
}

#[derive(Debug, Clone)]
pub struct OptimizedParameters {
    pub delay_secs: f64,
    pub concurrency: usize,
    pub timeout_secs: f64,
    pub ua_strategy: String,
    pub use_proxy: bool,
    pub notes: Vec<String>,
}

#[async_trait]
pub trait AdvisorPort: Send + Sync {
    async fn analyze_board(&self, base_url: &str, html_sample: &str) -> anyhow::Result<BoardAnalysis>;
    async fn generate_selectors(&self, html: &str, board_name: &str) -> anyhow::Result<HashMap<String, Vec<String>>>;
    async fn validate_content(&self, job_text: &str) -> anyhow::Result<ContentValidation>;
    async fn detect_anti_bot(&self, html: &str, response_headers: &HashMap<String, String>) -> anyhow::Result<Vec<String>>;
    async fn optimize_parameters(&self, performance_data: &str) -> anyhow::Result<OptimizedParameters>;
}

fn fallback_analysis() -> BoardAnalysis {
    BoardAnalysis {
        recommended_engine: EngineKind::Static,
        complexity: 0.5,
        selectors: HashMap::new(),
        anti_bot_measures: Vec::new(),
        rate_limit_recommendation_rpm: 30.0,
        requires_js: false,
        confidence: FALLBACK_CONFIDENCE,
    }
}

/// Runs `call` against a deadline; any failure, timeout, or malformed
/// response maps to the deterministic fallback.
pub async fn analyze_with_fallback(
    advisor: &dyn AdvisorPort,
    base_url: &str,
    html_sample: &str,
    deadline: std::time::Duration,
) -> BoardAnalysis {
    match tokio::time::timeout(deadline, advisor.analyze_board(base_url, html_sample)).await {
        Ok(Ok(analysis)) => analysis,
        _ => fallback_analysis(),
    }
}

/// Caches advisor analyses per board with a 24h TTL, consulted by the
/// engine router's initial-engine selection.
pub struct AdvisorCache {
    entries: Mutex<HashMap<String, (EngineKind, DateTime<Utc>)>>,
    ttl: ChronoDuration,
}

impl AdvisorCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: ChronoDuration::hours(24),
        }
    }

    pub fn put(&self, board_id: &str, engine: EngineKind, now: DateTime<Utc>) {
        self.entries.lock().expect("lock poisoned").insert(board_id.to_string(), (engine, now));
    }

    pub fn get_fresh(&self, board_id: &str, now: DateTime<Utc>) -> Option<EngineKind> {
        let entries = self.entries.lock().expect("lock poisoned");
        let (engine, cached_at) = entries.get(board_id)?;
        if now.signed_duration_since(*cached_at) <= self.ttl {
            Some(*engine)
        } else {
            None
        }
    }
}

impl Default for AdvisorCache {
    fn default() -> Self {
        Self::new()
    }
}

/// A deterministic advisor used where no real AI backend is wired in: always
/// fails, so every call resolves through the fallback path above.
pub struct UnavailableAdvisor;

#[async_trait]
impl AdvisorPort for UnavailableAdvisor {
    async fn analyze_board(&self, _base_url: &str, _html_sample: &str) -> anyhow::Result<BoardAnalysis> {
        Err(anyhow::anyhow!("advisor not configured"))
    }

    async fn generate_selectors(&self, _html: &str, _board_name: &str) -> anyhow::Result<HashMap<String, Vec<String>>> {
        Err(anyhow::anyhow!("advisor not configured"))
    }

    async fn validate_content(&self, _job_text: &str) -> anyhow::Result<ContentValidation> {
        Err(anyhow::anyhow!("advisor not configured"))
    }

    async fn detect_anti_bot(&self, _html: &str, _response_headers: &HashMap<String, String>) -> anyhow::Result<Vec<String>> {
        Err(anyhow::anyhow!("advisor not configured"))
    }

    async fn optimize_parameters(&self, _performance_data: &str) -> anyhow::Result<OptimizedParameters> {
        Err(anyhow::anyhow!("advisor not configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn cache_hit_within_ttl() {
        let cache = AdvisorCache::new();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        cache.put("board-1", EngineKind::Browser, now);
        assert_eq!(cache.get_fresh("board-1", now + ChronoDuration::hours(1)), Some(EngineKind::Browser));
    }

    #[test]
    fn cache_miss_after_ttl() {
        let cache = AdvisorCache::new();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        cache.put("board-1", EngineKind::Browser, now);
        assert_eq!(cache.get_fresh("board-1", now + ChronoDuration::hours(25)), None);
    }

    #[tokio::test]
    async fn unavailable_advisor_resolves_to_fallback_confidence() {
        let analysis = analyze_with_fallback(&UnavailableAdvisor, "https://x.example", "", std::time::Duration::from_secs(1)).await;
        assert_eq!(analysis.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(analysis.recommended_engine, EngineKind::Static);
    }
}
