//! Composes rate limiting, engine routing, and the validation/dedup/enrich
//! pipeline into a single per-task execution.

use crate::domain::{BoardPerformance, CompositeJob, EngineKind, ScrapeResult, ScrapeTask, SessionOutcome};
use crate::error::{Error, Result};
use crate::external::advisor::{analyze_with_fallback, AdvisorCache, AdvisorPort};
use crate::external::persistence::PersistencePort;
use crate::pipeline::{dedup::Deduplicator, enricher, validator};
use crate::rate_limiter::RateLimiter;
use crate::router::EngineRouter;
use crate::telemetry::Telemetry;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct OrchestratorConfig {
    pub advisor_deadline: Duration,
    pub default_rate_limit_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            advisor_deadline: Duration::from_secs(30),
            default_rate_limit_delay: Duration::from_secs(2),
        }
    }
}

/// Ties together rate limiting, engine selection/fallback, and the
/// dedup/validate/enrich pipeline for a single task.
pub struct Orchestrator {
    persistence: Arc<dyn PersistencePort>,
    advisor: Arc<dyn AdvisorPort>,
    advisor_cache: AdvisorCache,
    rate_limiter: Arc<RateLimiter>,
    router: Arc<EngineRouter>,
    dedup: Arc<Deduplicator>,
    telemetry: Arc<Telemetry>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        persistence: Arc<dyn PersistencePort>,
        advisor: Arc<dyn AdvisorPort>,
        rate_limiter: Arc<RateLimiter>,
        router: Arc<EngineRouter>,
        dedup: Arc<Deduplicator>,
        telemetry: Arc<Telemetry>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            persistence,
            advisor,
            advisor_cache: AdvisorCache::new(),
            rate_limiter,
            router,
            dedup,
            telemetry,
            config,
        }
    }

    /// Runs a single task end to end: resolve board, pick an engine, throttle
    /// by host, scrape with fallback, run every job through dedup/validate/
    /// enrich, persist, and feed performance back into the board record.
    pub async fn execute(&self, task: &ScrapeTask, token: CancellationToken) -> Result<ScrapeResult> {
        let board = self
            .persistence
            .load_job_boards(&Default::default())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?
            .into_iter()
            .find(|b| b.id == task.board_id)
            .ok_or_else(|| Error::UnknownBoard(task.board_id.clone()))?;

        if token.is_cancelled() {
            return Ok(cancelled_result());
        }

        let initial_engine = if board.engine_hint == EngineKind::Auto {
            let analysis = analyze_with_fallback(self.advisor.as_ref(), &board.base_url, "", self.config.advisor_deadline).await;
            self.advisor_cache.put(&board.id, analysis.recommended_engine, Utc::now());
            self.router.select_initial_engine(&board, &self.advisor_cache)
        } else {
            board.engine_hint
        };

        if let Some(host) = board.host() {
            let baseline = Duration::from_secs_f64(board.rate_limit_delay_secs.max(0.1));
            self.rate_limiter.acquire(&host, baseline).await;
        }

        if token.is_cancelled() {
            return Ok(cancelled_result());
        }

        let mut result = self
            .router
            .route(
                &board,
                task.query.as_deref(),
                task.location.as_deref(),
                task.max_pages,
                task.max_jobs,
                initial_engine,
                &token,
            )
            .await;

        if result.outcome == SessionOutcome::Blocked {
            if let Some(host) = board.host() {
                self.rate_limiter.report_rate_limited(&host, Duration::from_secs_f64(board.rate_limit_delay_secs.max(0.1)));
            }
        }

        let now = Utc::now();
        let mut composite_jobs = Vec::with_capacity(result.jobs.len());
        let mut accepted = Vec::with_capacity(result.jobs.len());

        for raw in result.jobs.drain(..) {
            if token.is_cancelled() {
                break;
            }
            if !raw.has_required_fields() {
                continue;
            }
            let fingerprint = crate::pipeline::dedup::compute_fingerprint(&raw);
            let is_duplicate = !self.dedup.check_and_insert(&raw);
            let validation = validator::validate(&raw, is_duplicate, now);
            if !validation.is_valid {
                continue;
            }
            let enrichment = enricher::enrich(&raw);
            self.telemetry.record_quality_score(&board.id, validation.quality_score);
            accepted.push(raw.clone());
            composite_jobs.push(CompositeJob { raw, fingerprint, validation, enrichment });
        }

        result.jobs = accepted;
        result.found = result.jobs.len();
        tracing::debug!(board_id = %board.id, composed = composite_jobs.len(), "pipeline composed jobs");

        if let Err(e) = self.persistence.save_raw_jobs(&result.jobs).await {
            warn!(board_id = %board.id, error = %e, "failed to persist scraped jobs");
        }
        if let Err(e) = self.persistence.save_session(task, &result).await {
            warn!(board_id = %board.id, error = %e, "failed to persist session record");
        }

        let total_attempts = result.found + result.errors;
        let success_rate = if total_attempts == 0 { 0.0 } else { result.found as f64 / total_attempts as f64 };
        let performance = BoardPerformance {
            success_rate,
            avg_response_time_secs: result.duration.as_secs_f64(),
        };
        if let Err(e) = self.persistence.update_board_metrics(&board.id, performance).await {
            warn!(board_id = %board.id, error = %e, "failed to update board performance");
        }
        self.telemetry.record_session_completed(&board.id);

        info!(
            board_id = %board.id,
            outcome = ?result.outcome,
            found = result.found,
            engine = ?result.engine_used,
            "scrape session finished"
        );

        if token.is_cancelled() {
            return Ok(cancelled_result());
        }

        Ok(result)
    }
}

fn cancelled_result() -> ScrapeResult {
    ScrapeResult {
        outcome: SessionOutcome::Cancelled,
        jobs: Vec::new(),
        found: 0,
        pages_scraped: 0,
        errors: 0,
        duration: Duration::ZERO,
        engine_used: None,
    }
}
