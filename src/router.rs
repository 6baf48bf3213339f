//! Engine selection and fallback sequencing.

use crate::domain::{EngineKind, JobBoard, ScrapeResult, SessionOutcome};
use crate::engine::Engine;
use crate::error::Error;
use crate::external::advisor::AdvisorCache;
use crate::telemetry::Telemetry;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// The full fallback sequence; the router strips the already-tried engine(s)
/// from the front of this order for each subsequent attempt.
const FALLBACK_SEQUENCE: [EngineKind; 3] = [EngineKind::Static, EngineKind::Browser, EngineKind::Feed];

pub struct EngineRouter {
    engines: HashMap<EngineKind, Arc<dyn Engine>>,
    telemetry: Arc<Telemetry>,
}

impl EngineRouter {
    pub fn new(engines: HashMap<EngineKind, Arc<dyn Engine>>, telemetry: Arc<Telemetry>) -> Self {
        Self { engines, telemetry }
    }

    /// Engine selection order: board hint, then advisor cache (24h TTL),
    /// then static. `requires_js=true` forces browser when the advisor is
    /// unavailable and no explicit hint is set.
    pub fn select_initial_engine(&self, board: &JobBoard, advisor_cache: &AdvisorCache) -> EngineKind {
        if board.engine_hint != EngineKind::Auto {
            return board.engine_hint;
        }
        if let Some(recommended) = advisor_cache.get_fresh(&board.id, Utc::now()) {
            return recommended;
        }
        if board.requires_js {
            return EngineKind::Browser;
        }
        EngineKind::Static
    }

    fn fallback_order(&self, tried: &[EngineKind]) -> Vec<EngineKind> {
        FALLBACK_SEQUENCE
            .into_iter()
            .filter(|k| !tried.contains(k))
            .collect()
    }

    /// Execute a scrape attempt starting at `initial`, falling back through
    /// the remaining untried engines on engine error, zero extraction, or a
    /// blocked signal. An engine kind with no registered adapter is skipped
    /// rather than treated as exhausting the fallback chain, so a deployment
    /// missing e.g. a browser driver still surfaces the real failure reason
    /// from the last engine it actually ran. `token` is checked between
    /// fallback attempts and between individual page fetches within an
    /// attempt, so cancelling mid-scrape stops further page fetches rather
    /// than only taking effect once the whole routing loop returns.
    pub async fn route(
        &self,
        board: &JobBoard,
        query: Option<&str>,
        location: Option<&str>,
        max_pages: usize,
        max_jobs: Option<usize>,
        initial: EngineKind,
        token: &CancellationToken,
    ) -> ScrapeResult {
        let mut tried = Vec::new();
        let mut candidate = initial;
        let start = Instant::now();
        let mut fallback_outcome = SessionOutcome::Failed;
        let mut last_attempted: Option<EngineKind> = None;

        loop {
            if token.is_cancelled() {
                return cancelled(last_attempted, start.elapsed());
            }

            tried.push(candidate);

            let Some(engine) = self.engines.get(&candidate) else {
                match self.fallback_order(&tried).into_iter().next() {
                    Some(next) => {
                        candidate = next;
                        continue;
                    }
                    None => break,
                }
            };

            last_attempted = Some(candidate);
            let attempt_start = Instant::now();
            let outcome = self
                .attempt(engine.as_ref(), board, query, location, max_pages, max_jobs, token)
                .await;
            let elapsed = attempt_start.elapsed().as_secs_f64();

            if token.is_cancelled() {
                let jobs = outcome.map(|r| r.jobs).unwrap_or_default();
                let found = jobs.len();
                return ScrapeResult {
                    outcome: SessionOutcome::Cancelled,
                    jobs,
                    found,
                    pages_scraped: 0,
                    errors: 0,
                    duration: start.elapsed(),
                    engine_used: last_attempted,
                };
            }

            match outcome {
                Ok(result) if !result.jobs.is_empty() => {
                    self.telemetry.record_engine_success(candidate, elapsed, result.jobs.len() as u64);
                    return finish(result, candidate, start.elapsed());
                }
                Ok(_) => {
                    self.telemetry.record_engine_failure(candidate, "extraction_empty", elapsed);
                    fallback_outcome = SessionOutcome::Failed;
                }
                Err(e) => {
                    self.telemetry.record_engine_failure(candidate, e.kind_tag(), elapsed);
                    fallback_outcome = if matches!(e, Error::Blocked { .. }) {
                        SessionOutcome::Blocked
                    } else if matches!(e, Error::RateLimited { .. }) {
                        SessionOutcome::RateLimited
                    } else {
                        SessionOutcome::Failed
                    };
                }
            }

            match self.fallback_order(&tried).into_iter().next() {
                Some(next) => candidate = next,
                None => break,
            }
        }

        ScrapeResult {
            outcome: fallback_outcome,
            jobs: Vec::new(),
            found: 0,
            pages_scraped: 0,
            errors: 1,
            duration: start.elapsed(),
            engine_used: last_attempted,
        }
    }

    async fn attempt(
        &self,
        engine: &dyn Engine,
        board: &JobBoard,
        query: Option<&str>,
        location: Option<&str>,
        max_pages: usize,
        max_jobs: Option<usize>,
        token: &CancellationToken,
    ) -> crate::error::Result<ScrapeResult> {
        let (urls, pages_scraped) = engine.list_jobs(board, query, location, max_pages).await?;

        let mut jobs = Vec::new();
        let mut errors = 0usize;
        for url in urls {
            if token.is_cancelled() {
                break;
            }
            if let Some(limit) = max_jobs {
                if jobs.len() >= limit {
                    break;
                }
            }
            match engine.extract_job(&url, board).await {
                Ok(Some(job)) => jobs.push(job),
                Ok(None) => {}
                Err(_) => errors += 1,
            }
        }

        let found = jobs.len();
        Ok(ScrapeResult {
            outcome: SessionOutcome::Success,
            jobs,
            found,
            pages_scraped,
            errors,
            duration: std::time::Duration::ZERO,
            engine_used: Some(engine.kind()),
        })
    }
}

fn finish(mut result: ScrapeResult, engine: EngineKind, duration: std::time::Duration) -> ScrapeResult {
    result.engine_used = Some(engine);
    result.duration = duration;
    if result.outcome == SessionOutcome::Success && result.errors > 0 && result.found > 0 {
        result.outcome = SessionOutcome::Partial;
    }
    result
}

fn cancelled(engine_used: Option<EngineKind>, duration: std::time::Duration) -> ScrapeResult {
    ScrapeResult {
        outcome: SessionOutcome::Cancelled,
        jobs: Vec::new(),
        found: 0,
        pages_scraped: 0,
        errors: 0,
        duration,
        engine_used,
    }
}
