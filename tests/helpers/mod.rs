use async_trait::async_trait;
use jobboard_orchestrator::domain::{EngineKind, JobBoard, RawJob, SelectorMap};
use jobboard_orchestrator::engine::Engine;
use jobboard_orchestrator::error::{Error, Result as EngineResult};
use jobboard_orchestrator::external::advisor::UnavailableAdvisor;
use jobboard_orchestrator::external::persistence::InMemoryPersistence;
use jobboard_orchestrator::orchestrator::{Orchestrator, OrchestratorConfig};
use jobboard_orchestrator::pipeline::Deduplicator;
use jobboard_orchestrator::rate_limiter::RateLimiter;
use jobboard_orchestrator::router::EngineRouter;
use jobboard_orchestrator::telemetry::Telemetry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Build a test `JobBoard` with sensible defaults; only `id`/`engine_hint`
/// usually need to vary between scenarios.
pub fn board(id: &str, engine_hint: EngineKind) -> JobBoard {
    JobBoard {
        id: id.to_string(),
        name: format!("Board {id}"),
        base_url: format!("https://{id}.example.test"),
        engine_hint,
        region: None,
        category: None,
        selectors: SelectorMap::new(),
        rate_limit_delay_secs: 1.0,
        max_concurrent: 1,
        headers: HashMap::new(),
        requires_js: false,
        has_anti_bot: false,
        active: true,
        priority: 5,
        last_analyzed_at: None,
        analysis_confidence: None,
        timezone: None,
    }
}

pub fn raw_job(board_id: &str, url: &str, title: &str, company: &str) -> RawJob {
    RawJob {
        title: title.to_string(),
        company: company.to_string(),
        location: "Remote".to_string(),
        description: "A sufficiently detailed description of the role and its day-to-day responsibilities.".to_string(),
        salary: None,
        posted_date: None,
        url: url.to_string(),
        board_id: board_id.to_string(),
        board_name: format!("Board {board_id}"),
        fetched_at: chrono::Utc::now(),
        engine: EngineKind::Static,
    }
}

pub fn clone_error(e: &Error) -> Error {
    match e {
        Error::Blocked { host } => Error::Blocked { host: host.clone() },
        Error::RateLimited { host } => Error::RateLimited { host: host.clone() },
        Error::Transient { host, message } => Error::Transient { host: host.clone(), message: message.clone() },
        _ => Error::Internal("unexpected scripted error".to_string()),
    }
}

/// Engine whose `list_jobs`/`extract_job` responses are fixed at construction,
/// optionally failing every call with a chosen error.
pub struct ScriptedEngine {
    kind: EngineKind,
    urls: Vec<String>,
    jobs: HashMap<String, RawJob>,
    fail_with: Option<Error>,
    pages: usize,
}

impl ScriptedEngine {
    pub fn succeeding(kind: EngineKind, jobs: Vec<RawJob>) -> Self {
        let urls: Vec<String> = jobs.iter().map(|j| j.url.clone()).collect();
        let pages = if urls.is_empty() { 0 } else { 1 };
        let jobs = jobs.into_iter().map(|j| (j.url.clone(), j)).collect();
        Self { kind, urls, jobs, fail_with: None, pages }
    }

    pub fn failing(kind: EngineKind, err: Error) -> Self {
        Self { kind, urls: Vec::new(), jobs: HashMap::new(), fail_with: Some(err), pages: 0 }
    }

    /// Like `succeeding`, but the caller supplies the raw URL list directly
    /// (which may contain repeats) instead of deriving it one-for-one from
    /// `jobs`, for exercising dedup against a single combined listing page.
    pub fn succeeding_with_urls(kind: EngineKind, jobs: Vec<RawJob>, urls: Vec<String>) -> Self {
        let pages = if urls.is_empty() { 0 } else { 1 };
        let jobs = jobs.into_iter().map(|j| (j.url.clone(), j)).collect();
        Self { kind, urls, jobs, fail_with: None, pages }
    }

    /// Like `succeeding_with_urls`, but the caller also states how many
    /// listing pages were walked to assemble `urls`, for exercising
    /// multi-page `pages_scraped` reporting.
    pub fn succeeding_with_pages(kind: EngineKind, jobs: Vec<RawJob>, urls: Vec<String>, pages: usize) -> Self {
        let jobs = jobs.into_iter().map(|j| (j.url.clone(), j)).collect();
        Self { kind, urls, jobs, fail_with: None, pages }
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    async fn probe(&self, _url: &str) -> bool {
        self.fail_with.is_none()
    }

    async fn list_jobs(
        &self,
        _board: &JobBoard,
        _query: Option<&str>,
        _location: Option<&str>,
        _max_pages: usize,
    ) -> EngineResult<(Vec<String>, usize)> {
        match &self.fail_with {
            Some(e) => Err(clone_error(e)),
            None => Ok((self.urls.clone(), self.pages)),
        }
    }

    async fn extract_job(&self, url: &str, _board: &JobBoard) -> EngineResult<Option<RawJob>> {
        Ok(self.jobs.get(url).cloned())
    }

    async fn close(&self) {}
}

/// Like `ScriptedEngine`, but fails its first `fail_first` calls to
/// `list_jobs` before succeeding, to drive queue-level retry behavior.
pub struct FlakyEngine {
    pub kind: EngineKind,
    pub fail_first: usize,
    pub calls: AtomicUsize,
    pub err: Error,
    pub urls: Vec<String>,
    pub jobs: HashMap<String, RawJob>,
}

#[async_trait]
impl Engine for FlakyEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    async fn probe(&self, _url: &str) -> bool {
        true
    }

    async fn list_jobs(
        &self,
        _board: &JobBoard,
        _query: Option<&str>,
        _location: Option<&str>,
        _max_pages: usize,
    ) -> EngineResult<(Vec<String>, usize)> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(clone_error(&self.err));
        }
        Ok((self.urls.clone(), if self.urls.is_empty() { 0 } else { 1 }))
    }

    async fn extract_job(&self, url: &str, _board: &JobBoard) -> EngineResult<Option<RawJob>> {
        Ok(self.jobs.get(url).cloned())
    }

    async fn close(&self) {}
}

/// Extracts jobs for its configured URLs in order, cancelling the shared
/// token once `cancel_after` extractions have completed, so callers can
/// observe the router stopping further page fetches mid-attempt.
pub struct CancelingEngine {
    kind: EngineKind,
    urls: Vec<String>,
    jobs: HashMap<String, RawJob>,
    cancel_after: usize,
    token: CancellationToken,
    extracted: AtomicUsize,
}

impl CancelingEngine {
    pub fn new(kind: EngineKind, jobs: Vec<RawJob>, cancel_after: usize, token: CancellationToken) -> Self {
        let urls = jobs.iter().map(|j| j.url.clone()).collect();
        let jobs = jobs.into_iter().map(|j| (j.url.clone(), j)).collect();
        Self { kind, urls, jobs, cancel_after, token, extracted: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl Engine for CancelingEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    async fn probe(&self, _url: &str) -> bool {
        true
    }

    async fn list_jobs(
        &self,
        _board: &JobBoard,
        _query: Option<&str>,
        _location: Option<&str>,
        _max_pages: usize,
    ) -> EngineResult<(Vec<String>, usize)> {
        Ok((self.urls.clone(), if self.urls.is_empty() { 0 } else { 1 }))
    }

    async fn extract_job(&self, url: &str, _board: &JobBoard) -> EngineResult<Option<RawJob>> {
        let done = self.extracted.fetch_add(1, Ordering::SeqCst) + 1;
        if done >= self.cancel_after {
            self.token.cancel();
        }
        Ok(self.jobs.get(url).cloned())
    }

    async fn close(&self) {}
}

pub struct Harness {
    pub persistence: Arc<InMemoryPersistence>,
    pub rate_limiter: Arc<RateLimiter>,
    pub orchestrator: Orchestrator,
}

pub fn build_harness(engines: HashMap<EngineKind, Arc<dyn Engine>>) -> Harness {
    let persistence = Arc::new(InMemoryPersistence::new());
    let rate_limiter = Arc::new(RateLimiter::new(Duration::from_secs(60), Duration::from_secs(300)));
    let telemetry = Arc::new(Telemetry::new());
    let router = Arc::new(EngineRouter::new(engines, telemetry.clone()));
    let dedup = Arc::new(Deduplicator::new(10_000));
    let orchestrator = Orchestrator::new(
        persistence.clone(),
        Arc::new(UnavailableAdvisor),
        rate_limiter.clone(),
        router,
        dedup,
        telemetry,
        OrchestratorConfig::default(),
    );
    Harness { persistence, rate_limiter, orchestrator }
}

pub async fn seed(harness: &Harness, boards: Vec<JobBoard>) {
    harness.persistence.seed(boards).await;
}
