//! `TaskQueue` retry-on-unfavorable-outcome behavior, driven under a paused
//! clock so the exponential backoff doesn't cost real wall-clock time.

mod helpers;

use helpers::{board, raw_job, FlakyEngine, ScriptedEngine};
use jobboard_orchestrator::domain::{EngineKind, Priority, ScrapeTask, SessionOutcome, TaskStatus};
use jobboard_orchestrator::error::Error;
use jobboard_orchestrator::external::advisor::UnavailableAdvisor;
use jobboard_orchestrator::external::persistence::InMemoryPersistence;
use jobboard_orchestrator::orchestrator::{Orchestrator, OrchestratorConfig};
use jobboard_orchestrator::pipeline::Deduplicator;
use jobboard_orchestrator::queue::TaskQueue;
use jobboard_orchestrator::rate_limiter::RateLimiter;
use jobboard_orchestrator::router::EngineRouter;
use jobboard_orchestrator::telemetry::Telemetry;
use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn queue_retries_a_rate_limited_session_until_it_succeeds() {
    let b = board("retry-board", EngineKind::Static);
    let job = raw_job(&b.id, "https://retry-board.example.test/1", "SRE", "Umbrella");

    let flaky = Arc::new(FlakyEngine {
        kind: EngineKind::Static,
        fail_first: 2,
        calls: AtomicUsize::new(0),
        err: Error::RateLimited { host: "retry-board.example.test".to_string() },
        urls: vec![job.url.clone()],
        jobs: HashMap::from([(job.url.clone(), job)]),
    });
    let mut engines: HashMap<EngineKind, Arc<dyn jobboard_orchestrator::engine::Engine>> = HashMap::new();
    engines.insert(EngineKind::Static, flaky);

    let persistence = Arc::new(InMemoryPersistence::new());
    persistence.seed(vec![b.clone()]).await;
    let rate_limiter = Arc::new(RateLimiter::new(Duration::from_secs(60), Duration::from_secs(300)));
    let telemetry = Arc::new(Telemetry::new());
    let router = Arc::new(EngineRouter::new(engines, telemetry.clone()));
    let dedup = Arc::new(Deduplicator::new(10_000));
    let orchestrator = Arc::new(Orchestrator::new(
        persistence,
        Arc::new(UnavailableAdvisor),
        rate_limiter,
        router,
        dedup,
        telemetry,
        OrchestratorConfig::default(),
    ));

    let queue = Arc::new(TaskQueue::new(16, 1, orchestrator));
    queue.start().await;

    let task = ScrapeTask::new(b.id.clone(), Priority::Normal);
    let id = queue.enqueue(task).await.unwrap();

    // Two retries at 2s then 4s backoff; advance past both under paused time.
    for _ in 0..20 {
        tokio::time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        if let Some(t) = queue.get(&id).await {
            if t.status.is_terminal() {
                break;
            }
        }
    }

    let finished = queue.get(&id).await.unwrap();
    assert!(finished.status.is_terminal(), "task should have finished retrying, got {:?}", finished.status);
    assert_eq!(finished.retry_count, 2);

    let result = queue.result_of(&id).await.expect("completed task keeps its result");
    assert_eq!(result.outcome, SessionOutcome::Success);
    assert_eq!(result.found, 1);

    queue.stop(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn task_exhausts_retries_and_lands_on_failed_status() {
    let b = board("always-down-board", EngineKind::Static);

    let mut engines: HashMap<EngineKind, Arc<dyn jobboard_orchestrator::engine::Engine>> = HashMap::new();
    engines.insert(
        EngineKind::Static,
        Arc::new(ScriptedEngine::failing(EngineKind::Static, Error::Transient { host: b.host().unwrap(), message: "connection reset".to_string() })),
    );

    let persistence = Arc::new(InMemoryPersistence::new());
    persistence.seed(vec![b.clone()]).await;
    let rate_limiter = Arc::new(RateLimiter::new(Duration::from_secs(60), Duration::from_secs(300)));
    let telemetry = Arc::new(Telemetry::new());
    let router = Arc::new(EngineRouter::new(engines, telemetry.clone()));
    let dedup = Arc::new(Deduplicator::new(10_000));
    let orchestrator = Arc::new(Orchestrator::new(
        persistence,
        Arc::new(UnavailableAdvisor),
        rate_limiter,
        router,
        dedup,
        telemetry,
        OrchestratorConfig::default(),
    ));

    let queue = Arc::new(TaskQueue::new(16, 1, orchestrator));
    queue.start().await;

    let mut task = ScrapeTask::new(b.id.clone(), Priority::Normal);
    task.max_retries = 2;
    let id = queue.enqueue(task).await.unwrap();

    // Two retries at 2s then 4s backoff, then a third attempt that still
    // fails and exhausts the retry budget.
    for _ in 0..20 {
        tokio::time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        if let Some(t) = queue.get(&id).await {
            if t.status.is_terminal() {
                break;
            }
        }
    }

    let finished = queue.get(&id).await.unwrap();
    assert_eq!(finished.status, TaskStatus::Failed);
    assert_eq!(finished.retry_count, 2);
    assert!(finished.last_error.is_some());

    let result = queue.result_of(&id).await.expect("failed task still keeps its last result");
    assert_eq!(result.outcome, SessionOutcome::Failed);

    queue.stop(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn task_exhausts_retries_on_a_blocked_outcome_and_lands_on_failed_status() {
    let b = board("perma-blocked-board", EngineKind::Static);

    let mut engines: HashMap<EngineKind, Arc<dyn jobboard_orchestrator::engine::Engine>> = HashMap::new();
    engines.insert(
        EngineKind::Static,
        Arc::new(ScriptedEngine::failing(EngineKind::Static, Error::Blocked { host: b.host().unwrap() })),
    );

    let persistence = Arc::new(InMemoryPersistence::new());
    persistence.seed(vec![b.clone()]).await;
    let rate_limiter = Arc::new(RateLimiter::new(Duration::from_secs(60), Duration::from_secs(300)));
    let telemetry = Arc::new(Telemetry::new());
    let router = Arc::new(EngineRouter::new(engines, telemetry.clone()));
    let dedup = Arc::new(Deduplicator::new(10_000));
    let orchestrator = Arc::new(Orchestrator::new(
        persistence,
        Arc::new(UnavailableAdvisor),
        rate_limiter,
        router,
        dedup,
        telemetry,
        OrchestratorConfig::default(),
    ));

    let queue = Arc::new(TaskQueue::new(16, 1, orchestrator));
    queue.start().await;

    let mut task = ScrapeTask::new(b.id.clone(), Priority::Normal);
    task.max_retries = 2;
    let id = queue.enqueue(task).await.unwrap();

    // Every attempt comes back Blocked; two retries at 2s then 4s backoff,
    // then a third attempt that is still blocked and exhausts the budget.
    for _ in 0..20 {
        tokio::time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        if let Some(t) = queue.get(&id).await {
            if t.status.is_terminal() {
                break;
            }
        }
    }

    let finished = queue.get(&id).await.unwrap();
    assert_eq!(finished.status, TaskStatus::Failed);
    assert_eq!(finished.retry_count, 2);
    assert!(finished.last_error.is_some());

    let result = queue.result_of(&id).await.expect("failed task still keeps its last result");
    assert_eq!(result.outcome, SessionOutcome::Blocked);

    queue.stop(Duration::from_secs(1)).await;
}
