//! Orchestrator scenarios covering the happy path, cross-session dedup, and
//! fallback-on-block, driven through the real `Orchestrator` against
//! scripted engines and in-memory persistence.

mod helpers;

use helpers::{board, build_harness, raw_job, seed, ScriptedEngine};
use jobboard_orchestrator::domain::{EngineKind, Priority, ScrapeTask, SessionOutcome};
use jobboard_orchestrator::error::Error;
use jobboard_orchestrator::external::persistence::PersistencePort;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn feed_happy_path_returns_both_jobs_and_persists_session() {
    let b = board("feed-board", EngineKind::Feed);
    let jobs = vec![
        raw_job(&b.id, "https://feed-board.example.test/1", "Rust Engineer", "Acme"),
        raw_job(&b.id, "https://feed-board.example.test/2", "Platform Engineer", "Globex"),
    ];
    let mut engines: HashMap<EngineKind, Arc<dyn jobboard_orchestrator::engine::Engine>> = HashMap::new();
    engines.insert(EngineKind::Feed, Arc::new(ScriptedEngine::succeeding(EngineKind::Feed, jobs)));

    let harness = build_harness(engines);
    seed(&harness, vec![b.clone()]).await;

    let task = ScrapeTask::new(b.id.clone(), Priority::Normal);
    let result = harness.orchestrator.execute(&task, CancellationToken::new()).await.unwrap();

    assert_eq!(result.outcome, SessionOutcome::Success);
    assert_eq!(result.found, 2);
    assert_eq!(result.engine_used, Some(EngineKind::Feed));

    let sessions = harness
        .persistence
        .read_recent_sessions(chrono::Utc::now() - chrono::Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].jobs_found, 2);
}

#[tokio::test]
async fn duplicate_listings_across_sessions_are_suppressed() {
    let b = board("static-board", EngineKind::Static);
    let jobs = vec![
        raw_job(&b.id, "https://static-board.example.test/1", "Backend Engineer", "Initech"),
        raw_job(&b.id, "https://static-board.example.test/2", "Frontend Engineer", "Initech"),
    ];
    let mut engines: HashMap<EngineKind, Arc<dyn jobboard_orchestrator::engine::Engine>> = HashMap::new();
    engines.insert(EngineKind::Static, Arc::new(ScriptedEngine::succeeding(EngineKind::Static, jobs)));

    let harness = build_harness(engines);
    seed(&harness, vec![b.clone()]).await;

    let first = ScrapeTask::new(b.id.clone(), Priority::Normal);
    let first_result = harness.orchestrator.execute(&first, CancellationToken::new()).await.unwrap();
    assert_eq!(first_result.found, 2);

    // Same board, same listing URLs: the dedup store carries state across
    // sessions, so a re-scrape of an unchanged page should find nothing new.
    let second = ScrapeTask::new(b.id.clone(), Priority::Normal);
    let second_result = harness.orchestrator.execute(&second, CancellationToken::new()).await.unwrap();
    assert_eq!(second_result.found, 0);
}

#[tokio::test]
async fn duplicate_urls_within_a_single_session_are_suppressed() {
    // One page of 10 unique listings followed by a second page that repeats
    // 3 of them; the engine hands the router one combined URL list (paging
    // is internal to the engine), so this exercises the same-session dedup
    // path rather than the cross-session one above.
    let b = board("paginated-board", EngineKind::Static);
    let mut jobs = Vec::new();
    let mut urls = Vec::new();
    for i in 0..10 {
        let url = format!("https://paginated-board.example.test/{i}");
        jobs.push(raw_job(&b.id, &url, &format!("Engineer {i}"), "Soylent"));
        urls.push(url);
    }
    urls.extend(urls[..3].to_vec());

    let mut engines: HashMap<EngineKind, Arc<dyn jobboard_orchestrator::engine::Engine>> = HashMap::new();
    engines.insert(EngineKind::Static, Arc::new(ScriptedEngine::succeeding_with_urls(EngineKind::Static, jobs, urls)));

    let harness = build_harness(engines);
    seed(&harness, vec![b.clone()]).await;

    let task = ScrapeTask::new(b.id.clone(), Priority::Normal);
    let result = harness.orchestrator.execute(&task, CancellationToken::new()).await.unwrap();

    assert_eq!(result.outcome, SessionOutcome::Success);
    assert_eq!(result.found, 10);
}

#[tokio::test]
async fn multi_page_listing_reports_the_real_page_count() {
    // Two listing pages: page one has 10 jobs, page two has 7 more plus 3
    // repeats of page one's URLs, for 17 unique jobs across 2 pages.
    let b = board("multi-page-board", EngineKind::Static);
    let mut jobs = Vec::new();
    let mut urls = Vec::new();
    for i in 0..17 {
        let url = format!("https://multi-page-board.example.test/{i}");
        jobs.push(raw_job(&b.id, &url, &format!("Engineer {i}"), "Massive Dynamic"));
        urls.push(url);
    }
    urls.extend(urls[..3].to_vec());

    let mut engines: HashMap<EngineKind, Arc<dyn jobboard_orchestrator::engine::Engine>> = HashMap::new();
    engines.insert(EngineKind::Static, Arc::new(ScriptedEngine::succeeding_with_pages(EngineKind::Static, jobs, urls, 2)));

    let harness = build_harness(engines);
    seed(&harness, vec![b.clone()]).await;

    let task = ScrapeTask::new(b.id.clone(), Priority::Normal);
    let result = harness.orchestrator.execute(&task, CancellationToken::new()).await.unwrap();

    assert_eq!(result.outcome, SessionOutcome::Success);
    assert_eq!(result.found, 17);
    assert_eq!(result.pages_scraped, 2);
}

#[tokio::test]
async fn falls_back_to_browser_when_static_is_blocked() {
    let b = board("auto-board", EngineKind::Auto);
    let job = raw_job(&b.id, "https://auto-board.example.test/1", "Data Engineer", "Hooli");

    let mut engines: HashMap<EngineKind, Arc<dyn jobboard_orchestrator::engine::Engine>> = HashMap::new();
    engines.insert(
        EngineKind::Static,
        Arc::new(ScriptedEngine::failing(EngineKind::Static, Error::Blocked { host: "auto-board.example.test".to_string() })),
    );
    engines.insert(EngineKind::Browser, Arc::new(ScriptedEngine::succeeding(EngineKind::Browser, vec![job])));

    let harness = build_harness(engines);
    seed(&harness, vec![b.clone()]).await;

    let task = ScrapeTask::new(b.id.clone(), Priority::Normal);
    let result = harness.orchestrator.execute(&task, CancellationToken::new()).await.unwrap();

    assert_eq!(result.outcome, SessionOutcome::Success);
    assert_eq!(result.engine_used, Some(EngineKind::Browser));
    assert_eq!(result.found, 1);
}

#[tokio::test]
async fn unknown_board_id_surfaces_as_an_error() {
    let harness = build_harness(HashMap::new());
    let task = ScrapeTask::new("does-not-exist", Priority::Normal);
    let outcome = harness.orchestrator.execute(&task, CancellationToken::new()).await;
    assert!(matches!(outcome, Err(Error::UnknownBoard(id)) if id == "does-not-exist"));
}
