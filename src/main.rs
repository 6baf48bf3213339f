use clap::Parser;
use figment::providers::Env;
use figment::Figment;
use jobboard_orchestrator::cli::Args;
use jobboard_orchestrator::config::Config;
use jobboard_orchestrator::domain::EngineKind;
use jobboard_orchestrator::engine::browser::{BrowserEngine, NullBrowserDriver};
use jobboard_orchestrator::engine::feed::FeedEngine;
use jobboard_orchestrator::engine::static_engine::StaticEngine;
use jobboard_orchestrator::engine::{Engine, EngineTimeouts};
use jobboard_orchestrator::external::advisor::UnavailableAdvisor;
use jobboard_orchestrator::external::persistence::InMemoryPersistence;
use jobboard_orchestrator::logging;
use jobboard_orchestrator::orchestrator::{Orchestrator, OrchestratorConfig};
use jobboard_orchestrator::pipeline::Deduplicator;
use jobboard_orchestrator::queue::scheduler::RecurringTaskManager;
use jobboard_orchestrator::queue::TaskQueue;
use jobboard_orchestrator::rate_limiter::RateLimiter;
use jobboard_orchestrator::router::EngineRouter;
use jobboard_orchestrator::services::manager::ServiceManager;
use jobboard_orchestrator::services::scraper::ScraperService;
use jobboard_orchestrator::signals::handle_shutdown_signals;
use jobboard_orchestrator::telemetry::Telemetry;
use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config: Config = Figment::new()
        .merge(Env::raw())
        .extract()
        .expect("failed to load config");

    logging::setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = if cfg!(debug_assertions) { "development" } else { "production" },
        "starting job board orchestrator"
    );

    let persistence = Arc::new(InMemoryPersistence::new());
    if let Some(path) = &args.boards_file {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(boards) => persistence.seed(boards).await,
                Err(e) => tracing::error!(error = %e, path = %path.display(), "failed to parse boards file"),
            },
            Err(e) => tracing::error!(error = %e, path = %path.display(), "failed to read boards file"),
        }
    }

    let advisor = Arc::new(UnavailableAdvisor);
    let telemetry = Arc::new(Telemetry::new());
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_ceiling, config.rate_limit_cooldown));
    let dedup = Arc::new(Deduplicator::new(config.dedup_capacity));

    let timeouts = EngineTimeouts::default();
    let mut engines: HashMap<EngineKind, Arc<dyn Engine>> = HashMap::new();
    engines.insert(EngineKind::Static, Arc::new(StaticEngine::new(timeouts)));
    engines.insert(EngineKind::Feed, Arc::new(FeedEngine::new(timeouts)));
    engines.insert(EngineKind::Browser, Arc::new(BrowserEngine::new(Arc::new(NullBrowserDriver), timeouts)));

    let router = Arc::new(EngineRouter::new(engines, telemetry.clone()));

    let orchestrator = Arc::new(Orchestrator::new(
        persistence.clone(),
        advisor,
        rate_limiter,
        router,
        dedup,
        telemetry.clone(),
        OrchestratorConfig {
            advisor_deadline: config.advisor_deadline,
            default_rate_limit_delay: config.default_rate_limit_delay,
        },
    ));

    let queue = Arc::new(TaskQueue::new(config.queue_capacity, config.worker_count, orchestrator));
    let recurring = Arc::new(RecurringTaskManager::new(queue.clone()));

    let mut service_manager = ServiceManager::new();
    let scraper_service = Box::new(ScraperService::new(queue, recurring, config.shutdown_timeout));
    service_manager.register_service("scraper", scraper_service);
    service_manager.spawn_all();

    handle_shutdown_signals(service_manager, config.shutdown_timeout).await
}
