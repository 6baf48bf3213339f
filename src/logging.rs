use crate::cli::TracingFormat;
use crate::config::Config;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Configure and initialize logging for the application.
pub fn setup_logging(config: &Config, tracing_format: TracingFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let base_level = &config.log_level;
        EnvFilter::new(format!(
            "warn,jobboard_orchestrator={base_level},jobboard_orchestrator::rate_limiter=warn,jobboard_orchestrator::queue=debug"
        ))
    });

    match tracing_format {
        TracingFormat::Pretty => {
            let subscriber = FmtSubscriber::builder()
                .with_target(true)
                .pretty()
                .with_env_filter(filter)
                .finish();
            tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
        }
        TracingFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_target(true)
                .json()
                .with_env_filter(filter)
                .finish();
            tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
        }
    }
}
