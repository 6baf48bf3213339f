pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod external;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod queue;
pub mod rate_limiter;
pub mod router;
pub mod services;
pub mod signals;
pub mod telemetry;
pub mod utils;
