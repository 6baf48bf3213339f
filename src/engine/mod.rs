//! Uniform fetch+extract contract and the concrete engine adapters.

pub mod browser;
pub mod dates;
pub mod feed;
pub mod selectors;
pub mod static_engine;

use crate::domain::{EngineKind, JobBoard, RawJob};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A set of generic, built-in selectors tried when a board's configured
/// selectors come up empty.
pub use selectors::{built_in_selectors, candidates_for};

/// Deadlines a caller applies around adapter suspension points; adapters
/// themselves only need to know the values, not enforce cancellation.
#[derive(Debug, Clone, Copy)]
pub struct EngineTimeouts {
    pub http_request: Duration,
    pub page_load: Duration,
    pub selector_wait: Duration,
    pub probe: Duration,
}

impl Default for EngineTimeouts {
    fn default() -> Self {
        Self {
            http_request: Duration::from_secs(30),
            page_load: Duration::from_secs(30),
            selector_wait: Duration::from_secs(10),
            probe: Duration::from_secs(10),
        }
    }
}

/// Implemented by each concrete engine (Static, Browser, Feed). All methods
/// are cancellation-safe suspension points: callers race them against a
/// `CancellationToken` and a deadline.
#[async_trait]
pub trait Engine: Send + Sync {
    fn kind(&self) -> EngineKind;

    /// Inexpensive reachability check with a short deadline.
    async fn probe(&self, url: &str) -> bool;

    /// Traverse listing pages, returning absolute job detail URLs alongside
    /// the number of listing pages actually fetched. Stops at `max_pages`,
    /// on an empty page, or when no next-page locator is found.
    async fn list_jobs(
        &self,
        board: &JobBoard,
        query: Option<&str>,
        location: Option<&str>,
        max_pages: usize,
    ) -> Result<(Vec<String>, usize)>;

    /// Fetch and extract a single detail page. Returns `None` (not an error)
    /// when required fields are missing.
    async fn extract_job(&self, url: &str, board: &JobBoard) -> Result<Option<RawJob>>;

    async fn close(&self);
}
