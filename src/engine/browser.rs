//! Headless-browser adapter.
//!
//! The actual browser process (executable lookup, navigation, DOM
//! serialization) is an external driver: this module only defines the
//! narrow seam the core needs (`BrowserDriver`) and implements the engine
//! contract in terms of it, including the fixed cookie/consent dismissal
//! sequence. A `NullBrowserDriver` satisfies the seam for environments with
//! no browser binary, always reporting no page content.

use super::{candidates_for, Engine, EngineTimeouts};
use crate::domain::{EngineKind, JobBoard, RawJob};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use scraper::{Html, Selector};

/// A fixed, ordered list of selectors for common cookie/consent overlays,
/// dismissed in order before DOM serialization.
const CONSENT_DISMISS_SELECTORS: &[&str] = &[
    "#onetrust-accept-btn-handler",
    "button[aria-label=\"Accept\"]",
    "button[aria-label=\"Accept all\"]",
    ".cookie-consent button",
    "#cookie-banner button",
];

/// External headless-browser driver contract. A real implementation wraps a
/// browser automation client (e.g. via CDP); it is instantiated lazily and
/// pooled by the composition root.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate to `url`, wait up to `page_load` for network idle, then wait
    /// up to `selector_wait` for `ready_selector` (if given) to appear.
    /// Attempts each of `dismiss_selectors` in order (best-effort, ignoring
    /// absence), then returns the serialized DOM.
    async fn render(
        &self,
        url: &str,
        ready_selector: Option<&str>,
        dismiss_selectors: &[&str],
        page_load: std::time::Duration,
        selector_wait: std::time::Duration,
    ) -> Result<String>;
}

/// Driver with no browser binary available; used where a real driver is not
/// wired in (tests, or deployments without `requires_js` boards).
pub struct NullBrowserDriver;

#[async_trait]
impl BrowserDriver for NullBrowserDriver {
    async fn render(
        &self,
        url: &str,
        _ready_selector: Option<&str>,
        _dismiss_selectors: &[&str],
        _page_load: std::time::Duration,
        _selector_wait: std::time::Duration,
    ) -> Result<String> {
        Err(Error::Transient {
            host: url.to_string(),
            message: "no browser driver configured".to_string(),
        })
    }
}

pub struct BrowserEngine {
    driver: std::sync::Arc<dyn BrowserDriver>,
    timeouts: EngineTimeouts,
}

impl BrowserEngine {
    pub fn new(driver: std::sync::Arc<dyn BrowserDriver>, timeouts: EngineTimeouts) -> Self {
        Self { driver, timeouts }
    }

    async fn render_document(&self, url: &str, ready_selector: Option<&str>) -> Result<Html> {
        let html = self
            .driver
            .render(
                url,
                ready_selector,
                CONSENT_DISMISS_SELECTORS,
                self.timeouts.page_load,
                self.timeouts.selector_wait,
            )
            .await?;
        Ok(Html::parse_document(&html))
    }
}

#[async_trait]
impl Engine for BrowserEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Browser
    }

    async fn probe(&self, url: &str) -> bool {
        tokio::time::timeout(self.timeouts.probe, self.render_document(url, None))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false)
    }

    async fn list_jobs(
        &self,
        board: &JobBoard,
        _query: Option<&str>,
        _location: Option<&str>,
        max_pages: usize,
    ) -> Result<(Vec<String>, usize)> {
        let link_candidates = board
            .selectors
            .get("job_links")
            .map(|s| s.candidates().to_vec());
        let link_cands = candidates_for(link_candidates.as_deref(), "job_links");

        // A single rendered DOM covers the whole listing (infinite-scroll
        // boards load further results into the same page), so one
        // successful render is one page scraped regardless of `max_pages`.
        let doc = self.render_document(&board.base_url, link_cands.first().copied()).await?;

        let mut urls = Vec::new();
        for raw in &link_cands {
            if let Ok(selector) = Selector::parse(raw) {
                for el in doc.select(&selector) {
                    if let Some(href) = el.value().attr("href") {
                        if let Ok(base) = url::Url::parse(&board.base_url) {
                            if let Ok(abs) = base.join(href) {
                                urls.push(abs.to_string());
                            }
                        }
                    }
                }
                if !urls.is_empty() {
                    break;
                }
            }
        }
        urls.dedup();
        urls.truncate(urls.len().min(max_pages.max(1) * 50));
        Ok((urls, 1))
    }

    async fn extract_job(&self, url: &str, board: &JobBoard) -> Result<Option<RawJob>> {
        let title_cands = candidates_for(board.selectors.get("job_title").map(|s| s.candidates()), "job_title");
        let doc = self.render_document(url, title_cands.first().copied()).await?;

        let select_first = |cands: &[&str]| -> Option<String> {
            for raw in cands {
                if let Ok(selector) = Selector::parse(raw) {
                    if let Some(el) = doc.select(&selector).next() {
                        let text = el.text().collect::<String>().trim().to_string();
                        if !text.is_empty() {
                            return Some(text);
                        }
                    }
                }
            }
            None
        };

        let title = select_first(&title_cands);
        let company = select_first(&candidates_for(
            board.selectors.get("company").map(|s| s.candidates()),
            "company",
        ));
        let Some((title, company)) = title.zip(company) else {
            return Ok(None);
        };

        let location = select_first(&candidates_for(
            board.selectors.get("location").map(|s| s.candidates()),
            "location",
        ))
        .unwrap_or_default();
        let description = select_first(&candidates_for(
            board.selectors.get("description").map(|s| s.candidates()),
            "description",
        ))
        .unwrap_or_default();
        let salary = select_first(&candidates_for(
            board.selectors.get("salary").map(|s| s.candidates()),
            "salary",
        ));

        let job = RawJob {
            title,
            company,
            location,
            description,
            salary,
            posted_date: None,
            url: url.to_string(),
            board_id: board.id.clone(),
            board_name: board.name.clone(),
            fetched_at: Utc::now(),
            engine: EngineKind::Browser,
        };
        if !job.has_required_fields() {
            return Ok(None);
        }
        Ok(Some(job))
    }

    async fn close(&self) {}
}
