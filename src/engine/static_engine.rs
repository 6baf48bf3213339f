//! Single-shot HTTP GET + CSS-selector extraction.

use super::{candidates_for, Engine, EngineTimeouts};
use crate::domain::{EngineKind, JobBoard, RawJob};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use std::sync::atomic::{AtomicUsize, Ordering};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
];

trait GetText {
    fn get_text(&self) -> String;
}

impl GetText for ElementRef<'_> {
    fn get_text(&self) -> String {
        self.text().collect::<String>().trim().to_string()
    }
}

pub struct StaticEngine {
    client: reqwest::Client,
    timeouts: EngineTimeouts,
    ua_index: AtomicUsize,
}

impl StaticEngine {
    pub fn new(timeouts: EngineTimeouts) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeouts.http_request)
            .build()
            .expect("reqwest client builds");
        Self {
            client,
            timeouts,
            ua_index: AtomicUsize::new(0),
        }
    }

    fn next_user_agent(&self) -> &'static str {
        let i = self.ua_index.fetch_add(1, Ordering::Relaxed) % USER_AGENTS.len();
        USER_AGENTS[i]
    }

    async fn fetch_html(&self, url: &str) -> Result<Html> {
        let resp = self
            .client
            .get(url)
            .header("User-Agent", self.next_user_agent())
            .timeout(self.timeouts.http_request)
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited {
                host: url.to_string(),
            });
        }
        if !resp.status().is_success() {
            return Err(Error::Transient {
                host: url.to_string(),
                message: format!("HTTP {}", resp.status()),
            });
        }
        let body = resp.text().await?;
        Ok(Html::parse_document(&body))
    }

    fn select_first_text(&self, doc: &Html, scope: Option<ElementRef<'_>>, candidates: &[&str]) -> Option<String> {
        for raw in candidates {
            if let Ok(selector) = Selector::parse(raw) {
                let found = match scope {
                    Some(el) => el.select(&selector).next(),
                    None => doc.select(&selector).next(),
                };
                if let Some(el) = found {
                    let text = el.get_text();
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
            }
        }
        None
    }
}

#[async_trait]
impl Engine for StaticEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Static
    }

    async fn probe(&self, url: &str) -> bool {
        tokio::time::timeout(self.timeouts.probe, self.fetch_html(url))
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
        let next_page_candidates = board
            .selectors
            .get("next_page")
            .map(|s| s.candidates().to_vec());

        let mut urls = Vec::new();
        let mut page_url = board.base_url.clone();
        let mut pages_scraped = 0usize;

        for _ in 0..max_pages.max(1) {
            let doc = self.fetch_html(&page_url).await?;
            pages_scraped += 1;

            let link_cands = candidates_for(link_candidates.as_deref(), "job_links");
            let mut page_urls = Vec::new();
            for raw in &link_cands {
                if let Ok(selector) = Selector::parse(raw) {
                    for el in doc.select(&selector) {
                        if let Some(href) = el.value().attr("href") {
                            if let Ok(abs) = resolve(&board.base_url, href) {
                                page_urls.push(abs);
                            }
                        }
                    }
                    if !page_urls.is_empty() {
                        break;
                    }
                }
            }

            if page_urls.is_empty() {
                break;
            }

            let new_count = page_urls.iter().filter(|u| !urls.contains(*u)).count();
            urls.extend(page_urls);
            if new_count == 0 {
                break;
            }

            let next_cands = candidates_for(next_page_candidates.as_deref(), "next_page");
            let mut next_href = None;
            for raw in &next_cands {
                if let Ok(selector) = Selector::parse(raw) {
                    if let Some(el) = doc.select(&selector).next() {
                        next_href = el.value().attr("href").map(str::to_string);
                        break;
                    }
                }
            }
            match next_href.and_then(|h| resolve(&board.base_url, &h).ok()) {
                Some(next) => page_url = next,
                None => break,
            }
        }

        urls.dedup();
        Ok((urls, pages_scraped))
    }

    async fn extract_job(&self, url: &str, board: &JobBoard) -> Result<Option<RawJob>> {
        let doc = self.fetch_html(url).await?;

        let title = self.select_first_text(
            &doc,
            None,
            &candidates_for(board.selectors.get("job_title").map(|s| s.candidates()), "job_title"),
        );
        let company = self.select_first_text(
            &doc,
            None,
            &candidates_for(board.selectors.get("company").map(|s| s.candidates()), "company"),
        );
        let Some((title, company)) = title.zip(company) else {
            return Ok(None);
        };

        let location = self
            .select_first_text(
                &doc,
                None,
                &candidates_for(board.selectors.get("location").map(|s| s.candidates()), "location"),
            )
            .unwrap_or_default();
        let description = self
            .select_first_text(
                &doc,
                None,
                &candidates_for(
                    board.selectors.get("description").map(|s| s.candidates()),
                    "description",
                ),
            )
            .unwrap_or_default();
        let salary = self.select_first_text(
            &doc,
            None,
            &candidates_for(board.selectors.get("salary").map(|s| s.candidates()), "salary"),
        );
        let posted_date = self
            .select_first_text(
                &doc,
                None,
                &candidates_for(
                    board.selectors.get("date_posted").map(|s| s.candidates()),
                    "date_posted",
                ),
            )
            .and_then(|s| super::dates::parse_date(&s, Utc::now(), board.tz()));

        let job = RawJob {
            title,
            company,
            location,
            description,
            salary,
            posted_date,
            url: url.to_string(),
            board_id: board.id.clone(),
            board_name: board.name.clone(),
            fetched_at: Utc::now(),
            engine: EngineKind::Static,
        };
        if !job.has_required_fields() {
            return Ok(None);
        }
        Ok(Some(job))
    }

    async fn close(&self) {}
}

fn resolve(base: &str, href: &str) -> std::result::Result<String, url::ParseError> {
    let base_url = url::Url::parse(base)?;
    base_url.join(href).map(|u| u.to_string())
}
