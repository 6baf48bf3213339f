//! RSS/Atom feed adapter. No pagination beyond the feed itself.

use super::{Engine, EngineTimeouts};
use crate::domain::{EngineKind, JobBoard, RawJob};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

pub struct FeedEngine {
    client: reqwest::Client,
    timeouts: EngineTimeouts,
}

#[derive(Debug, Clone, Default)]
struct FeedEntry {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    author: Option<String>,
    pub_date: Option<String>,
}

impl FeedEngine {
    pub fn new(timeouts: EngineTimeouts) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeouts.http_request)
            .build()
            .expect("reqwest client builds");
        Self { client, timeouts }
    }

    async fn fetch_body(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .timeout(self.timeouts.http_request)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::Transient {
                host: url.to_string(),
                message: format!("HTTP {}", resp.status()),
            });
        }
        Ok(resp.text().await?)
    }

    fn parse_entries(xml: &str) -> Vec<FeedEntry> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut entries = Vec::new();
        let mut current: Option<FeedEntry> = None;
        let mut field: Option<&'static str> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = local_name(e.name().as_ref());
                    match name.as_str() {
                        "item" | "entry" => current = Some(FeedEntry::default()),
                        "title" => field = Some("title"),
                        "link" => {
                            field = Some("link");
                            // Atom <link href="..."/> carries no text body.
                            if let Some(entry) = current.as_mut() {
                                for attr in e.attributes().flatten() {
                                    if attr.key.as_ref() == b"href" {
                                        if let Ok(v) = attr.unescape_value() {
                                            entry.link = Some(v.to_string());
                                        }
                                    }
                                }
                            }
                        }
                        "description" | "summary" | "content" => field = Some("description"),
                        "author" | "dc:creator" => field = Some("author"),
                        "pubdate" | "published" | "updated" => field = Some("pub_date"),
                        _ => {}
                    }
                }
                Ok(Event::Text(e)) => {
                    if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                        if let Ok(text) = e
                            .decode()
                            .map_err(|_| ())
                            .and_then(|d| quick_xml::escape::unescape(&d).map(|u| u.into_owned()).map_err(|_| ()))
                        {
                            let text = text.trim().to_string();
                            if !text.is_empty() {
                                match f {
                                    "title" => entry.title = Some(text),
                                    "link" => {
                                        entry.link.get_or_insert(text);
                                    }
                                    "description" => entry.description = Some(text),
                                    "author" => entry.author = Some(text),
                                    "pub_date" => entry.pub_date = Some(text),
                                    _ => {}
                                }
                            }
                        }
                    }
                }
                Ok(Event::End(e)) => {
                    let name = local_name(e.name().as_ref());
                    if matches!(name.as_str(), "item" | "entry") {
                        if let Some(entry) = current.take() {
                            entries.push(entry);
                        }
                    }
                    field = None;
                }
                Ok(Event::Eof) => break,
                Err(_) => break,
                _ => {}
            }
            buf.clear();
        }

        entries
    }
}

fn local_name(qualified: &[u8]) -> String {
    let s = String::from_utf8_lossy(qualified);
    s.rsplit(':').next().unwrap_or(&s).to_lowercase()
}

#[async_trait]
impl Engine for FeedEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Feed
    }

    async fn probe(&self, url: &str) -> bool {
        tokio::time::timeout(self.timeouts.probe, self.fetch_body(url))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false)
    }

    async fn list_jobs(
        &self,
        board: &JobBoard,
        _query: Option<&str>,
        _location: Option<&str>,
        _max_pages: usize,
    ) -> Result<(Vec<String>, usize)> {
        let body = self.fetch_body(&board.base_url).await?;
        let entries = Self::parse_entries(&body);
        let urls = entries.into_iter().filter_map(|e| e.link).collect();
        Ok((urls, 1))
    }

    /// Feeds carry their fields inline; `extract_job` re-fetches the feed and
    /// picks the matching entry by link rather than re-fetching the detail
    /// page, since a feed URL often has no separate per-job HTML page.
    async fn extract_job(&self, url: &str, board: &JobBoard) -> Result<Option<RawJob>> {
        let body = self.fetch_body(&board.base_url).await?;
        let entries = Self::parse_entries(&body);
        let Some(entry) = entries.into_iter().find(|e| e.link.as_deref() == Some(url)) else {
            return Ok(None);
        };

        let Some(title) = entry.title else {
            return Ok(None);
        };
        let company = entry.author.unwrap_or_else(|| board.name.clone());
        let job = RawJob {
            title,
            company,
            location: String::new(),
            description: entry.description.unwrap_or_default(),
            salary: None,
            posted_date: entry
                .pub_date
                .and_then(|d| super::dates::parse_date(&d, Utc::now(), board.tz())),
            url: url.to_string(),
            board_id: board.id.clone(),
            board_name: board.name.clone(),
            fetched_at: Utc::now(),
            engine: EngineKind::Feed,
        };
        if !job.has_required_fields() {
            return Ok(None);
        }
        Ok(Some(job))
    }

    async fn close(&self) {}
}
