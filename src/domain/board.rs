//! Job board catalog entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which engine a board should be fetched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Static,
    Browser,
    Feed,
    Auto,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EngineKind::Static => "static",
            EngineKind::Browser => "browser",
            EngineKind::Feed => "feed",
            EngineKind::Auto => "auto",
        };
        f.write_str(s)
    }
}

/// A single logical field's selector, with fallbacks tried in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorSpec {
    Single(String),
    Fallbacks(Vec<String>),
}

impl SelectorSpec {
    pub fn candidates(&self) -> &[String] {
        match self {
            SelectorSpec::Single(s) => std::slice::from_ref(s),
            SelectorSpec::Fallbacks(v) => v,
        }
    }
}

pub type SelectorMap = HashMap<String, SelectorSpec>;

/// A scrape target: URL, engine hint, selectors, throttling and behavior flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobBoard {
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub engine_hint: EngineKind,
    pub region: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub selectors: SelectorMap,
    pub rate_limit_delay_secs: f64,
    pub max_concurrent: usize,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub requires_js: bool,
    pub has_anti_bot: bool,
    pub active: bool,
    pub priority: u8,
    pub last_analyzed_at: Option<DateTime<Utc>>,
    pub analysis_confidence: Option<f64>,
    /// IANA zone the board's bare calendar dates (no offset) are expressed
    /// in, e.g. "America/New_York". `None` assumes UTC.
    #[serde(default)]
    pub timezone: Option<String>,
}

impl JobBoard {
    /// scheme+authority of `base_url`, used as the rate-limit key.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.base_url).ok().and_then(|u| {
            let scheme = u.scheme().to_string();
            u.host_str()
                .map(|h| match u.port() {
                    Some(p) => format!("{scheme}://{h}:{p}"),
                    None => format!("{scheme}://{h}"),
                })
        })
    }

    /// Parses `timezone`, falling back to UTC for an unset or unrecognized zone.
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(chrono_tz::UTC)
    }
}

/// Rolling performance figures fed back from completed sessions, per
/// `UpdateBoardMetrics`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardPerformance {
    pub success_rate: f64,
    pub avg_response_time_secs: f64,
}
