//! Scrape task lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Retrying,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeTask {
    pub id: String,
    pub board_id: String,
    pub query: Option<String>,
    pub location: Option<String>,
    pub max_pages: usize,
    pub max_jobs: Option<usize>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub result_ref: Option<String>,
    pub last_error: Option<String>,
}

impl ScrapeTask {
    pub fn new(board_id: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            board_id: board_id.into(),
            query: None,
            location: None,
            max_pages: 10,
            max_jobs: None,
            priority,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            scheduled_at: None,
            started_at: None,
            completed_at: None,
            retry_count: 0,
            max_retries: 3,
            result_ref: None,
            last_error: None,
        }
    }

    /// True once `scheduled_at`, if set, has arrived.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at.is_none_or(|at| at <= now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Success,
    Partial,
    Failed,
    Blocked,
    Timeout,
    RateLimited,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub outcome: SessionOutcome,
    pub jobs: Vec<super::job::RawJob>,
    pub found: usize,
    pub pages_scraped: usize,
    pub errors: usize,
    pub duration: std::time::Duration,
    pub engine_used: Option<crate::domain::board::EngineKind>,
}

/// A named recurring scrape configuration, advanced by the dispatcher loop
/// once its `next_run` arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringConfig {
    pub name: String,
    pub board_id: String,
    pub interval: std::time::Duration,
    pub query: Option<String>,
    pub location: Option<String>,
    pub priority: Priority,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: DateTime<Utc>,
}
