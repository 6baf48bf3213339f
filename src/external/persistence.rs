//! Persistence port. The core only calls these operations; storage
//! mechanics are entirely opaque to it.

use crate::domain::{BoardPerformance, JobBoard, RawJob, ScrapeResult, ScrapeTask};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct BoardFilter {
    pub active_only: bool,
    pub category: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub task: ScrapeTask,
    pub result_outcome: String,
    pub jobs_found: usize,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct BoardAggregate {
    pub board_id: String,
    pub success_rate: f64,
    pub jobs_last_window: u64,
}

/// Every operation is expected to be idempotent on `(board_id, job_url)`.
#[async_trait]
pub trait PersistencePort: Send + Sync {
    async fn load_job_boards(&self, filter: &BoardFilter) -> anyhow::Result<Vec<JobBoard>>;
    async fn upsert_job_board(&self, board: &JobBoard) -> anyhow::Result<()>;
    async fn update_board_metrics(&self, id: &str, performance: BoardPerformance) -> anyhow::Result<()>;
    async fn save_session(&self, task: &ScrapeTask, result: &ScrapeResult) -> anyhow::Result<()>;
    async fn save_raw_jobs(&self, jobs: &[RawJob]) -> anyhow::Result<()>;
    async fn read_recent_sessions(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<Session>>;
    async fn list_top_boards(&self, since: DateTime<Utc>, limit: usize) -> anyhow::Result<Vec<BoardAggregate>>;
}

/// In-memory persistence used by tests and as a standalone-demo default.
#[derive(Default)]
pub struct InMemoryPersistence {
    boards: RwLock<HashMap<String, JobBoard>>,
    performance: RwLock<HashMap<String, BoardPerformance>>,
    sessions: RwLock<Vec<Session>>,
    raw_jobs: RwLock<Vec<RawJob>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, boards: Vec<JobBoard>) {
        let mut store = self.boards.write().await;
        for board in boards {
            store.insert(board.id.clone(), board);
        }
    }
}

#[async_trait]
impl PersistencePort for InMemoryPersistence {
    async fn load_job_boards(&self, filter: &BoardFilter) -> anyhow::Result<Vec<JobBoard>> {
        let boards = self.boards.read().await;
        Ok(boards
            .values()
            .filter(|b| !filter.active_only || b.active)
            .filter(|b| filter.category.as_deref().is_none_or(|c| b.category.as_deref() == Some(c)))
            .cloned()
            .collect())
    }

    async fn upsert_job_board(&self, board: &JobBoard) -> anyhow::Result<()> {
        self.boards.write().await.insert(board.id.clone(), board.clone());
        Ok(())
    }

    async fn update_board_metrics(&self, id: &str, performance: BoardPerformance) -> anyhow::Result<()> {
        self.performance.write().await.insert(id.to_string(), performance);
        Ok(())
    }

    async fn save_session(&self, task: &ScrapeTask, result: &ScrapeResult) -> anyhow::Result<()> {
        self.sessions.write().await.push(Session {
            task: task.clone(),
            result_outcome: format!("{:?}", result.outcome),
            jobs_found: result.jobs.len(),
            recorded_at: Utc::now(),
        });
        Ok(())
    }

    async fn save_raw_jobs(&self, jobs: &[RawJob]) -> anyhow::Result<()> {
        self.raw_jobs.write().await.extend_from_slice(jobs);
        Ok(())
    }

    async fn read_recent_sessions(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<Session>> {
        Ok(self
            .sessions
            .read()
            .await
            .iter()
            .filter(|s| s.recorded_at >= since)
            .cloned()
            .collect())
    }

    async fn list_top_boards(&self, since: DateTime<Utc>, limit: usize) -> anyhow::Result<Vec<BoardAggregate>> {
        let sessions = self.sessions.read().await;
        let mut by_board: HashMap<String, (u64, u64)> = HashMap::new();
        for s in sessions.iter().filter(|s| s.recorded_at >= since) {
            let entry = by_board.entry(s.task.board_id.clone()).or_insert((0, 0));
            entry.0 += 1;
            if s.result_outcome == "Success" {
                entry.1 += 1;
            }
        }
        let mut aggregates: Vec<BoardAggregate> = by_board
            .into_iter()
            .map(|(board_id, (total, successes))| BoardAggregate {
                board_id,
                success_rate: if total == 0 { 0.0 } else { successes as f64 / total as f64 },
                jobs_last_window: total,
            })
            .collect();
        aggregates.sort_by(|a, b| b.success_rate.partial_cmp(&a.success_rate).unwrap_or(Ordering::Equal));
        aggregates.truncate(limit);
        Ok(aggregates)
    }
}
