//! Recurring-task dispatcher: advances named recurring configs on a
//! per-minute tick and enqueues any whose `next_run` has arrived.

use super::TaskQueue;
use crate::domain::{RecurringConfig, ScrapeTask};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct RecurringTaskManager {
    configs: RwLock<HashMap<String, RecurringConfig>>,
    queue: Arc<TaskQueue>,
}

impl RecurringTaskManager {
    pub fn new(queue: Arc<TaskQueue>) -> Self {
        Self {
            configs: RwLock::new(HashMap::new()),
            queue,
        }
    }

    pub async fn register(&self, config: RecurringConfig) {
        self.configs.write().await.insert(config.name.clone(), config);
    }

    pub async fn deregister(&self, name: &str) {
        self.configs.write().await.remove(name);
    }

    /// Runs until `shutdown` is signalled. On each tick, dispatches every
    /// due config and advances its `next_run` by its interval.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("recurring task manager shutting down");
                    return;
                }
                _ = interval.tick() => {
                    self.dispatch_due().await;
                }
            }
        }
    }

    async fn dispatch_due(&self) {
        let now = Utc::now();
        let due_names: Vec<String> = {
            let configs = self.configs.read().await;
            configs
                .values()
                .filter(|c| c.next_run <= now)
                .map(|c| c.name.clone())
                .collect()
        };

        for name in due_names {
            let mut configs = self.configs.write().await;
            let Some(config) = configs.get_mut(&name) else { continue };

            let mut task = ScrapeTask::new(config.board_id.clone(), config.priority);
            task.query = config.query.clone();
            task.location = config.location.clone();

            config.last_run = Some(now);
            config.next_run += config.interval;
            let interval = config.interval;
            drop(configs);

            match self.queue.enqueue(task).await {
                Ok(id) => info!(recurring = %name, task_id = %id, next_in = ?interval, "dispatched recurring task"),
                Err(e) => warn!(recurring = %name, error = %e, "failed to enqueue recurring task"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Priority;
    use chrono::TimeZone;

    fn config(name: &str, next_run: chrono::DateTime<Utc>) -> RecurringConfig {
        RecurringConfig {
            name: name.to_string(),
            board_id: "board-1".to_string(),
            interval: std::time::Duration::from_secs(3600),
            query: None,
            location: None,
            priority: Priority::Normal,
            last_run: None,
            next_run,
        }
    }

    #[test]
    fn due_configs_are_identified_by_next_run() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let due = config("a", now - chrono::Duration::minutes(1));
        let not_due = config("b", now + chrono::Duration::minutes(1));
        assert!(due.next_run <= now);
        assert!(not_due.next_run > now);
    }
}
