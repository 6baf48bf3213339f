//! Wraps the task queue and recurring-task dispatcher as a managed service.

use crate::queue::scheduler::RecurringTaskManager;
use crate::queue::TaskQueue;
use crate::services::Service;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct ScraperService {
    queue: Arc<TaskQueue>,
    recurring: Arc<RecurringTaskManager>,
    shutdown: CancellationToken,
    shutdown_deadline: Duration,
}

impl ScraperService {
    pub fn new(queue: Arc<TaskQueue>, recurring: Arc<RecurringTaskManager>, shutdown_deadline: Duration) -> Self {
        Self {
            queue,
            recurring,
            shutdown: CancellationToken::new(),
            shutdown_deadline,
        }
    }
}

#[async_trait]
impl Service for ScraperService {
    fn name(&self) -> &'static str {
        "scraper"
    }

    async fn run(&mut self) -> Result<(), anyhow::Error> {
        self.queue.start().await;
        self.recurring.run(self.shutdown.clone()).await;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), anyhow::Error> {
        self.shutdown.cancel();
        self.queue.stop(self.shutdown_deadline).await;
        Ok(())
    }
}
