use super::command::{Command, Request};
use super::dispatcher::{Task, TaskOutcome, WorkerPool};
use super::service::OrderService;
use crate::error::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything a session needs: the service with its storage, and the pool that runs commands.
pub struct AppContext {
    service: Arc<OrderService>,
    pool: WorkerPool,
}

impl AppContext {
    pub fn new(service: OrderService, pool: WorkerPool) -> Self {
        Self {
            service: Arc::new(service),
            pool,
        }
    }

    pub fn service(&self) -> &Arc<OrderService> {
        &self.service
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn take_results(&mut self) -> Option<mpsc::Receiver<TaskOutcome>> {
        self.pool.take_results()
    }

    /// Queues a command; its outcome arrives on the results receiver.
    pub async fn submit(&self, command: Command) -> Result<()> {
        let service = self.service.clone();
        let task = Task::new(command.label(), async move { command.execute(&service).await });
        self.pool.submit(task).await
    }

    /// Runs one line of a command file. Pool requests are answered on the results receiver,
    /// after the outcome of every command submitted before them.
    pub async fn handle(&mut self, request: Request) -> Result<()> {
        let result = match request {
            Request::Run(command) => return self.submit(command).await,
            Request::SetWorkers(count) => self.set_workers(count).await,
            Request::Workers => {
                self.pool.flush().await;
                Ok(format!("workers: {}", self.pool.size()))
            }
        };
        self.pool
            .report(TaskOutcome {
                label: "workers".to_string(),
                result,
            })
            .await
    }

    /// Stops intake, lets every queued command finish, then runs `count` workers.
    pub async fn set_workers(&mut self, count: usize) -> Result<String> {
        self.pool.resize(count).await?;
        tracing::info!(workers = count, "Worker pool resized");
        Ok(format!("workers: {}", self.pool.size()))
    }

    /// Lets queued commands finish, then persists the storage.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.pool.wait().await;
        self.service.storage().save().await
    }
}
