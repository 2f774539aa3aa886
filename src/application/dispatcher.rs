use crate::error::{OrderError, Result};
use std::fmt;
use std::future::Future;
use std::cmp::Ordering as SizeOrdering;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::task::JoinSet;

pub const MIN_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 100;

type TaskFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;

/// A unit of work: a label naming the request and the future that serves it.
pub struct Task {
    label: String,
    future: TaskFuture,
}

impl Task {
    pub fn new<F>(label: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = Result<String>> + Send + 'static,
    {
        Self {
            label: label.into(),
            future: Box::pin(future),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("label", &self.label).finish()
    }
}

/// What a task returned, tagged with its label.
#[derive(Debug)]
pub struct TaskOutcome {
    pub label: String,
    pub result: Result<String>,
}

/// Resizable pool of tokio workers fed from one bounded queue.
///
/// Each worker pulls one task at a time, awaits it and pushes the outcome to the bounded results
/// queue, so a caller that stops draining results eventually stalls the workers. Failed tasks are
/// reported, never retried.
///
/// Shutdown: [`close`](Self::close) stops intake, the workers drain what is queued, and
/// [`wait`](Self::wait) joins them; the results receiver ends once every outcome is read.
///
/// [`resize`](Self::resize) takes the pool exclusively, waits for every submitted task to report,
/// then adds or stops workers, so no in-flight outcome is lost to a stopping worker.
pub struct WorkerPool {
    tasks: Option<mpsc::Sender<Task>>,
    queue: Arc<Mutex<mpsc::Receiver<Task>>>,
    stop_tx: mpsc::UnboundedSender<()>,
    stop_rx: Arc<Mutex<mpsc::UnboundedReceiver<()>>>,
    results_tx: Option<mpsc::Sender<TaskOutcome>>,
    results: Option<mpsc::Receiver<TaskOutcome>>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
    workers: JoinSet<()>,
    size: usize,
    next_id: usize,
}

impl WorkerPool {
    /// Starts `workers` workers with room for `capacity` queued tasks and as many unread results.
    pub fn new(workers: usize, capacity: usize) -> Result<Self> {
        check_size(workers)?;
        let capacity = capacity.max(1);
        let (tasks, queue) = mpsc::channel(capacity);
        let (stop_tx, stop_rx) = mpsc::unbounded_channel();
        let (results_tx, results) = mpsc::channel(capacity);

        let mut pool = Self {
            tasks: Some(tasks),
            queue: Arc::new(Mutex::new(queue)),
            stop_tx,
            stop_rx: Arc::new(Mutex::new(stop_rx)),
            results_tx: Some(results_tx),
            results: Some(results),
            pending: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
            workers: JoinSet::new(),
            size: 0,
            next_id: 0,
        };
        pool.spawn(workers)?;
        Ok(pool)
    }

    /// Number of running workers.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn add_workers(&mut self, count: usize) -> Result<()> {
        check_size(self.size + count)?;
        self.spawn(count)
    }

    /// Asks `count` workers to stop once they finish their current task.
    pub fn remove_workers(&mut self, count: usize) -> Result<()> {
        if count > self.size {
            return Err(OrderError::WrongInput(format!(
                "can't remove {count} workers: current workers count = {}",
                self.size
            )));
        }
        check_size(self.size - count)?;

        for _ in 0..count {
            self.stop_tx
                .send(())
                .map_err(|_| OrderError::internal("worker pool is shut down"))?;
        }
        self.size -= count;
        tracing::debug!(removed = count, size = self.size, "Resized worker pool");
        Ok(())
    }

    /// Queues a task, waiting for room when the queue is full.
    pub async fn submit(&self, task: Task) -> Result<()> {
        let Some(tasks) = &self.tasks else {
            return Err(OrderError::WrongStatus(format!(
                "can't submit {}: worker pool is closed",
                task.label
            )));
        };
        self.pending.fetch_add(1, Ordering::AcqRel);
        if tasks.send(task).await.is_err() {
            finish_one(&self.pending, &self.idle);
            return Err(OrderError::internal("all workers have stopped"));
        }
        Ok(())
    }

    /// Waits until every submitted task has pushed its outcome.
    ///
    /// Only returns once the results queue has room for those outcomes, so someone must be
    /// draining it.
    pub async fn flush(&self) {
        loop {
            let idle = self.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();
            if self.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            idle.await;
        }
    }

    /// Drains in-flight work, then runs exactly `size` workers.
    pub async fn resize(&mut self, size: usize) -> Result<()> {
        check_size(size)?;
        if self.tasks.is_none() {
            return Err(OrderError::WrongStatus(
                "can't resize: worker pool is closed".to_string(),
            ));
        }

        self.flush().await;
        match size.cmp(&self.size) {
            SizeOrdering::Greater => self.add_workers(size - self.size),
            SizeOrdering::Less => self.remove_workers(self.size - size),
            SizeOrdering::Equal => Ok(()),
        }
    }

    /// Pushes an outcome that did not come from a worker, such as the answer to a pool request.
    pub async fn report(&self, outcome: TaskOutcome) -> Result<()> {
        let Some(results) = &self.results_tx else {
            return Err(OrderError::WrongStatus(format!(
                "can't report {}: worker pool is shut down",
                outcome.label
            )));
        };
        results
            .send(outcome)
            .await
            .map_err(|_| OrderError::internal("results receiver is gone"))
    }

    /// Hands out the results receiver. Only the first call returns it.
    pub fn take_results(&mut self) -> Option<mpsc::Receiver<TaskOutcome>> {
        self.results.take()
    }

    /// Stops accepting tasks. Queued tasks still run.
    pub fn close(&mut self) {
        if self.tasks.take().is_some() {
            tracing::debug!("Closed worker pool queue");
        }
    }

    /// Waits for every worker to exit. Closes the queue first if that hasn't happened yet.
    pub async fn wait(&mut self) {
        self.close();
        self.results_tx = None;
        while let Some(joined) = self.workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Worker task failed");
            }
        }
        self.size = 0;
    }

    fn spawn(&mut self, count: usize) -> Result<()> {
        let Some(results) = &self.results_tx else {
            return Err(OrderError::WrongStatus(
                "can't add workers: worker pool is shut down".to_string(),
            ));
        };
        for _ in 0..count {
            let id = self.next_id;
            self.next_id += 1;
            self.workers.spawn(work(
                id,
                self.queue.clone(),
                self.stop_rx.clone(),
                results.clone(),
                Progress {
                    pending: self.pending.clone(),
                    idle: self.idle.clone(),
                },
            ));
        }
        self.size += count;
        tracing::debug!(added = count, size = self.size, "Resized worker pool");
        Ok(())
    }
}

fn check_size(size: usize) -> Result<()> {
    if !(MIN_WORKERS..=MAX_WORKERS).contains(&size) {
        return Err(OrderError::WrongInput(format!(
            "workers count must be between {MIN_WORKERS} and {MAX_WORKERS}, got {size}"
        )));
    }
    Ok(())
}

fn finish_one(pending: &AtomicUsize, idle: &Notify) {
    if pending.fetch_sub(1, Ordering::AcqRel) == 1 {
        idle.notify_waiters();
    }
}

/// Count of submitted tasks whose outcome is not pushed yet.
struct Progress {
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

async fn work(
    id: usize,
    queue: Arc<Mutex<mpsc::Receiver<Task>>>,
    stop: Arc<Mutex<mpsc::UnboundedReceiver<()>>>,
    results: mpsc::Sender<TaskOutcome>,
    progress: Progress,
) {
    loop {
        let task = tokio::select! {
            biased;
            _ = async { stop.lock().await.recv().await } => {
                tracing::trace!(worker = id, "Worker stopped");
                return;
            }
            task = async { queue.lock().await.recv().await } => match task {
                Some(task) => task,
                None => return,
            },
        };

        let Task { label, future } = task;
        let result = future.await;
        if let Err(e) = &result {
            tracing::debug!(worker = id, task = %label, error = %e, "Task failed");
        }
        let sent = results.send(TaskOutcome { label, result }).await;
        finish_one(&progress.pending, &progress.idle);
        if sent.is_err() {
            return;
        }
    }
}
