//! Bounded task queue and worker pool
//!
//! Submission never blocks: the queue is a bounded channel and a full
//! channel surfaces `QueueFull` to the caller immediately — that is the
//! engine's backpressure signal. A pool of workers shares the receiving
//! end and drives each task through claim, execution, and release.
//!
//! Shutdown is cooperative: cancelling the token stops workers between
//! tasks, never mid-execution, and whatever is still sitting on the queue
//! is deliberately left unprocessed.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::agent::AgentRegistry;
use crate::error::{CoordinatorError, SwarmResult};
use crate::executor::TaskExecutor;
use crate::stats::StatsCollector;
use crate::store::CoordinationStore;
use crate::task::{Task, TaskBoard, TaskId};

/// Terminal failure reason for tasks no agent could take.
pub const NO_SUITABLE_AGENT: &str = "NoSuitableAgent";

/// Sending half of the bounded task queue
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::Sender<TaskId>,
    capacity: usize,
}

impl TaskQueue {
    /// Create a queue with the given capacity, returning the receiving
    /// end for the worker pool
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<TaskId>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, capacity }, rx)
    }

    /// Try to place a task ID on the queue without blocking
    ///
    /// A full queue — or a queue whose workers have shut down — reports
    /// `QueueFull`.
    pub fn try_enqueue(&self, id: TaskId) -> SwarmResult<()> {
        self.tx.try_send(id).map_err(|_| CoordinatorError::QueueFull)
    }

    /// Number of tasks currently buffered
    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Shared dependencies handed to every worker
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub registry: Arc<AgentRegistry>,
    pub board: Arc<TaskBoard>,
    pub stats: Arc<StatsCollector>,
    pub executor: Arc<dyn TaskExecutor>,
    pub store: Arc<dyn CoordinationStore>,
}

/// Track a task and place it on the queue
///
/// On success the task is marked `Queued` and `total_tasks` is bumped.
/// On `QueueFull` the task is untracked again, leaving no trace — the
/// caller keeps ownership of the retry decision.
pub(crate) async fn enqueue(
    board: &TaskBoard,
    queue: &TaskQueue,
    stats: &StatsCollector,
    task: Task,
) -> SwarmResult<TaskId> {
    let id = task.id;

    // Track before sending so a fast worker never sees an unknown ID
    board.insert(task).await;

    if let Err(err) = queue.try_enqueue(id) {
        board.remove(id).await;
        return Err(err);
    }

    board.mark_queued(id).await?;
    stats.record_submitted().await;
    Ok(id)
}

/// Spawn the worker pool
pub(crate) fn spawn_workers(
    count: usize,
    receiver: mpsc::Receiver<TaskId>,
    ctx: WorkerContext,
    shutdown: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let receiver = Arc::new(Mutex::new(receiver));
    (0..count)
        .map(|worker_id| {
            let receiver = Arc::clone(&receiver);
            let ctx = ctx.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(worker_loop(worker_id, receiver, ctx, shutdown))
        })
        .collect()
}

/// One worker: dequeue, process, repeat until cancelled
///
/// The shutdown check happens only between tasks, so an in-flight task
/// always runs to completion.
async fn worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<TaskId>>>,
    ctx: WorkerContext,
    shutdown: CancellationToken,
) {
    debug!(worker_id, "Task worker started");

    loop {
        let next = tokio::select! {
            biased;

            _ = shutdown.cancelled() => None,
            received = async { receiver.lock().await.recv().await } => received,
        };

        let Some(task_id) = next else { break };

        if let Err(error) = process_task(worker_id, task_id, &ctx).await {
            warn!(worker_id, task_id = %task_id, %error, "Task processing failed");
        }
    }

    debug!(worker_id, "Task worker stopped");
}

/// Drive one task through claim, execution, and release
async fn process_task(worker_id: usize, task_id: TaskId, ctx: &WorkerContext) -> SwarmResult<()> {
    let task = ctx.board.get(task_id).await?;

    debug!(
        worker_id,
        task_id = %task_id,
        task_type = %task.task_type,
        "Processing task"
    );

    let Some(agent) = ctx.registry.claim_for_task(&task, Utc::now()).await else {
        error!(task_id = %task_id, "No suitable agent found for task");
        ctx.board.fail(task_id, NO_SUITABLE_AGENT).await?;
        ctx.stats.record_failed().await;
        persist_task(ctx, task_id).await;
        return Ok(());
    };

    ctx.board.mark_assigned(task_id, agent.id).await?;
    ctx.board.mark_in_progress(task_id).await?;

    let report = ctx.executor.execute(&task, &agent).await;

    let released = ctx
        .registry
        .release(agent.id, task_id, report.success, report.response_time_ms)
        .await?;

    if report.success {
        let result = report.result.unwrap_or(serde_json::Value::Null);
        ctx.board.complete(task_id, result).await?;
        ctx.stats.record_completed(report.response_time_ms).await;
    } else {
        let reason = report
            .error
            .unwrap_or_else(|| "task execution failed".to_string());
        ctx.board.fail(task_id, reason).await?;
        ctx.stats.record_failed().await;
    }

    if let Err(error) = ctx.store.update_agent(&released).await {
        warn!(agent_id = %released.id, %error, "Failed to persist agent update");
    }
    persist_task(ctx, task_id).await;

    Ok(())
}

/// Write the task's current state through to the store, best-effort
async fn persist_task(ctx: &WorkerContext, task_id: TaskId) {
    let Ok(task) = ctx.board.get(task_id).await else {
        return;
    };
    if let Err(error) = ctx.store.update_task(&task).await {
        warn!(task_id = %task_id, %error, "Failed to persist task update");
    }
}
