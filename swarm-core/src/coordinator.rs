//! The coordination engine façade
//!
//! [`Coordinator`] wires the agent registry, the bounded task queue with
//! its worker pool, the execution simulator, and the background monitors
//! behind one handle. The lifecycle is single-shot: `start` succeeds at
//! most once, `stop` is idempotent, and a stopped coordinator stays
//! stopped.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::{Agent, AgentId, AgentRegistry};
use crate::config::CoordinatorConfig;
use crate::dispatcher::{self, TaskQueue, WorkerContext};
use crate::error::{CoordinatorError, SwarmResult};
use crate::executor::{SimulatedExecutor, TaskExecutor};
use crate::monitor::Monitor;
use crate::stats::{CoordinatorStats, StatsCollector};
use crate::store::{CoordinationStore, NullStore};
use crate::task::{Task, TaskBoard, TaskId};

enum Lifecycle {
    /// Built but not started; holds the queue receiver for the workers
    Idle { receiver: mpsc::Receiver<TaskId> },
    Running { handles: Vec<JoinHandle<()>> },
    Stopped,
}

/// Agent coordination and task scheduling engine
///
/// Construct with [`Coordinator::new`], optionally swap in a store or
/// executor, then [`start`](Coordinator::start) it. All methods take
/// `&self`; the engine is designed to sit behind an `Arc` and be shared.
pub struct Coordinator {
    config: CoordinatorConfig,
    registry: Arc<AgentRegistry>,
    board: Arc<TaskBoard>,
    stats: Arc<StatsCollector>,
    store: Arc<dyn CoordinationStore>,
    executor: Arc<dyn TaskExecutor>,
    queue: TaskQueue,
    shutdown: CancellationToken,
    lifecycle: Mutex<Lifecycle>,
}

impl Coordinator {
    /// Build a coordinator with the given configuration, a [`NullStore`],
    /// and the default simulated executor
    pub fn new(config: CoordinatorConfig) -> Self {
        let (queue, receiver) = TaskQueue::bounded(config.queue_size);
        Self {
            registry: Arc::new(AgentRegistry::new(config.max_agents)),
            board: Arc::new(TaskBoard::new()),
            stats: Arc::new(StatsCollector::new()),
            store: Arc::new(NullStore),
            executor: Arc::new(SimulatedExecutor::new()),
            queue,
            shutdown: CancellationToken::new(),
            lifecycle: Mutex::new(Lifecycle::Idle { receiver }),
            config,
        }
    }

    /// Replace the persistence store
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn CoordinationStore>) -> Self {
        self.store = store;
        self
    }

    /// Replace the task executor
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = executor;
        self
    }

    fn monitor(&self) -> Monitor {
        Monitor {
            registry: Arc::clone(&self.registry),
            board: Arc::clone(&self.board),
            stats: Arc::clone(&self.stats),
            store: Arc::clone(&self.store),
            queue: self.queue.clone(),
            max_agents: self.config.max_agents,
            stale_after: self.config.stale_after,
        }
    }

    /// Start the worker pool and the background monitors
    ///
    /// Previously persisted agents are adopted back into the registry
    /// first; a load failure is logged and the engine starts empty.
    /// Errors with `AlreadyRunning` on any call after the first.
    pub async fn start(&self) -> SwarmResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        let receiver = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Idle { receiver } => receiver,
            other => {
                *lifecycle = other;
                return Err(CoordinatorError::AlreadyRunning);
            }
        };

        match self.store.load_agents().await {
            Ok(agents) if !agents.is_empty() => {
                info!(count = agents.len(), "Adopting persisted agents");
                self.registry.adopt(agents).await;
            }
            Ok(_) => {}
            Err(error) => warn!(%error, "Failed to load persisted agents, starting empty"),
        }

        let ctx = WorkerContext {
            registry: Arc::clone(&self.registry),
            board: Arc::clone(&self.board),
            stats: Arc::clone(&self.stats),
            executor: Arc::clone(&self.executor),
            store: Arc::clone(&self.store),
        };
        let mut handles =
            dispatcher::spawn_workers(self.config.worker_count, receiver, ctx, self.shutdown.clone());

        let monitor = Arc::new(self.monitor());
        handles.push(monitor.spawn_health_loop(self.config.health_interval, self.shutdown.clone()));
        handles.push(
            monitor.spawn_maintenance_loop(self.config.maintenance_interval, self.shutdown.clone()),
        );

        *lifecycle = Lifecycle::Running { handles };
        info!(
            workers = self.config.worker_count,
            queue_size = self.config.queue_size,
            max_agents = self.config.max_agents,
            "Coordinator started"
        );
        Ok(())
    }

    /// Stop the engine
    ///
    /// Workers finish their in-flight task but do not drain the backlog;
    /// whatever is still queued stays queued. Every agent is marked
    /// inactive on the way out. Calling `stop` again, or before `start`,
    /// is a no-op.
    pub async fn stop(&self) -> SwarmResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        let handles = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Running { handles } => handles,
            // Never started or already stopped; put the state back
            other => {
                *lifecycle = other;
                return Ok(());
            }
        };

        self.shutdown.cancel();
        for handle in handles {
            if let Err(error) = handle.await {
                warn!(%error, "Background task panicked during shutdown");
            }
        }

        for agent in self.registry.deactivate_all().await {
            if let Err(error) = self.store.update_agent(&agent).await {
                warn!(agent_id = %agent.id, %error, "Failed to persist agent shutdown");
            }
        }

        info!("Coordinator stopped");
        Ok(())
    }

    /// Whether the engine is currently running
    pub async fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock().await, Lifecycle::Running { .. })
    }

    /// Submit a task for scheduling
    ///
    /// Non-blocking: a full queue fails fast with `QueueFull` as the
    /// backpressure signal, and the rejected task is not tracked.
    pub async fn submit_task(&self, task: Task) -> SwarmResult<TaskId> {
        let id = dispatcher::enqueue(&self.board, &self.queue, &self.stats, task).await?;
        info!(task_id = %id, "Task submitted");
        Ok(id)
    }

    /// Create and register a new agent
    pub async fn create_agent(
        &self,
        agent_type: impl Into<String>,
        config: std::collections::HashMap<String, serde_json::Value>,
    ) -> SwarmResult<Agent> {
        let agent = self.registry.create(agent_type, config).await?;
        if let Err(error) = self.store.save_agent(&agent).await {
            warn!(agent_id = %agent.id, %error, "Failed to persist new agent");
        }
        Ok(agent)
    }

    /// Get a snapshot of one agent
    pub async fn get_agent(&self, id: AgentId) -> SwarmResult<Agent> {
        self.registry.get(id).await
    }

    /// Snapshot of every registered agent
    pub async fn list_agents(&self) -> Vec<Agent> {
        self.registry.list().await
    }

    /// Get a snapshot of one task
    ///
    /// This is the polling surface: execution outcomes are written onto
    /// the task, never returned from `submit_task`.
    pub async fn get_task(&self, id: TaskId) -> SwarmResult<Task> {
        self.board.get(id).await
    }

    /// Point-in-time statistics snapshot
    pub async fn stats(&self) -> CoordinatorStats {
        self.stats
            .snapshot(self.queue.len(), self.registry.active_count().await)
            .await
    }

    /// Health summary for external checks
    pub async fn health(&self) -> serde_json::Value {
        let stats = self.stats().await;
        json!({
            "running": self.is_running().await,
            "active_agents": stats.active_agents,
            "queue_length": stats.queue_length,
            "stats": stats,
        })
    }

    /// Run one health, rebalance, and scale cycle on demand
    ///
    /// The same sweeps the background loops run on their tickers, for
    /// callers that want coordination now rather than at the next tick.
    pub async fn coordinate(&self) -> SwarmResult<()> {
        let monitor = self.monitor();
        monitor.health_sweep().await;
        monitor.rebalance_sweep().await;
        monitor.autoscale_check().await;
        self.stats.touch().await;
        Ok(())
    }
}
