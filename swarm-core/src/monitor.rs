//! Background maintenance
//!
//! Two periodic loops run alongside the worker pool. The health loop
//! sweeps for stale agents on a slow cadence. The maintenance loop runs
//! faster and bundles three checks per tick: task-count rebalancing,
//! queue-pressure autoscaling, and a scan of the store for pending tasks
//! that were persisted but never queued.
//!
//! Every sweep is also a plain method so callers can trigger one cycle on
//! demand without waiting for a ticker.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::AgentRegistry;
use crate::dispatcher::{self, TaskQueue};
use crate::error::CoordinatorError;
use crate::stats::StatsCollector;
use crate::store::CoordinationStore;
use crate::task::TaskBoard;

/// Agent type given to pool members created under queue pressure.
pub const AUTO_SCALER_AGENT_TYPE: &str = "auto-scaler";

/// Runs the periodic health and maintenance sweeps
pub(crate) struct Monitor {
    pub registry: Arc<AgentRegistry>,
    pub board: Arc<TaskBoard>,
    pub stats: Arc<StatsCollector>,
    pub store: Arc<dyn CoordinationStore>,
    pub queue: TaskQueue,
    pub max_agents: usize,
    pub stale_after: Duration,
}

impl Monitor {
    /// Flip agents that have been idle past the staleness window
    pub async fn health_sweep(&self) {
        let stale_after = chrono::Duration::from_std(self.stale_after)
            .unwrap_or(chrono::Duration::MAX);
        let deactivated = self.registry.deactivate_stale(stale_after, Utc::now()).await;

        for agent in &deactivated {
            if let Err(error) = self.store.update_agent(agent).await {
                warn!(agent_id = %agent.id, %error, "Failed to persist agent deactivation");
            }
        }
        if !deactivated.is_empty() {
            self.stats.touch().await;
        }
    }

    /// Smooth task-count imbalance and persist the adjusted agents
    pub async fn rebalance_sweep(&self) {
        let adjusted = self.registry.rebalance_task_counts().await;

        for (from, to) in &adjusted {
            for agent in [from, to] {
                if let Err(error) = self.store.update_agent(agent).await {
                    warn!(agent_id = %agent.id, %error, "Failed to persist rebalanced agent");
                }
            }
        }
        if !adjusted.is_empty() {
            self.stats.touch().await;
        }
    }

    /// Grow the pool by one agent when the queue is under pressure
    ///
    /// Pressure means the queue is more than half full. There is no
    /// scale-down path; idle surplus agents age out via the health sweep.
    pub async fn autoscale_check(&self) {
        let queue_length = self.queue.len();
        if queue_length <= self.queue.capacity() / 2 {
            return;
        }
        if self.registry.active_count().await >= self.max_agents {
            return;
        }

        let config = HashMap::from([("auto_created".to_string(), json!(true))]);
        match self.registry.create(AUTO_SCALER_AGENT_TYPE, config).await {
            Ok(agent) => {
                info!(
                    agent_id = %agent.id,
                    queue_length,
                    "Scaled up agent pool under queue pressure"
                );
                if let Err(error) = self.store.save_agent(&agent).await {
                    warn!(agent_id = %agent.id, %error, "Failed to persist autoscaled agent");
                }
            }
            // Inactive agents still occupy pool slots
            Err(CoordinatorError::MaxAgentsReached { limit }) => {
                debug!(limit, "Autoscale skipped, agent pool at ceiling");
            }
            Err(error) => {
                warn!(%error, "Autoscale failed to create agent");
            }
        }
    }

    /// Queue persisted tasks that are still pending
    ///
    /// The store returns them ordered by priority descending then age, so
    /// the scan stops at the first `QueueFull` rather than skipping ahead
    /// to lower-priority work.
    pub async fn pending_scan(&self) {
        let pending = match self.store.load_pending_tasks().await {
            Ok(pending) => pending,
            Err(error) => {
                warn!(%error, "Failed to load pending tasks");
                return;
            }
        };

        for task in pending {
            let id = task.id;
            match dispatcher::enqueue(&self.board, &self.queue, &self.stats, task).await {
                Ok(_) => {
                    debug!(task_id = %id, "Queued pending task from store");
                    if let Ok(queued) = self.board.get(id).await
                        && let Err(error) = self.store.update_task(&queued).await
                    {
                        warn!(task_id = %id, %error, "Failed to persist queued task");
                    }
                }
                Err(CoordinatorError::QueueFull) => break,
                Err(error) => {
                    warn!(task_id = %id, %error, "Failed to queue pending task");
                }
            }
        }
    }

    /// Spawn the health loop
    pub fn spawn_health_loop(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // skip the immediate first tick
            loop {
                tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => monitor.health_sweep().await,
                }
            }
            debug!("Health monitor stopped");
        })
    }

    /// Spawn the maintenance loop (rebalance, autoscale, pending scan)
    pub fn spawn_maintenance_loop(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        monitor.rebalance_sweep().await;
                        monitor.autoscale_check().await;
                        monitor.pending_scan().await;
                    }
                }
            }
            debug!("Maintenance monitor stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::task::{Task, TaskStatus};

    fn harness(
        queue_size: usize,
        max_agents: usize,
    ) -> (Monitor, Arc<MemoryStore>, tokio::sync::mpsc::Receiver<crate::task::TaskId>) {
        let store = Arc::new(MemoryStore::new());
        // The receiver is returned so the queue stays open for the test
        let (queue, rx) = TaskQueue::bounded(queue_size);
        let monitor = Monitor {
            registry: Arc::new(AgentRegistry::new(max_agents)),
            board: Arc::new(TaskBoard::new()),
            stats: Arc::new(StatsCollector::new()),
            store: Arc::clone(&store) as Arc<dyn CoordinationStore>,
            queue,
            max_agents,
            stale_after: Duration::from_secs(300),
        };
        (monitor, store, rx)
    }

    // ==================== Health Sweep Tests ====================

    #[tokio::test]
    async fn health_sweep_persists_deactivations() {
        let (monitor, store, _rx) = harness(10, 10);
        let agent = monitor
            .registry
            .create("coder", HashMap::new())
            .await
            .unwrap();
        monitor
            .registry
            .update(agent.id, |a| {
                a.last_active = Utc::now() - chrono::Duration::minutes(10);
            })
            .await
            .unwrap();

        monitor.health_sweep().await;

        assert_eq!(monitor.registry.active_count().await, 0);
        let persisted = store.agent(agent.id).await.unwrap();
        assert_eq!(persisted.status, crate::agent::AgentStatus::Inactive);
    }

    // ==================== Autoscale Tests ====================

    #[tokio::test]
    async fn autoscale_grows_pool_under_queue_pressure() {
        let (monitor, store, _rx) = harness(4, 10);
        for _ in 0..3 {
            monitor.queue.try_enqueue(crate::task::TaskId::new()).unwrap();
        }

        monitor.autoscale_check().await;

        let agents = monitor.registry.list().await;
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].agent_type, AUTO_SCALER_AGENT_TYPE);
        assert_eq!(agents[0].config["auto_created"], json!(true));
        assert!(store.agent(agents[0].id).await.is_some());
    }

    #[tokio::test]
    async fn autoscale_ignores_quiet_queue() {
        let (monitor, _store, _rx) = harness(4, 10);
        monitor.queue.try_enqueue(crate::task::TaskId::new()).unwrap();

        monitor.autoscale_check().await;

        assert_eq!(monitor.registry.count().await, 0);
    }

    #[tokio::test]
    async fn autoscale_respects_pool_ceiling() {
        let (monitor, _store, _rx) = harness(4, 1);
        monitor
            .registry
            .create("coder", HashMap::new())
            .await
            .unwrap();
        for _ in 0..3 {
            monitor.queue.try_enqueue(crate::task::TaskId::new()).unwrap();
        }

        monitor.autoscale_check().await;

        assert_eq!(monitor.registry.count().await, 1);
    }

    // ==================== Pending Scan Tests ====================

    #[tokio::test]
    async fn pending_scan_queues_persisted_tasks() {
        let (monitor, store, _rx) = harness(10, 10);
        let task = Task::new("coding", 3, json!({}));
        let id = task.id;
        store.insert_task(task).await;

        monitor.pending_scan().await;

        assert_eq!(
            monitor.board.get(id).await.unwrap().status,
            TaskStatus::Queued
        );
        // The store copy was advanced too, so the next tick skips it
        assert_eq!(store.task(id).await.unwrap().status, TaskStatus::Queued);
    }

    #[tokio::test]
    async fn pending_scan_stops_at_first_queue_full() {
        let (monitor, store, _rx) = harness(1, 10);
        let high = Task::new("coding", 4, json!({}));
        let mut low = Task::new("coding", 1, json!({}));
        low.created_at = high.created_at + chrono::Duration::seconds(1);
        let low_id = low.id;
        store.insert_task(high).await;
        store.insert_task(low).await;

        monitor.pending_scan().await;

        // Only the high-priority task fit; the rest stay pending in the store
        assert_eq!(monitor.board.len().await, 1);
        assert_eq!(store.task(low_id).await.unwrap().status, TaskStatus::Pending);
    }

    // ==================== Rebalance Sweep Tests ====================

    #[tokio::test]
    async fn rebalance_sweep_persists_adjusted_pair() {
        let (monitor, store, _rx) = harness(10, 10);
        let heavy = monitor
            .registry
            .create("coder", HashMap::new())
            .await
            .unwrap();
        let light = monitor
            .registry
            .create("coder", HashMap::new())
            .await
            .unwrap();
        monitor
            .registry
            .update(heavy.id, |a| a.task_count = 10)
            .await
            .unwrap();

        monitor.rebalance_sweep().await;

        assert_eq!(store.agent(heavy.id).await.unwrap().task_count, 9);
        assert_eq!(store.agent(light.id).await.unwrap().task_count, 1);
    }
}
