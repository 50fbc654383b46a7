//! Coordinator statistics
//!
//! Counters live behind their own lock, independent from the agent and
//! task locks, so readers see eventually-consistent aggregates and must
//! tolerate brief staleness. `queue_length` and `active_agents` are not
//! stored at all; they are computed live when a snapshot is taken.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Point-in-time aggregate view of the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorStats {
    /// Number of active agents (live at snapshot time)
    pub active_agents: usize,
    /// Tasks accepted onto the queue since startup
    pub total_tasks: u64,
    /// Tasks that reached `Completed`
    pub completed_tasks: u64,
    /// Tasks that reached `Failed` (no agent found, or execution failed)
    pub failed_tasks: u64,
    /// Tasks currently sitting on the queue (live at snapshot time)
    pub queue_length: usize,
    /// Running average of task processing time in milliseconds
    pub avg_task_time_ms: f64,
    /// Last time the engine did anything noteworthy
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug)]
struct Counters {
    total_tasks: u64,
    completed_tasks: u64,
    failed_tasks: u64,
    avg_task_time_ms: f64,
    last_activity: DateTime<Utc>,
}

/// Aggregates counters from the dispatcher and monitors
pub struct StatsCollector {
    counters: RwLock<Counters>,
}

impl StatsCollector {
    /// Create a collector with zeroed counters
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(Counters {
                total_tasks: 0,
                completed_tasks: 0,
                failed_tasks: 0,
                avg_task_time_ms: 0.0,
                last_activity: Utc::now(),
            }),
        }
    }

    /// Record a task accepted onto the queue
    pub async fn record_submitted(&self) {
        let mut counters = self.counters.write().await;
        counters.total_tasks += 1;
        counters.last_activity = Utc::now();
    }

    /// Record a completed task and fold in its processing time
    pub async fn record_completed(&self, processing_time_ms: f64) {
        let mut counters = self.counters.write().await;
        counters.completed_tasks += 1;
        counters.avg_task_time_ms = if counters.avg_task_time_ms == 0.0 {
            processing_time_ms
        } else {
            (counters.avg_task_time_ms + processing_time_ms) / 2.0
        };
        counters.last_activity = Utc::now();
    }

    /// Record a failed task (no agent found, or execution failed)
    pub async fn record_failed(&self) {
        let mut counters = self.counters.write().await;
        counters.failed_tasks += 1;
        counters.last_activity = Utc::now();
    }

    /// Refresh the activity timestamp without touching any counter
    pub async fn touch(&self) {
        self.counters.write().await.last_activity = Utc::now();
    }

    /// Take a snapshot, merging in the live queue length and agent count
    pub async fn snapshot(&self, queue_length: usize, active_agents: usize) -> CoordinatorStats {
        let counters = self.counters.read().await;
        CoordinatorStats {
            active_agents,
            total_tasks: counters.total_tasks,
            completed_tasks: counters.completed_tasks,
            failed_tasks: counters.failed_tasks,
            queue_length,
            avg_task_time_ms: counters.avg_task_time_ms,
            last_activity: counters.last_activity,
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}
