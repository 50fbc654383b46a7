//! Coordinator configuration

use std::time::Duration;

/// Default number of worker tasks draining the queue.
const DEFAULT_WORKER_COUNT: usize = 4;

/// Default bounded queue capacity.
const DEFAULT_QUEUE_SIZE: usize = 100;

/// Default ceiling on the agent pool.
const DEFAULT_MAX_AGENTS: usize = 10;

/// Default interval between health sweeps.
const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(30);

/// Default interval between rebalance/autoscale/pending-scan ticks.
const DEFAULT_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(5);

/// Default inactivity window after which an agent is marked stale.
const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(5 * 60);

/// Configuration for the [`Coordinator`](crate::coordinator::Coordinator)
///
/// Intervals only affect the periodic loops; every sweep is also callable
/// on demand through `Coordinator::coordinate`.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Number of worker tasks pulling from the queue.
    pub worker_count: usize,
    /// Capacity of the bounded task queue. Submissions beyond this fail
    /// fast with `QueueFull`.
    pub queue_size: usize,
    /// Maximum number of agents the registry will hold.
    pub max_agents: usize,
    /// How often the health monitor sweeps for stale agents.
    pub health_interval: Duration,
    /// How often the rebalancer, autoscaler, and pending-task scan run.
    pub maintenance_interval: Duration,
    /// Inactivity window after which an active agent is flipped inactive.
    pub stale_after: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            queue_size: DEFAULT_QUEUE_SIZE,
            max_agents: DEFAULT_MAX_AGENTS,
            health_interval: DEFAULT_HEALTH_INTERVAL,
            maintenance_interval: DEFAULT_MAINTENANCE_INTERVAL,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }
}

impl CoordinatorConfig {
    /// Create a configuration with the default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count.
    #[must_use]
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the queue capacity.
    #[must_use]
    pub fn with_queue_size(mut self, size: usize) -> Self {
        self.queue_size = size;
        self
    }

    /// Set the agent-pool ceiling.
    #[must_use]
    pub fn with_max_agents(mut self, max: usize) -> Self {
        self.max_agents = max;
        self
    }

    /// Set the health sweep interval.
    #[must_use]
    pub fn with_health_interval(mut self, interval: Duration) -> Self {
        self.health_interval = interval;
        self
    }

    /// Set the maintenance tick interval.
    #[must_use]
    pub fn with_maintenance_interval(mut self, interval: Duration) -> Self {
        self.maintenance_interval = interval;
        self
    }

    /// Set the staleness window for the health monitor.
    #[must_use]
    pub fn with_stale_after(mut self, window: Duration) -> Self {
        self.stale_after = window;
        self
    }
}
