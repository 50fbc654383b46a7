//! swarm-core: Agent coordination and task scheduling engine
//!
//! This crate provides the building blocks for a multi-agent work
//! coordinator:
//!
//! - **Agent pool** - [`Agent`] and [`AgentRegistry`] for the bounded pool
//!   of stateful workers tasks are matched against
//! - **Task scheduling** - [`Task`], the bounded [`TaskQueue`], and a
//!   worker pool that scores agents and drives execution
//! - **Scoring** - [`scoring`] free functions implementing the multi-factor
//!   agent/task match
//! - **Execution simulation** - [`TaskExecutor`] and [`SimulatedExecutor`]
//!   for realistic duration and outcome modelling
//! - **Background upkeep** - health sweeps, task-count rebalancing, and
//!   queue-pressure autoscaling on periodic tickers
//! - **Persistence port** - [`CoordinationStore`] for best-effort
//!   write-through of agent and task state
//!
//! # Quick Start
//!
//! ```no_run
//! use swarm_core::{Coordinator, CoordinatorConfig, Task};
//! use serde_json::json;
//! use std::collections::HashMap;
//!
//! # async fn example() -> Result<(), swarm_core::CoordinatorError> {
//! let coordinator = Coordinator::new(CoordinatorConfig::default());
//! coordinator.start().await?;
//!
//! coordinator.create_agent("coder", HashMap::new()).await?;
//! let task_id = coordinator
//!     .submit_task(Task::new("coding", 2, json!({"title": "write parser"})))
//!     .await?;
//!
//! // Outcomes are polled, not pushed
//! let task = coordinator.get_task(task_id).await?;
//! println!("task status: {:?}", task.status);
//!
//! coordinator.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod monitor;
pub mod scoring;
pub mod stats;
pub mod store;
pub mod task;

// Re-export key types for convenience
pub use agent::{Agent, AgentId, AgentRegistry, AgentStatus};
pub use config::CoordinatorConfig;
pub use coordinator::Coordinator;
pub use dispatcher::TaskQueue;
pub use error::{CoordinatorError, SwarmResult};
pub use executor::{
    ExecutionReport, FixedSample, ProbabilitySource, RandomSource, SimulatedExecutor, TaskExecutor,
};
pub use stats::{CoordinatorStats, StatsCollector};
pub use store::{CoordinationStore, MemoryStore, NullStore};
pub use task::{Task, TaskBoard, TaskId, TaskStatus};
