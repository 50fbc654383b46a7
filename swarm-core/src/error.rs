//! Error types for swarm-core

use thiserror::Error;

use crate::agent::AgentId;
use crate::task::TaskId;

/// Result alias used throughout the engine
pub type SwarmResult<T> = Result<T, CoordinatorError>;

/// Errors surfaced synchronously by the coordination engine
///
/// Execution-time outcomes (a task succeeding or failing inside an agent)
/// are never errors — they are state written onto the [`Task`](crate::task::Task)
/// and read back by polling. Only scheduling-time conditions appear here.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// The bounded task queue is full. This is the engine's backpressure
    /// signal: the caller should back off and retry, not treat it as fatal.
    #[error("task queue is full")]
    QueueFull,

    /// The configured agent ceiling has been reached
    #[error("maximum agent count reached ({limit})")]
    MaxAgentsReached { limit: usize },

    /// No agent with the given ID is registered
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// No task with the given ID is tracked
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The coordinator has already been started
    ///
    /// The engine is single-shot: `start` may succeed at most once.
    #[error("coordinator is already running")]
    AlreadyRunning,

    /// A persistence operation failed
    ///
    /// Raised by [`CoordinationStore`](crate::store::CoordinationStore)
    /// implementations. The engine logs and swallows these at every call
    /// site; in-memory state is never rolled back because of a failed write.
    #[error("store error: {0}")]
    Store(String),
}
