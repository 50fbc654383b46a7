//! Task types and the task board
//!
//! Tasks move strictly forward through their lifecycle:
//! `Pending → Queued → Assigned → InProgress → Completed | Failed`
//! (a task that never finds an agent jumps straight to `Failed`).
//! The [`TaskBoard`] is the only writer of task state and refuses
//! backward transitions, so the monotonic-status invariant holds
//! structurally rather than by caller discipline.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::agent::AgentId;
use crate::error::{CoordinatorError, SwarmResult};

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Create a new random task ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not yet submitted to the queue
    Pending,
    /// Sitting on the bounded queue, waiting for a worker
    Queued,
    /// A worker has claimed an agent for it
    Assigned,
    /// The agent is executing it
    InProgress,
    /// Terminal: execution succeeded, `result` is populated
    Completed,
    /// Terminal: no agent was found or execution failed, `error` is populated
    Failed,
}

impl TaskStatus {
    /// Position in the forward-only lifecycle. Both terminal states share
    /// the highest rank; nothing transitions out of them.
    fn rank(self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Queued => 1,
            TaskStatus::Assigned => 2,
            TaskStatus::InProgress => 3,
            TaskStatus::Completed | TaskStatus::Failed => 4,
        }
    }

    /// Whether this status ends the lifecycle
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// A unit of work for an agent to execute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,
    /// Category string used for agent matching (e.g. "coding", "research")
    pub task_type: String,
    /// Urgency/complexity, 1–4 (higher = more urgent)
    pub priority: u8,
    /// Opaque payload; never inspected by the scheduler
    pub payload: serde_json::Value,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// When a worker began executing it
    pub started_at: Option<DateTime<Utc>>,
    /// When it reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,
    /// The agent it was assigned to; set once, never changed
    pub assigned_to: Option<AgentId>,
    /// Lifecycle status
    pub status: TaskStatus,
    /// Success payload; populated iff `status == Completed`
    pub result: Option<serde_json::Value>,
    /// Failure reason; populated iff `status == Failed`
    pub error: Option<String>,
}

impl Task {
    /// Create a new pending task. Priority is clamped to 1–4.
    pub fn new(task_type: impl Into<String>, priority: u8, payload: serde_json::Value) -> Self {
        Self {
            id: TaskId::new(),
            task_type: task_type.into(),
            priority: priority.clamp(1, 4),
            payload,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            assigned_to: None,
            status: TaskStatus::Pending,
            result: None,
            error: None,
        }
    }
}

/// Tracks every task the coordinator has accepted
///
/// The board owns the canonical task state; callers poll it through
/// snapshot reads. All writes go through the transition methods below,
/// which silently drop any attempt to move a task backward.
pub struct TaskBoard {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl TaskBoard {
    /// Create an empty board
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace a task
    pub async fn insert(&self, task: Task) {
        self.tasks.write().await.insert(task.id, task);
    }

    /// Remove a task, returning it if present
    ///
    /// Used to untrack a task whose submission was rejected by the queue.
    pub async fn remove(&self, id: TaskId) -> Option<Task> {
        self.tasks.write().await.remove(&id)
    }

    /// Get a snapshot of a task
    pub async fn get(&self, id: TaskId) -> SwarmResult<Task> {
        self.tasks
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(CoordinatorError::TaskNotFound(id))
    }

    /// Number of tracked tasks
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Whether the board is empty
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Mark a task queued (accepted onto the bounded queue)
    pub async fn mark_queued(&self, id: TaskId) -> SwarmResult<()> {
        self.advance(id, TaskStatus::Queued, |_| {}).await
    }

    /// Mark a task assigned to an agent
    pub async fn mark_assigned(&self, id: TaskId, agent_id: AgentId) -> SwarmResult<()> {
        self.advance(id, TaskStatus::Assigned, |task| {
            task.assigned_to = Some(agent_id);
        })
        .await
    }

    /// Mark a task in progress
    pub async fn mark_in_progress(&self, id: TaskId) -> SwarmResult<()> {
        self.advance(id, TaskStatus::InProgress, |task| {
            task.started_at = Some(Utc::now());
        })
        .await
    }

    /// Mark a task completed with its success payload
    pub async fn complete(&self, id: TaskId, result: serde_json::Value) -> SwarmResult<()> {
        self.advance(id, TaskStatus::Completed, |task| {
            task.completed_at = Some(Utc::now());
            task.result = Some(result);
        })
        .await
    }

    /// Mark a task failed with a human-readable reason
    pub async fn fail(&self, id: TaskId, reason: impl Into<String>) -> SwarmResult<()> {
        self.advance(id, TaskStatus::Failed, |task| {
            task.completed_at = Some(Utc::now());
            task.error = Some(reason.into());
        })
        .await
    }

    /// Apply a forward transition. Backward or lateral moves are dropped
    /// with a warning; the stored status is never reverted.
    async fn advance<F>(&self, id: TaskId, target: TaskStatus, apply: F) -> SwarmResult<()>
    where
        F: FnOnce(&mut Task),
    {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(&id)
            .ok_or(CoordinatorError::TaskNotFound(id))?;

        if target.rank() <= task.status.rank() {
            warn!(
                task_id = %id,
                from = ?task.status,
                to = ?target,
                "Refusing backward task transition"
            );
            return Ok(());
        }

        task.status = target;
        apply(task);
        Ok(())
    }
}

impl Default for TaskBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pending_task() -> Task {
        Task::new("coding", 2, json!({"title": "write parser"}))
    }

    // ==================== Task Tests ====================

    #[test]
    fn new_task_is_pending() {
        let task = pending_task();

        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.assigned_to.is_none());
        assert!(task.result.is_none());
        assert!(task.error.is_none());
    }

    #[test]
    fn priority_is_clamped_to_valid_range() {
        assert_eq!(Task::new("x", 0, json!(null)).priority, 1);
        assert_eq!(Task::new("x", 9, json!(null)).priority, 4);
        assert_eq!(Task::new("x", 3, json!(null)).priority, 3);
    }

    #[test]
    fn task_ids_are_unique() {
        assert_ne!(pending_task().id, pending_task().id);
    }

    #[test]
    fn terminal_statuses_are_terminal() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
    }

    // ==================== Transition Tests ====================

    #[tokio::test]
    async fn board_advances_through_full_lifecycle() {
        let board = TaskBoard::new();
        let task = pending_task();
        let id = task.id;
        let agent_id = AgentId::new();
        board.insert(task).await;

        board.mark_queued(id).await.unwrap();
        assert_eq!(board.get(id).await.unwrap().status, TaskStatus::Queued);

        board.mark_assigned(id, agent_id).await.unwrap();
        let snapshot = board.get(id).await.unwrap();
        assert_eq!(snapshot.status, TaskStatus::Assigned);
        assert_eq!(snapshot.assigned_to, Some(agent_id));

        board.mark_in_progress(id).await.unwrap();
        assert!(board.get(id).await.unwrap().started_at.is_some());

        board.complete(id, json!({"ok": true})).await.unwrap();
        let done = board.get(id).await.unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.completed_at.is_some());
        assert!(done.result.is_some());
        assert!(done.error.is_none());
    }

    #[tokio::test]
    async fn board_refuses_backward_transition() {
        let board = TaskBoard::new();
        let task = pending_task();
        let id = task.id;
        board.insert(task).await;

        board.mark_queued(id).await.unwrap();
        board.fail(id, "no suitable agent").await.unwrap();

        // Attempting to move a terminal task forward or backward is a no-op
        board.mark_in_progress(id).await.unwrap();
        board.complete(id, json!({})).await.unwrap();

        let snapshot = board.get(id).await.unwrap();
        assert_eq!(snapshot.status, TaskStatus::Failed);
        assert!(snapshot.result.is_none());
        assert_eq!(snapshot.error.as_deref(), Some("no suitable agent"));
    }

    #[tokio::test]
    async fn failed_task_can_skip_assignment() {
        let board = TaskBoard::new();
        let task = pending_task();
        let id = task.id;
        board.insert(task).await;

        board.mark_queued(id).await.unwrap();
        board.fail(id, "NoSuitableAgent").await.unwrap();

        let snapshot = board.get(id).await.unwrap();
        assert_eq!(snapshot.status, TaskStatus::Failed);
        assert!(snapshot.assigned_to.is_none());
    }

    #[tokio::test]
    async fn get_unknown_task_returns_error() {
        let board = TaskBoard::new();

        let result = board.get(TaskId::new()).await;

        assert!(matches!(result, Err(CoordinatorError::TaskNotFound(_))));
    }
}
