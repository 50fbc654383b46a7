//! Persistence port
//!
//! The coordinator owns the canonical agent and task state in memory; a
//! [`CoordinationStore`] only ever holds copies. Every call is best-effort
//! at the engine's call sites: failures are logged and swallowed, and
//! in-memory state is never rolled back because of a failed write-through.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::agent::{Agent, AgentId};
use crate::error::SwarmResult;
use crate::task::{Task, TaskId, TaskStatus};

/// Write-through persistence for agents and tasks
///
/// Implementations should be cheap to call from hot paths; anything slow
/// belongs behind the implementation's own buffering.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Persist a newly created agent
    async fn save_agent(&self, agent: &Agent) -> SwarmResult<()>;

    /// Persist updated agent state
    async fn update_agent(&self, agent: &Agent) -> SwarmResult<()>;

    /// Load previously known agents (any status) at startup
    async fn load_agents(&self) -> SwarmResult<Vec<Agent>>;

    /// Persist updated task state
    async fn update_task(&self, task: &Task) -> SwarmResult<()>;

    /// Load tasks still pending submission, ordered by priority
    /// descending then creation time ascending
    async fn load_pending_tasks(&self) -> SwarmResult<Vec<Task>>;
}

/// Store that discards everything (the default)
pub struct NullStore;

#[async_trait]
impl CoordinationStore for NullStore {
    async fn save_agent(&self, _agent: &Agent) -> SwarmResult<()> {
        Ok(())
    }

    async fn update_agent(&self, _agent: &Agent) -> SwarmResult<()> {
        Ok(())
    }

    async fn load_agents(&self) -> SwarmResult<Vec<Agent>> {
        Ok(Vec::new())
    }

    async fn update_task(&self, _task: &Task) -> SwarmResult<()> {
        Ok(())
    }

    async fn load_pending_tasks(&self) -> SwarmResult<Vec<Task>> {
        Ok(Vec::new())
    }
}

/// In-memory store for tests and single-process embedding
pub struct MemoryStore {
    agents: RwLock<HashMap<AgentId, Agent>>,
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Seed a task, e.g. a pending task awaiting pickup by the
    /// maintenance scan
    pub async fn insert_task(&self, task: Task) {
        self.tasks.write().await.insert(task.id, task);
    }

    /// Read back a persisted task copy
    pub async fn task(&self, id: TaskId) -> Option<Task> {
        self.tasks.read().await.get(&id).cloned()
    }

    /// Read back a persisted agent copy
    pub async fn agent(&self, id: AgentId) -> Option<Agent> {
        self.agents.read().await.get(&id).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinationStore for MemoryStore {
    async fn save_agent(&self, agent: &Agent) -> SwarmResult<()> {
        self.agents.write().await.insert(agent.id, agent.clone());
        Ok(())
    }

    async fn update_agent(&self, agent: &Agent) -> SwarmResult<()> {
        self.agents.write().await.insert(agent.id, agent.clone());
        Ok(())
    }

    async fn load_agents(&self) -> SwarmResult<Vec<Agent>> {
        Ok(self.agents.read().await.values().cloned().collect())
    }

    async fn update_task(&self, task: &Task) -> SwarmResult<()> {
        self.tasks.write().await.insert(task.id, task.clone());
        Ok(())
    }

    async fn load_pending_tasks(&self) -> SwarmResult<Vec<Task>> {
        let mut pending: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.status == TaskStatus::Pending)
            .cloned()
            .collect();

        pending.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_store_round_trips_agents() {
        let store = MemoryStore::new();
        let agent = Agent::new("coder", HashMap::new());

        store.save_agent(&agent).await.unwrap();

        let loaded = store.load_agents().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, agent.id);
    }

    #[tokio::test]
    async fn update_agent_overwrites_previous_copy() {
        let store = MemoryStore::new();
        let mut agent = Agent::new("coder", HashMap::new());
        store.save_agent(&agent).await.unwrap();

        agent.task_count = 5;
        store.update_agent(&agent).await.unwrap();

        assert_eq!(store.agent(agent.id).await.unwrap().task_count, 5);
    }

    #[tokio::test]
    async fn pending_tasks_are_ordered_by_priority_then_age() {
        let store = MemoryStore::new();

        let old_low = Task::new("a", 1, json!({}));
        let mut old_high = Task::new("b", 4, json!({}));
        let mut new_high = Task::new("c", 4, json!({}));
        // Make the ordering unambiguous
        old_high.created_at = old_low.created_at + chrono::Duration::seconds(1);
        new_high.created_at = old_low.created_at + chrono::Duration::seconds(2);

        store.insert_task(new_high.clone()).await;
        store.insert_task(old_low.clone()).await;
        store.insert_task(old_high.clone()).await;

        let pending = store.load_pending_tasks().await.unwrap();

        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0].id, old_high.id);
        assert_eq!(pending[1].id, new_high.id);
        assert_eq!(pending[2].id, old_low.id);
    }

    #[tokio::test]
    async fn non_pending_tasks_are_not_loaded() {
        let store = MemoryStore::new();
        let mut task = Task::new("a", 2, json!({}));
        task.status = TaskStatus::Queued;
        store.insert_task(task).await;

        assert!(store.load_pending_tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn null_store_accepts_and_forgets() {
        let store = NullStore;
        let agent = Agent::new("coder", HashMap::new());

        store.save_agent(&agent).await.unwrap();

        assert!(store.load_agents().await.unwrap().is_empty());
    }
}
