//! Agent registry
//!
//! The registry owns every agent in the pool behind a single read-write
//! lock. All reads hand out snapshots; all writes flow through the methods
//! here, never through shared references. `claim_for_task` and `release`
//! are the only two places `current_task` is set or cleared, which is what
//! guarantees that no agent ever runs two tasks at once.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::types::{Agent, AgentId, AgentStatus};
use crate::error::{CoordinatorError, SwarmResult};
use crate::scoring;
use crate::task::{Task, TaskId};

/// Multiplier above the average task count that marks an agent overloaded.
const OVERLOAD_FACTOR: f64 = 1.5;

/// Multiplier below the average task count that marks an agent underloaded.
const UNDERLOAD_FACTOR: f64 = 0.5;

/// Owns the set of known agents
pub struct AgentRegistry {
    agents: RwLock<HashMap<AgentId, Agent>>,
    max_agents: usize,
}

impl AgentRegistry {
    /// Create an empty registry with the given pool ceiling
    pub fn new(max_agents: usize) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            max_agents,
        }
    }

    /// Create and register a new active agent
    ///
    /// Fails with `MaxAgentsReached` once the pool is at its ceiling.
    pub async fn create(
        &self,
        agent_type: impl Into<String>,
        config: HashMap<String, serde_json::Value>,
    ) -> SwarmResult<Agent> {
        let mut agents = self.agents.write().await;
        if agents.len() >= self.max_agents {
            return Err(CoordinatorError::MaxAgentsReached {
                limit: self.max_agents,
            });
        }

        let agent = Agent::new(agent_type, config);
        info!(agent_id = %agent.id, agent_type = %agent.agent_type, "Created new agent");
        agents.insert(agent.id, agent.clone());
        Ok(agent)
    }

    /// Insert previously persisted agents, e.g. at startup
    ///
    /// Bypasses the ceiling check: agents that already existed are adopted
    /// as-is rather than rejected.
    pub async fn adopt(&self, loaded: Vec<Agent>) {
        let mut agents = self.agents.write().await;
        for agent in loaded {
            agents.insert(agent.id, agent);
        }
    }

    /// Get a snapshot of an agent
    pub async fn get(&self, id: AgentId) -> SwarmResult<Agent> {
        self.agents
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(CoordinatorError::AgentNotFound(id))
    }

    /// Snapshot of every agent
    pub async fn list(&self) -> Vec<Agent> {
        self.agents.read().await.values().cloned().collect()
    }

    /// Total number of agents, active or not
    pub async fn count(&self) -> usize {
        self.agents.read().await.len()
    }

    /// Number of active agents
    pub async fn active_count(&self) -> usize {
        self.agents
            .read()
            .await
            .values()
            .filter(|a| a.status == AgentStatus::Active)
            .count()
    }

    /// Apply a mutation to one agent under the write lock
    ///
    /// This is the generic mutation gate used by the monitors and by
    /// administrative callers. Returns a snapshot of the mutated agent.
    pub async fn update<F>(&self, id: AgentId, mutate: F) -> SwarmResult<Agent>
    where
        F: FnOnce(&mut Agent),
    {
        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(&id)
            .ok_or(CoordinatorError::AgentNotFound(id))?;
        mutate(agent);
        Ok(agent.clone())
    }

    /// Score all available agents against a task and claim the best one
    ///
    /// Selection and claim happen under one write lock, so two workers can
    /// never claim the same agent. The claimed agent has `current_task`
    /// set, `task_count` bumped (before the outcome is known), and
    /// `last_active` refreshed. Returns `None` when no agent is available.
    pub async fn claim_for_task(&self, task: &Task, now: DateTime<Utc>) -> Option<Agent> {
        let mut agents = self.agents.write().await;

        let best_id = scoring::select_best(agents.values(), task, now).map(|a| a.id)?;

        // select_best only returns agents present in the map
        let agent = agents.get_mut(&best_id)?;
        agent.current_task = Some(task.id);
        agent.task_count += 1;
        agent.last_active = now;

        debug!(
            agent_id = %agent.id,
            task_id = %task.id,
            task_type = %task.task_type,
            "Claimed agent for task"
        );
        Some(agent.clone())
    }

    /// Release an agent after its task finished and fold in the outcome
    ///
    /// Clears `current_task`, applies the success-rate delta, and updates
    /// the running response-time average.
    pub async fn release(
        &self,
        id: AgentId,
        task_id: TaskId,
        success: bool,
        response_time_ms: f64,
    ) -> SwarmResult<Agent> {
        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(&id)
            .ok_or(CoordinatorError::AgentNotFound(id))?;

        if agent.current_task != Some(task_id) {
            warn!(
                agent_id = %id,
                task_id = %task_id,
                "Releasing agent that was not executing this task"
            );
        }
        agent.current_task = None;
        agent.last_active = Utc::now();
        agent.record_outcome(success);
        agent.record_response_time(response_time_ms);
        Ok(agent.clone())
    }

    /// Flip active agents that have been idle too long to inactive
    ///
    /// Returns snapshots of the agents that were deactivated. There is no
    /// automatic reactivation path.
    pub async fn deactivate_stale(&self, stale_after: Duration, now: DateTime<Utc>) -> Vec<Agent> {
        let mut agents = self.agents.write().await;
        let mut deactivated = Vec::new();

        for agent in agents.values_mut() {
            if agent.status == AgentStatus::Active && now - agent.last_active > stale_after {
                agent.status = AgentStatus::Inactive;
                warn!(agent_id = %agent.id, "Agent marked inactive due to inactivity");
                deactivated.push(agent.clone());
            }
        }
        deactivated
    }

    /// Smooth task-count imbalance across active agents
    ///
    /// Classifies active agents as overloaded (above 1.5x the average task
    /// count) or underloaded (below 0.5x), pairs them up, and shifts one
    /// count per pair where the gap exceeds 1. This adjusts the load signal
    /// only; no task changes hands and `assigned_to` is never touched.
    /// Returns the adjusted (from, to) snapshot pairs.
    pub async fn rebalance_task_counts(&self) -> Vec<(Agent, Agent)> {
        let mut agents = self.agents.write().await;

        let active: Vec<AgentId> = agents
            .values()
            .filter(|a| a.status == AgentStatus::Active)
            .map(|a| a.id)
            .collect();
        if active.len() < 2 {
            return Vec::new();
        }

        let total: u32 = active
            .iter()
            .filter_map(|id| agents.get(id))
            .map(|a| a.task_count)
            .sum();
        let avg = f64::from(total) / active.len() as f64;

        let mut overloaded = Vec::new();
        let mut underloaded = Vec::new();
        for id in &active {
            let Some(agent) = agents.get(id) else { continue };
            let count = f64::from(agent.task_count);
            if count > avg * OVERLOAD_FACTOR {
                overloaded.push(*id);
            } else if count < avg * UNDERLOAD_FACTOR {
                underloaded.push(*id);
            }
        }

        let mut adjusted = Vec::new();
        for (from_id, to_id) in overloaded.into_iter().zip(underloaded) {
            let from_count = agents.get(&from_id).map(|a| a.task_count).unwrap_or(0);
            let to_count = agents.get(&to_id).map(|a| a.task_count).unwrap_or(0);
            if from_count <= to_count + 1 {
                continue;
            }

            let from = match agents.get_mut(&from_id) {
                Some(from) => {
                    from.task_count = from.task_count.saturating_sub(1);
                    from.clone()
                }
                None => continue,
            };
            let to = match agents.get_mut(&to_id) {
                Some(to) => {
                    to.task_count += 1;
                    to.clone()
                }
                None => continue,
            };

            debug!(
                from_agent = %from.id,
                to_agent = %to.id,
                from_count = from.task_count,
                to_count = to.task_count,
                "Rebalanced task counts between agents"
            );
            adjusted.push((from, to));
        }
        adjusted
    }

    /// Mark every agent inactive (used during shutdown)
    ///
    /// Returns snapshots so the caller can persist the flips.
    pub async fn deactivate_all(&self) -> Vec<Agent> {
        let mut agents = self.agents.write().await;
        for agent in agents.values_mut() {
            agent.status = AgentStatus::Inactive;
        }
        agents.values().cloned().collect()
    }
}
