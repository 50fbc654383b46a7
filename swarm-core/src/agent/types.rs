//! Agent type definitions

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::TaskId;

/// Success rate assigned to a freshly created agent. Neutral: the scoring
/// function neither favors nor penalizes an agent with no history.
pub const INITIAL_SUCCESS_RATE: f64 = 0.5;

/// Success-rate bump applied after a successful execution.
pub const SUCCESS_RATE_REWARD: f64 = 0.05;

/// Success-rate penalty applied after a failed execution.
pub const SUCCESS_RATE_PENALTY: f64 = 0.02;

/// Unique identifier for an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    /// Create a new random agent ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Agent lifecycle status
///
/// `Active → Inactive` happens via the health monitor or shutdown.
/// There is no automatic path back to `Active`; reactivation is an
/// administrative action performed through the registry's mutation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Eligible for task assignment
    Active,
    /// Not eligible; stale or shut down
    Inactive,
}

/// A stateful worker unit the scheduler assigns tasks to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique identifier
    pub id: AgentId,
    /// Category string used for task matching (e.g. "coder", "researcher")
    pub agent_type: String,
    /// Lifecycle status
    pub status: AgentStatus,
    /// Opaque configuration, owned by the agent, never inspected here
    pub config: HashMap<String, serde_json::Value>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last time the agent was touched by scheduling
    pub last_active: DateTime<Utc>,
    /// Load signal: how many tasks this agent has been handed. Adjusted by
    /// the rebalancer, so it is a smoothed counter rather than an exact
    /// history.
    pub task_count: u32,
    /// Running success rate, always within [0.0, 1.0]
    pub success_rate: f64,
    /// Exponential running average of response time in milliseconds
    pub avg_response_time_ms: f64,
    /// The task currently executing on this agent, if any.
    /// Invariant: at most one task per agent at any time.
    pub current_task: Option<TaskId>,
}

impl Agent {
    /// Create a new active agent
    pub fn new(agent_type: impl Into<String>, config: HashMap<String, serde_json::Value>) -> Self {
        let now = Utc::now();
        Self {
            id: AgentId::new(),
            agent_type: agent_type.into(),
            status: AgentStatus::Active,
            config,
            created_at: now,
            last_active: now,
            task_count: 0,
            success_rate: INITIAL_SUCCESS_RATE,
            avg_response_time_ms: 0.0,
            current_task: None,
        }
    }

    /// Whether the agent can be handed a task right now
    pub fn is_available(&self) -> bool {
        self.status == AgentStatus::Active && self.current_task.is_none()
    }

    /// Fold an execution outcome into the running success rate, clamped
    /// to [0.0, 1.0]
    pub fn record_outcome(&mut self, success: bool) {
        if success {
            self.success_rate = (self.success_rate + SUCCESS_RATE_REWARD).min(1.0);
        } else {
            self.success_rate = (self.success_rate - SUCCESS_RATE_PENALTY).max(0.0);
        }
    }

    /// Fold a response time into the running average: `(old + new) / 2`,
    /// or just `new` for the first observation
    pub fn record_response_time(&mut self, millis: f64) {
        if self.avg_response_time_ms == 0.0 {
            self.avg_response_time_ms = millis;
        } else {
            self.avg_response_time_ms = (self.avg_response_time_ms + millis) / 2.0;
        }
    }
}
