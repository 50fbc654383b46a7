//! Task execution
//!
//! The engine does not run real work; it simulates execution so the
//! scheduling machinery around it can be exercised under realistic load.
//! [`TaskExecutor`] is the seam: the shipped [`SimulatedExecutor`] sleeps
//! for a duration derived from task and agent characteristics and samples
//! a success outcome, while tests can swap in an instant executor or pin
//! the outcome through [`ProbabilitySource`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use serde_json::json;
use tracing::debug;

use crate::agent::Agent;
use crate::scoring;
use crate::task::Task;

/// Baseline simulated execution time.
const BASE_DURATION: Duration = Duration::from_millis(50);

/// Success-probability bonus for an exact type match.
const EXACT_MATCH_BONUS: f64 = 0.2;

/// Success-probability bonus for a compatibility-table match.
const COMPATIBLE_MATCH_BONUS: f64 = 0.1;

/// Success-probability penalty when the types are unrelated.
const TYPE_MISMATCH_PENALTY: f64 = 0.2;

/// Per-priority-step penalty above priority 2.
const PRIORITY_PENALTY_STEP: f64 = 0.05;

/// Floor and ceiling for the sampled success probability. No task is ever
/// a guaranteed success or a guaranteed failure.
const MIN_SUCCESS_PROBABILITY: f64 = 0.1;
const MAX_SUCCESS_PROBABILITY: f64 = 0.95;

/// Outcome of executing a task on an agent
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// Whether the simulated execution succeeded
    pub success: bool,
    /// Wall-clock execution time in milliseconds
    pub response_time_ms: f64,
    /// Success payload; populated iff `success`
    pub result: Option<serde_json::Value>,
    /// Failure reason; populated iff `!success`
    pub error: Option<String>,
}

/// Source of uniform samples in [0, 1) used to decide task outcomes
///
/// Injected so tests can force a specific outcome instead of depending on
/// ambient randomness.
pub trait ProbabilitySource: Send + Sync {
    /// Draw one sample in [0, 1)
    fn sample(&self) -> f64;
}

/// Thread-local RNG-backed probability source (the default)
pub struct RandomSource;

impl ProbabilitySource for RandomSource {
    fn sample(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Probability source that always returns the same sample
///
/// `FixedSample(0.0)` forces every execution to succeed (every clamped
/// probability exceeds 0.0); `FixedSample(1.0)` forces failure.
pub struct FixedSample(pub f64);

impl ProbabilitySource for FixedSample {
    fn sample(&self) -> f64 {
        self.0
    }
}

/// Executes a task against an agent
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Run `task` on `agent` and report the outcome
    ///
    /// This is the only place a worker is allowed to block for a
    /// meaningful amount of time.
    async fn execute(&self, task: &Task, agent: &Agent) -> ExecutionReport;
}

/// The default executor: sleeps a computed duration, samples an outcome
pub struct SimulatedExecutor {
    base_duration: Duration,
    probability: Arc<dyn ProbabilitySource>,
}

impl SimulatedExecutor {
    /// Create a simulator with the default base duration and RNG
    pub fn new() -> Self {
        Self {
            base_duration: BASE_DURATION,
            probability: Arc::new(RandomSource),
        }
    }

    /// Set the baseline duration (use `Duration::ZERO` for instant tests)
    #[must_use]
    pub fn with_base_duration(mut self, base: Duration) -> Self {
        self.base_duration = base;
        self
    }

    /// Replace the probability source
    #[must_use]
    pub fn with_probability_source(mut self, source: Arc<dyn ProbabilitySource>) -> Self {
        self.probability = source;
        self
    }

    /// Simulated execution time: base x priority x experience x complexity
    ///
    /// Less experienced agents (lower success rate) take longer; so do
    /// higher-priority and more complex task types.
    fn execution_duration(&self, task: &Task, agent: &Agent) -> Duration {
        let priority_factor = f64::from(task.priority);
        let experience_factor = 2.0 - agent.success_rate;
        let complexity = scoring::complexity_factor(&task.task_type);

        self.base_duration
            .mul_f64(priority_factor * experience_factor * complexity)
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskExecutor for SimulatedExecutor {
    async fn execute(&self, task: &Task, agent: &Agent) -> ExecutionReport {
        let started = Instant::now();

        let duration = self.execution_duration(task, agent);
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
        let response_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        let probability = success_probability(task, agent);
        let success = self.probability.sample() < probability;

        debug!(
            task_id = %task.id,
            agent_id = %agent.id,
            probability,
            success,
            "Simulated task execution"
        );

        if success {
            ExecutionReport {
                success: true,
                response_time_ms,
                result: Some(json!({
                    "status": "success",
                    "data": success_summary(&task.task_type, &agent.agent_type),
                    "response_time_ms": response_time_ms,
                    "agent_type": agent.agent_type,
                })),
                error: None,
            }
        } else {
            ExecutionReport {
                success: false,
                response_time_ms,
                result: None,
                error: Some(failure_reason(&task.task_type, &agent.agent_type)),
            }
        }
    }
}

/// Probability that `agent` completes `task` successfully
///
/// Starts from the agent's success rate, adjusted for type affinity and
/// task priority, clamped to [0.1, 0.95].
pub fn success_probability(task: &Task, agent: &Agent) -> f64 {
    let mut probability = agent.success_rate;

    if agent.agent_type == task.task_type {
        probability += EXACT_MATCH_BONUS;
    } else if scoring::is_compatible(&agent.agent_type, &task.task_type) {
        probability += COMPATIBLE_MATCH_BONUS;
    } else {
        probability -= TYPE_MISMATCH_PENALTY;
    }

    // Higher-priority tasks are assumed harder
    probability -= (f64::from(task.priority) - 2.0) * PRIORITY_PENALTY_STEP;

    probability.clamp(MIN_SUCCESS_PROBABILITY, MAX_SUCCESS_PROBABILITY)
}

fn success_summary(task_type: &str, agent_type: &str) -> String {
    let summary = match task_type {
        "research" => "Research findings compiled with key insights and recommendations",
        "analysis" => "Data analysis completed with statistical findings and visualizations",
        "coding" => "Code implementation completed with unit tests and documentation",
        "development" => "Feature development completed with integration tests",
        "testing" => "Testing completed with test report and bug findings",
        "review" => "Code review completed with feedback and improvement suggestions",
        "optimization" => "Performance optimization completed with improvement metrics",
        "coordination" => "Task coordination completed with updated project timeline",
        "design" => "Design specifications completed with mockups and technical requirements",
        _ => return format!("Task of type '{task_type}' completed successfully by {agent_type} agent"),
    };
    format!("{summary} (executed by {agent_type} agent)")
}

fn failure_reason(task_type: &str, agent_type: &str) -> String {
    let reason = match task_type {
        "research" => "Research task failed due to insufficient data sources",
        "analysis" => "Analysis task failed due to data quality issues",
        "coding" => "Coding task failed due to compilation errors",
        "development" => "Development task failed due to dependency conflicts",
        "testing" => "Testing task failed due to environment setup issues",
        "review" => "Review task failed due to incomplete code submission",
        "optimization" => "Optimization task failed due to performance constraints",
        "coordination" => "Coordination task failed due to communication issues",
        "design" => "Design task failed due to unclear requirements",
        _ => return format!("Task of type '{task_type}' failed during execution by {agent_type} agent"),
    };
    format!("{reason} (attempted by {agent_type} agent)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn agent(agent_type: &str) -> Agent {
        Agent::new(agent_type, HashMap::new())
    }

    fn task(task_type: &str, priority: u8) -> Task {
        Task::new(task_type, priority, json!({}))
    }

    fn instant_executor(sample: f64) -> SimulatedExecutor {
        SimulatedExecutor::new()
            .with_base_duration(Duration::ZERO)
            .with_probability_source(Arc::new(FixedSample(sample)))
    }

    // ==================== Probability Tests ====================

    #[test]
    fn exact_match_raises_probability() {
        let t = task("coding", 2);
        let exact = agent("coding");
        let unrelated = agent("barista");

        assert!(success_probability(&t, &exact) > success_probability(&t, &unrelated));
    }

    #[test]
    fn probability_is_clamped_to_valid_range() {
        let mut hopeless = agent("barista");
        hopeless.success_rate = 0.0;
        let hard = task("coding", 4);
        assert_eq!(success_probability(&hard, &hopeless), 0.1);

        let mut perfect = agent("coding");
        perfect.success_rate = 1.0;
        let easy = task("coding", 1);
        assert_eq!(success_probability(&easy, &perfect), 0.95);
    }

    #[test]
    fn higher_priority_lowers_probability() {
        let a = agent("coder");

        let routine = success_probability(&task("coding", 1), &a);
        let urgent = success_probability(&task("coding", 4), &a);

        assert!(urgent < routine);
    }

    // ==================== Duration Tests ====================

    #[test]
    fn duration_scales_with_priority_and_complexity() {
        let executor = SimulatedExecutor::new();
        let a = agent("coder");

        let simple = executor.execution_duration(&task("review", 1), &a);
        let complex = executor.execution_duration(&task("coding", 4), &a);

        assert!(complex > simple);
    }

    #[test]
    fn experienced_agents_finish_faster() {
        let executor = SimulatedExecutor::new();
        let t = task("coding", 2);

        let mut novice = agent("coder");
        novice.success_rate = 0.1;
        let mut veteran = agent("coder");
        veteran.success_rate = 0.9;

        assert!(executor.execution_duration(&t, &veteran) < executor.execution_duration(&t, &novice));
    }

    #[test]
    fn zero_base_duration_is_instant() {
        let executor = SimulatedExecutor::new().with_base_duration(Duration::ZERO);

        let duration = executor.execution_duration(&task("coding", 4), &agent("coder"));

        assert!(duration.is_zero());
    }

    // ==================== Outcome Tests ====================

    #[tokio::test]
    async fn fixed_low_sample_forces_success() {
        let executor = instant_executor(0.0);

        let report = executor.execute(&task("coding", 2), &agent("coder")).await;

        assert!(report.success);
        assert!(report.result.is_some());
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn fixed_high_sample_forces_failure() {
        let executor = instant_executor(1.0);

        let report = executor.execute(&task("coding", 2), &agent("coder")).await;

        assert!(!report.success);
        assert!(report.result.is_none());
        assert!(report.error.is_some());
    }

    #[tokio::test]
    async fn success_payload_names_the_agent_type() {
        let executor = instant_executor(0.0);

        let report = executor.execute(&task("coding", 2), &agent("coder")).await;

        let result = report.result.unwrap();
        assert_eq!(result["agent_type"], "coder");
        assert_eq!(result["status"], "success");
    }

    #[tokio::test]
    async fn failure_reason_mentions_the_task_type() {
        let executor = instant_executor(1.0);

        let report = executor.execute(&task("unusual", 2), &agent("coder")).await;

        assert!(report.error.unwrap().contains("unusual"));
    }
}
