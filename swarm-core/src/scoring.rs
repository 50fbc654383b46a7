//! Agent-task suitability scoring
//!
//! Pure functions: given snapshots of an agent and a task plus the current
//! wall-clock time, compute a suitability score and pick the best available
//! agent. The registry calls [`select_best`] under its write lock, so
//! everything here must stay cheap and allocation-free.
//!
//! The score is a greedy per-task heuristic, not a global optimum:
//! `typeMatch + 2·successRate + idleBonus`, scaled by `(1 + priority/4)`,
//! then nudged by how recently the agent was active.

use chrono::{DateTime, Duration, Utc};

use crate::agent::Agent;
use crate::task::Task;

/// Score contribution for an exact agent/task type match.
const EXACT_MATCH_SCORE: f64 = 2.0;

/// Score contribution for a compatibility-table match.
const COMPATIBLE_MATCH_SCORE: f64 = 1.0;

/// Weight applied to the agent's success rate.
const SUCCESS_RATE_WEIGHT: f64 = 2.0;

/// Recency bonus/penalty applied at the end.
const RECENCY_ADJUSTMENT: f64 = 0.5;

/// Agents active within this window get the recency bonus.
const RECENT_WINDOW_MINUTES: i64 = 5;

/// Agents idle longer than this get the recency penalty.
const IDLE_WINDOW_MINUTES: i64 = 30;

/// Whether an agent type can take on a task type it doesn't exactly match
pub fn is_compatible(agent_type: &str, task_type: &str) -> bool {
    let compatible: &[&str] = match agent_type {
        "researcher" => &["analysis", "research", "investigation"],
        "coder" => &["coding", "development", "programming", "implementation"],
        "analyst" => &["analysis", "data_analysis", "investigation", "research"],
        "tester" => &["testing", "validation", "quality_assurance"],
        "designer" => &["design", "ui_design", "architecture"],
        "reviewer" => &["review", "code_review", "documentation_review"],
        "optimizer" => &["optimization", "performance", "refactoring"],
        "coordinator" => &["coordination", "management", "orchestration"],
        _ => return false,
    };
    compatible.contains(&task_type)
}

/// Relative execution complexity of a task type (1.0 = baseline)
pub fn complexity_factor(task_type: &str) -> f64 {
    match task_type {
        "research" => 1.5,
        "analysis" => 1.3,
        "coding" => 2.0,
        "development" => 2.0,
        "testing" => 1.2,
        "review" => 1.0,
        "optimization" => 1.8,
        "coordination" => 1.1,
        "design" => 1.6,
        "implementation" => 1.9,
        _ => 1.0,
    }
}

/// Compute how suitable `agent` is for `task` at time `now`
///
/// Deterministic given its inputs. Higher is better. The caller is
/// responsible for filtering out ineligible agents first.
pub fn score(agent: &Agent, task: &Task, now: DateTime<Utc>) -> f64 {
    let mut score = 0.0;

    if agent.agent_type == task.task_type {
        score += EXACT_MATCH_SCORE;
    } else if is_compatible(&agent.agent_type, &task.task_type) {
        score += COMPATIBLE_MATCH_SCORE;
    }

    score += agent.success_rate * SUCCESS_RATE_WEIGHT;

    // Prefer less busy agents
    if agent.task_count == 0 {
        score += 1.0;
    } else {
        score += 1.0 / f64::from(agent.task_count);
    }

    // High-priority tasks get better agents
    let priority_factor = f64::from(task.priority) / 4.0;
    score *= 1.0 + priority_factor;

    // Recently active agents score higher, long-idle ones lower
    let idle = now - agent.last_active;
    if idle < Duration::minutes(RECENT_WINDOW_MINUTES) {
        score += RECENCY_ADJUSTMENT;
    } else if idle > Duration::minutes(IDLE_WINDOW_MINUTES) {
        score -= RECENCY_ADJUSTMENT;
    }

    score
}

/// Pick the available agent with the strictly highest score
///
/// Only active agents with no current task are considered. Ties resolve to
/// whichever candidate is seen first in iteration order, which for the
/// registry's map is arbitrary.
pub fn select_best<'a, I>(agents: I, task: &Task, now: DateTime<Utc>) -> Option<&'a Agent>
where
    I: IntoIterator<Item = &'a Agent>,
{
    let mut best: Option<(&'a Agent, f64)> = None;

    for agent in agents {
        if !agent.is_available() {
            continue;
        }
        let candidate = score(agent, task, now);
        match best {
            Some((_, best_score)) if candidate <= best_score => {}
            _ => best = Some((agent, candidate)),
        }
    }

    best.map(|(agent, _)| agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentStatus;
    use crate::task::TaskId;
    use serde_json::json;
    use std::collections::HashMap;

    fn agent(agent_type: &str) -> Agent {
        Agent::new(agent_type, HashMap::new())
    }

    fn task(task_type: &str, priority: u8) -> Task {
        Task::new(task_type, priority, json!({}))
    }

    // ==================== Compatibility Table Tests ====================

    #[test]
    fn exact_types_are_not_in_compatibility_table() {
        // Exact matches are handled separately with a higher score
        assert!(!is_compatible("coder", "coder"));
    }

    #[test]
    fn compatible_pairs_match() {
        assert!(is_compatible("researcher", "analysis"));
        assert!(is_compatible("coder", "implementation"));
        assert!(is_compatible("tester", "quality_assurance"));
        assert!(is_compatible("coordinator", "orchestration"));
    }

    #[test]
    fn unknown_agent_type_matches_nothing() {
        assert!(!is_compatible("barista", "coding"));
    }

    #[test]
    fn complexity_defaults_to_one() {
        assert_eq!(complexity_factor("coding"), 2.0);
        assert_eq!(complexity_factor("unheard_of"), 1.0);
    }

    // ==================== Score Tests ====================

    #[test]
    fn exact_match_beats_compatible_match() {
        let now = Utc::now();
        let t = task("coding", 2);
        let exact = agent("coding");
        let compatible = agent("coder");

        assert!(score(&exact, &t, now) > score(&compatible, &t, now));
    }

    #[test]
    fn compatible_match_beats_no_match() {
        let now = Utc::now();
        let t = task("coding", 2);
        let compatible = agent("coder");
        let unrelated = agent("designer");

        assert!(score(&compatible, &t, now) > score(&unrelated, &t, now));
    }

    #[test]
    fn higher_success_rate_never_scores_lower() {
        let now = Utc::now();
        let t = task("coding", 3);

        let mut weak = agent("coder");
        weak.success_rate = 0.3;
        let mut strong = weak.clone();
        strong.success_rate = 0.9;

        assert!(score(&strong, &t, now) >= score(&weak, &t, now));
    }

    #[test]
    fn idle_agent_gets_full_bonus() {
        let now = Utc::now();
        let t = task("coding", 2);

        let fresh = agent("coder");
        let mut busy_history = agent("coder");
        busy_history.task_count = 4;

        assert!(score(&fresh, &t, now) > score(&busy_history, &t, now));
    }

    #[test]
    fn long_idle_agent_is_penalized() {
        let now = Utc::now();
        let t = task("coding", 2);

        let recent = agent("coder");
        let mut stale = recent.clone();
        stale.last_active = now - Duration::minutes(45);

        // Same agent otherwise; the only difference is the recency term
        assert_eq!(
            score(&recent, &t, now) - score(&stale, &t, now),
            2.0 * RECENCY_ADJUSTMENT
        );
    }

    #[test]
    fn priority_scales_the_score() {
        let now = Utc::now();
        let a = agent("coder");

        let low = score(&a, &task("coding", 1), now);
        let high = score(&a, &task("coding", 4), now);

        assert!(high > low);
    }

    // ==================== Selection Tests ====================

    #[test]
    fn select_best_prefers_matching_type() {
        let now = Utc::now();
        let t = task("coding", 2);
        let coder = agent("coder");
        let designer = agent("designer");
        let pool = [designer, coder];

        let best = select_best(pool.iter(), &t, now).unwrap();
        assert_eq!(best.agent_type, "coder");
    }

    #[test]
    fn select_best_skips_busy_and_inactive_agents() {
        let now = Utc::now();
        let t = task("coding", 2);

        let mut busy = agent("coder");
        busy.current_task = Some(TaskId::new());
        let mut inactive = agent("coder");
        inactive.status = AgentStatus::Inactive;
        let available = agent("designer");
        let pool = [busy, inactive, available];

        let best = select_best(pool.iter(), &t, now).unwrap();
        assert_eq!(best.agent_type, "designer");
    }

    #[test]
    fn select_best_returns_none_for_empty_pool() {
        let now = Utc::now();
        let t = task("coding", 2);

        let pool: [Agent; 0] = [];
        assert!(select_best(pool.iter(), &t, now).is_none());
    }

    #[test]
    fn select_best_breaks_ties_arbitrarily_but_picks_one() {
        // Two identical agents score identically; which one wins depends on
        // iteration order. Callers must not rely on either outcome.
        let now = Utc::now();
        let t = task("coding", 2);
        let pool = [agent("coder"), agent("coder")];

        let best = select_best(pool.iter(), &t, now);
        assert!(best.is_some());
    }
}
