//! Agent types and the agent registry
//!
//! Agents are the stateful worker units tasks get assigned to. The
//! [`AgentRegistry`] owns every agent; all mutation flows through its
//! write lock, which is how the "at most one current task per agent"
//! invariant is enforced.

pub mod registry;
pub mod types;

pub use registry::AgentRegistry;
pub use types::{Agent, AgentId, AgentStatus};
