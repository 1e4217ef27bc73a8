//! # Holos Console Authorization
//!
//! The authorization engine: the static role/permission table, grant
//! annotations with time-window activation, the multi-tier access evaluator,
//! and the deployment-wide creator policy for organization creation.
//!
//! State lives on the stored objects themselves; this crate is pure logic
//! over parsed annotations and validated claims.

pub mod creator;
pub mod evaluate;
pub mod grant;
pub mod role;

// Re-export commonly used types for convenience
pub use creator::CreatorPolicy;
pub use evaluate::{Decision, TierGrants, evaluate};
pub use grant::{AnnotationGrant, GrantError, active_grants_map, parse_grants, serialize_grants};
pub use role::{Permission, Role};
