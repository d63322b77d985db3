//! Engine-level errors.
//!
//! Only protocol and contract violations are errors. A cost that cannot be
//! paid, an action that cannot happen or a search branch that cannot be
//! completed are ordinary outcomes (`false`, a cancelled flag, a retired
//! batch) and never surface here.

use super::{AbilityId, EntityId, PlayerId, ZoneId};
use crate::options::NodeId;

/// A collaborator broke the contract of the timing core.
#[derive(Debug, thiserror::Error)]
pub enum TimingError {
    #[error("invalid response for {request}: {reason}")]
    InvalidResponse { request: String, reason: String },

    #[error("a response was supplied but no input request is pending")]
    UnexpectedResponse,

    #[error("an input request is pending but no response was supplied")]
    MissingResponse,

    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    #[error("unknown ability {0}")]
    UnknownAbility(AbilityId),

    #[error("unknown zone {0}")]
    UnknownZone(ZoneId),

    #[error("{player} has no {role} zone")]
    MissingZone { player: PlayerId, role: &'static str },

    #[error("unknown option node {0}")]
    UnknownNode(NodeId),

    #[error("batch source resumed after it completed")]
    SourceFinished,

    #[error("undo called on an action that has not run")]
    NotRun,

    #[error("replay diverged at choice {depth}: {reason}")]
    ReplayDiverged { depth: usize, reason: String },

    #[error("action lineage exceeded {limit} replacements")]
    ReplacementLimit { limit: usize },

    #[error("follow-up actions did not settle within {limit} passes")]
    FollowUpLimit { limit: usize },

    #[error("option tree exceeded {limit} nodes")]
    SearchLimit { limit: usize },

    #[error("counter {key} on {target} would overflow")]
    CounterOverflow { target: EntityId, key: String },

    #[error("malformed action: {0}")]
    MalformedAction(String),

    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] bincode::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, TimingError>;
