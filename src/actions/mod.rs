//! Actions: reversible atomic game mutations.
//!
//! ## Key Types
//!
//! - `Action`: one candidate mutation with its cost group and provenance
//! - `ActionKind`: the closed set of mutations the core knows how to run
//! - `ActionTag`: fieldless kind, for modifier matching
//! - `Event`: what a run (or undo) did
//!
//! ## Contract
//!
//! - `run` performs the mutation and records how to reverse it
//! - `undo` reverses the most recent `run` exactly
//! - `is_impossible` / `is_possible` / `is_fully_possible` are pure queries
//! - `set_cancelled` is permanent and propagates into embedded actions

pub mod action;
pub mod event;
mod execute;
mod feasibility;

pub use action::{Action, ActionId, ActionKind, ActionTag};
pub use event::Event;
