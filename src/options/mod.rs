//! Speculative option search.
//!
//! Answers "can this run still be completed if the player picks X?" without
//! cloning the game: every query replays the run's recorded responses on
//! the live state and undoes them again. See [`OptionTree`] for the search
//! and [`CostPayment`] for the interactive wrapper used when paying costs.

mod node;
mod payment;
mod stats;
mod tree;

pub use node::{NodeId, OptionNode, Validity};
pub use payment::CostPayment;
pub use stats::SearchStats;
pub use tree::{Children, EndPredicate, OptionTree};
