//! # ccg-timing
//!
//! Timing core for card game engines: reversible action batches, static
//! modifiers and speculative option search.
//!
//! ## Design Principles
//!
//! 1. **Everything Undoes**: Every mutation is an `Action` that records how
//!    to reverse itself. Batches and whole runs undo in reverse order and
//!    leave the state byte-identical.
//!
//! 2. **Simultaneity**: Actions yielded together form one `Timing`. They
//!    are judged against the same state, intercepted together, and their
//!    follow-ups are collected as a group.
//!
//! 3. **No Hidden Prompts**: The core never blocks on a player. It returns
//!    an `InputRequest` and is resumed with a `Response`.
//!
//! ## Architecture
//!
//! - **Speculation by Replay**: Option validity is decided by replaying
//!   recorded responses on the live state and undoing them, never by
//!   cloning the game.
//!
//! - **Persistent Data Structures**: `im-rs` keeps snapshots and zone
//!   bookkeeping cheap.
//!
//! ## Modules
//!
//! - `core`: Entity IDs, players, state, RNG, configuration, errors
//! - `zones`: Zone membership and order
//! - `cards`: Card instances
//! - `actions`: Reversible actions and the events they emit
//! - `modifiers`: Static abilities, modifier stacks, derived values
//! - `timing`: Batches, batch sources and the runner
//! - `options`: Speculative option tree and cost payment

pub mod core;
pub mod zones;
pub mod cards;
pub mod actions;
pub mod modifiers;
pub mod timing;
pub mod options;

// Re-export commonly used types
pub use crate::core::{
    AbilityId, EntityId, PlayerId, PlayerMap,
    GameRng, GameRngState,
    ZoneId, ZoneConfig, ZoneRole, ZoneVisibility,
    TimingConfig, TimingError, Result,
    Game, GameResult, GameState,
};

pub use crate::zones::{ZoneManager, ZonePosition};

pub use crate::cards::CardInstance;

pub use crate::actions::{Action, ActionId, ActionKind, ActionTag, Event};

pub use crate::modifiers::{
    AbilityCatalogue, Condition, DerivedValues, InterceptEffect, Modification,
    ModifierStack, StaticAbility, ValueChange,
};

pub use crate::timing::{
    BatchSource, InputRequest, RequestKind, Response,
    RunnerMode, RunnerStatus, ScriptedSource, SourceFactory, SourceStep,
    Timing, TimingRunner, TimingStep,
};

pub use crate::options::{CostPayment, NodeId, OptionTree, SearchStats, Validity};
