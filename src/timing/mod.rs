//! Batches of simultaneous actions and the runner that sequences them.
//!
//! ## Key Types
//!
//! - `Timing`: one batch. Prunes impossible and prohibited actions, lets
//!   applied modifiers cancel or replace actions, enforces cost groups,
//!   runs the survivors, adds follow-up actions until nothing new is
//!   implied, recalculates derived values, and can undo all of it.
//! - `BatchSource`: scripted logic yielding batches and input requests
//! - `TimingRunner`: drives a source to completion, one `Timing` per
//!   yielded batch, with ambient phasing before each resume
//! - `InputRequest` / `Response`: the only way the core asks players
//!   anything
//!
//! ## Example
//!
//! ```
//! use ccg_timing::actions::Action;
//! use ccg_timing::cards::CardInstance;
//! use ccg_timing::core::{Game, GameState, PlayerId, ZoneConfig, ZoneId};
//! use ccg_timing::modifiers::AbilityCatalogue;
//! use ccg_timing::timing::{RunnerStatus, ScriptedSource, TimingRunner};
//!
//! let p0 = PlayerId::new(0);
//! let mut state = GameState::new(2, 42);
//! let (hand, field) = (ZoneId::new(0), ZoneId::new(1));
//! state.add_zone(ZoneConfig::hand(hand, p0));
//! state.add_zone(ZoneConfig::field(field, p0));
//! let card = state.alloc_entity();
//! state.add_card(CardInstance::new(card, "Squire", p0), hand).unwrap();
//! let mut game = Game::new(state, AbilityCatalogue::new());
//!
//! let source = ScriptedSource::new([vec![Action::move_card(p0, card, field)]]);
//! let mut runner = TimingRunner::new(source.factory());
//! assert_eq!(runner.step(&mut game, None).unwrap(), RunnerStatus::Finished(true));
//! assert!(game.state.is_in_play(card));
//!
//! runner.undo(&mut game, false).unwrap();
//! assert!(!game.state.is_in_play(card));
//! ```

mod batch;
mod followup;
mod request;
mod runner;
mod source;

pub use batch::{Timing, TimingStep};
pub use request::{InputRequest, RequestKind, Response, Responses};
pub use runner::{RunnerMode, RunnerStatus, TimingRunner};
pub use source::{source_factory, BatchSource, FnSource, Resume, ScriptedSource, SourceFactory, SourceStep};
