//! Core engine types: identifiers, players, RNG, configuration, state, errors.
//!
//! Everything else in the crate builds on these; nothing here knows about
//! batches or search.

pub mod entity;
pub mod player;
pub mod rng;
pub mod config;
pub mod error;
pub mod state;

pub use entity::{AbilityId, EntityId};
pub use player::{PlayerId, PlayerMap};
pub use rng::{GameRng, GameRngState};
pub use config::{TimingConfig, ZoneConfig, ZoneId, ZoneRole, ZoneVisibility};
pub use error::{Result, TimingError};
pub use state::{Game, GameResult, GameState};
