//! Zone system for card locations.
//!
//! Zones are game-configured via `ZoneConfig`; the manager only tracks
//! membership and order.

pub mod manager;

pub use manager::{Placement, ZoneManager, ZonePosition};

pub use crate::core::config::{ZoneConfig, ZoneId, ZoneRole, ZoneVisibility};
