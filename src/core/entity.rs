//! Stable identifiers for game objects.
//!
//! Every object an action can touch (players, cards, tokens) has an
//! `EntityId`. Ids are never reused within a game, so an id captured in an
//! undo record or a modifier stack entry always resolves to the same logical
//! object, even after that object has moved between zones.
//!
//! ## ID Layout
//!
//! - `0..player_count`: reserved for players
//! - `player_count..`: cards and other objects, allocated by `GameState`
//!
//! ```
//! use ccg_timing::core::EntityId;
//!
//! let player_count = 2;
//! assert!(EntityId::player_id(1).is_player(player_count));
//! assert!(!EntityId(7).is_player(player_count));
//! ```

use serde::{Deserialize, Serialize};

use super::PlayerId;

/// Unique identifier for any game object.
///
/// Ordered so that state maps keyed by entity iterate (and serialize)
/// deterministically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Entity ID for a player by index.
    #[must_use]
    pub const fn player_id(index: u8) -> Self {
        Self(index as u32)
    }

    /// Entity ID for a player.
    #[must_use]
    pub const fn player(id: PlayerId) -> Self {
        Self(id.0 as u32)
    }

    /// First raw ID available for non-player objects.
    #[must_use]
    pub const fn first_non_player(player_count: usize) -> u32 {
        player_count as u32
    }

    /// Check if this entity ID refers to a player.
    #[must_use]
    pub const fn is_player(self, player_count: usize) -> bool {
        self.0 < player_count as u32
    }

    /// Convert to a `PlayerId` if this is a player entity.
    ///
    /// ```
    /// use ccg_timing::core::{EntityId, PlayerId};
    ///
    /// assert_eq!(EntityId(1).as_player(2), Some(PlayerId::new(1)));
    /// assert_eq!(EntityId(5).as_player(2), None);
    /// ```
    #[must_use]
    pub fn as_player(self, player_count: usize) -> Option<PlayerId> {
        if self.is_player(player_count) {
            Some(PlayerId::new(self.0 as u8))
        } else {
            None
        }
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Identifier of a registered static ability.
///
/// Allocated by [`AbilityCatalogue::register`](crate::modifiers::AbilityCatalogue::register).
/// Modifier stack entries and use counters refer to abilities by this id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AbilityId(pub u32);

impl AbilityId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for AbilityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ability({})", self.0)
    }
}
