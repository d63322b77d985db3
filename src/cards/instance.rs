//! Card instances - runtime card state.
//!
//! Location is not stored here; `ZoneManager` is the single source of truth
//! for where a card is. A card carries:
//! - ownership and control
//! - face-down state
//! - counters (mutated by actions, undoable)
//! - base values (printed attack/defense etc.), the input to derived-value
//!   recalculation
//! - the sequence number of its most recent entry into play, which orders
//!   competing modifiers ("oldest first")
//! - the card it is attached to, for equipment

use im::OrdMap;
use serde::{Deserialize, Serialize};

use crate::core::{EntityId, PlayerId};

/// A card in a game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInstance {
    pub entity_id: EntityId,

    /// Human-readable name (for debugging/display).
    pub name: String,

    pub owner: PlayerId,

    pub controller: PlayerId,

    pub face_down: bool,

    /// Mutable counters (damage, charge, tapped as 0/1, ...).
    pub counters: OrdMap<String, i64>,

    /// Printed values; modifiers are applied on top of these.
    pub base: OrdMap<String, i64>,

    /// Play sequence number of the latest entry into an in-play zone.
    pub entered_play: Option<u64>,

    /// Card this one is attached to (equipment).
    pub attached_to: Option<EntityId>,
}

impl CardInstance {
    #[must_use]
    pub fn new(entity_id: EntityId, name: impl Into<String>, owner: PlayerId) -> Self {
        Self {
            entity_id,
            name: name.into(),
            owner,
            controller: owner,
            face_down: false,
            counters: OrdMap::new(),
            base: OrdMap::new(),
            entered_play: None,
            attached_to: None,
        }
    }

    /// Set a printed value (builder pattern).
    #[must_use]
    pub fn with_base(mut self, key: impl Into<String>, value: i64) -> Self {
        self.base.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn face_down(mut self) -> Self {
        self.face_down = true;
        self
    }

    #[must_use]
    pub fn counter(&self, key: &str) -> Option<i64> {
        self.counters.get(key).copied()
    }

    /// Set a counter, returning the previous value.
    pub fn set_counter(&mut self, key: &str, value: i64) -> Option<i64> {
        self.counters.insert(key.to_string(), value)
    }

    /// Restore a counter to a previous value (`None` removes it).
    pub fn restore_counter(&mut self, key: &str, previous: Option<i64>) {
        match previous {
            Some(value) => {
                self.counters.insert(key.to_string(), value);
            }
            None => {
                self.counters.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_card() {
        let card = CardInstance::new(EntityId(10), "Knight", PlayerId::new(1))
            .with_base("attack", 3)
            .face_down();

        assert_eq!(card.owner, PlayerId::new(1));
        assert_eq!(card.controller, PlayerId::new(1));
        assert!(card.face_down);
        assert_eq!(card.base.get("attack"), Some(&3));
        assert_eq!(card.entered_play, None);
    }

    #[test]
    fn test_counter_restore() {
        let mut card = CardInstance::new(EntityId(10), "Knight", PlayerId::new(0));
        let before = card.clone();

        let previous = card.set_counter("damage", 2);
        assert_eq!(previous, None);
        assert_eq!(card.counter("damage"), Some(2));

        card.restore_counter("damage", previous);
        assert_eq!(card, before);
    }
}
