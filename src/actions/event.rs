//! Events: descriptions of what a batch actually did.
//!
//! `Action::run` returns the event for its mutation; `Action::undo` returns
//! the inverse. A batch collects the events of every action that ran, plus
//! cancellations, replacements, value changes and replacement notes.

use serde::{Deserialize, Serialize};

use crate::core::{AbilityId, EntityId, GameResult, PlayerId, ZoneId};

use super::ActionId;

/// Something observable that happened during a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Moved {
        card: EntityId,
        from: ZoneId,
        to: ZoneId,
    },

    Drawn {
        player: PlayerId,
        card: EntityId,
    },

    /// A card was put back on top of a deck (inverse of a draw).
    Undrawn {
        player: PlayerId,
        card: EntityId,
    },

    Destroyed {
        card: EntityId,
    },

    Shuffled {
        zone: ZoneId,
    },

    Revealed {
        card: EntityId,
    },

    Concealed {
        card: EntityId,
    },

    CounterChanged {
        target: EntityId,
        key: String,
        before: Option<i64>,
        after: Option<i64>,
    },

    Attached {
        card: EntityId,
        to: Option<EntityId>,
    },

    AbilityApplied {
        ability: AbilityId,
        target: EntityId,
    },

    AbilityUnapplied {
        ability: AbilityId,
        target: EntityId,
    },

    TurnAdvanced {
        turn: u32,
        active: PlayerId,
    },

    GameEnded {
        result: Option<GameResult>,
    },

    Cancelled {
        action: ActionId,
    },

    /// An interception replaced `action` with `by` (empty for a cancel).
    Replaced {
        action: ActionId,
        ability: AbilityId,
        by: Vec<ActionId>,
    },

    ValueChanged {
        object: EntityId,
        stat: String,
        before: Option<i64>,
        after: Option<i64>,
    },

    KeywordChanged {
        object: EntityId,
        keyword: String,
        granted: bool,
    },

    /// Diagnostic emitted while computing a replacement.
    Note(String),
}

impl Event {
    /// Objects this event is about (for UI/log filtering).
    #[must_use]
    pub fn subject(&self) -> Option<EntityId> {
        match self {
            Self::Moved { card, .. }
            | Self::Drawn { card, .. }
            | Self::Undrawn { card, .. }
            | Self::Destroyed { card }
            | Self::Revealed { card }
            | Self::Concealed { card }
            | Self::Attached { card, .. } => Some(*card),
            Self::CounterChanged { target, .. }
            | Self::AbilityApplied { target, .. }
            | Self::AbilityUnapplied { target, .. } => Some(*target),
            Self::ValueChanged { object, .. } | Self::KeywordChanged { object, .. } => Some(*object),
            Self::Shuffled { .. }
            | Self::TurnAdvanced { .. }
            | Self::GameEnded { .. }
            | Self::Cancelled { .. }
            | Self::Replaced { .. }
            | Self::Note(_) => None,
        }
    }
}
