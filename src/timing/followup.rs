//! Follow-up actions implied by what a batch just did.
//!
//! After each run the batch asks for the follow-ups of the actions and
//! events of that pass, appends them, and processes them as a new window.
//! Each rule fires at most once per qualifying object per batch, which is
//! what makes the fixpoint terminate.

use rustc_hash::FxHashSet;

use crate::actions::{Action, ActionKind, Event};
use crate::core::{EntityId, GameState, ZoneVisibility};

/// Rule that produced a follow-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum FollowUp {
    /// A face-down card arrived somewhere it can be seen.
    Reveal,
    /// A card was put into a deck at no particular position.
    Reshuffle,
    /// Equipment is attached to something no longer in play.
    Unequip,
}

/// Objects each rule has already fired for.
pub(crate) type FollowUpSeen = FxHashSet<(FollowUp, EntityId)>;

/// Follow-ups for one pass, in deterministic order.
pub(crate) fn follow_ups<'a>(
    state: &GameState,
    ran: impl IntoIterator<Item = &'a Action>,
    events: &[Event],
    seen: &mut FollowUpSeen,
) -> Vec<Action> {
    let mut actions = Vec::new();

    for event in events {
        let card = match event {
            Event::Moved { card, .. } | Event::Drawn { card, .. } => *card,
            _ => continue,
        };
        let Some(instance) = state.card(card) else {
            continue;
        };
        let visible = state
            .zones
            .zone_of(card)
            .and_then(|zone| state.zone_config(zone))
            .is_some_and(|config| config.visibility != ZoneVisibility::Hidden);
        if instance.face_down && visible && seen.insert((FollowUp::Reveal, card)) {
            actions.push(Action::reveal(instance.owner, card));
        }
    }

    for action in ran {
        if let ActionKind::PlaceInDeck { card, position: None } = &action.kind {
            let Some(owner) = state.card(*card).map(|c| c.owner) else {
                continue;
            };
            if seen.insert((FollowUp::Reshuffle, EntityId::player(owner))) {
                actions.push(Action::shuffle(owner).caused_by(*card));
            }
        }
    }

    for card in state.cards_in_play() {
        let Some(bearer) = card.attached_to else {
            continue;
        };
        if !state.is_in_play(bearer) && seen.insert((FollowUp::Unequip, card.entity_id)) {
            actions.push(Action::discard(card.controller, card.entity_id).caused_by(bearer));
        }
    }

    actions
}
