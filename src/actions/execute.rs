//! Running and undoing actions.
//!
//! `run` captures exactly what it needs to reverse itself in an
//! [`UndoRecord`]; `undo` consumes the record. Zone moves remember the index
//! a card left from, shuffles remember the previous order and RNG position,
//! counters remember the previous value (including "absent"). This is what
//! makes a batch round-trip byte-identical.

use tracing::{debug, trace};

use crate::core::{
    EntityId, GameResult, GameRngState, GameState, PlayerId, Result, TimingError, ZoneId, ZoneRole,
};
use crate::modifiers::{ExpiryEntry, StackEntry};
use crate::zones::{Placement, ZonePosition};

use super::{Action, ActionKind, Event};

/// What `undo` needs to reverse one `run`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum UndoRecord {
    Moved {
        card: EntityId,
        from: Placement,
        /// Previous `entered_play`, if the move put the card into play.
        entered: Option<Option<u64>>,
    },
    /// Reversal is delegated to the embedded action.
    Composite,
    Shuffled {
        zone: ZoneId,
        order: Vec<EntityId>,
        rng: GameRngState,
    },
    Revealed,
    Counter {
        previous: Option<i64>,
    },
    Attached {
        previous: Option<EntityId>,
    },
    Applied {
        queued_expiry: bool,
    },
    Unapplied {
        index: usize,
        entry: StackEntry,
        expiry: Option<(usize, ExpiryEntry)>,
    },
    Turn {
        previous_active: PlayerId,
    },
    Ended {
        previous: Option<GameResult>,
    },
}

impl Action {
    /// Perform the mutation.
    ///
    /// Returns what happened, or `None` if nothing observable occurred.
    /// Running a cancelled action, or running twice without an `undo` in
    /// between, is a contract violation.
    pub fn run(&mut self, state: &mut GameState, speculative: bool) -> Result<Option<Event>> {
        if self.is_cancelled() {
            return Err(TimingError::MalformedAction(format!("{} is cancelled", self.id)));
        }
        if self.undo.is_some() {
            return Err(TimingError::MalformedAction(format!("{} ran twice", self.id)));
        }
        if speculative {
            trace!(action = %self.id, kind = ?self.tag(), "run");
        } else {
            debug!(action = %self.id, kind = ?self.tag(), "run");
        }

        let (record, event) = match &mut self.kind {
            ActionKind::MoveCard { card, to, position } => {
                let (from, entered) = relocate(state, *card, *to, *position)?;
                (
                    UndoRecord::Moved { card: *card, from, entered },
                    Some(Event::Moved {
                        card: *card,
                        from: from.zone,
                        to: *to,
                    }),
                )
            }

            ActionKind::Draw { player } => {
                let deck = state.zone_for(*player, ZoneRole::Deck)?;
                let hand = state.zone_for(*player, ZoneRole::Hand)?;
                let card = state
                    .zones
                    .top(deck)
                    .ok_or_else(|| TimingError::MalformedAction(format!("{player} drew from an empty deck")))?;
                let (from, entered) = relocate(state, card, hand, Some(ZonePosition::Top))?;
                (
                    UndoRecord::Moved { card, from, entered },
                    Some(Event::Drawn { player: *player, card }),
                )
            }

            ActionKind::Discard { card } => {
                let owner = owner_of(state, *card)?;
                let graveyard = state.zone_for(owner, ZoneRole::Graveyard)?;
                let (from, entered) = relocate(state, *card, graveyard, Some(ZonePosition::Top))?;
                (
                    UndoRecord::Moved { card: *card, from, entered },
                    Some(Event::Moved {
                        card: *card,
                        from: from.zone,
                        to: graveyard,
                    }),
                )
            }

            ActionKind::Destroy { card, discard } => {
                discard.run(state, speculative)?;
                (UndoRecord::Composite, Some(Event::Destroyed { card: *card }))
            }

            ActionKind::PlaceInDeck { card, position } => {
                let owner = owner_of(state, *card)?;
                let deck = state.zone_for(owner, ZoneRole::Deck)?;
                let (from, entered) = relocate(state, *card, deck, *position)?;
                (
                    UndoRecord::Moved { card: *card, from, entered },
                    Some(Event::Moved {
                        card: *card,
                        from: from.zone,
                        to: deck,
                    }),
                )
            }

            ActionKind::Shuffle { player } => {
                let zone = state.zone_for(*player, ZoneRole::Deck)?;
                let order = state.zones.order(zone);
                let rng = state.rng_state();
                state.shuffle_zone(zone);
                (UndoRecord::Shuffled { zone, order, rng }, Some(Event::Shuffled { zone }))
            }

            ActionKind::Reveal { card } => {
                state.require_card_mut(*card)?.face_down = false;
                (UndoRecord::Revealed, Some(Event::Revealed { card: *card }))
            }

            ActionKind::ModifyCounter { target, key, delta, .. } => {
                let before = state.counter(*target, key);
                let after = before
                    .unwrap_or(0)
                    .checked_add(*delta)
                    .ok_or_else(|| TimingError::CounterOverflow {
                        target: *target,
                        key: key.clone(),
                    })?;
                let previous = state.set_counter(*target, key, after)?;
                (
                    UndoRecord::Counter { previous },
                    Some(Event::CounterChanged {
                        target: *target,
                        key: key.clone(),
                        before,
                        after: Some(after),
                    }),
                )
            }

            ActionKind::SetCounter { target, key, value } => {
                let previous = state.set_counter(*target, key, *value)?;
                (
                    UndoRecord::Counter { previous },
                    Some(Event::CounterChanged {
                        target: *target,
                        key: key.clone(),
                        before: previous,
                        after: Some(*value),
                    }),
                )
            }

            ActionKind::Attach { card, to } => {
                let instance = state.require_card_mut(*card)?;
                let previous = std::mem::replace(&mut instance.attached_to, *to);
                (
                    UndoRecord::Attached { previous },
                    Some(Event::Attached { card: *card, to: *to }),
                )
            }

            ActionKind::ApplyStaticAbility { ability, target, until } => {
                if !state.exists(*target) {
                    return Err(TimingError::UnknownEntity(*target));
                }
                state.push_modifier(*target, StackEntry { ability: *ability });
                if let Some(expiry) = until {
                    state.queue_expiry(ExpiryEntry {
                        ability: *ability,
                        target: *target,
                        expiry: *expiry,
                    });
                }
                (
                    UndoRecord::Applied {
                        queued_expiry: until.is_some(),
                    },
                    Some(Event::AbilityApplied {
                        ability: *ability,
                        target: *target,
                    }),
                )
            }

            ActionKind::UnapplyStaticAbility { ability, target } => {
                let (index, entry) = state.remove_modifier(*target, *ability).ok_or_else(|| {
                    TimingError::MalformedAction(format!("{ability} is not applied to {target}"))
                })?;
                let expiry = state.take_expiry(*ability, *target);
                (
                    UndoRecord::Unapplied { index, entry, expiry },
                    Some(Event::AbilityUnapplied {
                        ability: *ability,
                        target: *target,
                    }),
                )
            }

            ActionKind::AdvanceTurn => {
                let previous_active = state.active_player;
                state.turn_number += 1;
                state.active_player = previous_active.next(state.player_count());
                (
                    UndoRecord::Turn { previous_active },
                    Some(Event::TurnAdvanced {
                        turn: state.turn_number,
                        active: state.active_player,
                    }),
                )
            }

            ActionKind::EndGame { winner } => {
                let result = winner.map_or(GameResult::Draw, GameResult::Winner);
                let previous = state.set_result(Some(result.clone()));
                (
                    UndoRecord::Ended { previous },
                    Some(Event::GameEnded { result: Some(result) }),
                )
            }
        };

        self.undo = Some(record);
        Ok(event)
    }

    /// Exactly reverse the most recent `run`.
    pub fn undo(&mut self, state: &mut GameState, speculative: bool) -> Result<Option<Event>> {
        let record = self.undo.take().ok_or(TimingError::NotRun)?;
        if speculative {
            trace!(action = %self.id, kind = ?self.tag(), "undo");
        } else {
            debug!(action = %self.id, kind = ?self.tag(), "undo");
        }

        let event = match (record, &mut self.kind) {
            (UndoRecord::Moved { card, from, entered }, kind) => {
                let now = state.zones.zone_of(card);
                restore_location(state, card, from, entered)?;
                match (kind, now) {
                    (ActionKind::Draw { player }, _) => Some(Event::Undrawn { player: *player, card }),
                    (_, Some(now)) => Some(Event::Moved {
                        card,
                        from: now,
                        to: from.zone,
                    }),
                    (_, None) => None,
                }
            }

            (UndoRecord::Composite, ActionKind::Destroy { discard, .. }) => discard.undo(state, speculative)?,

            (UndoRecord::Shuffled { zone, order, rng }, _) => {
                state.zones.set_order(zone, order);
                state.restore_rng(&rng);
                Some(Event::Shuffled { zone })
            }

            (UndoRecord::Revealed, ActionKind::Reveal { card }) => {
                state.require_card_mut(*card)?.face_down = true;
                Some(Event::Concealed { card: *card })
            }

            (
                UndoRecord::Counter { previous },
                ActionKind::ModifyCounter { target, key, .. } | ActionKind::SetCounter { target, key, .. },
            ) => {
                let before = state.counter(*target, key);
                state.restore_counter(*target, key, previous)?;
                Some(Event::CounterChanged {
                    target: *target,
                    key: key.clone(),
                    before,
                    after: previous,
                })
            }

            (UndoRecord::Attached { previous }, ActionKind::Attach { card, .. }) => {
                state.require_card_mut(*card)?.attached_to = previous;
                Some(Event::Attached {
                    card: *card,
                    to: previous,
                })
            }

            (UndoRecord::Applied { queued_expiry }, ActionKind::ApplyStaticAbility { ability, target, .. }) => {
                if queued_expiry {
                    state.take_expiry(*ability, *target);
                }
                state.remove_modifier(*target, *ability);
                Some(Event::AbilityUnapplied {
                    ability: *ability,
                    target: *target,
                })
            }

            (
                UndoRecord::Unapplied { index, entry, expiry },
                ActionKind::UnapplyStaticAbility { ability, target },
            ) => {
                state.insert_modifier_at(*target, index, entry);
                if let Some((position, queued)) = expiry {
                    state.requeue_expiry_at(position, queued);
                }
                Some(Event::AbilityApplied {
                    ability: *ability,
                    target: *target,
                })
            }

            (UndoRecord::Turn { previous_active }, _) => {
                state.turn_number -= 1;
                state.active_player = previous_active;
                Some(Event::TurnAdvanced {
                    turn: state.turn_number,
                    active: previous_active,
                })
            }

            (UndoRecord::Ended { previous }, _) => {
                state.set_result(previous.clone());
                Some(Event::GameEnded { result: previous })
            }

            (record, kind) => {
                return Err(TimingError::MalformedAction(format!(
                    "undo record {record:?} does not match {:?}",
                    kind.tag()
                )))
            }
        };
        Ok(event)
    }
}

fn owner_of(state: &GameState, card: EntityId) -> Result<PlayerId> {
    state
        .card(card)
        .map(|c| c.owner)
        .ok_or(TimingError::UnknownEntity(card))
}

/// Move a card, stamping a play sequence number if it enters play.
fn relocate(
    state: &mut GameState,
    card: EntityId,
    to: ZoneId,
    position: Option<ZonePosition>,
) -> Result<(Placement, Option<Option<u64>>)> {
    if state.card(card).is_none() {
        return Err(TimingError::UnknownEntity(card));
    }
    if !state.zones.has_zone(to) {
        return Err(TimingError::UnknownZone(to));
    }
    let was_in_play = state.is_in_play(card);
    let from = state
        .zones
        .move_to_zone(card, to, position)
        .ok_or(TimingError::UnknownEntity(card))?;

    let entered = if !was_in_play && state.is_in_play_zone(to) {
        let sequence = state.bump_play_sequence();
        let instance = state.require_card_mut(card)?;
        Some(std::mem::replace(&mut instance.entered_play, Some(sequence)))
    } else {
        None
    };
    Ok((from, entered))
}

fn restore_location(
    state: &mut GameState,
    card: EntityId,
    from: Placement,
    entered: Option<Option<u64>>,
) -> Result<()> {
    state.zones.remove(card);
    state.zones.insert_at(card, from);
    if let Some(previous) = entered {
        state.require_card_mut(card)?.entered_play = previous;
        state.rewind_play_sequence();
    }
    Ok(())
}
