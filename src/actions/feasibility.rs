//! Three-tier feasibility: impossible, possible, fully possible.
//!
//! *Impossible* means the action cannot happen at all right now; the batch
//! cancels it during pruning. *Fully possible* is the stronger check used
//! for cost groups: it also accounts for the other actions in the same
//! batch competing for the same resource. Kinds without a competing
//! resource fall back to `is_possible`.
//!
//! | Kind | Competing resource |
//! |------|--------------------|
//! | `MoveCard`, `PlaceInDeck`, `Discard`, `Destroy`, `Draw` | destination zone capacity |
//! | `Draw` | cards left in the deck |
//! | `ModifyCounter` with a floor | the counter's headroom above the floor |

use crate::core::{EntityId, GameState, PlayerId, ZoneId, ZoneRole};

use super::{Action, ActionKind};

impl Action {
    /// The action cannot occur at all in the current state.
    #[must_use]
    pub fn is_impossible(&self, state: &GameState) -> bool {
        if state.is_game_over() {
            return true;
        }
        match &self.kind {
            ActionKind::MoveCard { card, to, .. } => {
                !state.zones.has_zone(*to)
                    || state.card(*card).is_none()
                    || state.zones.is_in_zone(*card, *to)
                    || is_full(state, *to)
            }

            ActionKind::Draw { player } => match deck_and_hand(state, *player) {
                Some((deck, hand)) => state.zones.zone_size(deck) == 0 || is_full(state, hand),
                None => true,
            },

            ActionKind::Discard { card } => match owned_zone(state, *card, ZoneRole::Graveyard) {
                Some(graveyard) => state.zones.is_in_zone(*card, graveyard) || is_full(state, graveyard),
                None => true,
            },

            ActionKind::Destroy { card, discard } => !state.is_in_play(*card) || discard.is_impossible(state),

            ActionKind::PlaceInDeck { card, .. } => match owned_zone(state, *card, ZoneRole::Deck) {
                Some(deck) => state.zones.is_in_zone(*card, deck) || is_full(state, deck),
                None => true,
            },

            ActionKind::Shuffle { player } => state.find_zone(*player, ZoneRole::Deck).is_none(),

            ActionKind::Reveal { card } => !state.card(*card).is_some_and(|c| c.face_down),

            ActionKind::ModifyCounter {
                target,
                key,
                delta,
                floor,
            } => {
                if !state.exists(*target) {
                    return true;
                }
                match state.counter(*target, key).unwrap_or(0).checked_add(*delta) {
                    Some(after) => floor.is_some_and(|floor| after < floor),
                    None => true,
                }
            }

            ActionKind::SetCounter { target, .. } => !state.exists(*target),

            ActionKind::Attach { card, to } => {
                state.card(*card).is_none()
                    || to.is_some_and(|bearer| bearer == *card || !state.is_in_play(bearer))
            }

            ActionKind::ApplyStaticAbility { ability, target, .. } => {
                !state.exists(*target) || state.is_applied(*ability, *target)
            }

            ActionKind::UnapplyStaticAbility { ability, target } => !state.is_applied(*ability, *target),

            ActionKind::AdvanceTurn | ActionKind::EndGame { .. } => false,
        }
    }

    #[must_use]
    pub fn is_possible(&self, state: &GameState) -> bool {
        !self.is_impossible(state)
    }

    /// Possible even counting every competing action in `batch`.
    ///
    /// `batch` may or may not contain `self`; cancelled actions in it are
    /// ignored.
    #[must_use]
    pub fn is_fully_possible(&self, state: &GameState, batch: &[Action]) -> bool {
        if self.is_cancelled() || self.is_impossible(state) {
            return false;
        }
        let others = batch.iter().filter(|a| !a.is_cancelled() && a.id != self.id);

        if let Some((_, zone)) = self.destination(state) {
            if let Some(max) = state.zone_config(zone).and_then(|z| z.max_cards) {
                let incoming = others
                    .clone()
                    .filter_map(|a| a.destination(state))
                    .filter(|(other, dest)| *dest == zone && !state.zones.is_in_zone(*other, zone))
                    .count()
                    + 1;
                if state.zones.zone_size(zone) + incoming > max {
                    return false;
                }
            }
        }

        match &self.kind {
            ActionKind::Draw { player } => {
                let draws = others
                    .filter(|a| matches!(a.kind, ActionKind::Draw { player: p } if p == *player))
                    .count()
                    + 1;
                deck_and_hand(state, *player).is_some_and(|(deck, _)| state.zones.zone_size(deck) >= draws)
            }

            ActionKind::ModifyCounter {
                target,
                key,
                delta,
                floor: Some(floor),
            } => {
                let total = others
                    .filter_map(|a| match &a.kind {
                        ActionKind::ModifyCounter {
                            target: t, key: k, delta: d, ..
                        } if t == target && k == key => Some(*d),
                        _ => None,
                    })
                    .try_fold(*delta, i64::checked_add);
                total
                    .and_then(|total| state.counter(*target, key).unwrap_or(0).checked_add(total))
                    .is_some_and(|after| after >= *floor)
            }

            _ => true,
        }
    }

    /// Card and zone an action moves a card into, if it is a move.
    ///
    /// Draw reports the player entity as the "card" since the drawn card is
    /// not known until the action runs.
    fn destination(&self, state: &GameState) -> Option<(EntityId, ZoneId)> {
        match &self.kind {
            ActionKind::MoveCard { card, to, .. } => Some((*card, *to)),
            ActionKind::Discard { card } => Some((*card, owned_zone(state, *card, ZoneRole::Graveyard)?)),
            ActionKind::Destroy { discard, .. } => discard.destination(state),
            ActionKind::PlaceInDeck { card, .. } => Some((*card, owned_zone(state, *card, ZoneRole::Deck)?)),
            ActionKind::Draw { player } => Some((EntityId::player(*player), deck_and_hand(state, *player)?.1)),
            _ => None,
        }
    }
}

/// No room left under the zone's `max_cards`.
fn is_full(state: &GameState, zone: ZoneId) -> bool {
    state
        .zone_config(zone)
        .and_then(|z| z.max_cards)
        .is_some_and(|max| state.zones.zone_size(zone) >= max)
}

/// The zone with `role` belonging to a card's owner.
fn owned_zone(state: &GameState, card: EntityId, role: ZoneRole) -> Option<ZoneId> {
    let owner = state.card(card)?.owner;
    state.find_zone(owner, role)
}

fn deck_and_hand(state: &GameState, player: PlayerId) -> Option<(ZoneId, ZoneId)> {
    Some((
        state.find_zone(player, ZoneRole::Deck)?,
        state.find_zone(player, ZoneRole::Hand)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionId;
    use crate::cards::CardInstance;
    use crate::core::ZoneConfig;

    fn state_with_field(capacity: usize, in_hand: usize) -> (GameState, ZoneId, Vec<EntityId>) {
        let p0 = PlayerId::new(0);
        let mut state = GameState::new(2, 1);
        let deck = ZoneId::new(0);
        let hand = ZoneId::new(1);
        let field = ZoneId::new(2);
        state.add_zone(ZoneConfig::deck(deck, p0));
        state.add_zone(ZoneConfig::hand(hand, p0));
        state.add_zone(ZoneConfig::field(field, p0).with_max_cards(capacity));
        let mut cards = Vec::new();
        for _ in 0..in_hand {
            let id = state.alloc_entity();
            state.add_card(CardInstance::new(id, "unit", p0), hand).unwrap();
            cards.push(id);
        }
        (state, field, cards)
    }

    fn with_ids(mut actions: Vec<Action>) -> Vec<Action> {
        let mut next = 0;
        for action in &mut actions {
            action.assign_ids(&mut next);
        }
        actions
    }

    #[test]
    fn test_capacity_counts_competing_moves() {
        let p0 = PlayerId::new(0);
        let (state, field, cards) = state_with_field(1, 2);
        let batch = with_ids(vec![
            Action::move_card(p0, cards[0], field),
            Action::move_card(p0, cards[1], field),
        ]);

        assert!(batch[0].is_possible(&state));
        assert!(batch[0].is_fully_possible(&state, &batch[..1]));
        assert!(!batch[0].is_fully_possible(&state, &batch));

        let mut cancelled = batch.clone();
        cancelled[1].set_cancelled();
        assert!(cancelled[0].is_fully_possible(&state, &cancelled));
    }

    #[test]
    fn test_full_zone_makes_moves_impossible() {
        let p0 = PlayerId::new(0);
        let (mut state, field, cards) = state_with_field(1, 2);
        let graveyard = ZoneId::new(3);
        state.add_zone(ZoneConfig::graveyard(graveyard, p0).with_max_cards(1));
        assert!(Action::move_card(p0, cards[0], field).is_possible(&state));

        Action::move_card(p0, cards[0], field).run(&mut state, false).unwrap();
        assert!(Action::move_card(p0, cards[1], field).is_impossible(&state));
        assert!(Action::discard(p0, cards[1]).is_possible(&state));

        Action::discard(p0, cards[1]).run(&mut state, false).unwrap();
        assert!(Action::discard(p0, cards[0]).is_impossible(&state));
        assert!(Action::destroy(p0, cards[0]).is_impossible(&state));
    }

    #[test]
    fn test_draw_counts_deck() {
        let p0 = PlayerId::new(0);
        let (mut state, _, _) = state_with_field(5, 0);
        assert!(Action::draw(p0).is_impossible(&state));

        let id = state.alloc_entity();
        state.add_card(CardInstance::new(id, "top", p0), ZoneId::new(0)).unwrap();
        let batch = with_ids(vec![Action::draw(p0), Action::draw(p0)]);
        assert!(batch[0].is_possible(&state));
        assert!(!batch[0].is_fully_possible(&state, &batch));
    }

    #[test]
    fn test_counter_floor_sums_deltas() {
        let p0 = PlayerId::new(0);
        let (mut state, _, _) = state_with_field(5, 0);
        let me = EntityId::player(p0);
        state.set_counter(me, "mana", 3).unwrap();

        let batch = with_ids(vec![
            Action::modify_counter(p0, me, "mana", -2).with_floor(0),
            Action::modify_counter(p0, me, "mana", -2).with_floor(0),
        ]);
        assert!(batch[0].is_possible(&state));
        assert!(!batch[0].is_fully_possible(&state, &batch));
        assert!(Action::modify_counter(p0, me, "mana", -4).with_floor(0).is_impossible(&state));
    }

    #[test]
    fn test_counter_overflow_not_possible() {
        let p0 = PlayerId::new(0);
        let (mut state, _, _) = state_with_field(5, 0);
        let me = EntityId::player(p0);
        state.set_counter(me, "gold", 1).unwrap();
        assert!(Action::modify_counter(p0, me, "gold", i64::MAX).is_impossible(&state));

        let batch = with_ids(vec![
            Action::modify_counter(p0, me, "gold", i64::MAX - 1).with_floor(0),
            Action::modify_counter(p0, me, "gold", i64::MAX - 1).with_floor(0),
        ]);
        assert!(batch[0].is_possible(&state));
        assert!(!batch[0].is_fully_possible(&state, &batch));
    }

    #[test]
    fn test_destroy_requires_in_play() {
        let p0 = PlayerId::new(0);
        let (mut state, field, cards) = state_with_field(5, 1);
        state.add_zone(ZoneConfig::graveyard(ZoneId::new(3), p0));
        let destroy = Action::destroy(p0, cards[0]);
        assert!(destroy.is_impossible(&state));

        let mut play = Action::move_card(p0, cards[0], field);
        play.id = ActionId(0);
        play.run(&mut state, false).unwrap();
        assert!(destroy.is_possible(&state));
    }

    #[test]
    fn test_everything_impossible_after_game_over() {
        let p0 = PlayerId::new(0);
        let (mut state, _, _) = state_with_field(5, 0);
        let advance = Action::new(p0, ActionKind::AdvanceTurn);
        assert!(advance.is_possible(&state));
        state.set_result(Some(crate::core::GameResult::Draw));
        assert!(advance.is_impossible(&state));
    }
}
