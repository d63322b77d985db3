//! Ambient static-ability phasing.
//!
//! Before scripted logic observes the game, every phased ability must be
//! applied to exactly the objects its target condition selects right now.
//! Phasing computes the difference between the desired and the current
//! applications and expresses it as apply/unapply actions, so that it runs
//! as an ordinary (undoable) batch. Temporary applications whose expiry has
//! passed are removed the same way.

use im::OrdSet;

use crate::actions::{Action, ActionKind};
use crate::core::{AbilityId, EntityId, GameState, PlayerId};

use super::catalogue::AbilityCatalogue;

/// Actions that bring every phased ability up to date. Empty when nothing
/// changed.
#[must_use]
pub fn phasing_actions(state: &GameState, catalogue: &AbilityCatalogue) -> Vec<Action> {
    let mut actions = Vec::new();
    let mut removed: OrdSet<(AbilityId, EntityId)> = OrdSet::new();

    for entry in state.expiries() {
        if entry.expiry.is_expired(state.turn_number) && state.is_applied(entry.ability, entry.target) {
            let Some(ability) = catalogue.get(entry.ability) else {
                continue;
            };
            removed.insert((entry.ability, entry.target));
            actions.push(unapply(ability.controller, ability.source, entry.ability, entry.target));
        }
    }

    let candidates: Vec<EntityId> = state
        .players()
        .map(EntityId::player)
        .chain(state.cards_in_play().map(|c| c.entity_id))
        .collect();

    for ability in catalogue.iter().filter(|a| a.phased) {
        let desired: OrdSet<EntityId> = if catalogue.is_active(state, ability) {
            candidates
                .iter()
                .copied()
                .filter(|c| catalogue.targets(state, ability, *c))
                .collect()
        } else {
            OrdSet::new()
        };
        let current = state.applied_targets(ability.id);

        for target in current.iter().filter(|t| !desired.contains(*t)) {
            if removed.insert((ability.id, *target)).is_none() {
                actions.push(unapply(ability.controller, ability.source, ability.id, *target));
            }
        }
        for target in desired.iter().filter(|t| !current.contains(*t)) {
            actions.push(
                Action::new(
                    ability.controller,
                    ActionKind::ApplyStaticAbility {
                        ability: ability.id,
                        target: *target,
                        until: None,
                    },
                )
                .caused_by(ability.source),
            );
        }
    }
    actions
}

fn unapply(controller: PlayerId, source: EntityId, ability: AbilityId, target: EntityId) -> Action {
    Action::new(controller, ActionKind::UnapplyStaticAbility { ability, target }).caused_by(source)
}
