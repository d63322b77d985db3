//! Derived values and their recalculation.
//!
//! An object's derived values are its base values with every in-force
//! `Value` modification on its stack applied oldest first, plus every
//! granted keyword. They are stored in `GameState` so that they are part of
//! the snapshot, and recomputed once per batch for the objects the batch
//! touched. Only the net difference is reported.

use im::{OrdMap, OrdSet};
use serde::{Deserialize, Serialize};

use crate::actions::Event;
use crate::core::{EntityId, GameState};

use super::ability::ModificationKind;
use super::catalogue::AbilityCatalogue;
use super::condition::ConditionEvaluator;

/// Computed values of one object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedValues {
    pub values: OrdMap<String, i64>,
    pub keywords: OrdSet<String>,
}

impl DerivedValues {
    #[must_use]
    pub fn get(&self, stat: &str) -> Option<i64> {
        self.values.get(stat).copied()
    }

    #[must_use]
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.contains(keyword)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.keywords.is_empty()
    }

    /// Value-changed events turning `before` into `after`.
    fn diff(object: EntityId, before: &Self, after: &Self, events: &mut Vec<Event>) {
        let stats: OrdSet<&String> = before.values.keys().chain(after.values.keys()).collect();
        for stat in stats {
            let (old, new) = (before.get(stat), after.get(stat));
            if old != new {
                events.push(Event::ValueChanged {
                    object,
                    stat: stat.clone(),
                    before: old,
                    after: new,
                });
            }
        }
        for keyword in before.keywords.iter().filter(|k| !after.keywords.contains(*k)) {
            events.push(Event::KeywordChanged {
                object,
                keyword: keyword.clone(),
                granted: false,
            });
        }
        for keyword in after.keywords.iter().filter(|k| !before.keywords.contains(*k)) {
            events.push(Event::KeywordChanged {
                object,
                keyword: keyword.clone(),
                granted: true,
            });
        }
    }
}

/// Compute an object's derived values from scratch.
///
/// Returns `None` for objects with nothing to derive.
#[must_use]
pub fn compute(state: &GameState, catalogue: &AbilityCatalogue, object: EntityId) -> Option<DerivedValues> {
    let mut derived = DerivedValues {
        values: state.card(object).map(|c| c.base.clone()).unwrap_or_default(),
        keywords: OrdSet::new(),
    };

    for ability in catalogue.applied_to(state, object) {
        let ctx = catalogue.context(state, ability).with_subject(object);
        for modification in &ability.modifications {
            if !ConditionEvaluator::evaluate(&modification.condition, &ctx) {
                continue;
            }
            match &modification.kind {
                ModificationKind::Value { stat, change } => {
                    let current = derived.get(stat).unwrap_or(0);
                    derived.values.insert(stat.clone(), change.apply(current));
                }
                ModificationKind::Grant(keyword) => {
                    derived.keywords.insert(keyword.clone());
                }
                ModificationKind::Intercept(_) | ModificationKind::Prohibit(_) => {}
            }
        }
    }

    (!derived.is_empty()).then_some(derived)
}

/// What a recalculation changed, for reporting and undo.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Recalculation {
    pub events: Vec<Event>,
    /// Previous stored values, in the order they were replaced.
    pub previous: Vec<(EntityId, Option<DerivedValues>)>,
}

/// Recompute and store derived values for `objects` (each at most once).
pub fn recalculate(
    state: &mut GameState,
    catalogue: &AbilityCatalogue,
    objects: impl IntoIterator<Item = EntityId>,
) -> Recalculation {
    let objects: OrdSet<EntityId> = objects.into_iter().collect();
    let mut result = Recalculation::default();

    for object in objects {
        let new = compute(state, catalogue, object);
        let old = state.derived(object).cloned();
        if new == old {
            continue;
        }
        DerivedValues::diff(
            object,
            &old.clone().unwrap_or_default(),
            &new.clone().unwrap_or_default(),
            &mut result.events,
        );
        let previous = state.set_derived(object, new);
        result.previous.push((object, previous));
    }
    result
}

/// Put back the values a recalculation replaced.
pub fn restore(state: &mut GameState, previous: &[(EntityId, Option<DerivedValues>)]) {
    for (object, values) in previous.iter().rev() {
        state.set_derived(*object, values.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardInstance;
    use crate::core::{PlayerId, ZoneConfig, ZoneId};
    use crate::modifiers::{Condition, StackEntry, StaticAbility, ValueChange};

    fn setup() -> (GameState, AbilityCatalogue, EntityId) {
        let mut state = GameState::new(2, 1);
        let field = ZoneId::new(0);
        state.add_zone(ZoneConfig::field(field, PlayerId::new(0)));
        let knight = state.alloc_entity();
        state
            .add_card(
                CardInstance::new(knight, "Knight", PlayerId::new(0)).with_base("attack", 2),
                field,
            )
            .unwrap();
        (state, AbilityCatalogue::new(), knight)
    }

    #[test]
    fn test_compute_applies_stack_in_order() {
        let (mut state, mut catalogue, knight) = setup();
        let set = catalogue.register(StaticAbility::new("set", knight, PlayerId::new(0)).value("attack", ValueChange::Set(0)));
        let add = catalogue.register(
            StaticAbility::new("add", knight, PlayerId::new(0))
                .value("attack", ValueChange::Add(3))
                .grant("flying"),
        );
        state.push_modifier(knight, StackEntry { ability: add });
        state.push_modifier(knight, StackEntry { ability: set });

        let derived = compute(&state, &catalogue, knight).unwrap();
        assert_eq!(derived.get("attack"), Some(0));
        assert!(derived.has_keyword("flying"));
    }

    #[test]
    fn test_conditional_modification() {
        let (mut state, mut catalogue, knight) = setup();
        let id = catalogue.register(
            StaticAbility::new("charged", knight, PlayerId::new(0)).with_modification(
                crate::modifiers::Modification::new(ModificationKind::Value {
                    stat: "attack".into(),
                    change: ValueChange::Add(5),
                })
                .when(Condition::counter_at_least("charge", 1)),
            ),
        );
        state.push_modifier(knight, StackEntry { ability: id });
        assert_eq!(compute(&state, &catalogue, knight).unwrap().get("attack"), Some(2));

        state.set_counter(knight, "charge", 1).unwrap();
        assert_eq!(compute(&state, &catalogue, knight).unwrap().get("attack"), Some(7));
    }

    #[test]
    fn test_recalculate_reports_net_diff_and_restores() {
        let (mut state, mut catalogue, knight) = setup();
        let id = catalogue.register(
            StaticAbility::new("anthem", knight, PlayerId::new(0))
                .value("attack", ValueChange::Add(1))
                .grant("vigilance"),
        );
        let first = recalculate(&mut state, &catalogue, [knight]);
        assert_eq!(first.events.len(), 1);
        let before = state.snapshot().unwrap();

        state.push_modifier(knight, StackEntry { ability: id });
        let recalc = recalculate(&mut state, &catalogue, [knight, knight]);
        assert_eq!(
            recalc.events,
            vec![
                Event::ValueChanged {
                    object: knight,
                    stat: "attack".into(),
                    before: Some(2),
                    after: Some(3),
                },
                Event::KeywordChanged {
                    object: knight,
                    keyword: "vigilance".into(),
                    granted: true,
                },
            ]
        );

        restore(&mut state, &recalc.previous);
        state.remove_modifier(knight, id);
        assert_eq!(state.snapshot().unwrap(), before);

        // Nothing changed: nothing reported.
        assert!(recalculate(&mut state, &catalogue, [knight]).events.is_empty());
    }

    #[test]
    fn test_players_without_modifiers_have_no_values() {
        let (state, catalogue, _) = setup();
        assert_eq!(compute(&state, &catalogue, EntityId::player_id(0)), None);
    }
}
