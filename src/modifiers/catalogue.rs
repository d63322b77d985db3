//! Static ability catalogue.
//!
//! The catalogue stores ability definitions by id and answers the questions
//! the batch pipeline asks about them: does this ability apply to that
//! object, is it active, which interceptions on an object's stack match an
//! action, is an action prohibited. It also holds the evaluators for
//! `Condition::Custom` keys.
//!
//! The catalogue is not part of the undoable state: abilities are
//! registered when cards are created and stay registered. Whether an
//! ability is *applied* is state (modifier stacks), and how often it was
//! used is state too.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::actions::Action;
use crate::core::{AbilityId, EntityId, GameState, Result, TimingError};

use super::ability::{Interception, ModificationKind, StaticAbility};
use super::condition::{ConditionContext, ConditionEvaluator};

/// Evaluator for a `Condition::Custom` key.
pub type CustomCondition = dyn Fn(&ConditionContext<'_>) -> bool + Send + Sync;

/// Registry of static abilities.
#[derive(Clone, Default)]
pub struct AbilityCatalogue {
    abilities: FxHashMap<AbilityId, StaticAbility>,

    /// Registration order, for deterministic iteration.
    order: Vec<AbilityId>,

    by_source: FxHashMap<EntityId, Vec<AbilityId>>,

    conditions: FxHashMap<String, Arc<CustomCondition>>,

    next_id: u32,
}

impl AbilityCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an ability, returns its ID.
    pub fn register(&mut self, mut ability: StaticAbility) -> AbilityId {
        self.next_id += 1;
        let id = AbilityId::new(self.next_id);
        ability.id = id;
        self.by_source.entry(ability.source).or_default().push(id);
        self.order.push(id);
        self.abilities.insert(id, ability);
        id
    }

    /// Register the evaluator for a `Condition::Custom` key.
    pub fn register_condition(
        &mut self,
        key: impl Into<String>,
        eval: impl Fn(&ConditionContext<'_>) -> bool + Send + Sync + 'static,
    ) {
        self.conditions.insert(key.into(), Arc::new(eval));
    }

    #[must_use]
    pub fn custom_condition(&self, key: &str) -> Option<&CustomCondition> {
        self.conditions.get(key).map(|eval| eval.as_ref())
    }

    #[must_use]
    pub fn get(&self, id: AbilityId) -> Option<&StaticAbility> {
        self.abilities.get(&id)
    }

    pub fn require(&self, id: AbilityId) -> Result<&StaticAbility> {
        self.abilities.get(&id).ok_or(TimingError::UnknownAbility(id))
    }

    /// All abilities in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &StaticAbility> + '_ {
        self.order.iter().filter_map(|id| self.abilities.get(id))
    }

    /// Abilities printed on a card.
    pub fn from_source(&self, source: EntityId) -> impl Iterator<Item = &StaticAbility> + '_ {
        self.by_source
            .get(&source)
            .into_iter()
            .flatten()
            .filter_map(|id| self.abilities.get(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }

    /// Evaluation context for an ability.
    pub fn context<'a>(&'a self, state: &'a GameState, ability: &StaticAbility) -> ConditionContext<'a> {
        ConditionContext::new(state, ability.source, ability.controller).with_catalogue(self)
    }

    /// Source in play and `active` holds.
    #[must_use]
    pub fn is_active(&self, state: &GameState, ability: &StaticAbility) -> bool {
        state.is_in_play(ability.source)
            && ConditionEvaluator::evaluate(
                &ability.active,
                &self.context(state, ability).with_subject(ability.source),
            )
    }

    /// Does the ability's target condition select `subject`?
    #[must_use]
    pub fn targets(&self, state: &GameState, ability: &StaticAbility, subject: EntityId) -> bool {
        ConditionEvaluator::evaluate(&ability.targets, &self.context(state, ability).with_subject(subject))
    }

    /// Use limit reached for the current turn?
    #[must_use]
    pub fn is_exhausted(&self, state: &GameState, ability: &StaticAbility) -> bool {
        ability.is_exhausted(&state.ability_uses(ability.id), state.turn_number)
    }

    /// Abilities applied to `object`, oldest first.
    pub fn applied_to<'a>(&'a self, state: &'a GameState, object: EntityId) -> impl Iterator<Item = &'a StaticAbility> + 'a {
        state
            .modifier_stack(object)
            .into_iter()
            .flat_map(|stack| stack.abilities())
            .filter_map(|id| self.abilities.get(&id))
    }

    /// Interceptions on `object`'s stack that match `action` right now,
    /// in stack order.
    pub fn interceptions<'a>(
        &'a self,
        state: &'a GameState,
        action: &'a Action,
        object: EntityId,
    ) -> Vec<(&'a StaticAbility, &'a Interception)> {
        let mut matches = Vec::new();
        for ability in self.applied_to(state, object) {
            let ctx = self.context(state, ability).with_subject(object).with_action(action);
            for modification in &ability.modifications {
                if let ModificationKind::Intercept(interception) = &modification.kind {
                    if ConditionEvaluator::evaluate(&modification.condition, &ctx)
                        && ConditionEvaluator::evaluate(&interception.matcher, &ctx)
                    {
                        matches.push((ability, interception));
                    }
                }
            }
        }
        matches
    }

    /// Is any affected object of `action` protected from it?
    #[must_use]
    pub fn is_prohibited(&self, state: &GameState, action: &Action) -> bool {
        action.affected_objects().into_iter().any(|object| {
            self.applied_to(state, object).any(|ability| {
                let ctx = self.context(state, ability).with_subject(object).with_action(action);
                ability.modifications.iter().any(|modification| match &modification.kind {
                    ModificationKind::Prohibit(matcher) => {
                        ConditionEvaluator::evaluate(&modification.condition, &ctx)
                            && ConditionEvaluator::evaluate(matcher, &ctx)
                    }
                    _ => false,
                })
            })
        })
    }
}
