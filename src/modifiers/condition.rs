//! Modifier conditions.
//!
//! Conditions gate static abilities: which objects an ability applies to,
//! whether it is active, whether a modification is in force and which
//! actions an interception matches. They are evaluated lazily, each time
//! they are consulted, against the current state.
//!
//! Relations (`You`, `Opponent`) are relative to the ability's controller.

use serde::{Deserialize, Serialize};

use crate::actions::{Action, ActionTag};
use crate::core::{EntityId, GameState, PlayerId, ZoneId};

use super::AbilityCatalogue;

/// Player relation, relative to an ability's controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    You,
    Opponent,
    Any,
}

impl Relation {
    #[must_use]
    pub fn holds(self, player: PlayerId, controller: PlayerId) -> bool {
        match self {
            Self::You => player == controller,
            Self::Opponent => player != controller,
            Self::Any => true,
        }
    }
}

/// A condition over the game state, an optional subject and an optional
/// action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    // === Subject filters ===

    /// Subject is the ability's own source.
    IsSource,

    SubjectIsPlayer,

    SubjectIsCard,

    /// Subject is a card in an in-play zone.
    SubjectInPlay,

    SubjectInZone(ZoneId),

    SubjectControlledBy(Relation),

    SubjectCounterAtLeast { key: String, min: i64 },

    /// Subject is face down.
    SubjectFaceDown,

    // === Source / game filters ===

    SourceInPlay,

    /// Whose turn it is.
    TurnOf(Relation),

    // === Action filters ===

    ActionIs(ActionTag),

    /// The acting player.
    ActorIs(Relation),

    /// The action was caused by a card effect.
    CausedByEffect,

    /// The action was caused by an effect of a card an opponent controls.
    CausedByOpponentEffect,

    // === Combinators ===

    All(Vec<Condition>),

    Any(Vec<Condition>),

    Not(Box<Condition>),

    // === Special ===

    Always,

    Never,

    /// Custom condition, evaluated by a function registered in the
    /// ability catalogue under this key.
    Custom(String),
}

impl Condition {
    pub fn controlled_by(relation: Relation) -> Self {
        Self::SubjectControlledBy(relation)
    }

    pub fn action_is(tag: ActionTag) -> Self {
        Self::ActionIs(tag)
    }

    pub fn counter_at_least(key: impl Into<String>, min: i64) -> Self {
        Self::SubjectCounterAtLeast { key: key.into(), min }
    }

    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::All(conditions.into_iter().collect())
    }

    pub fn any(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::Any(conditions.into_iter().collect())
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Add another condition with AND.
    pub fn and(self, other: Condition) -> Self {
        match self {
            Self::All(mut conditions) => {
                conditions.push(other);
                Self::All(conditions)
            }
            Self::Always => other,
            _ => Self::All(vec![self, other]),
        }
    }

    /// Add another condition with OR.
    pub fn or(self, other: Condition) -> Self {
        match self {
            Self::Any(mut conditions) => {
                conditions.push(other);
                Self::Any(conditions)
            }
            _ => Self::Any(vec![self, other]),
        }
    }
}

/// What a condition is evaluated against.
pub struct ConditionContext<'a> {
    pub state: &'a GameState,

    /// Ability source card.
    pub source: EntityId,

    /// Ability controller; relations are relative to this player.
    pub controller: PlayerId,

    /// Object under consideration (target candidate, modified object).
    pub subject: Option<EntityId>,

    /// Action under consideration (interceptions, prohibitions).
    pub action: Option<&'a Action>,

    /// Catalogue holding custom evaluators.
    pub catalogue: Option<&'a AbilityCatalogue>,
}

impl<'a> ConditionContext<'a> {
    pub fn new(state: &'a GameState, source: EntityId, controller: PlayerId) -> Self {
        Self {
            state,
            source,
            controller,
            subject: None,
            action: None,
            catalogue: None,
        }
    }

    #[must_use]
    pub fn with_subject(mut self, subject: EntityId) -> Self {
        self.subject = Some(subject);
        self
    }

    #[must_use]
    pub fn with_action(mut self, action: &'a Action) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn with_catalogue(mut self, catalogue: &'a AbilityCatalogue) -> Self {
        self.catalogue = Some(catalogue);
        self
    }
}

/// Evaluator for modifier conditions.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Check if a condition is satisfied. Subject and action filters are
    /// false when the context has no subject or action.
    pub fn evaluate(condition: &Condition, ctx: &ConditionContext) -> bool {
        let state = ctx.state;
        match condition {
            Condition::IsSource => ctx.subject == Some(ctx.source),

            Condition::SubjectIsPlayer => ctx.subject.is_some_and(|s| state.is_player(s)),

            Condition::SubjectIsCard => ctx.subject.is_some_and(|s| state.card(s).is_some()),

            Condition::SubjectInPlay => ctx.subject.is_some_and(|s| state.is_in_play(s)),

            Condition::SubjectInZone(zone) => ctx.subject.is_some_and(|s| state.zones.is_in_zone(s, *zone)),

            Condition::SubjectControlledBy(relation) => ctx
                .subject
                .and_then(|s| state.controller_of(s))
                .is_some_and(|p| relation.holds(p, ctx.controller)),

            Condition::SubjectCounterAtLeast { key, min } => ctx
                .subject
                .and_then(|s| state.counter(s, key))
                .is_some_and(|v| v >= *min),

            Condition::SubjectFaceDown => ctx
                .subject
                .and_then(|s| state.card(s))
                .is_some_and(|c| c.face_down),

            Condition::SourceInPlay => state.is_in_play(ctx.source),

            Condition::TurnOf(relation) => relation.holds(state.active_player, ctx.controller),

            Condition::ActionIs(tag) => ctx.action.is_some_and(|a| a.tag() == *tag),

            Condition::ActorIs(relation) => ctx.action.is_some_and(|a| relation.holds(a.player, ctx.controller)),

            Condition::CausedByEffect => ctx.action.is_some_and(|a| a.caused_by.is_some()),

            Condition::CausedByOpponentEffect => ctx
                .action
                .and_then(|a| a.caused_by)
                .and_then(|cause| state.controller_of(cause))
                .is_some_and(|p| p != ctx.controller),

            Condition::All(conditions) => conditions.iter().all(|c| Self::evaluate(c, ctx)),

            Condition::Any(conditions) => conditions.iter().any(|c| Self::evaluate(c, ctx)),

            Condition::Not(inner) => !Self::evaluate(inner, ctx),

            Condition::Always => true,

            Condition::Never => false,

            Condition::Custom(key) => ctx
                .catalogue
                .and_then(|catalogue| catalogue.custom_condition(key))
                .is_some_and(|eval| eval(ctx)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardInstance;
    use crate::core::ZoneConfig;

    fn setup() -> (GameState, EntityId, EntityId) {
        let mut state = GameState::new(2, 1);
        let field = ZoneId::new(0);
        let hand = ZoneId::new(1);
        state.add_zone(ZoneConfig::field(field, PlayerId::new(0)));
        state.add_zone(ZoneConfig::hand(hand, PlayerId::new(1)));
        let mine = state.alloc_entity();
        let theirs = state.alloc_entity();
        state.add_card(CardInstance::new(mine, "Mine", PlayerId::new(0)), field).unwrap();
        state.add_card(CardInstance::new(theirs, "Theirs", PlayerId::new(1)).face_down(), hand).unwrap();
        (state, mine, theirs)
    }

    fn eval(condition: &Condition, ctx: &ConditionContext) -> bool {
        ConditionEvaluator::evaluate(condition, ctx)
    }

    #[test]
    fn test_subject_filters() {
        let (state, mine, theirs) = setup();
        let ctx = ConditionContext::new(&state, mine, PlayerId::new(0));

        let on_mine = ConditionContext::new(&state, mine, PlayerId::new(0)).with_subject(mine);
        let on_theirs = ConditionContext::new(&state, mine, PlayerId::new(0)).with_subject(theirs);

        assert!(eval(&Condition::IsSource, &on_mine));
        assert!(eval(&Condition::SubjectInPlay, &on_mine));
        assert!(!eval(&Condition::SubjectInPlay, &on_theirs));
        assert!(eval(&Condition::controlled_by(Relation::Opponent), &on_theirs));
        assert!(eval(&Condition::SubjectFaceDown, &on_theirs));

        // No subject: subject filters are false.
        assert!(!eval(&Condition::SubjectIsCard, &ctx));
        assert!(eval(&Condition::SourceInPlay, &ctx));
    }

    #[test]
    fn test_player_subject() {
        let (mut state, mine, _) = setup();
        let player = EntityId::player_id(1);
        state.set_counter(player, "life", 5).unwrap();
        let ctx = ConditionContext::new(&state, mine, PlayerId::new(0)).with_subject(player);

        assert!(eval(&Condition::SubjectIsPlayer, &ctx));
        assert!(eval(&Condition::controlled_by(Relation::Opponent), &ctx));
        assert!(eval(&Condition::counter_at_least("life", 5), &ctx));
        assert!(!eval(&Condition::counter_at_least("life", 6), &ctx));
    }

    #[test]
    fn test_action_filters() {
        let (state, mine, theirs) = setup();
        let action = Action::discard(PlayerId::new(1), mine).caused_by(theirs);
        let ctx = ConditionContext::new(&state, mine, PlayerId::new(0)).with_action(&action);

        assert!(eval(&Condition::action_is(ActionTag::Discard), &ctx));
        assert!(!eval(&Condition::action_is(ActionTag::Draw), &ctx));
        assert!(eval(&Condition::ActorIs(Relation::Opponent), &ctx));
        assert!(eval(&Condition::CausedByEffect, &ctx));
        assert!(eval(&Condition::CausedByOpponentEffect, &ctx));
    }

    #[test]
    fn test_combinators() {
        let (state, mine, _) = setup();
        let ctx = ConditionContext::new(&state, mine, PlayerId::new(0)).with_subject(mine);

        assert!(eval(&Condition::all([Condition::Always, Condition::IsSource]), &ctx));
        assert!(!eval(&Condition::all([Condition::Always, Condition::Never]), &ctx));
        assert!(eval(&Condition::any([Condition::Never, Condition::IsSource]), &ctx));
        assert!(eval(&Condition::Never.negate(), &ctx));
        assert_eq!(Condition::Always.and(Condition::IsSource), Condition::IsSource);
        assert!(eval(&Condition::TurnOf(Relation::You), &ctx));
    }

    #[test]
    fn test_custom_needs_catalogue() {
        let (state, mine, _) = setup();
        let mut catalogue = AbilityCatalogue::new();
        catalogue.register_condition("always_true", |_ctx| true);

        let bare = ConditionContext::new(&state, mine, PlayerId::new(0));
        assert!(!eval(&Condition::Custom("always_true".into()), &bare));

        let with = ConditionContext::new(&state, mine, PlayerId::new(0)).with_catalogue(&catalogue);
        assert!(eval(&Condition::Custom("always_true".into()), &with));
        assert!(!eval(&Condition::Custom("missing".into()), &with));
    }
}
