//! The `Action` type: one candidate game mutation.
//!
//! Actions are a closed tagged variant. Everything the batch pipeline needs
//! to know about a kind (feasibility, affected objects, identity) is an
//! explicit match over [`ActionKind`], so modifier matchers can be written
//! against [`ActionTag`] instead of probing concrete types.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{AbilityId, EntityId, PlayerId, ZoneId};
use crate::modifiers::Expiry;
use crate::zones::ZonePosition;

use super::execute::UndoRecord;

/// Batch-local action identifier.
///
/// Assigned by the owning `Timing` when the action enters its list
/// (including embedded and replacement actions).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionId(pub u32);

impl ActionId {
    /// Placeholder for actions that have not been placed in a batch yet.
    pub const UNASSIGNED: ActionId = ActionId(u32::MAX);

    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.0 != u32::MAX
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Action({})", self.0)
    }
}

/// What an action does.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Move a card to a zone (`None` position = top).
    MoveCard {
        card: EntityId,
        to: ZoneId,
        position: Option<ZonePosition>,
    },

    /// Top card of the player's deck to their hand.
    Draw { player: PlayerId },

    /// Put a card into its owner's graveyard.
    Discard { card: EntityId },

    /// Destroy an in-play card. Composite: runs its embedded discard.
    Destroy { card: EntityId, discard: Box<Action> },

    /// Put a card into its owner's deck. `None` = unspecified position,
    /// which makes the batch reshuffle that deck afterwards.
    PlaceInDeck {
        card: EntityId,
        position: Option<ZonePosition>,
    },

    /// Shuffle a player's deck.
    Shuffle { player: PlayerId },

    /// Turn a face-down card face up.
    Reveal { card: EntityId },

    /// Add `delta` to a counter. A result below `floor` is impossible.
    ModifyCounter {
        target: EntityId,
        key: String,
        delta: i64,
        floor: Option<i64>,
    },

    SetCounter {
        target: EntityId,
        key: String,
        value: i64,
    },

    /// Attach equipment to a bearer (`None` detaches).
    Attach { card: EntityId, to: Option<EntityId> },

    /// Push a static ability onto an object's modifier stack.
    ApplyStaticAbility {
        ability: AbilityId,
        target: EntityId,
        until: Option<Expiry>,
    },

    /// Pop a static ability off an object's modifier stack.
    UnapplyStaticAbility { ability: AbilityId, target: EntityId },

    AdvanceTurn,

    /// End the game. `None` winner is a draw.
    EndGame { winner: Option<PlayerId> },
}

/// Fieldless mirror of [`ActionKind`] for matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionTag {
    MoveCard,
    Draw,
    Discard,
    Destroy,
    PlaceInDeck,
    Shuffle,
    Reveal,
    ModifyCounter,
    SetCounter,
    Attach,
    ApplyStaticAbility,
    UnapplyStaticAbility,
    AdvanceTurn,
    EndGame,
}

impl ActionKind {
    #[must_use]
    pub fn tag(&self) -> ActionTag {
        match self {
            Self::MoveCard { .. } => ActionTag::MoveCard,
            Self::Draw { .. } => ActionTag::Draw,
            Self::Discard { .. } => ActionTag::Discard,
            Self::Destroy { .. } => ActionTag::Destroy,
            Self::PlaceInDeck { .. } => ActionTag::PlaceInDeck,
            Self::Shuffle { .. } => ActionTag::Shuffle,
            Self::Reveal { .. } => ActionTag::Reveal,
            Self::ModifyCounter { .. } => ActionTag::ModifyCounter,
            Self::SetCounter { .. } => ActionTag::SetCounter,
            Self::Attach { .. } => ActionTag::Attach,
            Self::ApplyStaticAbility { .. } => ActionTag::ApplyStaticAbility,
            Self::UnapplyStaticAbility { .. } => ActionTag::UnapplyStaticAbility,
            Self::AdvanceTurn => ActionTag::AdvanceTurn,
            Self::EndGame { .. } => ActionTag::EndGame,
        }
    }

    /// Structural equality that ignores batch bookkeeping (ids, cancelled
    /// flags, undo records) of embedded actions.
    fn same_shape(&self, other: &ActionKind) -> bool {
        match (self, other) {
            (
                Self::Destroy { card, discard },
                Self::Destroy {
                    card: other_card,
                    discard: other_discard,
                },
            ) => card == other_card && discard.is_identical_to(other_discard),
            _ => self == other,
        }
    }
}

/// One candidate mutation, as placed in a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,

    /// Player performing the action.
    pub player: PlayerId,

    /// Cost group this action belongs to. `None` = not a cost.
    pub cost_group: Option<u32>,

    cancelled: bool,

    /// Card whose effect caused this action.
    pub caused_by: Option<EntityId>,

    /// Player the action is performed on behalf of.
    pub on_behalf_of: Option<PlayerId>,

    pub kind: ActionKind,

    #[serde(skip)]
    pub(crate) undo: Option<UndoRecord>,
}

impl Action {
    pub fn new(player: PlayerId, kind: ActionKind) -> Self {
        Self {
            id: ActionId::UNASSIGNED,
            player,
            cost_group: None,
            cancelled: false,
            caused_by: None,
            on_behalf_of: None,
            kind,
            undo: None,
        }
    }

    pub fn move_card(player: PlayerId, card: EntityId, to: ZoneId) -> Self {
        Self::new(player, ActionKind::MoveCard { card, to, position: None })
    }

    pub fn draw(player: PlayerId) -> Self {
        Self::new(player, ActionKind::Draw { player })
    }

    pub fn discard(player: PlayerId, card: EntityId) -> Self {
        Self::new(player, ActionKind::Discard { card })
    }

    /// Destroy with its embedded discard.
    pub fn destroy(player: PlayerId, card: EntityId) -> Self {
        Self::new(
            player,
            ActionKind::Destroy {
                card,
                discard: Box::new(Self::discard(player, card)),
            },
        )
    }

    pub fn place_in_deck(player: PlayerId, card: EntityId, position: Option<ZonePosition>) -> Self {
        Self::new(player, ActionKind::PlaceInDeck { card, position })
    }

    pub fn shuffle(player: PlayerId) -> Self {
        Self::new(player, ActionKind::Shuffle { player })
    }

    pub fn reveal(player: PlayerId, card: EntityId) -> Self {
        Self::new(player, ActionKind::Reveal { card })
    }

    pub fn modify_counter(player: PlayerId, target: EntityId, key: impl Into<String>, delta: i64) -> Self {
        Self::new(
            player,
            ActionKind::ModifyCounter {
                target,
                key: key.into(),
                delta,
                floor: None,
            },
        )
    }

    pub fn set_counter(player: PlayerId, target: EntityId, key: impl Into<String>, value: i64) -> Self {
        Self::new(
            player,
            ActionKind::SetCounter {
                target,
                key: key.into(),
                value,
            },
        )
    }

    pub fn attach(player: PlayerId, card: EntityId, to: Option<EntityId>) -> Self {
        Self::new(player, ActionKind::Attach { card, to })
    }

    pub fn end_game(player: PlayerId, winner: Option<PlayerId>) -> Self {
        Self::new(player, ActionKind::EndGame { winner })
    }

    /// Place this action in a cost group (builder pattern).
    #[must_use]
    pub fn as_cost(mut self, group: u32) -> Self {
        self.cost_group = Some(group);
        if let ActionKind::Destroy { discard, .. } = &mut self.kind {
            discard.cost_group = Some(group);
        }
        self
    }

    /// Refuse counter results below `floor` (builder pattern).
    /// Only meaningful for `ModifyCounter`.
    #[must_use]
    pub fn with_floor(mut self, value: i64) -> Self {
        if let ActionKind::ModifyCounter { floor, .. } = &mut self.kind {
            *floor = Some(value);
        }
        self
    }

    #[must_use]
    pub fn caused_by(mut self, source: EntityId) -> Self {
        self.caused_by = Some(source);
        self
    }

    #[must_use]
    pub fn on_behalf_of(mut self, player: PlayerId) -> Self {
        self.on_behalf_of = Some(player);
        self
    }

    #[must_use]
    pub fn tag(&self) -> ActionTag {
        self.kind.tag()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Whether `run` has happened without a matching `undo`.
    #[must_use]
    pub fn has_run(&self) -> bool {
        self.undo.is_some()
    }

    /// Cancel this action and everything it structurally implies.
    ///
    /// Returns every action newly cancelled by this call, each once.
    /// Cancelling is permanent.
    pub fn set_cancelled(&mut self) -> Vec<ActionId> {
        let mut cancelled = Vec::new();
        if !self.cancelled {
            self.cancelled = true;
            cancelled.push(self.id);
        }
        if let ActionKind::Destroy { discard, .. } = &mut self.kind {
            cancelled.extend(discard.set_cancelled());
        }
        cancelled
    }

    /// Would replacing `self` with `other` change nothing?
    #[must_use]
    pub fn is_identical_to(&self, other: &Action) -> bool {
        self.player == other.player && self.kind.same_shape(&other.kind)
    }

    /// Cards and players this action targets.
    #[must_use]
    pub fn affected_objects(&self) -> SmallVec<[EntityId; 2]> {
        let mut objects = SmallVec::new();
        match &self.kind {
            ActionKind::MoveCard { card, .. }
            | ActionKind::Discard { card }
            | ActionKind::Destroy { card, .. }
            | ActionKind::PlaceInDeck { card, .. }
            | ActionKind::Reveal { card } => objects.push(*card),
            ActionKind::Draw { player } | ActionKind::Shuffle { player } => {
                objects.push(EntityId::player(*player));
            }
            ActionKind::ModifyCounter { target, .. }
            | ActionKind::SetCounter { target, .. }
            | ActionKind::ApplyStaticAbility { target, .. }
            | ActionKind::UnapplyStaticAbility { target, .. } => objects.push(*target),
            ActionKind::Attach { card, to } => {
                objects.push(*card);
                objects.extend(*to);
            }
            ActionKind::AdvanceTurn | ActionKind::EndGame { .. } => {}
        }
        objects
    }

    /// Assign ids to this action and any embedded actions.
    pub(crate) fn assign_ids(&mut self, next: &mut u32) {
        self.id = ActionId(*next);
        *next += 1;
        if let ActionKind::Destroy { discard, .. } = &mut self.kind {
            discard.assign_ids(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p0() -> PlayerId {
        PlayerId::new(0)
    }

    #[test]
    fn test_cancel_composite_reports_each_once() {
        let mut destroy = Action::destroy(p0(), EntityId(10));
        let mut next = 0;
        destroy.assign_ids(&mut next);

        let cancelled = destroy.set_cancelled();
        assert_eq!(cancelled, vec![ActionId(0), ActionId(1)]);
        assert!(destroy.is_cancelled());
        match &destroy.kind {
            ActionKind::Destroy { discard, .. } => assert!(discard.is_cancelled()),
            _ => unreachable!(),
        }

        // Second call reports nothing new.
        assert!(destroy.set_cancelled().is_empty());
    }

    #[test]
    fn test_identity_ignores_ids() {
        let mut a = Action::destroy(p0(), EntityId(10));
        let b = Action::destroy(p0(), EntityId(10));
        let mut next = 5;
        a.assign_ids(&mut next);

        assert!(a.is_identical_to(&b));
        assert!(!a.is_identical_to(&Action::destroy(p0(), EntityId(11))));
        assert!(!a.is_identical_to(&Action::destroy(PlayerId::new(1), EntityId(10))));
    }

    #[test]
    fn test_as_cost_reaches_embedded_discard() {
        let destroy = Action::destroy(p0(), EntityId(10)).as_cost(2);
        match &destroy.kind {
            ActionKind::Destroy { discard, .. } => assert_eq!(discard.cost_group, Some(2)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_affected_objects() {
        let draw = Action::draw(PlayerId::new(1));
        assert_eq!(draw.affected_objects().as_slice(), &[EntityId::player_id(1)]);

        let attach = Action::attach(p0(), EntityId(10), Some(EntityId(11)));
        assert_eq!(attach.affected_objects().as_slice(), &[EntityId(10), EntityId(11)]);

        assert!(Action::new(p0(), ActionKind::AdvanceTurn).affected_objects().is_empty());
    }

    #[test]
    fn test_tags() {
        assert_eq!(Action::shuffle(p0()).tag(), ActionTag::Shuffle);
        assert_eq!(
            Action::modify_counter(p0(), EntityId(0), "life", -1).with_floor(0).kind,
            ActionKind::ModifyCounter {
                target: EntityId(0),
                key: "life".into(),
                delta: -1,
                floor: Some(0),
            }
        );
    }
}
