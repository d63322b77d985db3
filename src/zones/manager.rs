//! Zone manager for card locations and movement.
//!
//! Every zone keeps its members in an `im::Vector` (top = end). Removal
//! reports the index a card left from so that undo can put it back exactly
//! where it was, which keeps round-trip snapshots byte-identical.

use im::{OrdMap, Vector};
use serde::{Deserialize, Serialize};

use crate::core::{EntityId, GameRng, ZoneId};

/// Position for inserting a card into a zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZonePosition {
    /// Top of the zone (end of the list).
    Top,
    /// Bottom of the zone (index 0).
    Bottom,
    /// Insert at a specific index, clamped to the zone size.
    Index(usize),
}

/// Where a card was before it moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub zone: ZoneId,
    pub index: usize,
}

/// Tracks which zone every card is in and the order within each zone.
///
/// ```
/// use ccg_timing::zones::{ZoneManager, ZonePosition};
/// use ccg_timing::core::{EntityId, ZoneId};
///
/// let deck = ZoneId::new(0);
/// let mut zones = ZoneManager::new();
/// zones.init_zone(deck);
///
/// zones.add_to_zone(EntityId(10), deck, Some(ZonePosition::Top));
/// zones.add_to_zone(EntityId(11), deck, Some(ZonePosition::Bottom));
///
/// assert_eq!(zones.top(deck), Some(EntityId(10)));
/// assert_eq!(zones.zone_size(deck), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneManager {
    locations: OrdMap<EntityId, ZoneId>,
    contents: OrdMap<ZoneId, Vector<EntityId>>,
}

impl ZoneManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty zone. Idempotent.
    pub fn init_zone(&mut self, zone: ZoneId) {
        if !self.contents.contains_key(&zone) {
            self.contents.insert(zone, Vector::new());
        }
    }

    #[must_use]
    pub fn has_zone(&self, zone: ZoneId) -> bool {
        self.contents.contains_key(&zone)
    }

    /// Add a card that is not yet tracked. Returns the index it landed at,
    /// or `None` if the card is already tracked.
    pub fn add_to_zone(
        &mut self,
        entity: EntityId,
        zone: ZoneId,
        position: Option<ZonePosition>,
    ) -> Option<usize> {
        if self.locations.contains_key(&entity) {
            return None;
        }
        let mut members = self.contents.get(&zone).cloned().unwrap_or_default();
        let index = match position.unwrap_or(ZonePosition::Top) {
            ZonePosition::Top => members.len(),
            ZonePosition::Bottom => 0,
            ZonePosition::Index(i) => i.min(members.len()),
        };
        members.insert(index, entity);
        self.contents.insert(zone, members);
        self.locations.insert(entity, zone);
        Some(index)
    }

    /// Remove a card from whatever zone holds it.
    pub fn remove(&mut self, entity: EntityId) -> Option<Placement> {
        let zone = self.locations.remove(&entity)?;
        let members = self.contents.get_mut(&zone)?;
        let index = members.index_of(&entity)?;
        members.remove(index);
        Some(Placement { zone, index })
    }

    /// Put a card back at an exact placement (inverse of `remove`).
    pub fn insert_at(&mut self, entity: EntityId, placement: Placement) {
        let mut members = self.contents.get(&placement.zone).cloned().unwrap_or_default();
        let index = placement.index.min(members.len());
        members.insert(index, entity);
        self.contents.insert(placement.zone, members);
        self.locations.insert(entity, placement.zone);
    }

    /// Move a card to a zone. Returns where it was, or `None` if untracked.
    pub fn move_to_zone(
        &mut self,
        entity: EntityId,
        zone: ZoneId,
        position: Option<ZonePosition>,
    ) -> Option<Placement> {
        let previous = self.remove(entity)?;
        self.add_to_zone(entity, zone, position);
        Some(previous)
    }

    #[must_use]
    pub fn zone_of(&self, entity: EntityId) -> Option<ZoneId> {
        self.locations.get(&entity).copied()
    }

    #[must_use]
    pub fn is_in_zone(&self, entity: EntityId, zone: ZoneId) -> bool {
        self.zone_of(entity) == Some(zone)
    }

    /// Cards in a zone, bottom to top.
    pub fn cards_in_zone(&self, zone: ZoneId) -> impl Iterator<Item = EntityId> + '_ {
        self.contents.get(&zone).into_iter().flat_map(|m| m.iter().copied())
    }

    #[must_use]
    pub fn zone_size(&self, zone: ZoneId) -> usize {
        self.contents.get(&zone).map_or(0, Vector::len)
    }

    #[must_use]
    pub fn top(&self, zone: ZoneId) -> Option<EntityId> {
        self.contents.get(&zone).and_then(|m| m.last().copied())
    }

    /// Zone order as a plain list (for shuffle snapshots).
    #[must_use]
    pub fn order(&self, zone: ZoneId) -> Vec<EntityId> {
        self.cards_in_zone(zone).collect()
    }

    /// Replace a zone's order with a permutation of its current members.
    pub fn set_order(&mut self, zone: ZoneId, order: Vec<EntityId>) {
        self.contents.insert(zone, order.into_iter().collect());
    }

    /// Shuffle a zone's order.
    pub fn shuffle_zone(&mut self, zone: ZoneId, rng: &mut GameRng) {
        let mut order = self.order(zone);
        rng.shuffle(&mut order);
        self.set_order(zone, order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (ZoneManager, ZoneId, ZoneId) {
        let mut zones = ZoneManager::new();
        let deck = ZoneId::new(0);
        let hand = ZoneId::new(1);
        zones.init_zone(deck);
        zones.init_zone(hand);
        for i in 0..4 {
            zones.add_to_zone(EntityId(10 + i), deck, None);
        }
        (zones, deck, hand)
    }

    #[test]
    fn test_add_positions() {
        let (mut zones, deck, _) = setup();
        assert_eq!(zones.add_to_zone(EntityId(20), deck, Some(ZonePosition::Bottom)), Some(0));
        assert_eq!(zones.add_to_zone(EntityId(21), deck, Some(ZonePosition::Index(99))), Some(5));
        assert_eq!(zones.top(deck), Some(EntityId(21)));
        assert_eq!(zones.add_to_zone(EntityId(21), deck, None), None);
    }

    #[test]
    fn test_remove_and_reinsert_is_exact() {
        let (mut zones, deck, _) = setup();
        let before = zones.clone();

        let placement = zones.remove(EntityId(11)).unwrap();
        assert_eq!(placement, Placement { zone: deck, index: 1 });
        assert_eq!(zones.zone_size(deck), 3);

        zones.insert_at(EntityId(11), placement);
        assert_eq!(zones, before);
    }

    #[test]
    fn test_move_reports_previous_placement() {
        let (mut zones, deck, hand) = setup();
        let previous = zones.move_to_zone(EntityId(13), hand, None).unwrap();

        assert_eq!(previous.zone, deck);
        assert_eq!(previous.index, 3);
        assert!(zones.is_in_zone(EntityId(13), hand));
        assert!(zones.move_to_zone(EntityId(99), hand, None).is_none());
    }

    #[test]
    fn test_shuffle_keeps_members() {
        let (mut zones, deck, _) = setup();
        let mut rng = GameRng::new(3);
        zones.shuffle_zone(deck, &mut rng);

        let mut order = zones.order(deck);
        order.sort();
        assert_eq!(order, vec![EntityId(10), EntityId(11), EntityId(12), EntityId(13)]);
    }
}
