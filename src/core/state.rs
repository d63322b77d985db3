//! Game state: the object graph every action mutates.
//!
//! `GameState` is an arena keyed by stable [`EntityId`]s. Cards, players,
//! modifier stacks and derived values are all looked up by id, never held by
//! reference, so undo only has to reinstate id -> value mappings.
//!
//! Everything observable lives in `im` ordered structures. Two states that
//! went through different insert/remove histories but hold the same data
//! serialize to the same bytes, which is what [`GameState::snapshot`]
//! relies on.
//!
//! [`Game`] bundles the state with the (immutable during play) ability
//! catalogue and the timing configuration, and is passed explicitly to the
//! batch, runner and option-tree code.

use im::{OrdMap, OrdSet, Vector};
use serde::{Deserialize, Serialize};

use super::config::{TimingConfig, ZoneConfig, ZoneId, ZoneRole};
use super::entity::{AbilityId, EntityId};
use super::error::{Result, TimingError};
use super::player::{PlayerId, PlayerMap};
use super::rng::{GameRng, GameRngState};
use crate::cards::CardInstance;
use crate::modifiers::{AbilityCatalogue, DerivedValues, ExpiryEntry, ModifierStack, StackEntry};
use crate::zones::ZoneManager;

/// Result of a finished game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Winner(PlayerId),
    Draw,
}

/// Complete mutable game state.
#[derive(Clone, Debug)]
pub struct GameState {
    player_count: usize,

    /// Turn number (starts at 1).
    pub turn_number: u32,

    /// Whose turn it is.
    pub active_player: PlayerId,

    player_counters: PlayerMap<OrdMap<String, i64>>,

    zone_configs: OrdMap<ZoneId, ZoneConfig>,

    pub zones: ZoneManager,

    cards: OrdMap<EntityId, CardInstance>,

    modifier_stacks: OrdMap<EntityId, ModifierStack>,

    /// Reverse index: which objects each ability is currently applied to.
    applications: OrdMap<AbilityId, OrdSet<EntityId>>,

    derived: OrdMap<EntityId, DerivedValues>,

    /// Turn numbers in which each ability was used, oldest first.
    ability_uses: OrdMap<AbilityId, Vector<u32>>,

    /// Queued "expire this application later" entries.
    expiries: Vector<ExpiryEntry>,

    play_sequence: u64,

    /// Number of successful scripted batches so far.
    timing_counter: u64,

    result: Option<GameResult>,

    rng: GameRng,

    next_entity_id: u32,
}

/// Borrowed view of everything observable, for snapshots.
#[derive(Serialize)]
struct Observable<'a> {
    turn_number: u32,
    active_player: PlayerId,
    player_counters: &'a PlayerMap<OrdMap<String, i64>>,
    zones: &'a ZoneManager,
    cards: &'a OrdMap<EntityId, CardInstance>,
    modifier_stacks: &'a OrdMap<EntityId, ModifierStack>,
    applications: &'a OrdMap<AbilityId, OrdSet<EntityId>>,
    derived: &'a OrdMap<EntityId, DerivedValues>,
    ability_uses: &'a OrdMap<AbilityId, Vector<u32>>,
    expiries: &'a Vector<ExpiryEntry>,
    play_sequence: u64,
    timing_counter: u64,
    result: &'a Option<GameResult>,
    rng: GameRngState,
    next_entity_id: u32,
}

impl GameState {
    #[must_use]
    pub fn new(player_count: usize, seed: u64) -> Self {
        Self {
            player_count,
            turn_number: 1,
            active_player: PlayerId::new(0),
            player_counters: PlayerMap::with_default(player_count),
            zone_configs: OrdMap::new(),
            zones: ZoneManager::new(),
            cards: OrdMap::new(),
            modifier_stacks: OrdMap::new(),
            applications: OrdMap::new(),
            derived: OrdMap::new(),
            ability_uses: OrdMap::new(),
            expiries: Vector::new(),
            play_sequence: 0,
            timing_counter: 0,
            result: None,
            rng: GameRng::new(seed),
            next_entity_id: EntityId::first_non_player(player_count),
        }
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.player_count
    }

    pub fn players(&self) -> impl Iterator<Item = PlayerId> {
        PlayerId::all(self.player_count)
    }

    /// Byte-exact encoding of the observable state.
    ///
    /// Two states with equal snapshots are indistinguishable to every
    /// action, condition and derived-value computation.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let view = Observable {
            turn_number: self.turn_number,
            active_player: self.active_player,
            player_counters: &self.player_counters,
            zones: &self.zones,
            cards: &self.cards,
            modifier_stacks: &self.modifier_stacks,
            applications: &self.applications,
            derived: &self.derived,
            ability_uses: &self.ability_uses,
            expiries: &self.expiries,
            play_sequence: self.play_sequence,
            timing_counter: self.timing_counter,
            result: &self.result,
            rng: self.rng.state(),
            next_entity_id: self.next_entity_id,
        };
        Ok(bincode::serialize(&view)?)
    }

    // === Zones ===

    pub fn add_zone(&mut self, config: ZoneConfig) {
        self.zones.init_zone(config.id);
        self.zone_configs.insert(config.id, config);
    }

    #[must_use]
    pub fn zone_config(&self, zone: ZoneId) -> Option<&ZoneConfig> {
        self.zone_configs.get(&zone)
    }

    /// The zone a player owns with the given role.
    #[must_use]
    pub fn find_zone(&self, player: PlayerId, role: ZoneRole) -> Option<ZoneId> {
        self.zone_configs
            .values()
            .find(|z| z.owner == Some(player) && z.role == role)
            .map(|z| z.id)
    }

    /// Like [`find_zone`](Self::find_zone) but a missing zone is an error.
    pub fn zone_for(&self, player: PlayerId, role: ZoneRole) -> Result<ZoneId> {
        self.find_zone(player, role).ok_or(TimingError::MissingZone {
            player,
            role: match role {
                ZoneRole::Deck => "deck",
                ZoneRole::Hand => "hand",
                ZoneRole::Field => "field",
                ZoneRole::Graveyard => "graveyard",
                ZoneRole::Other => "other",
            },
        })
    }

    #[must_use]
    pub fn is_in_play_zone(&self, zone: ZoneId) -> bool {
        self.zone_config(zone).is_some_and(|z| z.in_play)
    }

    // === Entities ===

    pub fn alloc_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        id
    }

    /// Put a card into the game. Cards added straight into an in-play zone
    /// get a play sequence number like any other entry into play.
    pub fn add_card(&mut self, mut card: CardInstance, zone: ZoneId) -> Result<EntityId> {
        if !self.zones.has_zone(zone) {
            return Err(TimingError::UnknownZone(zone));
        }
        let id = card.entity_id;
        if self.is_in_play_zone(zone) {
            card.entered_play = Some(self.bump_play_sequence());
        }
        self.zones
            .add_to_zone(id, zone, None)
            .ok_or_else(|| TimingError::MalformedAction(format!("{id} added twice")))?;
        self.cards.insert(id, card);
        Ok(id)
    }

    #[must_use]
    pub fn card(&self, id: EntityId) -> Option<&CardInstance> {
        self.cards.get(&id)
    }

    pub fn card_mut(&mut self, id: EntityId) -> Option<&mut CardInstance> {
        self.cards.get_mut(&id)
    }

    pub fn require_card_mut(&mut self, id: EntityId) -> Result<&mut CardInstance> {
        self.cards.get_mut(&id).ok_or(TimingError::UnknownEntity(id))
    }

    #[must_use]
    pub fn is_player(&self, id: EntityId) -> bool {
        id.is_player(self.player_count)
    }

    #[must_use]
    pub fn exists(&self, id: EntityId) -> bool {
        self.is_player(id) || self.cards.contains_key(&id)
    }

    /// Players control themselves; cards report their controller.
    #[must_use]
    pub fn controller_of(&self, id: EntityId) -> Option<PlayerId> {
        id.as_player(self.player_count)
            .or_else(|| self.card(id).map(|c| c.controller))
    }

    #[must_use]
    pub fn is_in_play(&self, card: EntityId) -> bool {
        self.zones
            .zone_of(card)
            .is_some_and(|zone| self.is_in_play_zone(zone))
    }

    /// Cards currently in play, in id order.
    pub fn cards_in_play(&self) -> impl Iterator<Item = &CardInstance> + '_ {
        self.cards.values().filter(|c| self.is_in_play(c.entity_id))
    }

    // === Counters ===

    /// Counter of a card or player.
    #[must_use]
    pub fn counter(&self, target: EntityId, key: &str) -> Option<i64> {
        match target.as_player(self.player_count) {
            Some(player) => self.player_counters.try_get(player)?.get(key).copied(),
            None => self.card(target)?.counter(key),
        }
    }

    /// Set a counter on a card or player, returning the previous value.
    pub fn set_counter(&mut self, target: EntityId, key: &str, value: i64) -> Result<Option<i64>> {
        match target.as_player(self.player_count) {
            Some(player) => {
                let counters = self
                    .player_counters
                    .try_get_mut(player)
                    .ok_or(TimingError::UnknownEntity(target))?;
                Ok(counters.insert(key.to_string(), value))
            }
            None => Ok(self.require_card_mut(target)?.set_counter(key, value)),
        }
    }

    /// Reinstate a counter value captured by `set_counter`.
    pub fn restore_counter(&mut self, target: EntityId, key: &str, previous: Option<i64>) -> Result<()> {
        match target.as_player(self.player_count) {
            Some(player) => {
                let counters = self
                    .player_counters
                    .try_get_mut(player)
                    .ok_or(TimingError::UnknownEntity(target))?;
                match previous {
                    Some(value) => counters.insert(key.to_string(), value),
                    None => counters.remove(key),
                };
            }
            None => self.require_card_mut(target)?.restore_counter(key, previous),
        }
        Ok(())
    }

    // === Modifier stacks ===

    #[must_use]
    pub fn modifier_stack(&self, id: EntityId) -> Option<&ModifierStack> {
        self.modifier_stacks.get(&id)
    }

    /// Objects an ability is applied to right now.
    #[must_use]
    pub fn applied_targets(&self, ability: AbilityId) -> OrdSet<EntityId> {
        self.applications.get(&ability).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn is_applied(&self, ability: AbilityId, target: EntityId) -> bool {
        self.applications
            .get(&ability)
            .is_some_and(|targets| targets.contains(&target))
    }

    /// Push a modifier on top of an object's stack. Returns its index.
    pub fn push_modifier(&mut self, target: EntityId, entry: StackEntry) -> usize {
        let mut stack = self.modifier_stacks.get(&target).cloned().unwrap_or_default();
        let index = stack.push(entry);
        self.set_stack(target, stack);
        self.index_application(entry.ability, target, true);
        index
    }

    /// Remove an ability's entry from an object's stack.
    pub fn remove_modifier(&mut self, target: EntityId, ability: AbilityId) -> Option<(usize, StackEntry)> {
        let mut stack = self.modifier_stacks.get(&target).cloned()?;
        let removed = stack.remove(ability)?;
        self.set_stack(target, stack);
        self.index_application(ability, target, false);
        Some(removed)
    }

    /// Put a removed entry back at its exact index.
    pub fn insert_modifier_at(&mut self, target: EntityId, index: usize, entry: StackEntry) {
        let mut stack = self.modifier_stacks.get(&target).cloned().unwrap_or_default();
        stack.insert_at(index, entry);
        self.set_stack(target, stack);
        self.index_application(entry.ability, target, true);
    }

    fn set_stack(&mut self, target: EntityId, stack: ModifierStack) {
        if stack.is_empty() {
            self.modifier_stacks.remove(&target);
        } else {
            self.modifier_stacks.insert(target, stack);
        }
    }

    fn index_application(&mut self, ability: AbilityId, target: EntityId, applied: bool) {
        let mut targets = self.applications.get(&ability).cloned().unwrap_or_default();
        if applied {
            targets.insert(target);
        } else {
            targets.remove(&target);
        }
        if targets.is_empty() {
            self.applications.remove(&ability);
        } else {
            self.applications.insert(ability, targets);
        }
    }

    // === Derived values ===

    #[must_use]
    pub fn derived(&self, id: EntityId) -> Option<&DerivedValues> {
        self.derived.get(&id)
    }

    /// Replace an object's derived values, returning the previous ones.
    pub fn set_derived(&mut self, id: EntityId, values: Option<DerivedValues>) -> Option<DerivedValues> {
        match values {
            Some(values) => self.derived.insert(id, values),
            None => self.derived.remove(&id),
        }
    }

    // === Ability use bookkeeping ===

    /// Turns in which an ability was used.
    #[must_use]
    pub fn ability_uses(&self, ability: AbilityId) -> Vector<u32> {
        self.ability_uses.get(&ability).cloned().unwrap_or_default()
    }

    pub fn record_ability_use(&mut self, ability: AbilityId) {
        let mut uses = self.ability_uses(ability);
        uses.push_back(self.turn_number);
        self.ability_uses.insert(ability, uses);
    }

    /// Forget the most recent use of an ability.
    pub fn revert_ability_use(&mut self, ability: AbilityId) {
        let mut uses = self.ability_uses(ability);
        uses.pop_back();
        if uses.is_empty() {
            self.ability_uses.remove(&ability);
        } else {
            self.ability_uses.insert(ability, uses);
        }
    }

    // === Expiry queue ===

    pub fn expiries(&self) -> impl Iterator<Item = &ExpiryEntry> + '_ {
        self.expiries.iter()
    }

    /// Queue an expiry entry, returning its index.
    pub fn queue_expiry(&mut self, entry: ExpiryEntry) -> usize {
        self.expiries.push_back(entry);
        self.expiries.len() - 1
    }

    /// Un-queue the entry for an ability application, if any.
    pub fn take_expiry(&mut self, ability: AbilityId, target: EntityId) -> Option<(usize, ExpiryEntry)> {
        let index = self
            .expiries
            .iter()
            .position(|e| e.ability == ability && e.target == target)?;
        Some((index, self.expiries.remove(index)))
    }

    pub fn requeue_expiry_at(&mut self, index: usize, entry: ExpiryEntry) {
        let index = index.min(self.expiries.len());
        self.expiries.insert(index, entry);
    }

    // === Counters owned by the engine ===

    /// Allocate the next play sequence number.
    pub fn bump_play_sequence(&mut self) -> u64 {
        self.play_sequence += 1;
        self.play_sequence
    }

    /// Give back the most recently allocated play sequence number.
    pub fn rewind_play_sequence(&mut self) {
        self.play_sequence = self.play_sequence.saturating_sub(1);
    }

    #[must_use]
    pub fn timing_counter(&self) -> u64 {
        self.timing_counter
    }

    pub fn advance_timing_counter(&mut self) -> u64 {
        self.timing_counter += 1;
        self.timing_counter
    }

    pub fn rewind_timing_counter(&mut self) {
        self.timing_counter = self.timing_counter.saturating_sub(1);
    }

    // === Game end ===

    #[must_use]
    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.result.is_some()
    }

    /// Set (or clear) the game result, returning the previous one.
    pub fn set_result(&mut self, result: Option<GameResult>) -> Option<GameResult> {
        std::mem::replace(&mut self.result, result)
    }

    pub fn rng_mut(&mut self) -> &mut GameRng {
        &mut self.rng
    }

    /// Shuffle a zone with the game RNG.
    pub fn shuffle_zone(&mut self, zone: ZoneId) {
        self.zones.shuffle_zone(zone, &mut self.rng);
    }

    #[must_use]
    pub fn rng_state(&self) -> GameRngState {
        self.rng.state()
    }

    pub fn restore_rng(&mut self, state: &GameRngState) {
        self.rng.restore(state);
    }
}

/// The top-level game instance handed to every timing component.
#[derive(Clone)]
pub struct Game {
    pub state: GameState,
    pub abilities: AbilityCatalogue,
    pub config: TimingConfig,
}

impl Game {
    #[must_use]
    pub fn new(state: GameState, abilities: AbilityCatalogue) -> Self {
        Self {
            state,
            abilities,
            config: TimingConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: TimingConfig) -> Self {
        self.config = config;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ZoneConfig;

    fn two_player_state() -> (GameState, ZoneId, ZoneId) {
        let mut state = GameState::new(2, 42);
        let deck = ZoneId::new(0);
        let field = ZoneId::new(1);
        state.add_zone(ZoneConfig::deck(deck, PlayerId::new(0)));
        state.add_zone(ZoneConfig::field(field, PlayerId::new(0)));
        (state, deck, field)
    }

    #[test]
    fn test_alloc_starts_after_players() {
        let mut state = GameState::new(4, 1);
        assert_eq!(state.alloc_entity(), EntityId(4));
        assert_eq!(state.alloc_entity(), EntityId(5));
    }

    #[test]
    fn test_add_card_to_field_enters_play() {
        let (mut state, deck, field) = two_player_state();
        let a = state.alloc_entity();
        let b = state.alloc_entity();
        state.add_card(CardInstance::new(a, "A", PlayerId::new(0)), deck).unwrap();
        state.add_card(CardInstance::new(b, "B", PlayerId::new(0)), field).unwrap();

        assert_eq!(state.card(a).unwrap().entered_play, None);
        assert_eq!(state.card(b).unwrap().entered_play, Some(1));
        assert!(state.is_in_play(b));
        assert_eq!(state.cards_in_play().count(), 1);
    }

    #[test]
    fn test_add_card_unknown_zone() {
        let mut state = GameState::new(2, 1);
        let id = state.alloc_entity();
        let err = state
            .add_card(CardInstance::new(id, "A", PlayerId::new(0)), ZoneId::new(9))
            .unwrap_err();
        assert!(matches!(err, TimingError::UnknownZone(_)));
    }

    #[test]
    fn test_player_and_card_counters() {
        let (mut state, deck, _) = two_player_state();
        let card = state.alloc_entity();
        state.add_card(CardInstance::new(card, "A", PlayerId::new(0)), deck).unwrap();
        let player = EntityId::player_id(1);

        assert_eq!(state.set_counter(player, "life", 20).unwrap(), None);
        assert_eq!(state.set_counter(card, "charge", 2).unwrap(), None);
        assert_eq!(state.counter(player, "life"), Some(20));
        assert_eq!(state.counter(card, "charge"), Some(2));

        state.restore_counter(card, "charge", None).unwrap();
        assert_eq!(state.counter(card, "charge"), None);
        assert!(state.set_counter(EntityId(99), "x", 1).is_err());
    }

    #[test]
    fn test_modifier_push_remove_restores_snapshot() {
        let (mut state, _, _) = two_player_state();
        let target = EntityId::player_id(0);
        let before = state.snapshot().unwrap();

        let entry = StackEntry { ability: AbilityId::new(3) };
        state.push_modifier(target, entry);
        assert!(state.is_applied(AbilityId::new(3), target));

        let (index, removed) = state.remove_modifier(target, AbilityId::new(3)).unwrap();
        assert_eq!(index, 0);
        assert_eq!(removed, entry);
        assert_eq!(state.snapshot().unwrap(), before);
    }

    #[test]
    fn test_ability_use_revert() {
        let mut state = GameState::new(2, 1);
        let ability = AbilityId::new(1);
        let before = state.snapshot().unwrap();

        state.record_ability_use(ability);
        assert_eq!(state.ability_uses(ability).len(), 1);

        state.revert_ability_use(ability);
        assert_eq!(state.snapshot().unwrap(), before);
    }

    #[test]
    fn test_zone_for_missing_role() {
        let (state, _, _) = two_player_state();
        assert!(state.zone_for(PlayerId::new(0), ZoneRole::Deck).is_ok());
        let err = state.zone_for(PlayerId::new(1), ZoneRole::Hand).unwrap_err();
        assert_eq!(err.to_string(), "Player 1 has no hand zone");
    }
}
