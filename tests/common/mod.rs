//! Shared fixture for integration tests.
//!
//! Two players, each with a deck, a hand, a field holding at most three
//! cards, and a graveyard. Player 0 starts with three cards in hand and
//! two in the deck.

#![allow(dead_code)]

use ccg_timing::cards::CardInstance;
use ccg_timing::core::{EntityId, Game, GameState, PlayerId, ZoneConfig, ZoneId};
use ccg_timing::modifiers::AbilityCatalogue;

pub const FIELD_SIZE: usize = 3;

pub struct Zones {
    pub deck: ZoneId,
    pub hand: ZoneId,
    pub field: ZoneId,
    pub graveyard: ZoneId,
}

pub struct Fixture {
    pub game: Game,
    pub zones: Vec<Zones>,
    pub hand: Vec<EntityId>,
    pub deck: Vec<EntityId>,
}

pub fn p0() -> PlayerId {
    PlayerId::new(0)
}

pub fn p1() -> PlayerId {
    PlayerId::new(1)
}

/// Route library logs to the test output; `RUST_LOG=ccg_timing=trace`
/// shows per-action work.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn fixture() -> Fixture {
    init_tracing();
    let mut state = GameState::new(2, 42);
    let mut zones = Vec::new();
    for player in state.players().collect::<Vec<_>>() {
        let base = player.index() as u16 * 4;
        let z = Zones {
            deck: ZoneId::new(base),
            hand: ZoneId::new(base + 1),
            field: ZoneId::new(base + 2),
            graveyard: ZoneId::new(base + 3),
        };
        state.add_zone(ZoneConfig::deck(z.deck, player));
        state.add_zone(ZoneConfig::hand(z.hand, player));
        state.add_zone(ZoneConfig::field(z.field, player).with_max_cards(FIELD_SIZE));
        state.add_zone(ZoneConfig::graveyard(z.graveyard, player));
        zones.push(z);
    }

    let hand = (0..3)
        .map(|i| {
            let id = state.alloc_entity();
            let card = CardInstance::new(id, format!("Soldier {i}"), p0())
                .with_base("attack", 1)
                .with_base("defense", 1);
            state.add_card(card, zones[0].hand).expect("hand has room");
            id
        })
        .collect();
    let deck = (0..2)
        .map(|i| {
            let id = state.alloc_entity();
            let card = CardInstance::new(id, format!("Reserve {i}"), p0()).face_down();
            state.add_card(card, zones[0].deck).expect("deck has room");
            id
        })
        .collect();

    Fixture {
        game: Game::new(state, AbilityCatalogue::new()),
        zones,
        hand,
        deck,
    }
}

/// Put `count` filler cards on player 0's field.
pub fn fill_field(f: &mut Fixture, count: usize) -> Vec<EntityId> {
    (0..count)
        .map(|i| {
            let id = f.game.state.alloc_entity();
            let card = CardInstance::new(id, format!("Wall {i}"), p0());
            f.game.state.add_card(card, f.zones[0].field).expect("field has room");
            id
        })
        .collect()
}
