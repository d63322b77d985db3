//! Configuration types.
//!
//! - `ZoneConfig`: zones the game defines (deck, hand, field, ...)
//! - `TimingConfig`: limits and switches for batch execution and search
//!
//! Zones are game-configured. The engine only interprets a zone's role
//! (so `Draw` knows where a player's deck and hand are), its capacity, and
//! whether cards in it are "in play" (static abilities active).

use serde::{Deserialize, Serialize};

use super::PlayerId;

/// Zone identifier. Games define what zones exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub u16);

impl ZoneId {
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Zone({})", self.0)
    }
}

/// Zone visibility rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneVisibility {
    /// All cards visible to all players (field, graveyard).
    Public,
    /// Cards visible only to the zone owner (hand).
    OwnerOnly,
    /// Cards not visible to anyone (deck).
    Hidden,
}

/// The part a zone plays in built-in actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneRole {
    Deck,
    Hand,
    Field,
    Graveyard,
    Other,
}

/// Configuration for a single zone.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub id: ZoneId,

    /// Human-readable name (for debugging/display).
    pub name: String,

    /// Zone owner. `None` for shared zones.
    pub owner: Option<PlayerId>,

    pub role: ZoneRole,

    pub visibility: ZoneVisibility,

    /// Is card order significant? (deck: yes, field: no)
    pub ordered: bool,

    /// Cards here are in play: their static abilities are active and they
    /// can be targeted by abilities that look at the field.
    pub in_play: bool,

    /// Maximum cards allowed. `None` for unlimited.
    pub max_cards: Option<usize>,
}

impl ZoneConfig {
    pub fn new(id: ZoneId, name: impl Into<String>, role: ZoneRole) -> Self {
        Self {
            id,
            name: name.into(),
            owner: None,
            role,
            visibility: ZoneVisibility::Public,
            ordered: false,
            in_play: false,
            max_cards: None,
        }
    }

    /// A player's deck: hidden and ordered.
    pub fn deck(id: ZoneId, owner: PlayerId) -> Self {
        Self::new(id, format!("deck {}", owner.0), ZoneRole::Deck)
            .with_owner(owner)
            .hidden()
            .ordered()
    }

    /// A player's hand.
    pub fn hand(id: ZoneId, owner: PlayerId) -> Self {
        Self::new(id, format!("hand {}", owner.0), ZoneRole::Hand)
            .with_owner(owner)
            .owner_only()
    }

    /// A player's side of the field.
    pub fn field(id: ZoneId, owner: PlayerId) -> Self {
        Self::new(id, format!("field {}", owner.0), ZoneRole::Field)
            .with_owner(owner)
            .in_play()
    }

    /// A player's graveyard: public and ordered.
    pub fn graveyard(id: ZoneId, owner: PlayerId) -> Self {
        Self::new(id, format!("graveyard {}", owner.0), ZoneRole::Graveyard)
            .with_owner(owner)
            .ordered()
    }

    #[must_use]
    pub fn with_owner(mut self, owner: PlayerId) -> Self {
        self.owner = Some(owner);
        self
    }

    #[must_use]
    pub fn owner_only(mut self) -> Self {
        self.visibility = ZoneVisibility::OwnerOnly;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visibility = ZoneVisibility::Hidden;
        self
    }

    #[must_use]
    pub fn ordered(mut self) -> Self {
        self.ordered = true;
        self
    }

    #[must_use]
    pub fn in_play(mut self) -> Self {
        self.in_play = true;
        self
    }

    #[must_use]
    pub fn with_max_cards(mut self, max: usize) -> Self {
        self.max_cards = Some(max);
        self
    }
}

/// Limits and switches for batch execution and option search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Maximum follow-up passes a single batch may run.
    /// Exceeding it means the follow-up rules do not converge.
    pub follow_up_limit: usize,

    /// Maximum replacements applied along one action lineage.
    pub replacement_limit: usize,

    /// Run static-ability phasing before every batch-source resume.
    pub ambient_phasing: bool,

    /// Maximum nodes an option tree may allocate.
    pub search_node_limit: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            follow_up_limit: 64,
            replacement_limit: 32,
            ambient_phasing: true,
            search_node_limit: 100_000,
        }
    }
}

impl TimingConfig {
    #[must_use]
    pub fn with_follow_up_limit(mut self, limit: usize) -> Self {
        self.follow_up_limit = limit;
        self
    }

    #[must_use]
    pub fn with_replacement_limit(mut self, limit: usize) -> Self {
        self.replacement_limit = limit;
        self
    }

    #[must_use]
    pub fn with_ambient_phasing(mut self, enabled: bool) -> Self {
        self.ambient_phasing = enabled;
        self
    }

    #[must_use]
    pub fn with_search_node_limit(mut self, limit: usize) -> Self {
        self.search_node_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_presets() {
        let deck = ZoneConfig::deck(ZoneId::new(0), PlayerId::new(1));
        assert_eq!(deck.role, ZoneRole::Deck);
        assert_eq!(deck.visibility, ZoneVisibility::Hidden);
        assert!(deck.ordered);
        assert!(!deck.in_play);

        let field = ZoneConfig::field(ZoneId::new(2), PlayerId::new(0)).with_max_cards(5);
        assert!(field.in_play);
        assert_eq!(field.max_cards, Some(5));
        assert_eq!(field.owner, Some(PlayerId::new(0)));
    }

    #[test]
    fn test_default_timing_config() {
        let config = TimingConfig::default();
        assert_eq!(config.follow_up_limit, 64);
        assert_eq!(config.replacement_limit, 32);
        assert!(config.ambient_phasing);
    }

    #[test]
    fn test_builder_pattern() {
        let config = TimingConfig::default()
            .with_follow_up_limit(4)
            .with_ambient_phasing(false)
            .with_search_node_limit(10);

        assert_eq!(config.follow_up_limit, 4);
        assert!(!config.ambient_phasing);
        assert_eq!(config.search_node_limit, 10);
    }

    #[test]
    fn test_serialization() {
        let config = TimingConfig::default().with_replacement_limit(3);
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: TimingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
