//! Per-object modifier stacks and the expiry queue.

use im::Vector;
use serde::{Deserialize, Serialize};

use crate::core::{AbilityId, EntityId};

/// One applied static ability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEntry {
    pub ability: AbilityId,
}

/// Ordered modifier entries on one object, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierStack(Vector<StackEntry>);

impl ModifierStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push on top, returning the index.
    pub fn push(&mut self, entry: StackEntry) -> usize {
        self.0.push_back(entry);
        self.0.len() - 1
    }

    /// Remove an ability's entry, returning where it was.
    pub fn remove(&mut self, ability: AbilityId) -> Option<(usize, StackEntry)> {
        let index = self.0.iter().position(|e| e.ability == ability)?;
        Some((index, self.0.remove(index)))
    }

    /// Insert at an exact index (inverse of `remove`).
    pub fn insert_at(&mut self, index: usize, entry: StackEntry) {
        let index = index.min(self.0.len());
        self.0.insert(index, entry);
    }

    #[must_use]
    pub fn contains(&self, ability: AbilityId) -> bool {
        self.0.iter().any(|e| e.ability == ability)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StackEntry> + '_ {
        self.0.iter()
    }

    /// Applied abilities, oldest first.
    pub fn abilities(&self) -> impl Iterator<Item = AbilityId> + '_ {
        self.0.iter().map(|e| e.ability)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// When a temporary application ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expiry {
    /// At the end of the given turn: expired once the turn number passes it.
    EndOfTurn(u32),
}

impl Expiry {
    #[must_use]
    pub fn is_expired(self, turn: u32) -> bool {
        match self {
            Self::EndOfTurn(t) => turn > t,
        }
    }
}

/// A queued "remove this application later" entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryEntry {
    pub ability: AbilityId,
    pub target: EntityId,
    pub expiry: Expiry,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(raw: u32) -> StackEntry {
        StackEntry {
            ability: AbilityId::new(raw),
        }
    }

    #[test]
    fn test_remove_and_insert_at() {
        let mut stack = ModifierStack::new();
        stack.push(entry(1));
        stack.push(entry(2));
        stack.push(entry(3));
        let before = stack.clone();

        let (index, removed) = stack.remove(AbilityId::new(2)).unwrap();
        assert_eq!(index, 1);
        assert!(!stack.contains(AbilityId::new(2)));

        stack.insert_at(index, removed);
        assert_eq!(stack, before);
        assert_eq!(stack.abilities().collect::<Vec<_>>().len(), 3);
    }

    #[test]
    fn test_expiry() {
        assert!(!Expiry::EndOfTurn(3).is_expired(3));
        assert!(Expiry::EndOfTurn(3).is_expired(4));
    }
}
