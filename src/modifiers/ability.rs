//! Static abilities and their modifications.
//!
//! A static ability is applied to objects by pushing an entry onto their
//! modifier stack. While applied, each of its modifications is consulted:
//!
//! - `Value` / `Grant` feed derived-value recalculation
//! - `Intercept` may cancel or replace a matching action
//! - `Prohibit` makes matching actions impossible for that object
//!
//! Every modification carries its own condition, evaluated with the modified
//! object as subject.

use std::sync::Arc;

use crate::actions::{Action, ActionKind};
use crate::core::{AbilityId, EntityId, GameState, PlayerId};

use super::Condition;

/// Change to a derived value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueChange {
    Add(i64),
    Set(i64),
}

impl ValueChange {
    #[must_use]
    pub fn apply(self, current: i64) -> i64 {
        match self {
            Self::Add(delta) => current + delta,
            Self::Set(value) => value,
        }
    }
}

/// Result of a replacement: the actions to run instead and any diagnostic
/// notes produced while computing them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Replacement {
    pub actions: Vec<ActionKind>,
    pub notes: Vec<String>,
}

impl Replacement {
    pub fn with(actions: impl IntoIterator<Item = ActionKind>) -> Self {
        Self {
            actions: actions.into_iter().collect(),
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// Computes the replacement for a matched action.
pub type ReplaceFn = Arc<dyn Fn(&Action, &GameState) -> Replacement + Send + Sync>;

/// What an interception does to a matched action.
#[derive(Clone)]
pub enum InterceptEffect {
    Cancel,
    Replace(ReplaceFn),
}

impl std::fmt::Debug for InterceptEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancel => write!(f, "Cancel"),
            Self::Replace(_) => write!(f, "Replace(..)"),
        }
    }
}

/// An action interception: matcher plus effect.
#[derive(Clone, Debug)]
pub struct Interception {
    /// Evaluated with the intercepted object as subject and the action.
    pub matcher: Condition,
    pub effect: InterceptEffect,
}

#[derive(Clone, Debug)]
pub enum ModificationKind {
    Value { stat: String, change: ValueChange },
    Grant(String),
    Intercept(Interception),
    /// Matching actions cannot affect the object.
    Prohibit(Condition),
}

#[derive(Clone, Debug)]
pub struct Modification {
    pub kind: ModificationKind,
    pub condition: Condition,
}

impl Modification {
    pub fn new(kind: ModificationKind) -> Self {
        Self {
            kind,
            condition: Condition::Always,
        }
    }

    /// Only in force while `condition` holds (builder pattern).
    #[must_use]
    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    #[must_use]
    pub fn interception(&self) -> Option<&Interception> {
        match &self.kind {
            ModificationKind::Intercept(interception) => Some(interception),
            _ => None,
        }
    }
}

/// How often an ability may apply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UseLimit {
    #[default]
    Unlimited,
    OncePerTurn,
    OncePerGame,
}

/// A static ability definition.
#[derive(Clone, Debug)]
pub struct StaticAbility {
    /// Assigned by the catalogue on registration.
    pub id: AbilityId,

    /// Human-readable name (for debugging).
    pub name: String,

    /// Card the ability is printed on.
    pub source: EntityId,

    pub controller: PlayerId,

    /// Which objects phasing applies the ability to.
    pub targets: Condition,

    /// Evaluated with the source as subject; phasing removes the ability
    /// everywhere while this is false.
    pub active: Condition,

    pub modifications: Vec<Modification>,

    /// Mandatory interceptions apply automatically; optional ones ask the
    /// controller.
    pub mandatory: bool,

    pub limit: UseLimit,

    /// Managed by ambient phasing. Unphased abilities are applied and
    /// removed by explicit actions only.
    pub phased: bool,
}

impl StaticAbility {
    pub fn new(name: impl Into<String>, source: EntityId, controller: PlayerId) -> Self {
        Self {
            id: AbilityId::new(0),
            name: name.into(),
            source,
            controller,
            targets: Condition::IsSource,
            active: Condition::Always,
            modifications: Vec::new(),
            mandatory: true,
            limit: UseLimit::Unlimited,
            phased: true,
        }
    }

    #[must_use]
    pub fn with_targets(mut self, targets: Condition) -> Self {
        self.targets = targets;
        self
    }

    #[must_use]
    pub fn active_when(mut self, condition: Condition) -> Self {
        self.active = condition;
        self
    }

    #[must_use]
    pub fn with_modification(mut self, modification: Modification) -> Self {
        self.modifications.push(modification);
        self
    }

    #[must_use]
    pub fn value(self, stat: impl Into<String>, change: ValueChange) -> Self {
        self.with_modification(Modification::new(ModificationKind::Value {
            stat: stat.into(),
            change,
        }))
    }

    #[must_use]
    pub fn grant(self, keyword: impl Into<String>) -> Self {
        self.with_modification(Modification::new(ModificationKind::Grant(keyword.into())))
    }

    /// Cancel matching actions.
    #[must_use]
    pub fn cancel(self, matcher: Condition) -> Self {
        self.with_modification(Modification::new(ModificationKind::Intercept(Interception {
            matcher,
            effect: InterceptEffect::Cancel,
        })))
    }

    /// Replace matching actions with whatever `replace` returns.
    #[must_use]
    pub fn replace(
        self,
        matcher: Condition,
        replace: impl Fn(&Action, &GameState) -> Replacement + Send + Sync + 'static,
    ) -> Self {
        self.with_modification(Modification::new(ModificationKind::Intercept(Interception {
            matcher,
            effect: InterceptEffect::Replace(Arc::new(replace)),
        })))
    }

    #[must_use]
    pub fn prohibit(self, matcher: Condition) -> Self {
        self.with_modification(Modification::new(ModificationKind::Prohibit(matcher)))
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.mandatory = false;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: UseLimit) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn unphased(mut self) -> Self {
        self.phased = false;
        self
    }

    /// Has the use limit been reached, given the turns of previous uses?
    #[must_use]
    pub fn is_exhausted(&self, uses: &im::Vector<u32>, turn: u32) -> bool {
        match self.limit {
            UseLimit::Unlimited => false,
            UseLimit::OncePerTurn => uses.iter().any(|t| *t == turn),
            UseLimit::OncePerGame => !uses.is_empty(),
        }
    }

    #[must_use]
    pub fn has_interceptions(&self) -> bool {
        self.modifications.iter().any(|m| m.interception().is_some())
    }
}
