//! Static abilities, modifier stacks and derived values.
//!
//! ## Key Types
//!
//! - `StaticAbility`: a definition with target/active conditions and a list
//!   of modifications (value changes, keyword grants, interceptions,
//!   prohibitions)
//! - `AbilityCatalogue`: registry of definitions plus custom condition
//!   evaluators
//! - `ModifierStack`: the ordered abilities applied to one object (lives in
//!   `GameState`, pushed/popped only by actions)
//! - `DerivedValues`: base values with modifications applied
//!
//! ## Flow
//!
//! ```text
//! phasing_actions ──► Apply/Unapply actions ──► ModifierStack
//!                                                  │
//!                 Timing ◄── interceptions ────────┤
//!                    │                             │
//!                    └──► recalculate ◄────────────┘
//! ```

pub mod ability;
pub mod catalogue;
pub mod condition;
pub mod phasing;
pub mod stack;
pub mod values;

pub use ability::{
    InterceptEffect, Interception, Modification, ModificationKind, ReplaceFn, Replacement, StaticAbility, UseLimit,
    ValueChange,
};
pub use catalogue::{AbilityCatalogue, CustomCondition};
pub use condition::{Condition, ConditionContext, ConditionEvaluator, Relation};
pub use phasing::phasing_actions;
pub use stack::{Expiry, ExpiryEntry, ModifierStack, StackEntry};
pub use values::{DerivedValues, Recalculation};
