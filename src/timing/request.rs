//! Input requests and responses.
//!
//! A request is the only way the core asks a player anything. Every request
//! has a finite, ordered set of valid responses, enumerated lazily by
//! [`InputRequest::responses`] so that large choice spaces (card subsets)
//! are never materialized unless someone walks them. `validate` rejects
//! anything outside that set with a hard error.

use serde::{Deserialize, Serialize};

use crate::core::{AbilityId, EntityId, PlayerId, Result, TimingError};
use crate::options::NodeId;

/// What is being asked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    /// Pick one of the candidates.
    ChooseTarget { candidates: Vec<EntityId> },

    /// Pick between `min` and `max` distinct candidates.
    ChooseCards {
        candidates: Vec<EntityId>,
        min: usize,
        max: usize,
    },

    /// Pick a number in `min..=max`.
    ChooseNumber { min: i64, max: i64 },

    YesNo,

    /// Several modifiers tie for an action; pick the one that applies
    /// first (by index).
    OrderModifiers { candidates: Vec<AbilityId> },

    /// An optional modifier matched; apply it?
    ApplyOptional { ability: AbilityId },
}

/// A player's answer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Response {
    Bool(bool),
    Index(usize),
    Entity(EntityId),
    Entities(Vec<EntityId>),
    Number(i64),
}

/// A request for input from a player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRequest {
    pub player: PlayerId,
    pub kind: RequestKind,

    /// Option-tree node this request was reached at, when a tree is
    /// walking the run.
    pub node: Option<NodeId>,
}

impl InputRequest {
    pub fn new(player: PlayerId, kind: RequestKind) -> Self {
        Self {
            player,
            kind,
            node: None,
        }
    }

    pub fn choose_target(player: PlayerId, candidates: impl IntoIterator<Item = EntityId>) -> Self {
        Self::new(
            player,
            RequestKind::ChooseTarget {
                candidates: candidates.into_iter().collect(),
            },
        )
    }

    pub fn choose_cards(
        player: PlayerId,
        candidates: impl IntoIterator<Item = EntityId>,
        min: usize,
        max: usize,
    ) -> Self {
        Self::new(
            player,
            RequestKind::ChooseCards {
                candidates: candidates.into_iter().collect(),
                min,
                max,
            },
        )
    }

    pub fn choose_number(player: PlayerId, min: i64, max: i64) -> Self {
        Self::new(player, RequestKind::ChooseNumber { min, max })
    }

    pub fn yes_no(player: PlayerId) -> Self {
        Self::new(player, RequestKind::YesNo)
    }

    /// Valid responses, in order.
    #[must_use]
    pub fn responses(&self) -> Responses {
        let inner = match &self.kind {
            RequestKind::ChooseTarget { candidates } => ResponsesInner::Targets {
                candidates: candidates.clone(),
                next: 0,
            },
            RequestKind::ChooseCards { candidates, min, max } => {
                let max = (*max).min(candidates.len());
                ResponsesInner::Subsets {
                    candidates: candidates.clone(),
                    size: *min,
                    max,
                    combination: if *min <= max { Some((0..*min).collect()) } else { None },
                }
            }
            RequestKind::ChooseNumber { min, max } => ResponsesInner::Numbers {
                next: *min,
                max: *max,
                done: min > max,
            },
            RequestKind::YesNo | RequestKind::ApplyOptional { .. } => ResponsesInner::Bools { next: 0 },
            RequestKind::OrderModifiers { candidates } => ResponsesInner::Indices {
                next: 0,
                len: candidates.len(),
            },
        };
        Responses { inner }
    }

    /// Reject responses outside the valid set.
    pub fn validate(&self, response: &Response) -> Result<()> {
        let reason = match (&self.kind, response) {
            (RequestKind::ChooseTarget { candidates }, Response::Entity(e)) => {
                (!candidates.contains(e)).then(|| format!("{e} is not a candidate"))
            }
            (RequestKind::ChooseCards { candidates, min, max }, Response::Entities(chosen)) => {
                if chosen.len() < *min || chosen.len() > *max {
                    Some(format!("chose {} cards, expected {min}..={max}", chosen.len()))
                } else if let Some(e) = chosen.iter().find(|e| !candidates.contains(e)) {
                    Some(format!("{e} is not a candidate"))
                } else if chosen.iter().enumerate().any(|(i, e)| chosen[..i].contains(e)) {
                    Some("duplicate card".to_string())
                } else {
                    None
                }
            }
            (RequestKind::ChooseNumber { min, max }, Response::Number(n)) => {
                (n < min || n > max).then(|| format!("{n} is outside {min}..={max}"))
            }
            (RequestKind::YesNo | RequestKind::ApplyOptional { .. }, Response::Bool(_)) => None,
            (RequestKind::OrderModifiers { candidates }, Response::Index(i)) => {
                (*i >= candidates.len()).then(|| format!("index {i} out of {}", candidates.len()))
            }
            (_, other) => Some(format!("wrong response type {other:?}")),
        };
        match reason {
            Some(reason) => Err(TimingError::InvalidResponse {
                request: format!("{:?}", self.kind),
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Position of a response in `responses()`, if valid.
    #[must_use]
    pub fn index_of(&self, response: &Response) -> Option<usize> {
        if self.validate(response).is_err() {
            return None;
        }
        match (&self.kind, response) {
            (RequestKind::ChooseTarget { candidates }, Response::Entity(e)) => candidates.iter().position(|c| c == e),
            (RequestKind::ChooseNumber { min, .. }, Response::Number(n)) => usize::try_from(n - min).ok(),
            (RequestKind::YesNo | RequestKind::ApplyOptional { .. }, Response::Bool(b)) => Some(usize::from(!*b)),
            (RequestKind::OrderModifiers { .. }, Response::Index(i)) => Some(*i),
            _ => {
                let canonical = self.canonical(response);
                self.responses().position(|r| r == canonical)
            }
        }
    }

    /// `response` as `responses()` spells it: chosen cards in candidate
    /// order.
    #[must_use]
    pub fn canonical(&self, response: &Response) -> Response {
        match (&self.kind, response) {
            (RequestKind::ChooseCards { candidates, .. }, Response::Entities(chosen)) => {
                let mut sorted = chosen.clone();
                sorted.sort_by_key(|e| candidates.iter().position(|c| c == e));
                Response::Entities(sorted)
            }
            _ => response.clone(),
        }
    }
}

/// Lazy, owned enumeration of a request's valid responses.
#[derive(Clone, Debug)]
pub struct Responses {
    inner: ResponsesInner,
}

#[derive(Clone, Debug)]
enum ResponsesInner {
    Targets {
        candidates: Vec<EntityId>,
        next: usize,
    },
    /// Subsets by size, then lexicographically by candidate index.
    Subsets {
        candidates: Vec<EntityId>,
        size: usize,
        max: usize,
        combination: Option<Vec<usize>>,
    },
    Numbers {
        next: i64,
        max: i64,
        done: bool,
    },
    /// `true` first.
    Bools {
        next: u8,
    },
    Indices {
        next: usize,
        len: usize,
    },
}

impl Iterator for Responses {
    type Item = Response;

    fn next(&mut self) -> Option<Response> {
        match &mut self.inner {
            ResponsesInner::Targets { candidates, next } => {
                let target = candidates.get(*next).copied()?;
                *next += 1;
                Some(Response::Entity(target))
            }
            ResponsesInner::Subsets {
                candidates,
                size,
                max,
                combination,
            } => {
                let current = combination.take()?;
                let response = Response::Entities(current.iter().map(|i| candidates[*i]).collect());
                *combination = next_combination(current, candidates.len())
                    .or_else(|| (*size < *max).then(|| (0..*size + 1).collect()));
                if combination.as_ref().is_some_and(|c| c.len() != *size) {
                    *size += 1;
                }
                Some(response)
            }
            ResponsesInner::Numbers { next, max, done } => {
                if *done {
                    return None;
                }
                let value = *next;
                if value == *max {
                    *done = true;
                } else {
                    *next += 1;
                }
                Some(Response::Number(value))
            }
            ResponsesInner::Bools { next } => {
                let value = match *next {
                    0 => true,
                    1 => false,
                    _ => return None,
                };
                *next += 1;
                Some(Response::Bool(value))
            }
            ResponsesInner::Indices { next, len } => {
                if *next >= *len {
                    return None;
                }
                *next += 1;
                Some(Response::Index(*next - 1))
            }
        }
    }
}

/// Next k-combination of `0..n` in lexicographic order.
fn next_combination(mut combination: Vec<usize>, n: usize) -> Option<Vec<usize>> {
    let k = combination.len();
    let i = (0..k).rev().find(|&i| combination[i] < n - k + i)?;
    combination[i] += 1;
    for j in i + 1..k {
        combination[j] = combination[j - 1] + 1;
    }
    Some(combination)
}
