//! Option-tree nodes.
//!
//! Nodes live in the `OptionTree` arena and refer to each other by
//! [`NodeId`]. A node stands for "the run after these responses"; its
//! children are created lazily, one per valid response to the request the
//! run surfaces there.

use serde::{Deserialize, Serialize};

use crate::timing::{InputRequest, Response, Responses};

/// Index into the `OptionTree` node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value representing no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "NodeId(NONE)")
        } else {
            write!(f, "NodeId({})", self.0)
        }
    }
}

/// Memoized validity of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Validity {
    #[default]
    Unknown,
    Valid,
    Invalid,
}

impl Validity {
    /// `None` while unknown.
    #[must_use]
    pub fn known(self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Valid => Some(true),
            Self::Invalid => Some(false),
        }
    }
}

impl From<bool> for Validity {
    fn from(valid: bool) -> Self {
        if valid {
            Self::Valid
        } else {
            Self::Invalid
        }
    }
}

/// One point in the choice space of a run.
#[derive(Clone, Debug)]
pub struct OptionNode {
    /// `NodeId::NONE` for the root.
    pub parent: NodeId,

    /// Response that leads here from the parent. `None` only at the root.
    pub choice: Option<Response>,

    pub validity: Validity,

    /// Request the run surfaces at this node, once known.
    pub request: Option<InputRequest>,

    /// Remaining responses not yet turned into children.
    pub(crate) pending: Option<Responses>,

    /// Children materialized so far, in response order.
    pub children: Vec<NodeId>,

    /// Number of choices between the root and this node.
    pub depth: usize,
}

impl OptionNode {
    pub(crate) fn root() -> Self {
        Self {
            parent: NodeId::NONE,
            choice: None,
            validity: Validity::Unknown,
            request: None,
            pending: None,
            children: Vec::new(),
            depth: 0,
        }
    }

    pub(crate) fn child(parent: NodeId, depth: usize, choice: Response) -> Self {
        Self {
            parent,
            choice: Some(choice),
            validity: Validity::Unknown,
            request: None,
            pending: None,
            children: Vec::new(),
            depth: depth + 1,
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Every child has been created.
    #[must_use]
    pub fn is_fully_expanded(&self) -> bool {
        self.request.is_some() && self.pending.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        assert!(NodeId::NONE.is_none());
        assert!(!NodeId::new(0).is_none());
        assert_eq!(NodeId::new(4).to_string(), "NodeId(4)");
        assert_eq!(NodeId::NONE.to_string(), "NodeId(NONE)");
    }

    #[test]
    fn test_validity() {
        assert_eq!(Validity::default().known(), None);
        assert_eq!(Validity::from(true).known(), Some(true));
        assert_eq!(Validity::from(false), Validity::Invalid);
    }

    #[test]
    fn test_child_depth() {
        let root = OptionNode::root();
        assert!(root.is_root());
        assert!(!root.is_fully_expanded());
        let child = OptionNode::child(NodeId::new(0), root.depth, Response::Bool(true));
        assert_eq!(child.depth, 1);
        assert!(!child.is_root());
    }
}
