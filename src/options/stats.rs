//! Option-tree search statistics for diagnostics and tuning.

use serde::{Deserialize, Serialize};

/// Statistics collected while answering validity queries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Fresh speculative runs started (one per node searched).
    pub speculative_runs: u32,

    /// Nodes added to the tree.
    pub nodes_created: u32,

    /// Validity queries answered from the memo.
    pub memo_hits: u32,

    /// Searches that ended in a completed run.
    pub leaves: u32,

    /// Deepest node searched.
    pub max_depth: usize,
}

impl SearchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Share of queries answered without a speculative run.
    #[must_use]
    pub fn memo_hit_rate(&self) -> f64 {
        let total = self.memo_hits + self.speculative_runs;
        if total == 0 {
            0.0
        } else {
            f64::from(self.memo_hits) / f64::from(total)
        }
    }
}
