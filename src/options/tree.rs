//! Arena-based option tree with speculative validity search.
//!
//! A node is valid if some sequence of responses below it lets a fresh run
//! of the source complete successfully with the end predicate holding. The
//! tree never clones game state to find out. To search node N it
//!
//! 1. rolls the outer runner back to the start of its run,
//! 2. starts a brand-new speculative run and replays the responses on the
//!    path from the root to N,
//! 3. either judges the finished run, or records the request N surfaces
//!    and searches N's children lazily until one is valid,
//! 4. undoes the speculative run and replays the outer runner's own
//!    responses, so the game ends exactly where it started.
//!
//! Results are memoized per node, so a second query is free.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::core::{Game, GameState, Result, TimingConfig, TimingError};
use crate::timing::{InputRequest, Response, RunnerMode, RunnerStatus, SourceFactory, TimingRunner};

use super::node::{NodeId, OptionNode};
use super::stats::SearchStats;

/// Extra condition a completed run must satisfy for its branch to count.
pub type EndPredicate = Arc<dyn Fn(&GameState) -> bool + Send + Sync>;

/// Lazily expanded tree over the responses of one run.
pub struct OptionTree {
    nodes: Vec<OptionNode>,
    factory: SourceFactory,
    end_predicate: EndPredicate,
    mode: RunnerMode,
    limit: usize,
    stats: SearchStats,
}

impl OptionTree {
    /// A tree over cost-mode runs of `factory`.
    pub fn new(factory: SourceFactory, end_predicate: impl Fn(&GameState) -> bool + Send + Sync + 'static) -> Self {
        Self {
            nodes: vec![OptionNode::root()],
            factory,
            end_predicate: Arc::new(end_predicate),
            mode: RunnerMode::Cost,
            limit: TimingConfig::default().search_node_limit,
            stats: SearchStats::new(),
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: RunnerMode) -> Self {
        self.mode = mode;
        self
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    pub fn node(&self, id: NodeId) -> Result<&OptionNode> {
        self.nodes.get(id.index()).ok_or(TimingError::UnknownNode(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Responses leading from the root to `node`.
    pub fn path_to(&self, node: NodeId) -> Result<Vec<Response>> {
        let mut path = Vec::with_capacity(self.node(node)?.depth);
        let mut current = node;
        while let Some(entry) = self.nodes.get(current.index()) {
            match &entry.choice {
                Some(choice) => path.push(choice.clone()),
                None => break,
            }
            current = entry.parent;
        }
        path.reverse();
        Ok(path)
    }

    /// Record the request a run surfaced at `node`.
    ///
    /// Runs are deterministic, so a node surfaces the same request every
    /// time; a different one means the source is not.
    pub fn record_request(&mut self, node: NodeId, request: &InputRequest) -> Result<()> {
        self.node(node)?;
        let entry = &mut self.nodes[node.index()];
        match &entry.request {
            Some(known) if known.kind != request.kind || known.player != request.player => {
                Err(TimingError::ReplayDiverged {
                    depth: entry.depth,
                    reason: format!("expected {:?}, got {:?}", known.kind, request.kind),
                })
            }
            Some(_) => Ok(()),
            None => {
                let mut request = request.clone();
                request.node = Some(node);
                entry.pending = Some(request.responses());
                entry.request = Some(request);
                Ok(())
            }
        }
    }

    /// The `index`-th child of `node`, created on demand.
    ///
    /// `None` when the node's request is not known yet or has fewer
    /// responses.
    pub fn child(&mut self, node: NodeId, index: usize) -> Result<Option<NodeId>> {
        self.node(node)?;
        loop {
            let entry = &mut self.nodes[node.index()];
            if let Some(child) = entry.children.get(index) {
                return Ok(Some(*child));
            }
            let Some(pending) = entry.pending.as_mut() else {
                return Ok(None);
            };
            let Some(choice) = pending.next() else {
                entry.pending = None;
                return Ok(None);
            };
            let depth = entry.depth;

            if self.nodes.len() >= self.limit {
                return Err(TimingError::SearchLimit { limit: self.limit });
            }
            let id = NodeId::new(self.nodes.len() as u32);
            self.nodes.push(OptionNode::child(node, depth, choice));
            self.nodes[node.index()].children.push(id);
            self.stats.nodes_created += 1;
        }
    }

    /// Lazy cursor over `node`'s children. Searches the node first if its
    /// request is not known yet.
    pub fn children(&mut self, game: &mut Game, node: NodeId, outer: &mut TimingRunner) -> Result<Children> {
        let entry = self.node(node)?;
        if entry.request.is_none() && entry.validity.known().is_none() {
            self.is_valid(game, node, outer)?;
        }
        Ok(Children { node, next: 0 })
    }

    /// Can the run be completed from `node`?
    ///
    /// `outer` is the runner the caller is driving; it is rolled back for
    /// the search and replayed to its position afterwards.
    pub fn is_valid(&mut self, game: &mut Game, node: NodeId, outer: &mut TimingRunner) -> Result<bool> {
        if let Some(valid) = self.node(node)?.validity.known() {
            self.stats.memo_hits += 1;
            return Ok(valid);
        }
        self.limit = game.config.search_node_limit;

        let started = outer.status().is_some();
        let saved = outer.path().to_vec();
        outer.undo(game, true)?;

        let result = self.search(game, node);
        let restored = if started {
            outer.replay(game, &saved).map(|_| ())
        } else {
            Ok(())
        };
        let valid = result?;
        restored?;

        debug!(%node, valid, runs = self.stats.speculative_runs, "option validity");
        Ok(valid)
    }

    fn search(&mut self, game: &mut Game, node: NodeId) -> Result<bool> {
        let entry = self.node(node)?;
        if let Some(valid) = entry.validity.known() {
            self.stats.memo_hits += 1;
            return Ok(valid);
        }
        let depth = entry.depth;
        let path = self.path_to(node)?;

        let mut runner = TimingRunner::new(self.factory.clone())
            .with_mode(self.mode)
            .speculative();
        runner.attach(node);
        self.stats.speculative_runs += 1;
        self.stats.max_depth = self.stats.max_depth.max(depth);

        let outcome = match runner.replay(game, &path) {
            Ok(RunnerStatus::Finished(completed)) => {
                self.stats.leaves += 1;
                Ok(Some(
                    completed && !game.state.is_game_over() && (self.end_predicate)(&game.state),
                ))
            }
            // The game ended on the way: nothing can follow.
            Ok(RunnerStatus::NeedsInput(_)) if game.state.is_game_over() => Ok(Some(false)),
            Ok(RunnerStatus::NeedsInput(request)) => self.record_request(node, &request).map(|()| None),
            Err(err) => Err(err),
        };
        let undone = runner.undo(game, true);
        let outcome = outcome?;
        undone?;

        let valid = match outcome {
            Some(valid) => valid,
            None => self.any_child_valid(game, node)?,
        };
        self.nodes[node.index()].validity = valid.into();
        trace!(%node, depth, valid, "searched");
        Ok(valid)
    }

    /// Search children in response order, stopping at the first valid one.
    fn any_child_valid(&mut self, game: &mut Game, node: NodeId) -> Result<bool> {
        let mut index = 0;
        while let Some(child) = self.child(node, index)? {
            if self.search(game, child)? {
                return Ok(true);
            }
            index += 1;
        }
        Ok(false)
    }
}

impl std::fmt::Debug for OptionTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionTree")
            .field("nodes", &self.nodes.len())
            .field("mode", &self.mode)
            .field("stats", &self.stats)
            .finish()
    }
}

/// Lazy cursor over a node's children.
#[derive(Clone, Copy, Debug)]
pub struct Children {
    node: NodeId,
    next: usize,
}

impl Children {
    /// Next child, created on demand.
    pub fn next(&mut self, tree: &mut OptionTree) -> Result<Option<NodeId>> {
        let child = tree.child(self.node, self.next)?;
        if child.is_some() {
            self.next += 1;
        }
        Ok(child)
    }
}
