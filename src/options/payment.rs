//! Interactive cost payment guarded by the option tree.
//!
//! `CostPayment` drives a cost-mode run one response at a time while
//! keeping an [`OptionTree`] in step with it, so a caller can ask which
//! responses still lead to a complete payment before committing to one.

use tracing::debug;

use crate::core::{Game, GameState, Result, TimingError};
use crate::timing::{InputRequest, Response, RunnerMode, RunnerStatus, SourceFactory, TimingRunner};

use super::node::NodeId;
use super::tree::OptionTree;

/// A cost being paid interactively.
#[derive(Debug)]
pub struct CostPayment {
    runner: TimingRunner,
    tree: OptionTree,
    cursor: NodeId,
    status: RunnerStatus,
}

impl CostPayment {
    /// Start paying the cost produced by `factory`.
    pub fn begin(
        game: &mut Game,
        factory: SourceFactory,
        end_predicate: impl Fn(&GameState) -> bool + Send + Sync + 'static,
    ) -> Result<Self> {
        let mut tree = OptionTree::new(factory.clone(), end_predicate).with_mode(RunnerMode::Cost);
        let cursor = tree.root();
        let mut runner = TimingRunner::cost(factory);
        runner.attach(cursor);
        let status = runner.step(game, None)?;
        if let RunnerStatus::NeedsInput(request) = &status {
            tree.record_request(cursor, request)?;
        }
        Ok(Self {
            runner,
            tree,
            cursor,
            status,
        })
    }

    #[must_use]
    pub fn status(&self) -> &RunnerStatus {
        &self.status
    }

    #[must_use]
    pub fn cursor(&self) -> NodeId {
        self.cursor
    }

    #[must_use]
    pub fn tree(&self) -> &OptionTree {
        &self.tree
    }

    #[must_use]
    pub fn runner(&self) -> &TimingRunner {
        &self.runner
    }

    /// Hand over the runner, keeping its history for a later undo.
    #[must_use]
    pub fn into_runner(self) -> TimingRunner {
        self.runner
    }

    fn pending(&self) -> Result<&InputRequest> {
        match &self.status {
            RunnerStatus::NeedsInput(request) => Ok(request),
            RunnerStatus::Finished(_) => Err(TimingError::UnexpectedResponse),
        }
    }

    /// Tree node reached by answering the pending request with `response`.
    fn choice_node(&mut self, response: &Response) -> Result<NodeId> {
        let request = self.pending()?;
        request.validate(response)?;
        let index = request.index_of(response).ok_or_else(|| TimingError::InvalidResponse {
            request: format!("{:?}", request.kind),
            reason: format!("{response:?} is not offered"),
        })?;
        self.tree
            .child(self.cursor, index)?
            .ok_or(TimingError::UnknownNode(self.cursor))
    }

    /// Can the payment still be completed from where it stands?
    pub fn is_payable(&mut self, game: &mut Game) -> Result<bool> {
        match self.status {
            RunnerStatus::Finished(paid) => Ok(paid),
            RunnerStatus::NeedsInput(_) => self.tree.is_valid(game, self.cursor, &mut self.runner),
        }
    }

    /// Would answering the pending request with `response` still allow a
    /// complete payment?
    pub fn is_choice_valid(&mut self, game: &mut Game, response: &Response) -> Result<bool> {
        let child = self.choice_node(response)?;
        self.tree.is_valid(game, child, &mut self.runner)
    }

    /// Responses to the pending request that keep the payment completable.
    pub fn valid_responses(&mut self, game: &mut Game) -> Result<Vec<Response>> {
        self.pending()?;
        let mut valid = Vec::new();
        let mut index = 0;
        while let Some(child) = self.tree.child(self.cursor, index)? {
            if self.tree.is_valid(game, child, &mut self.runner)? {
                if let Some(choice) = self.tree.node(child)?.choice.clone() {
                    valid.push(choice);
                }
            }
            index += 1;
        }
        Ok(valid)
    }

    /// Answer the pending request and advance the payment.
    pub fn step(&mut self, game: &mut Game, response: Response) -> Result<RunnerStatus> {
        let response = self.pending()?.canonical(&response);
        let child = self.choice_node(&response)?;
        self.runner.attach(child);
        let status = match self.runner.step(game, Some(response)) {
            Ok(status) => status,
            Err(err) => {
                self.runner.attach(self.cursor);
                return Err(err);
            }
        };
        self.cursor = child;
        if let RunnerStatus::NeedsInput(request) = &status {
            self.tree.record_request(child, request)?;
        }
        debug!(node = %child, ?status, "cost payment step");
        self.status = status.clone();
        Ok(status)
    }

    /// Abandon the payment, undoing everything paid so far.
    pub fn cancel(mut self, game: &mut Game) -> Result<()> {
        self.runner.undo(game, false)
    }
}
