//! The batch-source contract.
//!
//! A batch source is the scripted logic behind an effect or a cost. It is a
//! resumable state machine: each `resume` either yields a batch of actions,
//! surfaces an input request, or completes with a success flag. After a
//! batch the source is resumed with the finished `Timing`, so it can branch
//! on whether its own request succeeded.
//!
//! Sources must be deterministic given the same responses and must not keep
//! side channels outside the actions they yield. The option tree relies on
//! this: it restarts a fresh source from a `SourceFactory` and replays
//! recorded responses instead of cloning a suspended run.

use std::sync::Arc;

use crate::actions::Action;
use crate::core::{GameState, Result};

use super::batch::Timing;
use super::request::{InputRequest, Response};

/// What a source is resumed with.
#[derive(Clone, Copy, Debug)]
pub enum Resume<'a> {
    /// First resume of a fresh run.
    Start,
    /// The batch yielded last has finished.
    Timing(&'a Timing),
    /// Answer to the request yielded last.
    Response(&'a Response),
}

/// What a source yields.
#[derive(Clone, Debug)]
pub enum SourceStep {
    Batch(Vec<Action>),
    /// An empty batch standing for a cost with nothing to pay. Unlike an
    /// empty `Batch`, it counts as successful.
    EmptyCost,
    Request(InputRequest),
    Complete(bool),
}

/// A resumable source of action batches.
pub trait BatchSource {
    fn resume(&mut self, state: &GameState, input: Resume<'_>) -> Result<SourceStep>;
}

/// Creates fresh, independent runs of the same source.
pub type SourceFactory = Arc<dyn Fn() -> Box<dyn BatchSource> + Send + Sync>;

/// Wrap a constructor into a [`SourceFactory`].
pub fn source_factory<S, F>(make: F) -> SourceFactory
where
    S: BatchSource + 'static,
    F: Fn() -> S + Send + Sync + 'static,
{
    Arc::new(move || Box::new(make()) as Box<dyn BatchSource>)
}

/// Closure-backed source.
pub struct FnSource<F> {
    resume: F,
}

impl<F> FnSource<F>
where
    F: FnMut(&GameState, Resume<'_>) -> Result<SourceStep>,
{
    pub fn new(resume: F) -> Self {
        Self { resume }
    }
}

impl<F> BatchSource for FnSource<F>
where
    F: FnMut(&GameState, Resume<'_>) -> Result<SourceStep>,
{
    fn resume(&mut self, state: &GameState, input: Resume<'_>) -> Result<SourceStep> {
        (self.resume)(state, input)
    }
}

/// Yields a fixed list of batches, then completes with whether every one
/// of them succeeded.
#[derive(Clone, Debug, Default)]
pub struct ScriptedSource {
    batches: std::collections::VecDeque<Vec<Action>>,
    all_successful: bool,
}

impl ScriptedSource {
    pub fn new(batches: impl IntoIterator<Item = Vec<Action>>) -> Self {
        Self {
            batches: batches.into_iter().collect(),
            all_successful: true,
        }
    }

    /// Factory creating a fresh copy of this script for every run.
    #[must_use]
    pub fn factory(self) -> SourceFactory {
        source_factory(move || self.clone())
    }
}

impl BatchSource for ScriptedSource {
    fn resume(&mut self, _state: &GameState, input: Resume<'_>) -> Result<SourceStep> {
        if let Resume::Timing(timing) = input {
            self.all_successful &= timing.is_successful();
        }
        Ok(match self.batches.pop_front() {
            Some(batch) => SourceStep::Batch(batch),
            None => SourceStep::Complete(self.all_successful),
        })
    }
}
