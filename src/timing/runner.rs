//! `TimingRunner`: drives a batch source through a sequence of timings.
//!
//! Each `step` runs until the run needs a player decision or finishes.
//! Before every resume of the source the runner brings static abilities up
//! to date with an ambient phasing batch, so scripted logic never observes
//! stale modifiers. Every timing it runs, ambient or scripted, is kept in
//! `history` so the whole run can be undone exactly.
//!
//! In cost mode the run is all-or-nothing: the first batch that does not
//! succeed (or a source completing with `false`) undoes the run and
//! finishes it with `false`.

use tracing::{debug, trace};

use crate::actions::Event;
use crate::core::{Game, GameState, Result, TimingError};
use crate::modifiers::phasing_actions;
use crate::options::NodeId;

use super::batch::{Timing, TimingStep};
use super::request::{InputRequest, Response};
use super::source::{BatchSource, Resume, SourceFactory, SourceStep};

/// How a runner treats failed batches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunnerMode {
    /// Failed batches are reported to the source, which decides.
    #[default]
    Normal,
    /// Any failed batch aborts and undoes the whole run.
    Cost,
}

/// Status of a runner after a step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunnerStatus {
    NeedsInput(InputRequest),
    Finished(bool),
}

/// What the source is resumed with next.
#[derive(Clone, Debug)]
enum Deferred {
    Start,
    /// History index of the scripted timing that just finished.
    Timing(usize),
    Response(Response),
}

/// Drives one run of a batch source.
pub struct TimingRunner {
    factory: SourceFactory,
    source: Box<dyn BatchSource>,
    mode: RunnerMode,
    speculative: bool,

    history: Vec<Timing>,
    current: Option<Timing>,
    deferred: Option<Deferred>,
    pending: Option<InputRequest>,
    path: Vec<Response>,
    finished: Option<bool>,
    ambient_passes: usize,

    /// Option-tree node the run is currently at.
    node: Option<NodeId>,
}

impl TimingRunner {
    pub fn new(factory: SourceFactory) -> Self {
        let source = factory();
        Self {
            factory,
            source,
            mode: RunnerMode::Normal,
            speculative: false,
            history: Vec::new(),
            current: None,
            deferred: Some(Deferred::Start),
            pending: None,
            path: Vec::new(),
            finished: None,
            ambient_passes: 0,
            node: None,
        }
    }

    /// A runner in cost mode.
    pub fn cost(factory: SourceFactory) -> Self {
        Self::new(factory).with_mode(RunnerMode::Cost)
    }

    #[must_use]
    pub fn with_mode(mut self, mode: RunnerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Log at trace level; used for option-tree search runs.
    #[must_use]
    pub fn speculative(mut self) -> Self {
        self.speculative = true;
        self
    }

    #[must_use]
    pub fn mode(&self) -> RunnerMode {
        self.mode
    }

    /// Tag subsequent requests with `node`.
    pub fn attach(&mut self, node: NodeId) {
        self.node = Some(node);
    }

    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Responses given so far, in order.
    #[must_use]
    pub fn path(&self) -> &[Response] {
        &self.path
    }

    /// Every timing run so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Timing] {
        &self.history
    }

    /// The timing in progress, if suspended inside one.
    #[must_use]
    pub fn current(&self) -> Option<&Timing> {
        self.current.as_ref()
    }

    /// Events of every successful timing, in order.
    pub fn events(&self) -> impl Iterator<Item = &Event> + '_ {
        self.history.iter().flat_map(|t| t.events())
    }

    #[must_use]
    pub fn pending_request(&self) -> Option<&InputRequest> {
        self.pending.as_ref()
    }

    /// Final result, once finished.
    #[must_use]
    pub fn result(&self) -> Option<bool> {
        self.finished
    }

    /// Current status; `None` before the first step.
    #[must_use]
    pub fn status(&self) -> Option<RunnerStatus> {
        match (&self.pending, self.finished) {
            (Some(request), _) => Some(RunnerStatus::NeedsInput(request.clone())),
            (None, Some(result)) => Some(RunnerStatus::Finished(result)),
            (None, None) => None,
        }
    }

    /// Run until a decision is needed or the run finishes.
    ///
    /// `response` answers the pending request and must be `None` when no
    /// request is pending. Stepping a finished runner returns its result.
    pub fn step(&mut self, game: &mut Game, response: Option<Response>) -> Result<RunnerStatus> {
        if let Some(result) = self.finished {
            if response.is_some() {
                return Err(TimingError::UnexpectedResponse);
            }
            return Ok(RunnerStatus::Finished(result));
        }

        let mut timing_input = None;
        match (self.pending.take(), response) {
            (Some(request), Some(response)) => {
                if let Err(err) = request.validate(&response) {
                    self.pending = Some(request);
                    return Err(err);
                }
                self.path.push(response.clone());
                if self.current.is_some() {
                    timing_input = Some(response);
                } else {
                    self.deferred = Some(Deferred::Response(response));
                }
            }
            (Some(request), None) => {
                self.pending = Some(request);
                return Err(TimingError::MissingResponse);
            }
            (None, Some(_)) => return Err(TimingError::UnexpectedResponse),
            (None, None) => {}
        }

        loop {
            if let Some(timing) = self.current.as_mut() {
                match timing.advance(game, timing_input.take())? {
                    TimingStep::NeedsInput(request) => return Ok(self.suspend(request)),
                    TimingStep::Finished => {
                        if let Some(status) = self.timing_finished(game)? {
                            return Ok(status);
                        }
                        continue;
                    }
                }
            }

            if game.config.ambient_phasing {
                let actions = phasing_actions(&game.state, &game.abilities);
                if !actions.is_empty() {
                    self.ambient_passes += 1;
                    if self.ambient_passes > game.config.follow_up_limit {
                        return Err(TimingError::FollowUpLimit {
                            limit: game.config.follow_up_limit,
                        });
                    }
                    trace!(count = actions.len(), "ambient phasing");
                    self.current = Some(Timing::ambient(actions).with_speculative(self.speculative));
                    continue;
                }
            }
            self.ambient_passes = 0;

            let step = self.resume_source(&game.state)?;
            match step {
                SourceStep::Batch(actions) => {
                    self.current = Some(Timing::new(actions).with_speculative(self.speculative));
                }
                SourceStep::EmptyCost => {
                    self.current = Some(Timing::empty_cost().with_speculative(self.speculative));
                }
                SourceStep::Request(request) => return Ok(self.suspend(request)),
                SourceStep::Complete(result) => {
                    if !result && self.mode == RunnerMode::Cost {
                        return self.abort(game);
                    }
                    self.finished = Some(result);
                    self.log_finished(result);
                    return Ok(RunnerStatus::Finished(result));
                }
            }
        }
    }

    fn suspend(&mut self, mut request: InputRequest) -> RunnerStatus {
        request.node = self.node;
        self.pending = Some(request.clone());
        RunnerStatus::NeedsInput(request)
    }

    /// Move the finished current timing into history. Returns a final
    /// status when the run aborts.
    fn timing_finished(&mut self, game: &mut Game) -> Result<Option<RunnerStatus>> {
        let Some(timing) = self.current.take() else {
            return Ok(None);
        };
        let scripted = !timing.is_ambient();
        let failed = scripted && !timing.is_successful();
        self.history.push(timing);
        if scripted {
            self.deferred = Some(Deferred::Timing(self.history.len() - 1));
            if failed && self.mode == RunnerMode::Cost {
                return self.abort(game).map(Some);
            }
        }
        Ok(None)
    }

    fn resume_source(&mut self, state: &GameState) -> Result<SourceStep> {
        let deferred = self.deferred.take().ok_or(TimingError::SourceFinished)?;
        let input = match &deferred {
            Deferred::Start => Resume::Start,
            Deferred::Timing(index) => Resume::Timing(&self.history[*index]),
            Deferred::Response(response) => Resume::Response(response),
        };
        self.source.resume(state, input)
    }

    /// Undo the run and finish it with `false`.
    fn abort(&mut self, game: &mut Game) -> Result<RunnerStatus> {
        debug!(timings = self.history.len(), "cost run aborted");
        self.undo_history(game, self.speculative)?;
        self.finished = Some(false);
        self.deferred = None;
        Ok(RunnerStatus::Finished(false))
    }

    fn log_finished(&self, result: bool) {
        if self.speculative {
            trace!(result, timings = self.history.len(), "run finished");
        } else {
            debug!(result, timings = self.history.len(), "run finished");
        }
    }

    fn undo_history(&mut self, game: &mut Game, speculative: bool) -> Result<()> {
        if let Some(mut timing) = self.current.take() {
            timing.undo(game, speculative)?;
        }
        while let Some(mut timing) = self.history.pop() {
            timing.undo(game, speculative)?;
        }
        Ok(())
    }

    /// Undo everything this run did and reset it to a fresh run of the
    /// same source. The attached node is kept.
    pub fn undo(&mut self, game: &mut Game, speculative: bool) -> Result<()> {
        self.undo_history(game, speculative)?;
        self.source = (self.factory)();
        self.deferred = Some(Deferred::Start);
        self.pending = None;
        self.path.clear();
        self.finished = None;
        self.ambient_passes = 0;
        Ok(())
    }

    /// Replay recorded responses on a fresh run.
    ///
    /// Fails with `ReplayDiverged` when the run finishes before the path
    /// is used up or rejects one of the recorded responses.
    pub fn replay(&mut self, game: &mut Game, path: &[Response]) -> Result<RunnerStatus> {
        let mut status = self.step(game, None)?;
        for (depth, response) in path.iter().enumerate() {
            if let RunnerStatus::Finished(_) = status {
                return Err(TimingError::ReplayDiverged {
                    depth,
                    reason: "run finished before the recorded choice".to_string(),
                });
            }
            status = self.step(game, Some(response.clone())).map_err(|err| match err {
                TimingError::InvalidResponse { reason, .. } => TimingError::ReplayDiverged { depth, reason },
                other => other,
            })?;
        }
        Ok(status)
    }

    /// Run to completion, answering requests with `responder`.
    pub fn run_with(
        &mut self,
        game: &mut Game,
        mut responder: impl FnMut(&GameState, &InputRequest) -> Response,
    ) -> Result<bool> {
        let mut response = None;
        loop {
            match self.step(game, response.take())? {
                RunnerStatus::NeedsInput(request) => response = Some(responder(&game.state, &request)),
                RunnerStatus::Finished(result) => return Ok(result),
            }
        }
    }
}

impl std::fmt::Debug for TimingRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingRunner")
            .field("mode", &self.mode)
            .field("history", &self.history.len())
            .field("path", &self.path)
            .field("pending", &self.pending)
            .field("finished", &self.finished)
            .field("node", &self.node)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Action;
    use crate::cards::CardInstance;
    use crate::core::{EntityId, PlayerId, ZoneConfig, ZoneId};
    use crate::modifiers::{AbilityCatalogue, StaticAbility, ValueChange};
    use crate::timing::{source_factory, FnSource, ScriptedSource};

    struct Setup {
        game: Game,
        hand: ZoneId,
        field: ZoneId,
        cards: Vec<EntityId>,
    }

    fn p0() -> PlayerId {
        PlayerId::new(0)
    }

    fn setup() -> Setup {
        let mut state = GameState::new(2, 5);
        let (hand, field, graveyard) = (ZoneId::new(0), ZoneId::new(1), ZoneId::new(2));
        state.add_zone(ZoneConfig::hand(hand, p0()));
        state.add_zone(ZoneConfig::field(field, p0()).with_max_cards(2));
        state.add_zone(ZoneConfig::graveyard(graveyard, p0()));
        let cards = (0..3)
            .map(|i| {
                let id = state.alloc_entity();
                state
                    .add_card(CardInstance::new(id, format!("Card {i}"), p0()).with_base("attack", 1), hand)
                    .unwrap();
                id
            })
            .collect();
        Setup {
            game: Game::new(state, AbilityCatalogue::new()),
            hand,
            field,
            cards,
        }
    }

    #[test]
    fn test_scripted_run_completes() {
        let mut s = setup();
        let factory = ScriptedSource::new([
            vec![Action::move_card(p0(), s.cards[0], s.field)],
            vec![Action::move_card(p0(), s.cards[1], s.field)],
        ])
        .factory();
        let mut runner = TimingRunner::new(factory);
        assert_eq!(runner.step(&mut s.game, None).unwrap(), RunnerStatus::Finished(true));
        assert_eq!(runner.history().len(), 2);
        assert_eq!(runner.events().count(), 2);
        assert_eq!(runner.result(), Some(true));
        assert!(matches!(
            runner.step(&mut s.game, Some(Response::Bool(true))),
            Err(TimingError::UnexpectedResponse)
        ));
    }

    #[test]
    fn test_cost_mode_aborts_and_undoes() {
        let mut s = setup();
        let before = s.game.state.snapshot().unwrap();
        // The third card does not fit.
        let factory = ScriptedSource::new([
            vec![Action::move_card(p0(), s.cards[0], s.field).as_cost(0)],
            vec![Action::move_card(p0(), s.cards[1], s.field).as_cost(0)],
            vec![Action::move_card(p0(), s.cards[2], s.field).as_cost(0)],
        ])
        .factory();

        let mut normal = TimingRunner::new(factory.clone());
        assert_eq!(normal.step(&mut s.game, None).unwrap(), RunnerStatus::Finished(false));
        assert_eq!(normal.history().len(), 3);
        normal.undo(&mut s.game, false).unwrap();
        assert_eq!(s.game.state.snapshot().unwrap(), before);

        let mut cost = TimingRunner::cost(factory);
        assert_eq!(cost.step(&mut s.game, None).unwrap(), RunnerStatus::Finished(false));
        assert!(cost.history().is_empty());
        assert_eq!(s.game.state.snapshot().unwrap(), before);
    }

    #[test]
    fn test_requests_validated_and_recorded() {
        let mut s = setup();
        let (cards, field) = (s.cards.clone(), s.field);
        let factory = source_factory(move || {
            let cards = cards.clone();
            FnSource::new(move |_: &GameState, input: Resume<'_>| {
                Ok(match input {
                    Resume::Start => SourceStep::Request(InputRequest::choose_target(PlayerId::new(0), cards.clone())),
                    Resume::Response(Response::Entity(card)) => {
                        SourceStep::Batch(vec![Action::move_card(PlayerId::new(0), *card, field)])
                    }
                    Resume::Response(_) => SourceStep::Complete(false),
                    Resume::Timing(timing) => SourceStep::Complete(timing.is_successful()),
                })
            })
        });

        let mut runner = TimingRunner::new(factory);
        runner.attach(NodeId::new(3));
        let RunnerStatus::NeedsInput(request) = runner.step(&mut s.game, None).unwrap() else {
            panic!("expected a request");
        };
        assert_eq!(request.node, Some(NodeId::new(3)));
        assert!(matches!(runner.step(&mut s.game, None), Err(TimingError::MissingResponse)));
        assert!(runner.step(&mut s.game, Some(Response::Entity(EntityId(99)))).is_err());
        assert!(runner.pending_request().is_some());

        let status = runner.step(&mut s.game, Some(Response::Entity(s.cards[2]))).unwrap();
        assert_eq!(status, RunnerStatus::Finished(true));
        assert_eq!(runner.path(), &[Response::Entity(s.cards[2])]);
        assert!(s.game.state.zones.is_in_zone(s.cards[2], s.field));

        // Undo resets to a fresh run that can be replayed.
        runner.undo(&mut s.game, true).unwrap();
        assert!(runner.path().is_empty());
        assert!(s.game.state.zones.is_in_zone(s.cards[2], s.hand));
        let status = runner.replay(&mut s.game, &[Response::Entity(s.cards[1])]).unwrap();
        assert_eq!(status, RunnerStatus::Finished(true));
        assert!(s.game.state.zones.is_in_zone(s.cards[1], s.field));

        runner.undo(&mut s.game, true).unwrap();
        let diverged = runner.replay(&mut s.game, &[Response::Entity(EntityId(99))]);
        assert!(matches!(diverged, Err(TimingError::ReplayDiverged { depth: 0, .. })));
    }

    #[test]
    fn test_ambient_phasing_runs_before_source() {
        let mut s = setup();
        let anthem_source = s.cards[0];
        s.game.abilities.register(
            StaticAbility::new("Anthem", anthem_source, p0())
                .with_targets(crate::modifiers::Condition::SubjectIsCard)
                .value("attack", ValueChange::Add(1)),
        );
        let factory = ScriptedSource::new([vec![Action::move_card(p0(), anthem_source, s.field)]]).factory();
        let mut runner = TimingRunner::new(factory);
        assert_eq!(runner.step(&mut s.game, None).unwrap(), RunnerStatus::Finished(true));

        // Scripted move, then phasing applied the anthem to the card in play.
        let kinds: Vec<bool> = runner.history().iter().map(Timing::is_ambient).collect();
        assert_eq!(kinds, vec![false, true]);
        assert_eq!(
            s.game.state.derived(anthem_source).and_then(|d| d.get("attack")),
            Some(2)
        );
        assert_eq!(s.game.state.timing_counter(), 1);

        runner.undo(&mut s.game, false).unwrap();
        assert!(s.game.state.derived(anthem_source).is_none());
        assert_eq!(s.game.state.timing_counter(), 0);
    }
}
