//! `Timing`: a batch of actions that happen together.
//!
//! A timing is a resumable state machine. `advance` drives it through
//!
//! ```text
//! Prune ─► Intercept ─► CostCheck ─► Run ─► FollowUp ─┬─► Done
//!   ▲                                                 │
//!   └──────────── new follow-up actions ──────────────┘
//! ```
//!
//! and suspends with `TimingStep::NeedsInput` whenever interception needs a
//! player decision (ordering tied modifiers, applying an optional one).
//! Each pass of the loop works on a *window*: the actions appended since
//! the previous pass. Cancelled actions stay in the list as a historical
//! record and are skipped by every later phase.
//!
//! Ability uses, runs and the value recalculation are all recorded so that
//! `undo` can restore the game exactly.

use std::collections::BTreeMap;

use im::OrdSet;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::actions::{Action, ActionId, Event};
use crate::core::{AbilityId, EntityId, Game, GameState, Result, TimingError};
use crate::modifiers::values::{recalculate, restore};
use crate::modifiers::{DerivedValues, InterceptEffect};

use super::followup::{follow_ups, FollowUpSeen};
use super::request::{InputRequest, RequestKind, Response};

/// Result of advancing a timing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimingStep {
    /// Suspended until the request is answered.
    NeedsInput(InputRequest),
    /// Done: successful or retired.
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Prune,
    Intercept,
    CostCheck,
    Run,
    FollowUp,
    Done,
}

/// An interception that matched the action under the cursor.
#[derive(Clone, Debug)]
struct Candidate {
    ability: AbilityId,
    object: EntityId,
    effect: InterceptEffect,
}

#[derive(Clone, Debug)]
enum Awaiting {
    Order { request: InputRequest, group: Vec<Candidate> },
    Optional { request: InputRequest, candidate: Candidate },
}

impl Awaiting {
    fn request(&self) -> &InputRequest {
        match self {
            Self::Order { request, .. } | Self::Optional { request, .. } => request,
        }
    }
}

/// Replacement history of one action.
#[derive(Clone, Debug, Default)]
struct Lineage {
    /// Abilities that may not intercept this action again.
    excluded: Vec<AbilityId>,
    /// Replacements between the original action and this one.
    depth: usize,
}

/// A batch of simultaneous actions.
#[derive(Clone, Debug)]
pub struct Timing {
    actions: Vec<Action>,
    ambient: bool,
    empty_success: bool,
    speculative: bool,
    next_id: u32,

    phase: Phase,
    window: usize,
    cursor: usize,
    awaiting: Option<Awaiting>,

    lineages: FxHashMap<ActionId, Lineage>,
    replaced: Vec<ActionId>,
    cost_groups: BTreeMap<u32, bool>,
    follow_up_seen: FollowUpSeen,
    passes: usize,
    /// Index into `events` where the current window's events begin.
    events_mark: usize,

    ran: Vec<usize>,
    events: Vec<Event>,
    dirty: OrdSet<EntityId>,
    applied: Vec<AbilityId>,
    recalculation: Vec<(EntityId, Option<DerivedValues>)>,

    successful: Option<bool>,
    ordering: Option<u64>,
    undone: bool,
}

impl Timing {
    /// A scripted batch.
    pub fn new(actions: impl IntoIterator<Item = Action>) -> Self {
        let mut timing = Self {
            actions: Vec::new(),
            ambient: false,
            empty_success: false,
            speculative: false,
            next_id: 0,
            phase: Phase::Prune,
            window: 0,
            cursor: 0,
            awaiting: None,
            lineages: FxHashMap::default(),
            replaced: Vec::new(),
            cost_groups: BTreeMap::new(),
            follow_up_seen: FollowUpSeen::default(),
            passes: 0,
            events_mark: 0,
            ran: Vec::new(),
            events: Vec::new(),
            dirty: OrdSet::new(),
            applied: Vec::new(),
            recalculation: Vec::new(),
            successful: None,
            ordering: None,
            undone: false,
        };
        for action in actions {
            timing.push(action, Lineage::default());
        }
        timing
    }

    /// An ambient (phasing) batch: no interception, no prohibition, not
    /// counted in the ordering sequence.
    pub fn ambient(actions: impl IntoIterator<Item = Action>) -> Self {
        let mut timing = Self::new(actions);
        timing.ambient = true;
        timing
    }

    /// An empty batch standing for a cost with nothing to pay.
    pub fn empty_cost() -> Self {
        Self::new(Vec::<Action>::new()).with_empty_success()
    }

    /// Treat an empty batch as successful (an already-empty cost).
    #[must_use]
    pub fn with_empty_success(mut self) -> Self {
        self.empty_success = true;
        self
    }

    /// Log per-action work at trace level.
    #[must_use]
    pub fn with_speculative(mut self, speculative: bool) -> Self {
        self.speculative = speculative;
        self
    }

    fn push(&mut self, mut action: Action, lineage: Lineage) -> ActionId {
        action.assign_ids(&mut self.next_id);
        let id = action.id;
        self.lineages.insert(id, lineage);
        self.actions.push(action);
        id
    }

    // === Queries ===

    /// Every action, including cancelled and replaced ones.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    #[must_use]
    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// Events of a successful batch. Empty for a retired one.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.successful == Some(true)
    }

    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.successful == Some(false)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }

    #[must_use]
    pub fn is_ambient(&self) -> bool {
        self.ambient
    }

    /// Whether cost group `group` was paid in full. `None` if the batch
    /// has no such group (or has not checked it yet).
    #[must_use]
    pub fn cost_group_complete(&self, group: u32) -> Option<bool> {
        self.cost_groups.get(&group).copied()
    }

    /// Abilities that intercepted an action, in the order they applied.
    #[must_use]
    pub fn applied_abilities(&self) -> &[AbilityId] {
        &self.applied
    }

    /// Position in the global ordering sequence, for successful scripted
    /// batches.
    #[must_use]
    pub fn ordering(&self) -> Option<u64> {
        self.ordering
    }

    #[must_use]
    pub fn pending_request(&self) -> Option<&InputRequest> {
        self.awaiting.as_ref().map(Awaiting::request)
    }

    // === Driving ===

    /// Drive the batch until it finishes or needs a decision.
    ///
    /// `response` answers the pending request; it must be `None` when no
    /// request is pending.
    pub fn advance(&mut self, game: &mut Game, response: Option<Response>) -> Result<TimingStep> {
        let mut response = match (&self.awaiting, response) {
            (Some(awaiting), Some(response)) => {
                awaiting.request().validate(&response)?;
                Some(response)
            }
            (Some(_), None) => return Err(TimingError::MissingResponse),
            (None, Some(_)) => return Err(TimingError::UnexpectedResponse),
            (None, None) => None,
        };
        if self.undone {
            return Err(TimingError::NotRun);
        }

        loop {
            match self.phase {
                Phase::Prune => {
                    self.prune(game);
                    self.cursor = self.window;
                    self.phase = if self.ambient { Phase::CostCheck } else { Phase::Intercept };
                }
                Phase::Intercept => {
                    if let Some(request) = self.intercept(game, response.take())? {
                        return Ok(TimingStep::NeedsInput(request));
                    }
                    self.phase = Phase::CostCheck;
                }
                Phase::CostCheck => {
                    self.check_cost_groups(&game.state);
                    self.phase = Phase::Run;
                }
                Phase::Run => {
                    self.run_window(&mut game.state)?;
                    self.phase = Phase::FollowUp;
                }
                Phase::FollowUp => {
                    let ran: Vec<&Action> = self
                        .ran
                        .iter()
                        .filter(|i| **i >= self.window)
                        .map(|i| &self.actions[*i])
                        .collect();
                    let new = follow_ups(
                        &game.state,
                        ran,
                        &self.events[self.events_mark..],
                        &mut self.follow_up_seen,
                    );
                    if new.is_empty() {
                        self.finish(game);
                        self.phase = Phase::Done;
                        continue;
                    }
                    self.passes += 1;
                    if self.passes > game.config.follow_up_limit {
                        return Err(TimingError::FollowUpLimit {
                            limit: game.config.follow_up_limit,
                        });
                    }
                    trace!(count = new.len(), pass = self.passes, "follow-up actions");
                    self.window = self.actions.len();
                    self.events_mark = self.events.len();
                    for action in new {
                        self.push(action, Lineage::default());
                    }
                    self.phase = Phase::Prune;
                }
                Phase::Done => return Ok(TimingStep::Finished),
            }
        }
    }

    /// Advance to the end, answering requests with `responder`.
    pub fn resolve(
        &mut self,
        game: &mut Game,
        mut responder: impl FnMut(&GameState, &InputRequest) -> Response,
    ) -> Result<()> {
        let mut response = None;
        loop {
            match self.advance(game, response.take())? {
                TimingStep::NeedsInput(request) => response = Some(responder(&game.state, &request)),
                TimingStep::Finished => return Ok(()),
            }
        }
    }

    // === Phases ===

    /// Cancel impossible and prohibited actions in the window.
    fn prune(&mut self, game: &Game) {
        for index in self.window..self.actions.len() {
            let action = &self.actions[index];
            if action.is_cancelled() {
                continue;
            }
            let prohibited = !self.ambient && game.abilities.is_prohibited(&game.state, action);
            if prohibited || action.is_impossible(&game.state) {
                trace!(action = %action.id, prohibited, "pruned");
                self.cancel(index);
            }
        }
    }

    fn cancel(&mut self, index: usize) {
        for id in self.actions[index].set_cancelled() {
            self.events.push(Event::Cancelled { action: id });
        }
    }

    /// Walk the window, letting matching modifiers intercept each action.
    fn intercept(&mut self, game: &mut Game, response: Option<Response>) -> Result<Option<InputRequest>> {
        if let Some(awaiting) = self.awaiting.take() {
            let response = response.ok_or(TimingError::MissingResponse)?;
            let request = match (awaiting, response) {
                (Awaiting::Order { group, .. }, Response::Index(i)) => {
                    let chosen = group[i].clone();
                    self.consider(game, chosen)?
                }
                (Awaiting::Optional { candidate, .. }, Response::Bool(apply)) => {
                    if apply {
                        self.apply(game, candidate)?;
                    } else {
                        self.exclude(self.cursor, candidate.ability);
                    }
                    None
                }
                (awaiting, response) => {
                    return Err(TimingError::InvalidResponse {
                        request: format!("{:?}", awaiting.request().kind),
                        reason: format!("wrong response type {response:?}"),
                    })
                }
            };
            if request.is_some() {
                return Ok(request);
            }
        }

        while self.cursor < self.actions.len() {
            if self.actions[self.cursor].is_cancelled() {
                self.cursor += 1;
                continue;
            }
            let group = self.first_bucket(game);
            match group.len() {
                0 => self.cursor += 1,
                1 => {
                    if let Some(request) = self.consider(game, group[0].clone())? {
                        return Ok(Some(request));
                    }
                }
                _ => {
                    let action = &self.actions[self.cursor];
                    let player = game.state.controller_of(group[0].object).unwrap_or(action.player);
                    let request = InputRequest::new(
                        player,
                        RequestKind::OrderModifiers {
                            candidates: group.iter().map(|c| c.ability).collect(),
                        },
                    );
                    self.awaiting = Some(Awaiting::Order {
                        request: request.clone(),
                        group,
                    });
                    return Ok(Some(request));
                }
            }
        }
        Ok(None)
    }

    /// The highest-priority candidates for the action under the cursor.
    ///
    /// Candidates are ordered by: the object's own abilities first, then
    /// the source's age in play (oldest first), then abilities controlled
    /// by the object's controller first. What remains tied is returned
    /// together.
    fn first_bucket(&self, game: &Game) -> Vec<Candidate> {
        let state = &game.state;
        let action = &self.actions[self.cursor];
        let excluded = self
            .lineages
            .get(&action.id)
            .map(|l| l.excluded.as_slice())
            .unwrap_or_default();

        let mut keyed: Vec<((bool, u64, bool), Candidate)> = Vec::new();
        for object in action.affected_objects() {
            for (ability, interception) in game.abilities.interceptions(state, action, object) {
                if excluded.contains(&ability.id)
                    || keyed.iter().any(|(_, c)| c.ability == ability.id)
                    || game.abilities.is_exhausted(state, ability)
                {
                    continue;
                }
                let key = (
                    ability.source != object,
                    state.card(ability.source).and_then(|c| c.entered_play).unwrap_or(u64::MAX),
                    state.controller_of(object) != Some(ability.controller),
                );
                keyed.push((
                    key,
                    Candidate {
                        ability: ability.id,
                        object,
                        effect: interception.effect.clone(),
                    },
                ));
            }
        }
        keyed.sort_by_key(|(key, _)| *key);

        let Some(first) = keyed.first().map(|(key, _)| *key) else {
            return Vec::new();
        };
        keyed
            .into_iter()
            .take_while(|(key, _)| *key == first)
            .map(|(_, c)| c)
            .collect()
    }

    /// Apply a mandatory candidate, or ask about an optional one.
    fn consider(&mut self, game: &mut Game, candidate: Candidate) -> Result<Option<InputRequest>> {
        let ability = game.abilities.require(candidate.ability)?;
        if ability.mandatory {
            self.apply(game, candidate)?;
            return Ok(None);
        }
        let request = InputRequest::new(ability.controller, RequestKind::ApplyOptional { ability: ability.id });
        self.awaiting = Some(Awaiting::Optional {
            request: request.clone(),
            candidate,
        });
        Ok(Some(request))
    }

    fn exclude(&mut self, index: usize, ability: AbilityId) {
        let id = self.actions[index].id;
        self.lineages.entry(id).or_default().excluded.push(ability);
    }

    /// Cancel or replace the action under the cursor.
    fn apply(&mut self, game: &mut Game, candidate: Candidate) -> Result<()> {
        let index = self.cursor;
        let original_id = self.actions[index].id;

        let replacement = match &candidate.effect {
            InterceptEffect::Cancel => {
                self.record_use(&mut game.state, candidate.ability);
                debug!(action = %original_id, ability = %candidate.ability, "intercepted: cancel");
                self.cancel(index);
                self.events.push(Event::Replaced {
                    action: original_id,
                    ability: candidate.ability,
                    by: Vec::new(),
                });
                return Ok(());
            }
            InterceptEffect::Replace(replace) => replace(&self.actions[index], &game.state),
        };

        let original = &self.actions[index];
        let new: Vec<Action> = replacement
            .actions
            .into_iter()
            .map(|kind| {
                let mut action = Action::new(original.player, kind);
                action.caused_by = original.caused_by;
                action.on_behalf_of = original.on_behalf_of;
                match original.cost_group {
                    Some(group) => action.as_cost(group),
                    None => action,
                }
            })
            .collect();

        if let [only] = new.as_slice() {
            if only.is_identical_to(original) {
                trace!(action = %original_id, ability = %candidate.ability, "replacement is identical, skipped");
                self.exclude(index, candidate.ability);
                return Ok(());
            }
        }

        let parent = self.lineages.get(&original_id).cloned().unwrap_or_default();
        let limit = game.config.replacement_limit;
        if parent.depth + 1 > limit {
            return Err(TimingError::ReplacementLimit { limit });
        }
        let mut child = parent;
        child.depth += 1;
        child.excluded.push(candidate.ability);

        self.record_use(&mut game.state, candidate.ability);
        self.events.extend(replacement.notes.into_iter().map(Event::Note));
        self.actions[index].set_cancelled();
        self.replaced.push(original_id);

        let mut by = Vec::with_capacity(new.len());
        let mut spliced = Vec::with_capacity(new.len());
        for mut action in new {
            action.assign_ids(&mut self.next_id);
            self.lineages.insert(action.id, child.clone());
            by.push(action.id);
            spliced.push(action);
        }
        let at = index + 1;
        self.actions.splice(at..at, spliced);
        debug!(action = %original_id, ability = %candidate.ability, by = ?by, "intercepted: replace");
        self.events.push(Event::Replaced {
            action: original_id,
            ability: candidate.ability,
            by: by.clone(),
        });

        for offset in 0..by.len() {
            let action = &self.actions[at + offset];
            if action.is_impossible(&game.state) || game.abilities.is_prohibited(&game.state, action) {
                self.cancel(at + offset);
            }
        }
        Ok(())
    }

    fn record_use(&mut self, state: &mut GameState, ability: AbilityId) {
        state.record_ability_use(ability);
        self.applied.push(ability);
    }

    /// Cancel every cost group in the window that cannot be paid in full.
    fn check_cost_groups(&mut self, state: &GameState) {
        let window = &self.actions[self.window..];
        let groups: OrdSet<u32> = window.iter().filter_map(|a| a.cost_group).collect();

        for group in groups {
            let members: Vec<usize> = (self.window..self.actions.len())
                .filter(|i| {
                    let action = &self.actions[*i];
                    action.cost_group == Some(group) && !self.replaced.contains(&action.id)
                })
                .collect();
            let window = &self.actions[self.window..];
            let complete = members
                .iter()
                .all(|i| self.actions[*i].is_fully_possible(state, window));
            if !complete {
                debug!(group, "cost group cannot be paid");
                for index in &members {
                    self.cancel(*index);
                }
            }
            let entry = self.cost_groups.entry(group).or_insert(true);
            *entry &= complete;
        }
    }

    /// Run the surviving actions of the window in list order.
    fn run_window(&mut self, state: &mut GameState) -> Result<()> {
        for index in self.window..self.actions.len() {
            if self.actions[index].is_cancelled() {
                continue;
            }
            if self.actions[index].is_impossible(state) {
                // Made impossible by an earlier action in this batch.
                if let Some(group) = self.actions[index].cost_group {
                    self.cost_groups.insert(group, false);
                }
                self.cancel(index);
                continue;
            }
            let action = &mut self.actions[index];
            let event = action.run(state, self.speculative)?;
            self.dirty.extend(action.affected_objects());
            self.ran.push(index);
            self.events.extend(event);
        }
        Ok(())
    }

    fn finish(&mut self, game: &mut Game) {
        let ran_any = !self.ran.is_empty();
        let successful = ran_any || (self.empty_success && self.actions.is_empty());
        self.successful = Some(successful);

        if !successful {
            self.events.clear();
            debug!(actions = self.actions.len(), ambient = self.ambient, "batch retired");
            return;
        }

        let recalculation = recalculate(&mut game.state, &game.abilities, self.dirty.iter().copied());
        self.events.extend(recalculation.events);
        self.recalculation = recalculation.previous;

        if ran_any && !self.ambient {
            self.ordering = Some(game.state.advance_timing_counter());
        }
        debug!(
            ran = self.ran.len(),
            events = self.events.len(),
            ordering = ?self.ordering,
            ambient = self.ambient,
            "batch successful"
        );
    }

    // === Undo ===

    /// Reverse everything this batch did, in reverse order.
    ///
    /// Works on finished and on suspended batches. Returns the inverse
    /// events of the actions that were undone.
    pub fn undo(&mut self, game: &mut Game, speculative: bool) -> Result<Vec<Event>> {
        if self.undone {
            return Err(TimingError::NotRun);
        }
        let state = &mut game.state;

        restore(state, &std::mem::take(&mut self.recalculation));
        let mut inverse = Vec::new();
        for index in self.ran.drain(..).rev() {
            inverse.extend(self.actions[index].undo(state, speculative)?);
        }
        if self.ordering.is_some() {
            state.rewind_timing_counter();
        }
        for ability in self.applied.iter().rev() {
            state.revert_ability_use(*ability);
        }

        self.undone = true;
        self.phase = Phase::Done;
        self.awaiting = None;
        if speculative {
            trace!(undone = inverse.len(), "batch undone");
        } else {
            debug!(undone = inverse.len(), "batch undone");
        }
        Ok(inverse)
    }
}
