//! `TimingRunner` integration tests: sequencing, cost mode, phasing and
//! undo of whole runs.

mod common;

use ccg_timing::actions::{Action, Event};
use ccg_timing::core::{EntityId, GameState, TimingError};
use ccg_timing::modifiers::{Condition, StaticAbility, ValueChange};
use ccg_timing::timing::{
    source_factory, FnSource, InputRequest, Resume, Response, RunnerStatus, ScriptedSource, SourceStep,
    TimingRunner,
};

use common::{fill_field, fixture, p0, FIELD_SIZE};

#[test]
fn test_batches_run_in_order() {
    let mut f = fixture();
    let (field, graveyard) = (f.zones[0].field, f.zones[0].graveyard);
    let soldier = f.hand[0];
    let factory = ScriptedSource::new([
        vec![Action::move_card(p0(), soldier, field)],
        vec![Action::discard(p0(), soldier)],
    ])
    .factory();

    let mut runner = TimingRunner::new(factory);
    assert_eq!(runner.step(&mut f.game, None).unwrap(), RunnerStatus::Finished(true));
    assert!(f.game.state.zones.is_in_zone(soldier, graveyard));

    let moves: Vec<&Event> = runner
        .events()
        .filter(|e| matches!(e, Event::Moved { card, .. } if *card == soldier))
        .collect();
    assert_eq!(moves.len(), 2);
    assert_eq!(f.game.state.timing_counter(), 2);
}

/// In normal mode the source sees the failed batch and decides.
#[test]
fn test_normal_mode_reports_failure_to_source() {
    let mut f = fixture();
    fill_field(&mut f, FIELD_SIZE);
    let field = f.zones[0].field;
    let graveyard = f.zones[0].graveyard;
    let soldier = f.hand[0];

    let factory = source_factory(move || {
        let mut failed = false;
        FnSource::new(move |_: &GameState, input: Resume<'_>| {
            Ok(match input {
                Resume::Start => SourceStep::Batch(vec![Action::move_card(p0(), soldier, field).as_cost(0)]),
                Resume::Timing(timing) if !timing.is_successful() && !failed => {
                    failed = true;
                    SourceStep::Batch(vec![Action::move_card(p0(), soldier, graveyard)])
                }
                _ => SourceStep::Complete(failed),
            })
        })
    });

    let mut runner = TimingRunner::new(factory);
    assert_eq!(runner.step(&mut f.game, None).unwrap(), RunnerStatus::Finished(true));
    assert!(f.game.state.zones.is_in_zone(soldier, graveyard));
}

/// In cost mode a failed batch undoes everything paid so far.
#[test]
fn test_cost_mode_is_all_or_nothing() {
    let mut f = fixture();
    fill_field(&mut f, FIELD_SIZE - 1);
    let field = f.zones[0].field;
    let snapshot = f.game.state.snapshot().unwrap();
    let factory = ScriptedSource::new([
        vec![Action::modify_counter(p0(), f.hand[2], "paid", 1).as_cost(0)],
        vec![Action::move_card(p0(), f.hand[0], field).as_cost(0)],
        vec![Action::move_card(p0(), f.hand[1], field).as_cost(0)],
    ])
    .factory();

    let mut runner = TimingRunner::cost(factory);
    assert_eq!(runner.step(&mut f.game, None).unwrap(), RunnerStatus::Finished(false));
    assert_eq!(runner.result(), Some(false));
    assert_eq!(f.game.state.snapshot().unwrap(), snapshot);
}

#[test]
fn test_responder_drives_requests() {
    let mut f = fixture();
    let field = f.zones[0].field;
    let candidates = f.hand.clone();
    let factory = source_factory(move || {
        let candidates = candidates.clone();
        FnSource::new(move |_: &GameState, input: Resume<'_>| {
            Ok(match input {
                Resume::Start => SourceStep::Request(InputRequest::choose_cards(p0(), candidates.clone(), 2, 2)),
                Resume::Response(Response::Entities(chosen)) => {
                    SourceStep::Batch(chosen.iter().map(|c| Action::move_card(p0(), *c, field)).collect())
                }
                Resume::Timing(timing) => SourceStep::Complete(timing.is_successful()),
                Resume::Response(_) => SourceStep::Complete(false),
            })
        })
    });

    let mut runner = TimingRunner::new(factory);
    let picked = runner
        .run_with(&mut f.game, |_, request| {
            request.responses().last().expect("request has responses")
        })
        .unwrap();
    assert!(picked);
    assert_eq!(runner.path(), &[Response::Entities(vec![f.hand[1], f.hand[2]])]);
    assert!(f.game.state.is_in_play(f.hand[2]));
    assert!(!f.game.state.is_in_play(f.hand[0]));
}

#[test]
fn test_undo_then_replay_reaches_same_state() {
    let mut f = fixture();
    let field = f.zones[0].field;
    let candidates = f.hand.clone();
    let factory = source_factory(move || {
        let candidates = candidates.clone();
        FnSource::new(move |_: &GameState, input: Resume<'_>| {
            Ok(match input {
                Resume::Start => SourceStep::Request(InputRequest::choose_target(p0(), candidates.clone())),
                Resume::Response(Response::Entity(card)) => {
                    SourceStep::Batch(vec![Action::move_card(p0(), *card, field), Action::draw(p0())])
                }
                _ => SourceStep::Complete(true),
            })
        })
    });

    let mut runner = TimingRunner::new(factory);
    assert!(matches!(runner.step(&mut f.game, None).unwrap(), RunnerStatus::NeedsInput(_)));
    let before = f.game.state.snapshot().unwrap();
    runner.step(&mut f.game, Some(Response::Entity(f.hand[1]))).unwrap();
    let after = f.game.state.snapshot().unwrap();

    let path = runner.path().to_vec();
    runner.undo(&mut f.game, true).unwrap();
    assert_ne!(f.game.state.snapshot().unwrap(), after);
    assert_eq!(runner.replay(&mut f.game, &path).unwrap(), RunnerStatus::Finished(true));
    assert_eq!(f.game.state.snapshot().unwrap(), after);

    runner.undo(&mut f.game, false).unwrap();
    runner.step(&mut f.game, None).unwrap();
    assert_eq!(f.game.state.snapshot().unwrap(), before);

    // A response the request never offered.
    runner.undo(&mut f.game, false).unwrap();
    let bogus = [Response::Entity(EntityId(77))];
    assert!(matches!(
        runner.replay(&mut f.game, &bogus),
        Err(TimingError::ReplayDiverged { depth: 0, .. })
    ));
}

/// Static abilities are phased in before the source sees the state again.
#[test]
fn test_phasing_keeps_abilities_current() {
    let mut f = fixture();
    let (field, hand) = (f.zones[0].field, f.zones[0].hand);
    let (captain, soldier) = (f.hand[0], f.hand[1]);
    f.game.abilities.register(
        StaticAbility::new("Rally", captain, p0())
            .with_targets(Condition::SubjectInPlay)
            .value("attack", ValueChange::Add(2)),
    );
    let snapshot = f.game.state.snapshot().unwrap();

    let factory = source_factory(move || {
        let mut seen_attack = None;
        let mut batches = 0;
        FnSource::new(move |state: &GameState, input: Resume<'_>| {
            Ok(match input {
                Resume::Start => {
                    batches += 1;
                    SourceStep::Batch(vec![
                        Action::move_card(p0(), captain, field),
                        Action::move_card(p0(), soldier, field),
                    ])
                }
                Resume::Timing(_) if batches == 1 => {
                    batches += 1;
                    seen_attack = state.derived(soldier).and_then(|d| d.get("attack"));
                    SourceStep::Batch(vec![Action::move_card(p0(), soldier, hand)])
                }
                _ => SourceStep::Complete(seen_attack == Some(3)),
            })
        })
    });

    let mut runner = TimingRunner::new(factory);
    assert_eq!(runner.step(&mut f.game, None).unwrap(), RunnerStatus::Finished(true));
    // Left play, so the ability was phased off again.
    assert_eq!(f.game.state.derived(soldier).and_then(|d| d.get("attack")), Some(1));
    assert_eq!(f.game.state.derived(captain).and_then(|d| d.get("attack")), Some(3));

    runner.undo(&mut f.game, false).unwrap();
    assert_eq!(f.game.state.snapshot().unwrap(), snapshot);
}

#[test]
fn test_finished_runner_rejects_responses() {
    let mut f = fixture();
    let mut runner = TimingRunner::new(ScriptedSource::new(Vec::<Vec<Action>>::new()).factory());
    assert_eq!(runner.step(&mut f.game, None).unwrap(), RunnerStatus::Finished(true));
    assert_eq!(runner.step(&mut f.game, None).unwrap(), RunnerStatus::Finished(true));
    assert!(matches!(
        runner.step(&mut f.game, Some(Response::Bool(true))),
        Err(TimingError::UnexpectedResponse)
    ));
}
