mod common;

use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{enabled_config, interactive_config, recording_interp, wait_for_state, RecordingLoop};
use skein_runtime::debug::{
    BreakContext, BreakpointKind, EntityId, EntityKind, HeaderFlags, RunState, ScriptLocation,
};
use skein_runtime::harness::ScriptEvaluator;
use skein_runtime::{Interp, InterpConfig, ReturnCode};
use smol_str::SmolStr;

#[test]
fn break_on_error_parks_until_resumed() {
    let interp = Interp::with_config("main", &enabled_config(), Arc::new(ScriptEvaluator::new()))
        .unwrap();
    let debugger = interp.debugger().unwrap();
    debugger.with_registry(|registry| registry.set_kind(BreakpointKind::ERROR, true));

    let (tx, rx) = channel();
    let worker = interp.clone();
    let handle = thread::spawn(move || {
        let outcome = worker.eval_script("set x 1\nerror boom");
        tx.send(outcome).unwrap();
    });

    assert!(wait_for_state(&debugger, RunState::BreakHit, Duration::from_secs(2)));
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    assert_eq!(debugger.status().break_count, 1);

    debugger.resume().unwrap();
    let outcome = rx.recv_timeout(Duration::from_millis(500)).unwrap();
    handle.join().unwrap();

    assert!(outcome.is_error());
    assert_eq!(outcome.result, "boom");
    assert_eq!(debugger.run_state(), RunState::Running);
    assert_eq!(debugger.status().break_count, 1);
    let last = debugger.last_break().unwrap();
    assert_eq!(last.kind, BreakpointKind::ERROR);
    assert_eq!(last.name, "error");
    assert_eq!(last.previous, ReturnCode::Error);
}

#[test]
fn parked_loop_runs_queued_commands() {
    let interp = Interp::with_config("main", &enabled_config(), Arc::new(ScriptEvaluator::new()))
        .unwrap();
    let debugger = interp.debugger().unwrap();
    debugger.with_registry(|registry| registry.set_kind(BreakpointKind::ERROR, true));

    let (tx, rx) = channel();
    let worker = interp.clone();
    let handle = thread::spawn(move || {
        tx.send(worker.eval_script("error stop")).unwrap();
    });

    assert!(wait_for_state(&debugger, RunState::BreakHit, Duration::from_secs(2)));
    debugger.enqueue("set seen yes");
    for _ in 0..200 {
        if debugger.result().is_some() {
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(debugger.command().as_deref(), Some("set seen yes"));
    assert_eq!(debugger.result().as_deref(), Some("yes"));

    debugger.resume().unwrap();
    rx.recv_timeout(Duration::from_millis(500)).unwrap();
    handle.join().unwrap();
    assert_eq!(interp.get_variable("seen").unwrap(), "yes");
}

#[test]
fn suspend_also_releases_a_parked_loop() {
    let interp = Interp::with_config("main", &enabled_config(), Arc::new(ScriptEvaluator::new()))
        .unwrap();
    let debugger = interp.debugger().unwrap();

    let (tx, rx) = channel();
    let worker = interp.clone();
    let handle = thread::spawn(move || {
        let code = worker.check_breakpoint(BreakContext::new(BreakpointKind::DEMAND, "break"));
        tx.send(code).unwrap();
    });

    assert!(wait_for_state(&debugger, RunState::BreakHit, Duration::from_secs(2)));
    assert_eq!(debugger.suspend().unwrap(), RunState::BreakHit);
    assert_eq!(
        rx.recv_timeout(Duration::from_millis(500)).unwrap(),
        ReturnCode::Ok
    );
    handle.join().unwrap();
    assert_eq!(debugger.run_state(), RunState::Suspended);
}

#[test]
fn break_on_error_enters_loop_once() {
    let (interp, _, recorder) = recording_interp(ReturnCode::Ok);
    let debugger = interp.debugger().unwrap();
    debugger.with_registry(|registry| registry.set_kind(BreakpointKind::ERROR, true));

    let outcome = interp.eval_script("echo a\nerror boom\necho b");
    assert!(outcome.is_error());
    assert_eq!(recorder.names(), ["error"]);
    assert_eq!(recorder.states(), [RunState::BreakHit]);
    assert_eq!(debugger.run_state(), RunState::Running);
}

#[test]
fn nested_error_breaks_only_where_it_is_raised() {
    let (interp, _, recorder) = recording_interp(ReturnCode::Ok);
    let debugger = interp.debugger().unwrap();
    debugger.with_registry(|registry| registry.set_kind(BreakpointKind::ERROR, true));

    let outcome = interp.eval_script("call p {call q {error boom}}");
    assert!(outcome.is_error());
    assert_eq!(outcome.result, "boom");
    assert_eq!(recorder.names(), ["error"]);
    assert_eq!(debugger.status().break_count, 1);

    let outcome = interp.eval_script("test case {call p {error again}}");
    assert!(outcome.is_error());
    assert_eq!(debugger.status().break_count, 2);
}

#[test]
fn loop_code_replaces_previous_code() {
    let (interp, _, recorder) = recording_interp(ReturnCode::Break);
    interp
        .debugger()
        .unwrap()
        .with_registry(|registry| registry.set_kind(BreakpointKind::ERROR, true));

    let outcome = interp.eval_script("error boom");
    assert_eq!(outcome.code, ReturnCode::Break);
    assert_eq!(recorder.breaks().len(), 1);
}

#[test]
fn disabled_debugger_never_breaks() {
    let (interp, _, recorder) = recording_interp(ReturnCode::Ok);
    let debugger = interp.debugger().unwrap();
    debugger.with_registry(|registry| registry.set_kind(BreakpointKind::ERROR, true));
    debugger.disable();

    assert!(interp.eval_script("error boom").is_error());
    assert!(recorder.breaks().is_empty());
}

#[test]
fn interpreter_without_debugger_keeps_previous_code() {
    let config = InterpConfig {
        debugger: None,
        ..InterpConfig::default()
    };
    let interp = Interp::with_config("bare", &config, Arc::new(ScriptEvaluator::new())).unwrap();
    let context = BreakContext::new(BreakpointKind::DEMAND, "break").with_previous(ReturnCode::Return);
    assert_eq!(interp.check_breakpoint(context), ReturnCode::Return);
    assert!(interp.require_debugger(false).is_err());
}

#[test]
fn single_step_consumes_steps_before_breaking() {
    let evaluator = ScriptEvaluator::new();
    let interp = Interp::with_config("main", &interactive_config(), Arc::new(evaluator)).unwrap();
    let recorder = RecordingLoop::new(ReturnCode::Ok);
    interp.set_interactive_loop(Some(recorder.clone()));
    let debugger = interp.debugger().unwrap();
    debugger.set_single_step(true, interp.is_interactive()).unwrap();
    debugger.set_steps(2, interp.is_interactive()).unwrap();

    interp.eval_script("echo 1; echo 2; set x 3; depth");
    assert_eq!(recorder.names(), ["set", "depth"]);
    assert!(recorder
        .breaks()
        .iter()
        .all(|context| context.kind == BreakpointKind::SINGLE_STEP));
    assert_eq!(debugger.steps(), 0);
}

#[test]
fn stepping_requires_interactive_interpreter() {
    let (interp, _, _) = recording_interp(ReturnCode::Ok);
    let debugger = interp.debugger().unwrap();
    let err = debugger
        .set_single_step(true, interp.is_interactive())
        .unwrap_err();
    assert_eq!(err.to_string(), "cannot enable single step");
    let err = debugger.set_steps(5, interp.is_interactive()).unwrap_err();
    assert_eq!(err.to_string(), "cannot break after 5 steps");
}

#[test]
fn token_breakpoints_match_exact_ranges() {
    let (interp, _, recorder) = recording_interp(ReturnCode::Ok);
    let debugger = interp.debugger().unwrap();
    debugger.with_registry(|registry| {
        registry.set_kind(BreakpointKind::TOKEN, true);
        registry.set_breakpoint(ScriptLocation::new("a.sk", 1, 3));
    });

    interp.eval_script("token a.sk 1 4; token a.sk 1 3; token b.sk 1 3");
    let breaks = recorder.breaks();
    assert_eq!(breaks.len(), 1);
    assert_eq!(breaks[0].location, Some(ScriptLocation::new("a.sk", 1, 3)));
    assert_eq!(breaks[0].name, "a.sk:1:3");
}

#[test]
fn test_breakpoints_fire_without_the_kind() {
    let (interp, _, recorder) = recording_interp(ReturnCode::Ok);
    let debugger = interp.debugger().unwrap();
    let entity = EntityId::new(EntityKind::Test, "t-1");
    assert!(!debugger.with_registry(|registry| registry.set(&entity, true)).unwrap());

    interp.eval_script("test t-1 {echo ok}; test t-2 {echo ok}");
    let breaks = recorder.breaks();
    assert_eq!(breaks.len(), 1);
    assert_eq!(breaks[0].kind, BreakpointKind::TEST);
    assert_eq!(breaks[0].entity, Some(entity));
}

#[test]
fn execute_breakpoints_carry_arguments_and_callbacks() {
    let (interp, _, recorder) = recording_interp(ReturnCode::Ok);
    let debugger = interp.debugger().unwrap();
    let entity = EntityId::new(EntityKind::Command, "echo");
    interp.register_entity(entity.clone());
    debugger.with_registry(|registry| registry.set(&entity, true)).unwrap();
    let callback = vec![SmolStr::new("log"), SmolStr::new("hit")];
    debugger.set_callback_arguments(Some(callback.clone()));

    interp.eval_script("set a 1; echo x y");
    let breaks = recorder.breaks();
    assert_eq!(breaks.len(), 1);
    assert_eq!(breaks[0].kind, BreakpointKind::EXECUTE);
    assert_eq!(breaks[0].arguments, ["echo", "x", "y"]);
    assert_eq!(breaks[0].callback_arguments, Some(callback));
    assert!(breaks[0].header.contains(HeaderFlags::BREAKPOINT));
}

#[test]
fn enabling_writes_host_lines() {
    let (interp, _, _) = recording_interp(ReturnCode::Ok);
    let host = Arc::new(common::RecordingHost::default());
    interp.set_host(Some(host.clone()));

    interp.set_debugger_enabled(false).unwrap();
    interp.set_debugger_enabled(true).unwrap();
    assert_eq!(host.lines(), ["debugger disabled", "debugger enabled"]);
}
