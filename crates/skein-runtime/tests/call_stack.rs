use std::sync::Arc;

use skein_runtime::frame::{CallFrame, FrameFlags, LevelSpec};
use skein_runtime::harness::ScriptEvaluator;
use skein_runtime::{Interp, Outcome, RuntimeError};

/// Interpreter with `up level script`, `hidecall name body`, `snap varName`
/// and `marked` commands.
fn uplevel_interp() -> Interp {
    let evaluator = ScriptEvaluator::new();
    evaluator.register("up", |interp, words| {
        let [_, level, script] = words else {
            return RuntimeError::usage("up level script").into();
        };
        let Some(spec) = LevelSpec::parse(level) else {
            return RuntimeError::InvalidFrame(level.clone()).into();
        };
        let target = match interp.with_stack(|stack| stack.resolve(&spec)) {
            Ok(target) => target,
            Err(err) => return err.into(),
        };
        interp
            .uplevel(target, "up", |interp| interp.eval_script(script))
            .unwrap_or_else(Outcome::from)
    });
    evaluator.register("hidecall", |interp, words| {
        let [_, name, body] = words else {
            return RuntimeError::usage("hidecall name body").into();
        };
        let _frame = interp.push_frame(
            CallFrame::procedure(name.as_str()).with_flags(FrameFlags::INVISIBLE),
        );
        interp.eval_script(body)
    });
    evaluator.register("snap", |interp, words| {
        let [_, name] = words else {
            return RuntimeError::usage("snap varName").into();
        };
        let flags = format!("{:?}", all_flags(interp));
        match interp.set_variable(name, &flags) {
            Ok(()) => Outcome::empty(),
            Err(err) => err.into(),
        }
    });
    evaluator.register("marked", |interp, _| {
        let count = interp.with_stack(|stack| stack.frames().filter(|frame| frame.is_marked()).count());
        Outcome::ok(count.to_string())
    });
    Interp::new("main", Arc::new(evaluator))
}

fn all_flags(interp: &Interp) -> Vec<FrameFlags> {
    interp.with_stack(|stack| stack.frames().map(|frame| frame.flags).collect())
}

#[test]
fn frame_count_survives_errors() {
    let interp = uplevel_interp();
    let before = interp.frame_depth();

    let outcome = interp.eval_script("call outer {call inner {error boom}}");
    assert!(outcome.is_error());
    assert_eq!(interp.frame_depth(), before);

    let outcome = interp.eval_script("call outer {call inner {up 1 {error deep}}}");
    assert_eq!(outcome.result, "deep");
    assert_eq!(interp.frame_depth(), before);
}

#[test]
fn uplevel_reads_and_writes_the_target_scope() {
    let interp = uplevel_interp();
    let outcome = interp.eval_script("call outer {set a 1; call inner {up 1 {set a}}}");
    assert_eq!(outcome.result, "1");

    let outcome = interp.eval_script("call outer {call inner {up 1 {set b 2}}; set b}");
    assert_eq!(outcome.result, "2");

    let outcome = interp.eval_script("call outer {call inner {up #0 {set g 3}}}; set g");
    assert_eq!(outcome.result, "3");
}

#[test]
fn named_levels_find_the_nearest_frame() {
    let interp = uplevel_interp();
    let outcome = interp.eval_script(
        "call outer {set where outer; call middle {set where middle; call inner {up @outer {set where}}}}",
    );
    assert_eq!(outcome.result, "outer");
}

#[test]
fn marks_are_released_after_uplevel() {
    let interp = uplevel_interp();
    let outcome = interp.eval_script("call outer {call inner {up 1 {marked}}}");
    assert_eq!(outcome.result, "2");

    let before = all_flags(&interp);
    let outcome = interp.eval_script("call outer {call inner {up 1 {error boom}}}");
    assert!(outcome.is_error());
    assert_eq!(all_flags(&interp), before);
    assert_eq!(interp.eval_script("marked").result, "0");
    assert!(interp.complaint().is_none());
}

#[test]
fn bad_levels_are_reported() {
    let interp = uplevel_interp();
    let outcome = interp.eval_script("call outer {up 5 {set x}}");
    assert!(outcome.is_error());
    assert_eq!(outcome.result, "bad level \"5\"");

    let outcome = interp.eval_script("call outer {up @missing {set x}}");
    assert_eq!(outcome.result, "bad level \"@missing\"");
}

#[test]
fn current_level_runs_without_marking() {
    let interp = uplevel_interp();
    let outcome = interp.eval_script("call outer {set v here; up 0 {marked}}");
    assert_eq!(outcome.result, "0");
    let outcome = interp.eval_script("call outer {set v here; up 0 {set v}}");
    assert_eq!(outcome.result, "here");
}

#[test]
fn nested_uplevel_marks_and_restores_shared_frames() {
    let interp = uplevel_interp();
    let outcome = interp.eval_script("call outer {call inner {up 1 {up 1 {set g 1}}}}; set g");
    assert!(outcome.is_ok(), "{}", outcome.result);
    assert_eq!(outcome.result, "1");

    // inner, outer, the first uplevel frame and the global frame.
    let outcome = interp.eval_script("call outer {call inner {up 1 {up 1 {marked}}}}");
    assert_eq!(outcome.result, "4");

    let outcome = interp.eval_script(
        "call outer {hidecall inner {snap ::before; up 1 {up 1 {set h 2}}; snap ::after}}; set h",
    );
    assert_eq!(outcome.result, "2");
    assert_eq!(
        interp.get_variable("before").unwrap(),
        interp.get_variable("after").unwrap()
    );
    assert!(interp.get_variable("before").unwrap().contains("INVISIBLE"));
    assert_eq!(interp.eval_script("marked").result, "0");
    assert!(interp.complaint().is_none());
}
