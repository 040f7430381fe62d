//! Debugger control and state.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use smol_str::SmolStr;
use tracing::debug;

use crate::error::RuntimeError;
use crate::outcome::ReturnCode;

use super::{BreakContext, BreakpointKind, BreakpointRegistry, RunState};

#[derive(Debug)]
struct DebuggerState {
    enabled: bool,
    run_state: RunState,
    single_step: bool,
    steps: i64,
    registry: BreakpointRegistry,
    callback_arguments: Option<Vec<SmolStr>>,
    command: Option<SmolStr>,
    result: Option<SmolStr>,
    queue: VecDeque<SmolStr>,
    break_count: u64,
    last_break: Option<BreakContext>,
}

/// Point-in-time view of the debugger, used by `debug status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebuggerStatus {
    pub enabled: bool,
    pub run_state: RunState,
    pub single_step: bool,
    pub steps: i64,
    pub kinds: BreakpointKind,
    pub queued: usize,
    pub break_count: u64,
}

/// Shared debugger handle.
///
/// State lives behind one mutex; the condition variable wakes threads parked
/// in an interactive loop when the run state changes or a command is queued.
#[derive(Debug, Clone)]
pub struct Debugger {
    state: Arc<(Mutex<DebuggerState>, Condvar)>,
}

impl Debugger {
    /// Create a disabled debugger in running state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new((
                Mutex::new(DebuggerState {
                    enabled: false,
                    run_state: RunState::Running,
                    single_step: false,
                    steps: 0,
                    registry: BreakpointRegistry::new(),
                    callback_arguments: None,
                    command: None,
                    result: None,
                    queue: VecDeque::new(),
                    break_count: 0,
                    last_break: None,
                }),
                Condvar::new(),
            )),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        let (lock, _) = &*self.state;
        lock.lock().enabled
    }

    /// Set the enabled flag; returns the previous value.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        let (lock, _) = &*self.state;
        let mut state = lock.lock();
        let previous = state.enabled;
        state.enabled = enabled;
        debug!(previous, enabled, "debugger enabled flag changed");
        previous
    }

    pub fn enable(&self) {
        self.set_enabled(true);
    }

    pub fn disable(&self) {
        self.set_enabled(false);
    }

    #[must_use]
    pub fn run_state(&self) -> RunState {
        let (lock, _) = &*self.state;
        lock.lock().run_state
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        matches!(self.run_state(), RunState::Suspended)
    }

    /// Move to `Suspended`; returns the state that was left.
    pub fn suspend(&self) -> Result<RunState, RuntimeError> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        let previous = state.run_state;
        if matches!(previous, RunState::Suspended) {
            return Err(RuntimeError::AlreadySuspended);
        }
        state.run_state = RunState::Suspended;
        cvar.notify_all();
        debug!(?previous, "debugger suspended");
        Ok(previous)
    }

    /// Move back to `Running`, waking any parked interactive loop.
    pub fn resume(&self) -> Result<(), RuntimeError> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        if matches!(state.run_state, RunState::Running) {
            return Err(RuntimeError::NotSuspended);
        }
        let previous = state.run_state;
        state.run_state = RunState::Running;
        cvar.notify_all();
        debug!(?previous, "debugger resumed");
        Ok(())
    }

    /// Undo a [`Self::suspend`], returning to the state it reported.
    pub fn restore(&self, previous: RunState) -> Result<(), RuntimeError> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        if !matches!(state.run_state, RunState::Suspended) {
            return Err(RuntimeError::NotSuspended);
        }
        state.run_state = previous;
        cvar.notify_all();
        debug!(?previous, "debugger state restored");
        Ok(())
    }

    /// Enter a break if the debugger is enabled, running and the registry
    /// wants a break for `context`. `enter_loop` runs with the state lock
    /// released and its code replaces the previous one unless it is `Ok`.
    pub fn check_breakpoint<F>(&self, context: BreakContext, enter_loop: F) -> ReturnCode
    where
        F: FnOnce(&BreakContext) -> ReturnCode,
    {
        let previous = context.previous;
        let Some(context) = self.begin_break(context) else {
            return previous;
        };
        let code = enter_loop(&context);
        self.end_break();
        if code.is_ok() {
            previous
        } else {
            code
        }
    }

    /// Enter `BreakHit` when `context` should break; returns the context
    /// completed with the callback arguments.
    fn begin_break(&self, mut context: BreakContext) -> Option<BreakContext> {
        let (lock, _) = &*self.state;
        let mut state = lock.lock();
        if !state.enabled
            || !matches!(state.run_state, RunState::Running)
            || !wants_break(&state.registry, &context)
        {
            return None;
        }
        state.run_state = RunState::BreakHit;
        state.break_count = state.break_count.saturating_add(1);
        context.callback_arguments.clone_from(&state.callback_arguments);
        debug!(kind = ?context.kind, name = %context.name, "breakpoint hit");
        state.last_break = Some(context.clone());
        Some(context)
    }

    fn end_break(&self) {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        if matches!(state.run_state, RunState::BreakHit) {
            state.run_state = RunState::Running;
        }
        cvar.notify_all();
    }

    /// Decide whether the next evaluated unit should break while single
    /// stepping. A positive step count is consumed instead of breaking.
    pub fn take_step(&self) -> bool {
        let (lock, _) = &*self.state;
        let mut state = lock.lock();
        if !state.enabled || !state.single_step || !matches!(state.run_state, RunState::Running) {
            return false;
        }
        if state.steps > 0 {
            state.steps -= 1;
            return false;
        }
        true
    }

    #[must_use]
    pub fn is_single_step(&self) -> bool {
        let (lock, _) = &*self.state;
        lock.lock().single_step
    }

    /// Toggle single stepping; only allowed for interactive interpreters.
    pub fn set_single_step(&self, enabled: bool, interactive: bool) -> Result<(), RuntimeError> {
        if !interactive {
            let verb = if enabled { "enable" } else { "disable" };
            return Err(RuntimeError::NotInteractive(
                format!("cannot {verb} single step").into(),
            ));
        }
        let (lock, _) = &*self.state;
        lock.lock().single_step = enabled;
        Ok(())
    }

    #[must_use]
    pub fn steps(&self) -> i64 {
        let (lock, _) = &*self.state;
        lock.lock().steps
    }

    pub fn set_steps(&self, steps: i64, interactive: bool) -> Result<(), RuntimeError> {
        if !interactive {
            return Err(RuntimeError::NotInteractive(
                format!("cannot break after {steps} steps").into(),
            ));
        }
        let (lock, _) = &*self.state;
        lock.lock().steps = steps;
        Ok(())
    }

    /// Run `f` with exclusive access to the breakpoint registry.
    pub fn with_registry<T>(&self, f: impl FnOnce(&mut BreakpointRegistry) -> T) -> T {
        let (lock, _) = &*self.state;
        let mut state = lock.lock();
        f(&mut state.registry)
    }

    #[must_use]
    pub fn is_enabled_for(&self, kind: BreakpointKind) -> bool {
        self.with_registry(|registry| registry.is_enabled_for(kind))
    }

    #[must_use]
    pub fn callback_arguments(&self) -> Option<Vec<SmolStr>> {
        let (lock, _) = &*self.state;
        lock.lock().callback_arguments.clone()
    }

    pub fn set_callback_arguments(&self, arguments: Option<Vec<SmolStr>>) {
        let (lock, _) = &*self.state;
        lock.lock().callback_arguments = arguments;
    }

    #[must_use]
    pub fn command(&self) -> Option<SmolStr> {
        let (lock, _) = &*self.state;
        lock.lock().command.clone()
    }

    pub fn set_command(&self, command: Option<SmolStr>) {
        let (lock, _) = &*self.state;
        lock.lock().command = command;
    }

    #[must_use]
    pub fn result(&self) -> Option<SmolStr> {
        let (lock, _) = &*self.state;
        lock.lock().result.clone()
    }

    pub fn set_result(&self, result: Option<SmolStr>) {
        let (lock, _) = &*self.state;
        lock.lock().result = result;
    }

    pub fn enqueue(&self, command: impl Into<SmolStr>) {
        let (lock, cvar) = &*self.state;
        lock.lock().queue.push_back(command.into());
        cvar.notify_all();
    }

    /// Snapshot of the pending commands, oldest first.
    #[must_use]
    pub fn dump(&self) -> Vec<SmolStr> {
        let (lock, _) = &*self.state;
        lock.lock().queue.iter().cloned().collect()
    }

    pub fn clear(&self) {
        let (lock, _) = &*self.state;
        lock.lock().queue.clear();
    }

    /// Apply dump, clear and enqueue, in that order, under one lock.
    pub fn queue_command(
        &self,
        dump: bool,
        clear: bool,
        command: Option<SmolStr>,
    ) -> Option<Vec<SmolStr>> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        let snapshot = dump.then(|| state.queue.iter().cloned().collect());
        if clear {
            state.queue.clear();
        }
        if let Some(command) = command {
            state.queue.push_back(command);
            cvar.notify_all();
        }
        snapshot
    }

    /// Block while a break is active, returning the next queued command.
    /// Returns `None` once the debugger leaves `BreakHit`.
    pub fn wait_for_command(&self) -> Option<SmolStr> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        loop {
            if !matches!(state.run_state, RunState::BreakHit) {
                return None;
            }
            if let Some(command) = state.queue.pop_front() {
                return Some(command);
            }
            cvar.wait(&mut state);
        }
    }

    #[must_use]
    pub fn last_break(&self) -> Option<BreakContext> {
        let (lock, _) = &*self.state;
        lock.lock().last_break.clone()
    }

    #[must_use]
    pub fn status(&self) -> DebuggerStatus {
        let (lock, _) = &*self.state;
        let state = lock.lock();
        DebuggerStatus {
            enabled: state.enabled,
            run_state: state.run_state,
            single_step: state.single_step,
            steps: state.steps,
            kinds: state.registry.kinds(),
            queued: state.queue.len(),
            break_count: state.break_count,
        }
    }
}

/// Entity kinds break when their kind bit is on or the entity itself is
/// flagged; token breaks need both the kind bit and a location match.
fn wants_break(registry: &BreakpointRegistry, context: &BreakContext) -> bool {
    let kind = context.kind;
    if kind == BreakpointKind::EXECUTE || kind == BreakpointKind::TEST {
        registry.is_enabled_for(kind)
            || context
                .entity
                .as_ref()
                .is_some_and(|entity| registry.has(entity))
    } else if kind == BreakpointKind::TOKEN {
        registry.is_enabled_for(kind)
            && context
                .location
                .as_ref()
                .is_some_and(|location| registry.matches(location))
    } else {
        registry.is_enabled_for(kind)
    }
}

impl Default for Debugger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::{EntityId, EntityKind, ScriptLocation};

    fn enabled() -> Debugger {
        let debugger = Debugger::new();
        debugger.enable();
        debugger
    }

    #[test]
    fn suspend_and_resume_follow_the_state_machine() {
        let debugger = enabled();
        assert_eq!(debugger.resume().unwrap_err(), RuntimeError::NotSuspended);
        assert_eq!(debugger.suspend().unwrap(), RunState::Running);
        assert_eq!(
            debugger.suspend().unwrap_err(),
            RuntimeError::AlreadySuspended
        );
        debugger.resume().unwrap();
        assert_eq!(debugger.run_state(), RunState::Running);
    }

    #[test]
    fn break_only_fires_for_enabled_kinds() {
        let debugger = enabled();
        let context = BreakContext::new(BreakpointKind::ERROR, "error");
        let mut entered = 0;
        debugger.check_breakpoint(context.clone(), |_| {
            entered += 1;
            ReturnCode::Ok
        });
        assert_eq!(entered, 0);

        debugger.with_registry(|registry| registry.set_kind(BreakpointKind::ERROR, true));
        let code = debugger.check_breakpoint(context.with_previous(ReturnCode::Error), |_| {
            entered += 1;
            ReturnCode::Ok
        });
        assert_eq!(entered, 1);
        assert_eq!(code, ReturnCode::Error);
        assert_eq!(debugger.run_state(), RunState::Running);
        assert_eq!(debugger.status().break_count, 1);
    }

    #[test]
    fn flagged_entity_breaks_without_kind_bit() {
        let debugger = enabled();
        let entity = EntityId::new(EntityKind::Procedure, "helper");
        let other = EntityId::new(EntityKind::Procedure, "other");
        debugger.with_registry(|registry| {
            registry.register_entity(entity.clone());
            registry.register_entity(other.clone());
            registry.set(&entity, true)
        })
        .unwrap();

        let mut hits = Vec::new();
        for target in [&entity, &other] {
            let context = BreakContext::new(BreakpointKind::EXECUTE, target.name.clone())
                .with_entity(target.clone());
            debugger.check_breakpoint(context, |ctx| {
                hits.push(ctx.name.clone());
                ReturnCode::Ok
            });
        }
        assert_eq!(hits, vec![SmolStr::new("helper")]);
    }

    #[test]
    fn token_break_needs_kind_and_location() {
        let debugger = enabled();
        let location = ScriptLocation::new("a.tcl", 1, 2);
        debugger.with_registry(|registry| registry.set_breakpoint(location.clone()));
        let context = BreakContext::new(BreakpointKind::TOKEN, "a.tcl").with_location(location);

        let mut entered = 0;
        debugger.check_breakpoint(context.clone(), |_| {
            entered += 1;
            ReturnCode::Ok
        });
        debugger.with_registry(|registry| registry.set_kind(BreakpointKind::TOKEN, true));
        debugger.check_breakpoint(context, |_| {
            entered += 1;
            ReturnCode::Ok
        });
        assert_eq!(entered, 1);
    }

    #[test]
    fn loop_code_replaces_previous_unless_ok() {
        let debugger = enabled();
        let context = BreakContext::new(BreakpointKind::DEMAND, "break");
        let code = debugger.check_breakpoint(context, |ctx| {
            assert_eq!(ctx.kind, BreakpointKind::DEMAND);
            ReturnCode::Return
        });
        assert_eq!(code, ReturnCode::Return);
    }

    #[test]
    fn disabled_or_suspended_debugger_never_breaks() {
        let debugger = Debugger::new();
        let context = BreakContext::new(BreakpointKind::DEMAND, "break");
        debugger.check_breakpoint(context.clone(), |_| panic!("disabled debugger broke"));

        debugger.enable();
        debugger.suspend().unwrap();
        debugger.check_breakpoint(context, |_| panic!("suspended debugger broke"));
    }

    #[test]
    fn steps_are_consumed_before_breaking() {
        let debugger = enabled();
        assert!(debugger.set_single_step(true, false).is_err());
        debugger.set_single_step(true, true).unwrap();
        debugger.set_steps(2, true).unwrap();
        assert!(!debugger.take_step());
        assert!(!debugger.take_step());
        assert!(debugger.take_step());
        assert_eq!(debugger.steps(), 0);
    }

    #[test]
    fn queue_command_dumps_before_clearing_and_enqueueing() {
        let debugger = Debugger::new();
        debugger.enqueue("a");
        debugger.enqueue("b");
        let snapshot = debugger.queue_command(true, true, Some("foo".into()));
        assert_eq!(snapshot, Some(vec![SmolStr::new("a"), SmolStr::new("b")]));
        assert_eq!(debugger.dump(), vec![SmolStr::new("foo")]);
    }
}
