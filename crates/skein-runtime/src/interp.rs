//! Interpreter handle.
//!
//! An [`Interp`] is a cheap, cloneable handle to one interpreter instance. It
//! owns the call-frame stack and the optional debugger, and forwards actual
//! evaluation to the injected [`Evaluator`].
//!
//! Locking: `sync` is a reentrant mutex around the mutable interpreter state
//! (frame stack, hidden commands, entities). State borrows are scoped to a
//! single closure and are never held across evaluator or interactive-loop
//! calls. `eval_lock` is separate and only ever try-locked, by secure
//! evaluation.

#![allow(missing_docs)]

use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use bitflags::bitflags;
use indexmap::IndexSet;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tracing::{debug, error};

use crate::config::InterpConfig;
use crate::debug::{
    BreakContext, BreakpointKind, DebugHook, Debugger, EntityId, EntityKind, HeaderFlags,
    InteractiveLoop, ParkingLoop, Trigger,
};
use crate::error::RuntimeError;
use crate::eval::{Evaluator, SubstFlags};
use crate::frame::{CallFrame, CallStack, FrameFlags, LevelTarget};
use crate::host::InteractiveHost;
use crate::outcome::{Outcome, ReturnCode};
use crate::scope::{Cleanup, FrameScope};
use crate::var::{get_flags, set_flags, watched, VarAccess, VarRef, Variable, VariableFlags};

bitflags! {
    /// Engine behavior toggles scoped to one thread.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EngineFlags: u8 {
        /// Hidden commands may be invoked.
        const IGNORE_HIDDEN = 1;
    }
}

/// Bits granted to the frames between an uplevel target and the current frame.
const MARK_ADD: FrameFlags = FrameFlags::VARIABLES;
const MARK_REMOVE: FrameFlags = FrameFlags::INVISIBLE.union(FrameFlags::NO_VARIABLES);
const MARK_GUARD: FrameFlags = FrameFlags::INVISIBLE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterpId(pub u32);

#[derive(Debug, Default)]
struct InterpState {
    stack: CallStack,
    hidden: FxHashSet<SmolStr>,
    entities: IndexSet<EntityId>,
}

struct InterpInner {
    id: InterpId,
    name: SmolStr,
    sync: ReentrantMutex<RefCell<InterpState>>,
    eval_lock: ReentrantMutex<()>,
    debugger: Option<Debugger>,
    evaluator: Arc<dyn Evaluator>,
    interactive_loop: Mutex<Option<Arc<dyn InteractiveLoop>>>,
    host: Mutex<Option<Arc<dyn InteractiveHost>>>,
    thread_flags: Mutex<FxHashMap<ThreadId, EngineFlags>>,
    complaint: Mutex<Option<SmolStr>>,
    safe: AtomicBool,
    trusted: AtomicBool,
    events: AtomicBool,
    interactive: AtomicBool,
}

#[derive(Clone)]
pub struct Interp {
    inner: Arc<InterpInner>,
}

impl fmt::Debug for Interp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interp")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

impl Interp {
    /// A standalone interpreter with the default configuration.
    pub fn new(name: impl Into<SmolStr>, evaluator: Arc<dyn Evaluator>) -> Self {
        Self::from_parts(
            InterpId(0),
            name.into(),
            &InterpConfig::default(),
            evaluator,
        )
    }

    pub fn with_config(
        name: impl Into<SmolStr>,
        config: &InterpConfig,
        evaluator: Arc<dyn Evaluator>,
    ) -> Result<Self, RuntimeError> {
        Self::build(InterpId(0), name.into(), config, evaluator)
    }

    pub(crate) fn build(
        id: InterpId,
        name: SmolStr,
        config: &InterpConfig,
        evaluator: Arc<dyn Evaluator>,
    ) -> Result<Self, RuntimeError> {
        let interp = Self::from_parts(id, name, config, evaluator);
        if let (Some(debugger), Some(settings)) = (interp.debugger(), &config.debugger) {
            debugger.set_enabled(settings.enabled);
            debugger.with_registry(|registry| registry.set_kinds(settings.kinds));
            if settings.single_step {
                debugger.set_single_step(true, config.interactive)?;
            }
            if settings.steps != 0 {
                debugger.set_steps(settings.steps, config.interactive)?;
            }
        }
        Ok(interp)
    }

    fn from_parts(
        id: InterpId,
        name: SmolStr,
        config: &InterpConfig,
        evaluator: Arc<dyn Evaluator>,
    ) -> Self {
        Self {
            inner: Arc::new(InterpInner {
                id,
                name,
                sync: ReentrantMutex::new(RefCell::new(InterpState::default())),
                eval_lock: ReentrantMutex::new(()),
                debugger: config.debugger.as_ref().map(|_| Debugger::new()),
                evaluator,
                interactive_loop: Mutex::new(None),
                host: Mutex::new(None),
                thread_flags: Mutex::new(FxHashMap::default()),
                complaint: Mutex::new(None),
                safe: AtomicBool::new(config.safe),
                trusted: AtomicBool::new(false),
                events: AtomicBool::new(config.events),
                interactive: AtomicBool::new(config.interactive),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> InterpId {
        self.inner.id
    }

    #[must_use]
    pub fn name(&self) -> &SmolStr {
        &self.inner.name
    }

    /// Returns true when both handles refer to the same interpreter.
    #[must_use]
    pub fn same(&self, other: &Interp) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn evaluator(&self) -> Arc<dyn Evaluator> {
        Arc::clone(&self.inner.evaluator)
    }

    #[must_use]
    pub fn debugger(&self) -> Option<Debugger> {
        self.inner.debugger.clone()
    }

    /// The debugger, which must exist and, when `enabled` is set, be enabled.
    pub fn require_debugger(&self, enabled: bool) -> Result<Debugger, RuntimeError> {
        let debugger = self.debugger().ok_or(RuntimeError::DebuggerUnavailable)?;
        if enabled && !debugger.is_enabled() {
            return Err(RuntimeError::DebuggerDisabled);
        }
        Ok(debugger)
    }

    /// Enable or disable the debugger and tell the host about it.
    pub fn set_debugger_enabled(&self, enabled: bool) -> Result<(), RuntimeError> {
        let debugger = self.require_debugger(false)?;
        debugger.set_enabled(enabled);
        let state = if enabled { "enabled" } else { "disabled" };
        self.write_result_line(ReturnCode::Ok, &format!("debugger {state}"));
        Ok(())
    }

    #[must_use]
    pub fn is_safe(&self) -> bool {
        self.inner.safe.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_trusted(&self) -> bool {
        self.inner.trusted.load(Ordering::Acquire)
    }

    /// Returns the previous value.
    pub fn set_trusted(&self, trusted: bool) -> bool {
        self.inner.trusted.swap(trusted, Ordering::AcqRel)
    }

    #[must_use]
    pub fn events_enabled(&self) -> bool {
        self.inner.events.load(Ordering::Acquire)
    }

    /// Returns the previous value.
    pub fn set_events_enabled(&self, enabled: bool) -> bool {
        self.inner.events.swap(enabled, Ordering::AcqRel)
    }

    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.inner.interactive.load(Ordering::Acquire)
    }

    pub fn set_interactive(&self, interactive: bool) -> bool {
        self.inner.interactive.swap(interactive, Ordering::AcqRel)
    }

    /// Engine flags of the calling thread.
    #[must_use]
    pub fn thread_flags(&self) -> EngineFlags {
        self.inner
            .thread_flags
            .lock()
            .get(&thread::current().id())
            .copied()
            .unwrap_or_default()
    }

    /// Replace the calling thread's engine flags; returns the previous ones.
    pub fn set_thread_flags(&self, flags: EngineFlags) -> EngineFlags {
        let mut table = self.inner.thread_flags.lock();
        let id = thread::current().id();
        let previous = if flags.is_empty() {
            table.remove(&id)
        } else {
            table.insert(id, flags)
        };
        previous.unwrap_or_default()
    }

    pub fn try_eval_lock(&self) -> Option<ReentrantMutexGuard<'_, ()>> {
        self.inner.eval_lock.try_lock()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut InterpState) -> T) -> T {
        let guard = self.inner.sync.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    /// Run `f` against the call-frame stack under the interpreter lock.
    pub fn with_stack<T>(&self, f: impl FnOnce(&mut CallStack) -> T) -> T {
        self.with_state(|state| f(&mut state.stack))
    }

    #[must_use]
    pub fn frame_depth(&self) -> usize {
        self.with_stack(|stack| stack.depth())
    }

    /// Push `frame` until the returned scope is dropped.
    pub fn push_frame(&self, frame: CallFrame) -> FrameScope<'_> {
        FrameScope::push(self, frame)
    }

    /// Returns true when the command was not already hidden.
    pub fn hide_command(&self, name: &str) -> bool {
        self.with_state(|state| state.hidden.insert(SmolStr::new(name)))
    }

    pub fn expose_command(&self, name: &str) -> bool {
        self.with_state(|state| state.hidden.remove(name))
    }

    #[must_use]
    pub fn is_hidden(&self, name: &str) -> bool {
        self.with_state(|state| state.hidden.contains(name))
    }

    /// Hidden commands are only callable when the calling thread ignores
    /// the hidden table.
    #[must_use]
    pub fn can_invoke(&self, name: &str) -> bool {
        !self.is_hidden(name) || self.thread_flags().contains(EngineFlags::IGNORE_HIDDEN)
    }

    /// Make an entity known for per-entity breakpoints.
    pub fn register_entity(&self, entity: EntityId) {
        self.with_state(|state| state.entities.insert(entity.clone()));
        if let Some(debugger) = self.debugger() {
            debugger.with_registry(|registry| registry.register_entity(entity));
        }
    }

    #[must_use]
    pub fn has_entity(&self, entity: &EntityId) -> bool {
        self.with_state(|state| state.entities.contains(entity))
    }

    /// Record an internal consistency failure.
    pub fn complain(&self, step: &str, err: &RuntimeError) {
        error!(interp = %self.inner.name, step, %err, "interpreter complaint");
        *self.inner.complaint.lock() = Some(SmolStr::new(format!("{step}: {err}")));
    }

    #[must_use]
    pub fn complaint(&self) -> Option<SmolStr> {
        self.inner.complaint.lock().clone()
    }

    pub fn set_host(&self, host: Option<Arc<dyn InteractiveHost>>) {
        *self.inner.host.lock() = host;
    }

    pub fn write_result_line(&self, code: ReturnCode, text: &str) {
        let host = self.inner.host.lock().clone();
        if let Some(host) = host {
            host.write_result_line(code, text);
        }
    }

    pub fn set_interactive_loop(&self, interactive_loop: Option<Arc<dyn InteractiveLoop>>) {
        *self.inner.interactive_loop.lock() = interactive_loop;
    }

    /// The configured interactive loop, or a [`ParkingLoop`].
    #[must_use]
    pub fn interactive_loop(&self) -> Arc<dyn InteractiveLoop> {
        self.inner
            .interactive_loop
            .lock()
            .clone()
            .unwrap_or_else(|| Arc::new(ParkingLoop))
    }

    pub fn eval_script(&self, script: &str) -> Outcome {
        self.evaluator().eval_script(self, script)
    }

    pub fn eval_file(&self, path: &Path) -> Outcome {
        self.evaluator().eval_file(self, path)
    }

    pub fn invoke(&self, words: &[SmolStr]) -> Outcome {
        self.evaluator().invoke(self, words)
    }

    pub fn substitute(&self, text: &str, flags: SubstFlags) -> Outcome {
        self.evaluator().substitute(self, text, flags)
    }

    /// Break into the interactive loop if the debugger wants to.
    pub fn check_breakpoint(&self, context: BreakContext) -> ReturnCode {
        let Some(debugger) = self.debugger() else {
            return context.previous;
        };
        let interactive_loop = self.interactive_loop();
        debugger.check_breakpoint(context, |context| interactive_loop.run(self, context).code)
    }

    /// Run `body` in the variable scope of `target`.
    ///
    /// When the target is not the current frame, every frame from the top of
    /// the stack down to the target is marked visible for the duration. The
    /// uplevel frame and the marks are released even when `body` fails.
    pub fn uplevel<F>(&self, target: LevelTarget, name: &str, body: F) -> Result<Outcome, RuntimeError>
    where
        F: FnOnce(&Interp) -> Outcome,
    {
        let current = self.with_stack(|stack| stack.current());
        let _unmark = if target.mark {
            self.with_stack(|stack| {
                stack.mark_range(current, target.level, MARK_ADD, MARK_REMOVE, MARK_GUARD)
            })
            .inspect_err(|err| self.complain("mark frames", err))?;
            Cleanup::new(self, "unmark frames", move || {
                self.with_stack(|stack| {
                    stack.unmark_range(current, target.level, MARK_REMOVE, MARK_ADD, MARK_GUARD)
                })
                .map(drop)
            })
        } else {
            Cleanup::noop(self, "unmark frames")
        };

        let frame = CallStack::new_uplevel_frame(
            name,
            target.level,
            FrameFlags::DEBUGGER,
            target.mark,
            current,
            target.frame,
        );
        let saved = self.with_stack(|stack| stack.push_uplevel_frame(current, frame))?;
        let _pop = Cleanup::new(self, "pop uplevel frame", move || {
            self.with_stack(|stack| stack.pop_uplevel_frame(saved))
                .map(drop)
        });
        Ok(body(self))
    }

    fn watch_break(&self, name: &str, access: VarAccess, flags: VariableFlags) {
        if flags.contains(access.watch_flag()) {
            debug!(variable = name, ?access, "watchpoint hit");
            let context = BreakContext::new(BreakpointKind::VARIABLE, name)
                .with_header(HeaderFlags::VARIABLE);
            // A variable access has no code of its own to replace.
            let _ = self.check_breakpoint(context);
        }
    }

    /// Read a variable, following links.
    pub fn get_variable(&self, name: &str) -> Result<String, RuntimeError> {
        let (reference, flags) = self.with_stack(|stack| {
            let reference = stack.resolve_variable(name)?;
            let flags = stack
                .variable(&reference)
                .map(|variable| variable.flags)
                .unwrap_or_default();
            Ok::<_, RuntimeError>((reference, flags))
        })?;
        self.watch_break(name, VarAccess::Get, flags);
        self.with_stack(|stack| stack.variable(&reference).and_then(|variable| variable.value.clone()))
            .ok_or_else(|| RuntimeError::NoSuchVariable(SmolStr::new(name)))
    }

    /// Write a variable, creating it in the current scope when missing.
    ///
    /// A `Mutable` watch restricts `BreakOnSet` to writes that change the
    /// value.
    pub fn set_variable(&self, name: &str, value: &str) -> Result<(), RuntimeError> {
        let (reference, flags, changed) = self.with_stack(|stack| {
            let reference = stack.resolve_target(name)?;
            let (flags, changed) = stack.variable(&reference).map_or(
                (VariableFlags::empty(), true),
                |variable| (variable.flags, variable.value.as_deref() != Some(value)),
            );
            Ok::<_, RuntimeError>((reference, flags, changed))
        })?;
        if changed || !flags.contains(VariableFlags::MUTABLE) {
            self.watch_break(name, VarAccess::Set, flags);
        }
        self.with_stack(|stack| match stack.variable_mut(&reference) {
            Some(variable) => {
                variable.value = Some(value.to_string());
                variable.flags -= VariableFlags::UNDEFINED;
                Ok(())
            }
            None => stack.insert_variable(&reference, Variable::new(value)),
        })
    }

    pub fn unset_variable(&self, name: &str) -> Result<(), RuntimeError> {
        let (reference, flags) = self.with_stack(|stack| {
            let reference = stack.resolve_variable(name)?;
            let flags = stack
                .variable(&reference)
                .map(|variable| variable.flags)
                .unwrap_or_default();
            Ok::<_, RuntimeError>((reference, flags))
        })?;
        self.watch_break(name, VarAccess::Unset, flags);
        self.with_stack(|stack| stack.remove_variable(&reference))
            .map(drop)
            .ok_or_else(|| RuntimeError::NoSuchVariable(SmolStr::new(name)))
    }

    /// Create `name` in the current scope as a link to `target`.
    pub fn link_variable(&self, name: &str, target: VarRef) -> Result<(), RuntimeError> {
        self.with_stack(|stack| {
            let reference = stack.local_ref(name);
            stack.insert_variable(&reference, Variable::link(target))
        })
    }

    /// Watch bits of the entry `name` resolves to.
    pub fn watch_flags(&self, name: &str) -> Result<VariableFlags, RuntimeError> {
        self.with_stack(|stack| {
            let reference = stack.resolve_variable(name)?;
            Ok(stack.variable(&reference).map(get_flags).unwrap_or_default())
        })
    }

    /// Replace the watch bits of the entry `name` resolves to with the value
    /// `update` computes from the current ones. Links are never modified.
    pub fn update_watch_flags(
        &self,
        name: &str,
        update: impl FnOnce(VariableFlags) -> Result<VariableFlags, RuntimeError>,
    ) -> Result<VariableFlags, RuntimeError> {
        self.with_stack(|stack| {
            let reference = stack.resolve_variable(name)?;
            let variable = stack
                .variable_mut(&reference)
                .ok_or_else(|| RuntimeError::NoSuchVariable(SmolStr::new(name)))?;
            let mask = update(get_flags(variable))?;
            Ok(set_flags(variable, mask))
        })
    }

    /// Watched variables of the current variable scope.
    #[must_use]
    pub fn watched_variables(&self) -> Vec<SmolStr> {
        self.with_stack(|stack| {
            let frame = stack.variable_frame(stack.current());
            stack.table(frame).map(watched).unwrap_or_default()
        })
    }
}

impl DebugHook for Interp {
    fn on_trigger(&mut self, trigger: Trigger<'_>, previous: ReturnCode) -> ReturnCode {
        let context = match trigger {
            Trigger::Execute { entity, arguments } => {
                BreakContext::new(BreakpointKind::EXECUTE, entity.name.clone())
                    .with_entity(entity.clone())
                    .with_arguments(arguments)
            }
            Trigger::Return { name } => BreakContext::new(BreakpointKind::RETURN, name),
            Trigger::Error { name } => BreakContext::new(BreakpointKind::ERROR, name),
            Trigger::Exit => BreakContext::new(BreakpointKind::EXIT, "exit"),
            Trigger::Test { name } => BreakContext::new(BreakpointKind::TEST, name)
                .with_entity(EntityId::new(EntityKind::Test, name)),
            Trigger::Cancel => BreakContext::new(BreakpointKind::CANCEL, "cancel"),
            Trigger::Token { location } => {
                BreakContext::new(BreakpointKind::TOKEN, location.to_string())
                    .with_location(location.clone())
            }
            Trigger::Step { name } => {
                let wants_step = self
                    .debugger()
                    .is_some_and(|debugger| debugger.take_step());
                if !wants_step {
                    return previous;
                }
                BreakContext::new(BreakpointKind::SINGLE_STEP, name)
            }
        };
        self.check_breakpoint(context.with_previous(previous))
    }
}
