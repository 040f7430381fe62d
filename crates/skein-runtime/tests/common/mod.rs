#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use skein_runtime::debug::{BreakContext, Debugger, InteractiveLoop, RunState};
use skein_runtime::harness::ScriptEvaluator;
use skein_runtime::host::InteractiveHost;
use skein_runtime::{DebuggerConfig, Interp, InterpConfig, Outcome, ReturnCode};

/// Interactive loop that records every break and returns a fixed code.
pub struct RecordingLoop {
    code: ReturnCode,
    breaks: Mutex<Vec<(BreakContext, RunState)>>,
}

impl RecordingLoop {
    pub fn new(code: ReturnCode) -> Arc<Self> {
        Arc::new(Self {
            code,
            breaks: Mutex::new(Vec::new()),
        })
    }

    pub fn breaks(&self) -> Vec<BreakContext> {
        self.breaks.lock().iter().map(|(context, _)| context.clone()).collect()
    }

    pub fn states(&self) -> Vec<RunState> {
        self.breaks.lock().iter().map(|(_, state)| *state).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.breaks
            .lock()
            .iter()
            .map(|(context, _)| context.name.to_string())
            .collect()
    }
}

impl InteractiveLoop for RecordingLoop {
    fn run(&self, interp: &Interp, context: &BreakContext) -> Outcome {
        let state = interp
            .debugger()
            .map_or(RunState::Running, |debugger| debugger.run_state());
        self.breaks.lock().push((context.clone(), state));
        Outcome::with_code(self.code, "")
    }
}

#[derive(Default)]
pub struct RecordingHost {
    lines: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl InteractiveHost for RecordingHost {
    fn write_result_line(&self, _code: ReturnCode, text: &str) {
        self.lines.lock().push(text.to_string());
    }
}

pub fn enabled_config() -> InterpConfig {
    InterpConfig {
        debugger: Some(DebuggerConfig {
            enabled: true,
            ..DebuggerConfig::default()
        }),
        ..InterpConfig::default()
    }
}

pub fn interactive_config() -> InterpConfig {
    InterpConfig {
        interactive: true,
        ..enabled_config()
    }
}

/// An interpreter with an enabled debugger and a recording loop.
pub fn recording_interp(code: ReturnCode) -> (Interp, ScriptEvaluator, Arc<RecordingLoop>) {
    let evaluator = ScriptEvaluator::new();
    let interp = Interp::with_config("main", &enabled_config(), Arc::new(evaluator.clone()))
        .expect("valid config");
    let recorder = RecordingLoop::new(code);
    interp.set_interactive_loop(Some(recorder.clone()));
    (interp, evaluator, recorder)
}

/// Poll until the debugger reaches `state`.
pub fn wait_for_state(debugger: &Debugger, state: RunState, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if debugger.run_state() == state {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    debugger.run_state() == state
}
