#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use skein_debug::DebugCommand;
use skein_runtime::debug::{BreakContext, InteractiveLoop};
use skein_runtime::harness::ScriptEvaluator;
use skein_runtime::host::InteractiveHost;
use skein_runtime::{DebuggerConfig, Interp, InterpConfig, InterpRegistry, Outcome, ReturnCode};

/// Interactive loop that records every break and continues.
#[derive(Default)]
pub struct RecordingLoop {
    breaks: Mutex<Vec<BreakContext>>,
}

impl RecordingLoop {
    pub fn breaks(&self) -> Vec<BreakContext> {
        self.breaks.lock().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.breaks
            .lock()
            .iter()
            .map(|context| context.name.to_string())
            .collect()
    }
}

impl InteractiveLoop for RecordingLoop {
    fn run(&self, _interp: &Interp, context: &BreakContext) -> Outcome {
        self.breaks.lock().push(context.clone());
        Outcome::empty()
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

/// A root interpreter with the `debug` command registered.
pub struct Shell {
    pub registry: Arc<InterpRegistry>,
    pub interp: Interp,
    pub evaluator: ScriptEvaluator,
    pub recorder: Arc<RecordingLoop>,
    pub host: Arc<RecordingHost>,
}

impl Shell {
    pub fn new(config: &InterpConfig) -> Self {
        let registry = Arc::new(InterpRegistry::new());
        let evaluator = ScriptEvaluator::new();
        let command = DebugCommand::new(Arc::clone(&registry));
        evaluator.register("debug", move |interp, words| command.execute(interp, words));
        let interp = registry
            .create_root("main", config, Arc::new(evaluator.clone()))
            .expect("valid config");
        let recorder = Arc::new(RecordingLoop::default());
        interp.set_interactive_loop(Some(recorder.clone()));
        let host = Arc::new(RecordingHost::default());
        interp.set_host(Some(host.clone()));
        Self {
            registry,
            interp,
            evaluator,
            recorder,
            host,
        }
    }

    /// Shell whose debugger is enabled.
    pub fn enabled() -> Self {
        Self::new(&enabled_config())
    }

    pub fn eval(&self, script: &str) -> Outcome {
        self.interp.eval_script(script)
    }

    /// Result text of `script`, whatever its code.
    pub fn result(&self, script: &str) -> String {
        self.eval(script).result
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

pub fn bare_config() -> InterpConfig {
    InterpConfig {
        debugger: None,
        ..InterpConfig::default()
    }
}
