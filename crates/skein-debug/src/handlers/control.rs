//! Run-control handlers.
//! - handle_break: explicit breakpoint
//! - handle_enable/suspend/resume: debugger state
//! - handle_run: evaluate with the debugger suspended
//! - handle_step/steps/interactive: stepping setup
//! - handle_status/complaint: reporting

use smol_str::SmolStr;

use skein_runtime::debug::{BreakContext, BreakpointKind};
use skein_runtime::flags::format_flags;
use skein_runtime::outcome::format_list;
use skein_runtime::scope::Cleanup;
use skein_runtime::{Interp, Outcome, ReturnCode, RuntimeError};

use crate::options::{enabled_word, extra_argument, parse_int, parse_options, OptionSpec};
use crate::DebugCommand;

use super::{arity, bool_outcome, concat, optional_bool};

const BREAK_OPTIONS: [OptionSpec; 2] = [
    OptionSpec::text("-interpreter"),
    OptionSpec::switch("-strict"),
];

impl DebugCommand {
    pub(crate) fn handle_break(
        &self,
        interp: &Interp,
        args: &[SmolStr],
        words: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        let (options, index) = parse_options(&BREAK_OPTIONS, args)?;
        if index < args.len() {
            return Err(extra_argument(
                &BREAK_OPTIONS,
                args.get(index),
                "debug break ?options?",
            ));
        }
        let target = match options.text("-interpreter") {
            Some(path) => self.registry.resolve_child(interp, path)?,
            None => interp.clone(),
        };
        // Without -strict a missing or disabled debugger is not an error.
        if let Err(err) = target.require_debugger(true) {
            return if options.has("-strict") {
                Err(err)
            } else {
                Ok(Outcome::empty())
            };
        }
        let context = BreakContext::new(BreakpointKind::DEMAND, "debug").with_arguments(words);
        let code = target.check_breakpoint(context);
        Ok(Outcome::with_code(code, ""))
    }

    pub(crate) fn handle_enable(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(args, 0, 1, "debug enable ?enabled?")?;
        let debugger = interp.require_debugger(false)?;
        let enabled = optional_bool(args, 0)?.unwrap_or(!debugger.is_enabled());
        interp.set_debugger_enabled(enabled)?;
        Ok(Outcome::empty())
    }

    pub(crate) fn handle_suspend(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(args, 0, 0, "debug suspend")?;
        interp.require_debugger(true)?.suspend()?;
        Ok(Outcome::ok("debugger suspended"))
    }

    pub(crate) fn handle_resume(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(args, 0, 0, "debug resume")?;
        interp.require_debugger(true)?.resume()?;
        Ok(Outcome::ok("debugger resumed"))
    }

    /// The previous run state comes back even when the script fails.
    pub(crate) fn handle_run(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(args, 1, usize::MAX, "debug run arg ?arg ...?")?;
        let debugger = interp.require_debugger(false)?;
        let previous = debugger.suspend()?;
        let _restore = Cleanup::new(interp, "restore debugger", move || {
            debugger.restore(previous)
        });
        Ok(interp.eval_script(&concat(args)))
    }

    pub(crate) fn handle_step(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(args, 0, 1, "debug step ?enabled?")?;
        let debugger = interp.require_debugger(false)?;
        let enabled = optional_bool(args, 0)?.unwrap_or(!debugger.is_single_step());
        debugger.set_single_step(enabled, interp.is_interactive())?;
        interp.write_result_line(
            ReturnCode::Ok,
            &format!("single step {}", enabled_word(enabled)),
        );
        Ok(Outcome::empty())
    }

    pub(crate) fn handle_steps(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(args, 0, 1, "debug steps ?integer?")?;
        let debugger = interp.require_debugger(false)?;
        if let Some(text) = args.first() {
            debugger.set_steps(parse_int(text)?, interp.is_interactive())?;
        }
        Ok(Outcome::ok(debugger.steps().to_string()))
    }

    pub(crate) fn handle_interactive(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(args, 0, 1, "debug interactive ?enabled?")?;
        if let Some(enabled) = optional_bool(args, 0)? {
            interp.set_interactive(enabled);
        }
        Ok(bool_outcome(interp.is_interactive()))
    }

    pub(crate) fn handle_status(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(args, 0, 0, "debug status")?;
        let Some(debugger) = interp.debugger() else {
            return Ok(Outcome::ok(format_list(&[
                "debugger not available",
                "debugger not enabled",
            ])));
        };
        let status = debugger.status();
        let lines = [
            "debugger available".to_string(),
            if status.enabled {
                "debugger enabled"
            } else {
                "debugger not enabled"
            }
            .to_string(),
            format!("run state is \"{:?}\"", status.run_state),
            format!("breakpoint types are \"{}\"", format_flags(&status.kinds)),
            format!("single step is {}", enabled_word(status.single_step)),
            format!("{} queued commands", status.queued),
            format!("{} breaks", status.break_count),
        ];
        Ok(Outcome::ok(format_list(&lines)))
    }

    pub(crate) fn handle_complaint(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(args, 0, 0, "debug complaint")?;
        Ok(Outcome::ok(
            interp.complaint().map(|text| text.to_string()).unwrap_or_default(),
        ))
    }
}
