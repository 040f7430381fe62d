//! Evaluation handlers that run inside debugger frames.
//! - handle_eval: script in a tracking frame
//! - handle_subst: substitution in a tracking frame
//! - handle_invoke: one command at another level

use smol_str::SmolStr;

use skein_runtime::eval::SubstFlags;
use skein_runtime::frame::{CallFrame, FrameFlags, LevelSpec};
use skein_runtime::{Interp, Outcome, RuntimeError};

use crate::options::{extra_argument, parse_options, OptionSpec};
use crate::DebugCommand;

use super::{arity, concat};

const SUBST_OPTIONS: [OptionSpec; 3] = [
    OptionSpec::switch("-nobackslashes"),
    OptionSpec::switch("-nocommands"),
    OptionSpec::switch("-novariables"),
];
const SUBST_USAGE: &str = "debug subst ?-nobackslashes? ?-nocommands? ?-novariables? string";

impl DebugCommand {
    pub(crate) fn handle_eval(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(args, 1, usize::MAX, "debug eval arg ?arg ...?")?;
        let _frame = interp.push_frame(CallFrame::tracking(
            "debug eval",
            FrameFlags::EVALUATE | FrameFlags::DEBUGGER,
        ));
        let mut outcome = interp.eval_script(&concat(args));
        let line = outcome.line();
        outcome.add_error_trace(format!("(in debug eval script line {line})"));
        Ok(outcome)
    }

    pub(crate) fn handle_subst(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        let (options, index) = parse_options(&SUBST_OPTIONS, args)?;
        let [text] = &args[index..] else {
            return Err(extra_argument(
                &SUBST_OPTIONS,
                args.get(index + 1),
                SUBST_USAGE,
            ));
        };
        let mut flags = SubstFlags::all();
        for (option, flag) in [
            ("-nobackslashes", SubstFlags::BACKSLASHES),
            ("-nocommands", SubstFlags::COMMANDS),
            ("-novariables", SubstFlags::VARIABLES),
        ] {
            if options.has(option) {
                flags.remove(flag);
            }
        }
        let _frame = interp.push_frame(CallFrame::tracking(
            "debug subst",
            FrameFlags::SUBSTITUTE | FrameFlags::DEBUGGER,
        ));
        let mut outcome = interp.substitute(text, flags);
        let line = outcome.line();
        outcome.add_error_trace(format!("(in debug subst script line {line})"));
        Ok(outcome)
    }

    /// `?level?` defaults to the caller's frame when the first argument is
    /// not a level.
    pub(crate) fn handle_invoke(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        const USAGE: &str = "debug invoke ?level? cmd ?arg ...?";
        arity(args, 1, usize::MAX, USAGE)?;
        let (level, consumed) = LevelSpec::parse_optional(&args[0]);
        let words = &args[usize::from(consumed)..];
        if words.is_empty() {
            return Err(RuntimeError::usage(USAGE));
        }
        let target = interp.with_stack(|stack| stack.resolve(&level))?;
        let mut outcome = interp.uplevel(target, "debug invoke", |interp| interp.invoke(words))?;
        // The body is a single command.
        let line = outcome.error_line.unwrap_or(1);
        outcome.add_error_trace(format!("(\"debug invoke\" body line {line})"));
        Ok(outcome)
    }
}
