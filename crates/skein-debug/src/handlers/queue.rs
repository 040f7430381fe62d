//! Interactive loop handlers.
//! - handle_iqueue: dump/clear/enqueue loop commands
//! - handle_icommand/iresult: last echoed command and result
//! - handle_callback: arguments handed to the loop on every break

use smol_str::SmolStr;

use skein_runtime::outcome::format_list;
use skein_runtime::{Interp, Outcome, RuntimeError};

use crate::options::{extra_argument, parse_options, OptionSpec};
use crate::DebugCommand;

use super::arity;

const IQUEUE_OPTIONS: [OptionSpec; 2] = [OptionSpec::switch("-dump"), OptionSpec::switch("-clear")];
const IQUEUE_USAGE: &str = "debug iqueue ?options? ?command?";

/// An empty value clears the stored text.
fn non_empty(text: &SmolStr) -> Option<SmolStr> {
    (!text.is_empty()).then(|| text.clone())
}

impl DebugCommand {
    /// Dump, clear and enqueue apply in that order under one lock.
    pub(crate) fn handle_iqueue(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        let (options, index) = parse_options(&IQUEUE_OPTIONS, args)?;
        if args.len() > index + 1 {
            return Err(extra_argument(
                &IQUEUE_OPTIONS,
                args.get(index + 1),
                IQUEUE_USAGE,
            ));
        }
        let debugger = interp.require_debugger(false)?;
        let snapshot = debugger.queue_command(
            options.has("-dump"),
            options.has("-clear"),
            args.get(index).cloned(),
        );
        Ok(snapshot.map_or_else(Outcome::empty, |commands| {
            Outcome::ok(format_list(&commands))
        }))
    }

    pub(crate) fn handle_icommand(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(args, 0, 1, "debug icommand ?command?")?;
        let debugger = interp.require_debugger(false)?;
        if let Some(command) = args.first() {
            debugger.set_command(non_empty(command));
            return Ok(Outcome::empty());
        }
        Ok(Outcome::ok(debugger.command().unwrap_or_default()))
    }

    pub(crate) fn handle_iresult(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(args, 0, 1, "debug iresult ?result?")?;
        let debugger = interp.require_debugger(false)?;
        if let Some(result) = args.first() {
            debugger.set_result(non_empty(result));
            return Ok(Outcome::empty());
        }
        Ok(Outcome::ok(debugger.result().unwrap_or_default()))
    }

    pub(crate) fn handle_callback(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        let debugger = interp.require_debugger(false)?;
        match args {
            [] => Ok(Outcome::ok(
                debugger
                    .callback_arguments()
                    .map(|arguments| format_list(&arguments))
                    .unwrap_or_default(),
            )),
            [single] if single.is_empty() => {
                debugger.set_callback_arguments(None);
                Ok(Outcome::empty())
            }
            _ => {
                debugger.set_callback_arguments(Some(args.to_vec()));
                Ok(Outcome::empty())
            }
        }
    }
}
