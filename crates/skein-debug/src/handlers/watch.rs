//! Variable watchpoint handler.

use smol_str::SmolStr;

use skein_runtime::flags::{format_flags, parse_flags};
use skein_runtime::outcome::format_list;
use skein_runtime::{Interp, Outcome, RuntimeError};

use crate::DebugCommand;

use super::arity;

impl DebugCommand {
    /// List watched variables, show one variable's watch types, or change
    /// them. Changes through a link land on the link's target.
    pub(crate) fn handle_watch(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(args, 0, 2, "debug watch ?varName? ?types?")?;
        let flags = match args {
            [] => return Ok(Outcome::ok(format_list(&interp.watched_variables()))),
            [name] => interp.watch_flags(name)?,
            [name, types, ..] => interp.update_watch_flags(name, |current| {
                parse_flags("variable", current, types)
            })?,
        };
        Ok(Outcome::ok(format_flags(&flags)))
    }
}
