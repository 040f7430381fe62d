//! Sub-command handlers grouped by area.
//! - control: enable/suspend/resume/run/step/steps/status/complaint/break
//! - breakpoints: on* toggles, types, token, entity and test breakpoints
//! - queue: interactive loop queue, echo and callback arguments
//! - frames: eval/subst/invoke in debugger frames
//! - secure: secureeval in a child interpreter
//! - watch: variable watchpoints

#![allow(clippy::unused_self)]

mod breakpoints;
mod control;
mod frames;
mod queue;
mod secure;
mod watch;

use skein_runtime::{Outcome, RuntimeError};
use smol_str::SmolStr;

use crate::options::parse_bool;

/// Check the argument count against `min..=max`.
fn arity(args: &[SmolStr], min: usize, max: usize, usage: &str) -> Result<(), RuntimeError> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else {
        Err(RuntimeError::usage(usage))
    }
}

/// Parse the optional boolean at `index`.
fn optional_bool(args: &[SmolStr], index: usize) -> Result<Option<bool>, RuntimeError> {
    args.get(index).map(|text| parse_bool(text)).transpose()
}

fn bool_outcome(value: bool) -> Outcome {
    Outcome::ok(if value { "true" } else { "false" })
}

/// Concatenate script arguments the way `eval` does.
fn concat(args: &[SmolStr]) -> String {
    match args {
        [single] => single.to_string(),
        _ => args
            .iter()
            .map(|arg| arg.trim())
            .filter(|arg| !arg.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    }
}
