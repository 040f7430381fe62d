//! Breakpoint handlers.
//! - handle_break_on: oncancel/onerror/onexecute/onexit/onreturn/ontest/ontoken
//! - handle_types: the whole kind set
//! - handle_token/breakpoints: source location breakpoints
//! - handle_entity: execute/function/operator/procedure breakpoints
//! - handle_test: test breakpoints

use smol_str::SmolStr;

use skein_runtime::debug::{BreakpointKind, EntityId, EntityKind, ScriptLocation};
use skein_runtime::flags::{format_flags, parse_flags};
use skein_runtime::outcome::format_list;
use skein_runtime::{Interp, Outcome, ReturnCode, RuntimeError};

use crate::options::{enabled_word, parse_line};
use crate::DebugCommand;

use super::{arity, optional_bool};

/// Kind bit and display word of an `on*` sub-command.
fn break_on_kind(option: &str) -> Option<(BreakpointKind, &'static str)> {
    let kind = match option {
        "oncancel" => (BreakpointKind::CANCEL, "cancel"),
        "onerror" => (BreakpointKind::ERROR, "error"),
        "onexecute" => (BreakpointKind::EXECUTE, "execute"),
        "onexit" => (BreakpointKind::EXIT, "exit"),
        "onreturn" => (BreakpointKind::RETURN, "return"),
        "ontest" => (BreakpointKind::TEST, "test"),
        "ontoken" => (BreakpointKind::TOKEN, "token"),
        _ => return None,
    };
    Some(kind)
}

/// Entity kinds an entity sub-command looks up, most specific first.
fn entity_kinds(option: &str) -> &'static [EntityKind] {
    match option {
        "execute" => &[EntityKind::Command, EntityKind::Procedure],
        "function" => &[EntityKind::Function],
        "operator" => &[EntityKind::Operator],
        _ => &[EntityKind::Procedure],
    }
}

fn resolve_entity(interp: &Interp, option: &str, name: &SmolStr) -> Result<EntityId, RuntimeError> {
    let kinds = entity_kinds(option);
    kinds
        .iter()
        .map(|kind| EntityId::new(*kind, name.clone()))
        .find(|entity| interp.has_entity(entity))
        .ok_or_else(|| match kinds {
            [kind @ (EntityKind::Function | EntityKind::Operator)] => {
                RuntimeError::EntityNotFound {
                    kind: kind.as_str(),
                    name: name.clone(),
                }
            }
            _ => RuntimeError::InvalidCommand(name.clone()),
        })
}

impl DebugCommand {
    pub(crate) fn handle_break_on(
        &self,
        interp: &Interp,
        option: &SmolStr,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        let usage = format!("debug {option} ?enabled?");
        arity(args, 0, 1, &usage)?;
        let Some((kind, what)) = break_on_kind(option) else {
            return Err(RuntimeError::usage(usage));
        };
        let requested = optional_bool(args, 0)?;
        let debugger = interp.require_debugger(false)?;
        let enabled = debugger.with_registry(|registry| registry.toggle_kind(kind, requested));
        interp.write_result_line(
            ReturnCode::Ok,
            &format!("break on {what} {}", enabled_word(enabled)),
        );
        Ok(Outcome::ok(enabled_word(enabled)))
    }

    pub(crate) fn handle_types(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(args, 0, 1, "debug types ?types?")?;
        let debugger = interp.require_debugger(false)?;
        let kinds = debugger.with_registry(|registry| {
            if let Some(text) = args.first() {
                let kinds = parse_flags("breakpoint type", registry.kinds(), text)?;
                registry.set_kinds(kinds);
            }
            Ok::<_, RuntimeError>(registry.kinds())
        })?;
        Ok(Outcome::ok(format_flags(&kinds)))
    }

    pub(crate) fn handle_token(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(
            args,
            3,
            4,
            "debug token fileName startLine endLine ?enabled?",
        )?;
        let debugger = interp.require_debugger(false)?;
        let location = ScriptLocation::new(args[0].clone(), parse_line(&args[1])?, parse_line(&args[2])?);
        let result = match optional_bool(args, 3)? {
            Some(enabled) => {
                let already = debugger.with_registry(|registry| {
                    if enabled {
                        registry.set_breakpoint(location.clone())
                    } else {
                        !registry.clear_breakpoint(&location)
                    }
                });
                format!(
                    "token \"{location}\" breakpoint {} {}",
                    if already { "was already" } else { "is now" },
                    enabled_word(enabled)
                )
            }
            None => {
                let enabled = debugger.with_registry(|registry| registry.matches(&location));
                format!("token \"{location}\" breakpoint is {}", enabled_word(enabled))
            }
        };
        Ok(Outcome::ok(result))
    }

    pub(crate) fn handle_breakpoints(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(args, 0, 1, "debug breakpoints ?pattern?")?;
        let debugger = interp.require_debugger(false)?;
        let pattern = args.first().map(SmolStr::as_str);
        let locations = debugger.with_registry(|registry| registry.locations(pattern))?;
        let names: Vec<String> = locations.iter().map(ToString::to_string).collect();
        Ok(Outcome::ok(format_list(&names)))
    }

    pub(crate) fn handle_entity(
        &self,
        interp: &Interp,
        option: &SmolStr,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(args, 1, 2, &format!("debug {option} name ?enabled?"))?;
        let name = &args[0];
        let requested = optional_bool(args, 1)?;
        let entity = resolve_entity(interp, option, name)?;
        let debugger = interp.require_debugger(false)?;
        let result = match requested {
            Some(enabled) => {
                debugger.with_registry(|registry| registry.set(&entity, enabled))?;
                format!(
                    "{option} \"{name}\" breakpoint is now {}",
                    enabled_word(enabled)
                )
            }
            None => {
                let enabled = debugger.with_registry(|registry| registry.has(&entity));
                format!("{option} \"{name}\" breakpoint is {}", enabled_word(enabled))
            }
        };
        Ok(Outcome::ok(result))
    }

    pub(crate) fn handle_test(
        &self,
        interp: &Interp,
        args: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        arity(args, 0, 2, "debug test ?name? ?enabled?")?;
        let debugger = interp.require_debugger(false)?;
        let Some(name) = args.first() else {
            let names = debugger.with_registry(|registry| registry.flagged(EntityKind::Test));
            return Ok(Outcome::ok(format_list(&names)));
        };
        let entity = EntityId::new(EntityKind::Test, name.clone());
        let result = match optional_bool(args, 1)? {
            Some(enabled) => {
                debugger.with_registry(|registry| registry.set(&entity, enabled))?;
                format!("test \"{name}\" breakpoint is now {}", enabled_word(enabled))
            }
            None => {
                let enabled = debugger.with_registry(|registry| registry.has(&entity));
                format!("test \"{name}\" breakpoint is {}", enabled_word(enabled))
            }
        };
        Ok(Outcome::ok(result))
    }
}
