//! A small word-oriented evaluator for driving interpreters in tests.
//!
//! Scripts are commands separated by newlines or `;`. Words are split on
//! whitespace; `{...}` groups a word verbatim, braces nesting. There is no
//! substitution while evaluating, only through [`Evaluator::substitute`].

#![allow(missing_docs)]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::debug::{DebugHook, EntityId, EntityKind, ScriptLocation};
use crate::error::RuntimeError;
use crate::eval::{Evaluator, SubstFlags};
use crate::frame::CallFrame;
use crate::interp::Interp;
use crate::outcome::{format_list, Outcome, ReturnCode};

/// A command implementation.
pub type CommandFn = Arc<dyn Fn(&Interp, &[SmolStr]) -> Outcome + Send + Sync>;

/// One command of a script together with the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCommand {
    pub line: u32,
    pub words: Vec<SmolStr>,
}

/// Split `script` into commands.
pub fn parse_script(script: &str) -> Result<Vec<ScriptCommand>, RuntimeError> {
    let mut commands = Vec::new();
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut depth = 0usize;
    let mut line = 1u32;
    let mut start_line = 1u32;

    let mut finish_command = |words: &mut Vec<SmolStr>, start_line: u32| {
        if !words.is_empty() {
            commands.push(ScriptCommand {
                line: start_line,
                words: std::mem::take(words),
            });
        }
    };

    for ch in script.chars() {
        if depth > 0 {
            match ch {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if ch == '\n' {
                line += 1;
            }
            if depth > 0 {
                word.push(ch);
            }
            continue;
        }
        match ch {
            '{' if !in_word => {
                depth = 1;
                in_word = true;
                if words.is_empty() {
                    start_line = line;
                }
            }
            '\n' | ';' => {
                if in_word {
                    words.push(SmolStr::new(&word));
                    word.clear();
                    in_word = false;
                }
                finish_command(&mut words, start_line);
                if ch == '\n' {
                    line += 1;
                }
            }
            ch if ch.is_whitespace() => {
                if in_word {
                    words.push(SmolStr::new(&word));
                    word.clear();
                    in_word = false;
                }
            }
            ch => {
                if !in_word && words.is_empty() {
                    start_line = line;
                }
                in_word = true;
                word.push(ch);
            }
        }
    }
    if depth > 0 {
        return Err(RuntimeError::Syntax(SmolStr::new("missing close-brace")));
    }
    if in_word {
        words.push(SmolStr::new(&word));
    }
    finish_command(&mut words, start_line);
    Ok(commands)
}

/// Join words back into one script, bracing those that need it.
#[must_use]
pub fn join_words(words: &[SmolStr]) -> String {
    format_list(words)
}

fn bool_result(value: bool) -> Outcome {
    Outcome::ok(if value { "true" } else { "false" })
}

fn wrong_args(usage: &str) -> Outcome {
    RuntimeError::usage(usage).into()
}

/// Evaluator with a command table and a handful of built-in commands.
///
/// Every dispatched command passes the step and execute trigger points of
/// its interpreter, and a command that fails passes the error trigger.
#[derive(Clone)]
pub struct ScriptEvaluator {
    commands: Arc<RwLock<FxHashMap<SmolStr, CommandFn>>>,
}

impl Default for ScriptEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEvaluator {
    #[must_use]
    pub fn new() -> Self {
        let evaluator = Self {
            commands: Arc::new(RwLock::new(FxHashMap::default())),
        };
        evaluator.register_builtins();
        evaluator
    }

    /// Add or replace a command.
    pub fn register<F>(&self, name: &str, command: F)
    where
        F: Fn(&Interp, &[SmolStr]) -> Outcome + Send + Sync + 'static,
    {
        self.commands
            .write()
            .insert(SmolStr::new(name), Arc::new(command));
    }

    #[must_use]
    pub fn has_command(&self, name: &str) -> bool {
        self.commands.read().contains_key(name)
    }

    fn command(&self, name: &str) -> Option<CommandFn> {
        self.commands.read().get(name).cloned()
    }

    fn register_builtins(&self) {
        self.register("set", |interp, words| match words {
            [_, name] => interp.get_variable(name).map_or_else(Outcome::from, Outcome::ok),
            [_, name, value] => match interp.set_variable(name, value) {
                Ok(()) => Outcome::ok(value.as_str()),
                Err(err) => err.into(),
            },
            _ => wrong_args("set varName ?newValue?"),
        });
        self.register("unset", |interp, words| match words {
            [_, name] => interp
                .unset_variable(name)
                .map_or_else(Outcome::from, |()| Outcome::empty()),
            _ => wrong_args("unset varName"),
        });
        self.register("link", |interp, words| match words {
            [_, name, target] => {
                let target = interp.with_stack(|stack| stack.local_ref(target));
                interp
                    .link_variable(name, target)
                    .map_or_else(Outcome::from, |()| Outcome::empty())
            }
            _ => wrong_args("link varName otherVarName"),
        });
        self.register("error", |_, words| Outcome::error(words[1..].join(" ")));
        self.register("echo", |_, words| Outcome::ok(words[1..].join(" ")));
        self.register("return", |_, words| {
            Outcome::with_code(ReturnCode::Return, words[1..].join(" "))
        });
        self.register("trusted", |interp, _| bool_result(interp.is_trusted()));
        self.register("events", |interp, _| bool_result(interp.events_enabled()));
        self.register("depth", |interp, _| Outcome::ok(interp.frame_depth().to_string()));
        self.register("sleep", |_, words| match words.get(1).map(|ms| ms.parse::<u64>()) {
            Some(Ok(ms)) => {
                thread::sleep(Duration::from_millis(ms));
                Outcome::empty()
            }
            _ => wrong_args("sleep milliseconds"),
        });
        self.register("call", |interp, words| match words {
            [_, name, body] => {
                let _frame = interp.push_frame(CallFrame::procedure(name.as_str()));
                let outcome = interp.eval_script(body);
                if outcome.code == ReturnCode::Return {
                    Outcome::ok(outcome.result)
                } else {
                    outcome
                }
            }
            _ => wrong_args("call name body"),
        });
        self.register("test", |interp, words| match words {
            [_, name, body] => {
                let mut hook = interp.clone();
                let code = hook.on_test(name, ReturnCode::Ok);
                if code.is_ok() {
                    interp.eval_script(body)
                } else {
                    Outcome::with_code(code, "")
                }
            }
            _ => wrong_args("test name body"),
        });
        self.register("token", |interp, words| match words {
            [_, file, start, end] => {
                let (Ok(start), Ok(end)) = (start.parse(), end.parse()) else {
                    return wrong_args("token file start end");
                };
                let mut hook = interp.clone();
                let location = ScriptLocation::new(file.as_str(), start, end);
                Outcome::with_code(hook.on_token(&location, ReturnCode::Ok), "")
            }
            _ => wrong_args("token file start end"),
        });
    }

    fn dispatch(&self, interp: &Interp, words: &[SmolStr]) -> Outcome {
        let Some(name) = words.first() else {
            return Outcome::empty();
        };
        let command = self
            .command(name)
            .filter(|_| interp.can_invoke(name));
        let Some(command) = command else {
            return RuntimeError::InvalidCommand(name.clone()).into();
        };

        let mut hook = interp.clone();
        let code = hook.on_step(name, ReturnCode::Ok);
        if !code.is_ok() {
            return Outcome::with_code(code, "");
        }
        let entity = EntityId::new(EntityKind::Command, name.clone());
        let code = hook.on_execute(&entity, words, ReturnCode::Ok);
        if !code.is_ok() {
            return Outcome::with_code(code, "");
        }

        let mut outcome = command(interp, words);
        if outcome.is_error() && !outcome.error_reported {
            outcome.error_reported = true;
            outcome.code = hook.on_error(name, outcome.code);
        }
        outcome
    }
}

impl Evaluator for ScriptEvaluator {
    fn eval_script(&self, interp: &Interp, script: &str) -> Outcome {
        let commands = match parse_script(script) {
            Ok(commands) => commands,
            Err(err) => return err.into(),
        };
        let mut outcome = Outcome::empty();
        for command in commands {
            outcome = self.dispatch(interp, &command.words);
            if !outcome.is_ok() {
                if outcome.is_error() && outcome.error_line.is_none() {
                    outcome = outcome.at_line(command.line);
                }
                break;
            }
        }
        outcome
    }

    fn invoke(&self, interp: &Interp, words: &[SmolStr]) -> Outcome {
        self.dispatch(interp, words)
    }

    fn substitute(&self, interp: &Interp, text: &str, flags: SubstFlags) -> Outcome {
        let mut output = String::new();
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\\' if flags.contains(SubstFlags::BACKSLASHES) => match chars.next() {
                    Some('n') => output.push('\n'),
                    Some('t') => output.push('\t'),
                    Some(other) => output.push(other),
                    None => output.push('\\'),
                },
                '$' if flags.contains(SubstFlags::VARIABLES) => {
                    let mut name = String::new();
                    while let Some(next) = chars.peek().copied() {
                        if next.is_alphanumeric() || next == '_' || next == ':' {
                            name.push(next);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if name.is_empty() {
                        output.push('$');
                        continue;
                    }
                    match interp.get_variable(&name) {
                        Ok(value) => output.push_str(&value),
                        Err(err) => return err.into(),
                    }
                }
                '[' if flags.contains(SubstFlags::COMMANDS) => {
                    let mut script = String::new();
                    let mut depth = 1usize;
                    for next in chars.by_ref() {
                        match next {
                            '[' => depth += 1,
                            ']' => depth -= 1,
                            _ => {}
                        }
                        if depth == 0 {
                            break;
                        }
                        script.push(next);
                    }
                    if depth > 0 {
                        return RuntimeError::Syntax(SmolStr::new("missing close-bracket")).into();
                    }
                    let outcome = self.eval_script(interp, &script);
                    if !outcome.is_ok() {
                        return outcome;
                    }
                    output.push_str(&outcome.result);
                }
                ch => output.push(ch),
            }
        }
        Outcome::ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(command: &ScriptCommand) -> Vec<&str> {
        command.words.iter().map(SmolStr::as_str).collect()
    }

    #[test]
    fn splits_commands_and_braced_words() {
        let commands = parse_script("set x 1; echo {a b}\n\ncall p {set y {2}\nset z 3}").unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(words(&commands[0]), ["set", "x", "1"]);
        assert_eq!(words(&commands[1]), ["echo", "a b"]);
        assert_eq!(words(&commands[2]), ["call", "p", "set y {2}\nset z 3"]);
        assert_eq!(commands[2].line, 3);
    }

    #[test]
    fn unbalanced_braces_are_rejected() {
        assert!(parse_script("echo {a").is_err());
    }

    #[test]
    fn join_braces_words_with_spaces() {
        let joined = join_words(&[SmolStr::new("echo"), SmolStr::new("a b"), SmolStr::new("")]);
        assert_eq!(joined, "echo {a b} {}");
    }

    #[test]
    fn errors_carry_their_line() {
        let interp = Interp::new("test", Arc::new(ScriptEvaluator::new()));
        let outcome = interp.eval_script("echo one\n\nerror boom\necho never");
        assert!(outcome.is_error());
        assert_eq!(outcome.result, "boom");
        assert_eq!(outcome.line(), 3);
    }

    #[test]
    fn substitute_honors_flags() {
        let interp = Interp::new("test", Arc::new(ScriptEvaluator::new()));
        interp.set_variable("x", "5").unwrap();
        let all = interp.substitute("x=$x [echo hi]\\t.", SubstFlags::default());
        assert_eq!(all.result, "x=5 hi\t.");
        let none = interp.substitute("x=$x [echo hi]", SubstFlags::empty());
        assert_eq!(none.result, "x=$x [echo hi]");
    }

    #[test]
    fn hidden_commands_need_the_thread_override() {
        let interp = Interp::new("test", Arc::new(ScriptEvaluator::new()));
        interp.hide_command("echo");
        assert!(interp.eval_script("echo hi").is_error());
        interp.set_thread_flags(crate::interp::EngineFlags::IGNORE_HIDDEN);
        assert_eq!(interp.eval_script("echo hi").result, "hi");
        interp.set_thread_flags(crate::interp::EngineFlags::empty());
        interp.expose_command("echo");
        assert_eq!(interp.eval_script("echo again").result, "again");
    }
}
