//! Evaluation outcomes.

#![allow(missing_docs)]

use std::fmt;

use smol_str::SmolStr;

use crate::error::RuntimeError;

/// Completion code of an evaluation or command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReturnCode {
    #[default]
    Ok,
    Error,
    Return,
    Break,
    Continue,
}

impl ReturnCode {
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Return => "return",
            Self::Break => "break",
            Self::Continue => "continue",
        };
        f.write_str(text)
    }
}

/// Code and textual result of an evaluation.
///
/// `trace` accumulates the error trace lines added while an error propagates
/// outward through eval-like commands; `error_line` is the script line the
/// evaluator reported for the failure. `error_reported` is set once the error
/// trigger point has seen the error, so commands that only pass it outward
/// do not report it again.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Outcome {
    pub code: ReturnCode,
    pub result: String,
    pub error_line: Option<u32>,
    pub trace: Vec<SmolStr>,
    pub error_reported: bool,
}

impl Outcome {
    #[must_use]
    pub fn ok(result: impl Into<String>) -> Self {
        Self {
            code: ReturnCode::Ok,
            result: result.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn error(result: impl Into<String>) -> Self {
        Self {
            code: ReturnCode::Error,
            result: result.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_code(code: ReturnCode, result: impl Into<String>) -> Self {
        Self {
            code,
            result: result.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn at_line(mut self, line: u32) -> Self {
        self.error_line = Some(line);
        self
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.code.is_error()
    }

    /// Append an error trace line; no-op unless the outcome is an error.
    pub fn add_error_trace(&mut self, line: impl Into<SmolStr>) {
        if self.is_error() {
            self.trace.push(line.into());
        }
    }

    /// Error line reported by the evaluator, zero when unknown.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.error_line.unwrap_or(0)
    }
}

/// Format items as a list, bracing empty items and items that contain
/// whitespace, a command separator, braces, quotes or backslashes. Items
/// whose braces do not balance are backslash-escaped instead.
#[must_use]
pub fn format_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| list_element(item.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn list_element(item: &str) -> String {
    if item.is_empty() {
        return "{}".to_string();
    }
    let special = |ch: char| ch.is_whitespace() || matches!(ch, ';' | '{' | '}' | '"' | '\\');
    if !item.contains(special) {
        return item.to_string();
    }
    if braces_balance(item) && !item.ends_with('\\') {
        return format!("{{{item}}}");
    }
    let mut escaped = String::with_capacity(item.len() * 2);
    for ch in item.chars() {
        match ch {
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            ch if special(ch) || matches!(ch, '[' | '$') => {
                escaped.push('\\');
                escaped.push(ch);
            }
            ch => escaped.push(ch),
        }
    }
    escaped
}

fn braces_balance(item: &str) -> bool {
    let mut depth = 0usize;
    for ch in item.chars() {
        match ch {
            '{' => depth += 1,
            '}' => match depth.checked_sub(1) {
                Some(next) => depth = next,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

impl From<RuntimeError> for Outcome {
    fn from(err: RuntimeError) -> Self {
        Outcome::error(err.to_string())
    }
}

impl From<Result<Outcome, RuntimeError>> for Outcome {
    fn from(result: Result<Outcome, RuntimeError>) -> Self {
        result.unwrap_or_else(Outcome::from)
    }
}
