//! Option and value parsing shared by the sub-command handlers.

use smol_str::SmolStr;

use skein_runtime::RuntimeError;

const END_OF_OPTIONS: &str = "--";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValueKind {
    /// Presence alone.
    Switch,
    Boolean,
    Text,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct OptionSpec {
    pub name: &'static str,
    pub kind: ValueKind,
}

impl OptionSpec {
    pub const fn switch(name: &'static str) -> Self {
        Self {
            name,
            kind: ValueKind::Switch,
        }
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self {
            name,
            kind: ValueKind::Boolean,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ValueKind::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum OptionValue {
    Present,
    Boolean(bool),
    Text(SmolStr),
}

/// Options seen on a command line, in the order given.
#[derive(Debug, Default)]
pub(crate) struct ParsedOptions {
    values: Vec<(&'static str, OptionValue)>,
}

impl ParsedOptions {
    fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values
            .iter()
            .rev()
            .find(|(option, _)| *option == name)
            .map(|(_, value)| value)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(OptionValue::Boolean(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&SmolStr> {
        match self.get(name) {
            Some(OptionValue::Text(value)) => Some(value),
            _ => None,
        }
    }
}

/// Parse leading options from `args`.
///
/// Parsing stops at `--`, which is consumed, or at the first argument that
/// does not start with `-`. Returns the options and the index of the first
/// remaining argument.
pub(crate) fn parse_options(
    specs: &[OptionSpec],
    args: &[SmolStr],
) -> Result<(ParsedOptions, usize), RuntimeError> {
    let mut parsed = ParsedOptions::default();
    let mut index = 0;
    while let Some(arg) = args.get(index) {
        if arg == END_OF_OPTIONS {
            index += 1;
            break;
        }
        if !looks_like_option(arg) {
            break;
        }
        let spec = specs
            .iter()
            .find(|spec| spec.name == arg.as_str())
            .ok_or_else(|| bad_option(arg, specs))?;
        index += 1;
        let value = match spec.kind {
            ValueKind::Switch => OptionValue::Present,
            ValueKind::Boolean | ValueKind::Text => {
                let value = args
                    .get(index)
                    .ok_or_else(|| RuntimeError::MissingOptionValue(arg.clone()))?;
                index += 1;
                if spec.kind == ValueKind::Boolean {
                    OptionValue::Boolean(parse_bool(value)?)
                } else {
                    OptionValue::Text(value.clone())
                }
            }
        };
        parsed.values.push((spec.name, value));
    }
    Ok((parsed, index))
}

/// Error for leftover arguments after options: an option-like word is a bad
/// option, anything else is a usage error.
pub(crate) fn extra_argument(
    specs: &[OptionSpec],
    arg: Option<&SmolStr>,
    usage: &str,
) -> RuntimeError {
    match arg {
        Some(arg) if looks_like_option(arg) => bad_option(arg, specs),
        _ => RuntimeError::usage(usage),
    }
}

fn looks_like_option(arg: &str) -> bool {
    arg.len() > 1 && arg.starts_with('-')
}

fn bad_option(arg: &SmolStr, specs: &[OptionSpec]) -> RuntimeError {
    let mut names: Vec<&str> = specs.iter().map(|spec| spec.name).collect();
    names.push(END_OF_OPTIONS);
    RuntimeError::BadOption {
        option: arg.clone(),
        expected: SmolStr::new(choice_list(&names)),
    }
}

/// `a`, `a or b`, `a, b, or c`.
pub(crate) fn choice_list(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, second] => format!("{first} or {second}"),
        [rest @ .., last] => format!("{}, or {last}", rest.join(", ")),
    }
}

pub(crate) fn parse_bool(text: &str) -> Result<bool, RuntimeError> {
    match text.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enable" | "enabled" => Ok(true),
        "0" | "false" | "no" | "off" | "disable" | "disabled" => Ok(false),
        _ => Err(RuntimeError::InvalidBoolean(SmolStr::new(text))),
    }
}

pub(crate) fn parse_int(text: &str) -> Result<i64, RuntimeError> {
    text.trim()
        .parse()
        .map_err(|_| RuntimeError::InvalidInteger(SmolStr::new(text)))
}

pub(crate) fn parse_line(text: &str) -> Result<u32, RuntimeError> {
    parse_int(text)
        .ok()
        .and_then(|value| u32::try_from(value).ok())
        .ok_or_else(|| RuntimeError::InvalidInteger(SmolStr::new(text)))
}

/// `enabled` or `disabled`.
pub(crate) fn enabled_word(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}
