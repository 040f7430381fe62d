//! Interpreter configuration loading.

#![allow(missing_docs)]

use std::path::Path;

use serde::Deserialize;

use crate::debug::BreakpointKind;
use crate::error::RuntimeError;
use crate::flags::parse_flags;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpConfig {
    pub interactive: bool,
    pub safe: bool,
    pub events: bool,
    /// Debugger settings; `None` creates the interpreter without a debugger.
    pub debugger: Option<DebuggerConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebuggerConfig {
    pub enabled: bool,
    pub single_step: bool,
    pub steps: i64,
    pub kinds: BreakpointKind,
}

impl Default for InterpConfig {
    fn default() -> Self {
        Self {
            interactive: false,
            safe: false,
            events: true,
            debugger: Some(DebuggerConfig::default()),
        }
    }
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            single_step: false,
            steps: 0,
            kinds: BreakpointKind::DEFAULT,
        }
    }
}

impl InterpConfig {
    /// Configuration for a sandboxed child interpreter.
    #[must_use]
    pub fn safe() -> Self {
        Self {
            safe: true,
            ..Self::default()
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|err| RuntimeError::InvalidConfig(format!("interp.toml: {err}").into()))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, RuntimeError> {
        let raw: InterpToml = toml::from_str(text)
            .map_err(|err| RuntimeError::InvalidConfig(format!("interp.toml: {err}").into()))?;
        raw.into_config()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct InterpToml {
    #[serde(default)]
    interp: InterpSection,
    debugger: Option<DebuggerSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct InterpSection {
    interactive: Option<bool>,
    safe: Option<bool>,
    events: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DebuggerSection {
    available: Option<bool>,
    enabled: Option<bool>,
    single_step: Option<bool>,
    steps: Option<i64>,
    types: Option<String>,
    break_on: Option<Vec<String>>,
}

impl InterpToml {
    fn into_config(self) -> Result<InterpConfig, RuntimeError> {
        let interactive = self.interp.interactive.unwrap_or(false);
        let debugger = match self.debugger {
            Some(section) if !section.available.unwrap_or(true) => None,
            Some(section) => Some(section.into_config(interactive)?),
            None => Some(DebuggerConfig::default()),
        };
        Ok(InterpConfig {
            interactive,
            safe: self.interp.safe.unwrap_or(false),
            events: self.interp.events.unwrap_or(true),
            debugger,
        })
    }
}

impl DebuggerSection {
    fn into_config(self, interactive: bool) -> Result<DebuggerConfig, RuntimeError> {
        let single_step = self.single_step.unwrap_or(false);
        let steps = self.steps.unwrap_or(0);
        if !interactive && (single_step || steps != 0) {
            return Err(RuntimeError::InvalidConfig(
                "debugger.single_step and debugger.steps require interp.interactive".into(),
            ));
        }
        let mut kinds = match self.types.as_deref() {
            Some(text) => parse_flags("breakpoint type", BreakpointKind::DEFAULT, text)
                .map_err(|err| RuntimeError::InvalidConfig(format!("debugger.types: {err}").into()))?,
            None => BreakpointKind::DEFAULT,
        };
        for name in self.break_on.unwrap_or_default() {
            let kind = parse_flags("breakpoint type", BreakpointKind::empty(), &name).map_err(
                |err| RuntimeError::InvalidConfig(format!("debugger.break_on: {err}").into()),
            )?;
            kinds |= kind;
        }
        Ok(DebuggerConfig {
            enabled: self.enabled.unwrap_or(false),
            single_step,
            steps,
            kinds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = InterpConfig::from_toml_str("").unwrap();
        assert_eq!(config, InterpConfig::default());
    }

    #[test]
    fn debugger_section_is_applied() {
        let config = InterpConfig::from_toml_str(
            r#"
[interp]
interactive = true
events = false

[debugger]
enabled = true
single_step = true
steps = 3
break_on = ["error", "Return"]
"#,
        )
        .unwrap();
        assert!(!config.events);
        let debugger = config.debugger.unwrap();
        assert!(debugger.enabled && debugger.single_step);
        assert_eq!(debugger.steps, 3);
        assert!(debugger.kinds.contains(BreakpointKind::ERROR | BreakpointKind::RETURN));
        assert!(debugger.kinds.contains(BreakpointKind::DEMAND));
    }

    #[test]
    fn stepping_requires_interactive() {
        let err = InterpConfig::from_toml_str("[debugger]\nsingle_step = true\n").unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));
    }

    #[test]
    fn unavailable_debugger_and_bad_types() {
        let config = InterpConfig::from_toml_str("[debugger]\navailable = false\n").unwrap();
        assert!(config.debugger.is_none());

        let err = InterpConfig::from_toml_str("[debugger]\ntypes = \"Demand Bogus\"\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: debugger.types: unknown breakpoint type flag \"Bogus\""
        );
    }
}
