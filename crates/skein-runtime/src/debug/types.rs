//! Debugger data types.

#![allow(missing_docs)]

use std::fmt;

use bitflags::bitflags;
use smol_str::SmolStr;

use crate::outcome::ReturnCode;

bitflags! {
    /// Kinds of breakpoints; each carries an independent enabled bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BreakpointKind: u32 {
        /// Explicit `debug break` request.
        const DEMAND = 1;
        /// Command, procedure, function or operator about to run.
        const EXECUTE = 1 << 1;
        const RETURN = 1 << 2;
        const ERROR = 1 << 3;
        const EXIT = 1 << 4;
        const TEST = 1 << 5;
        /// Source location match.
        const TOKEN = 1 << 6;
        const CANCEL = 1 << 7;
        /// Variable watchpoint hit.
        const VARIABLE = 1 << 8;
        /// Next evaluated unit while single stepping.
        const SINGLE_STEP = 1 << 9;
    }
}

impl BreakpointKind {
    /// Kinds enabled on a fresh debugger.
    pub const DEFAULT: Self = Self::DEMAND
        .union(Self::VARIABLE)
        .union(Self::SINGLE_STEP);
}

bitflags! {
    /// What the interactive loop shows when it is entered.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HeaderFlags: u32 {
        const BREAKPOINT = 1;
        const DEBUGGER = 1 << 1;
        const CALL_STACK = 1 << 2;
        const VARIABLE = 1 << 3;
        const RESULT = 1 << 4;
    }
}

/// Run state of an enabled debugger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Running,
    Suspended,
    /// A breakpoint fired and the interactive loop is active.
    BreakHit,
}

/// A token breakpoint key. Compared structurally, never by containment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptLocation {
    pub file_name: SmolStr,
    pub start_line: u32,
    pub end_line: u32,
}

impl ScriptLocation {
    #[must_use]
    pub fn new(file_name: impl Into<SmolStr>, start_line: u32, end_line: u32) -> Self {
        Self {
            file_name: file_name.into(),
            start_line,
            end_line,
        }
    }
}

impl fmt::Display for ScriptLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file_name, self.start_line, self.end_line)
    }
}

/// Kind of entity a per-entity breakpoint is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Command,
    Procedure,
    Function,
    Operator,
    Test,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Procedure => "procedure",
            Self::Function => "function",
            Self::Operator => "operator",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId {
    pub kind: EntityKind,
    pub name: SmolStr,
}

impl EntityId {
    #[must_use]
    pub fn new(kind: EntityKind, name: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Everything the interactive loop is told about a break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakContext {
    /// Code of the outcome that was current when the break fired.
    pub previous: ReturnCode,
    pub kind: BreakpointKind,
    /// Name of the command or entity that triggered the break.
    pub name: SmolStr,
    pub header: HeaderFlags,
    pub arguments: Vec<SmolStr>,
    /// Entity whose own breakpoint flag may request the break.
    pub entity: Option<EntityId>,
    pub location: Option<ScriptLocation>,
    /// Extra words configured with `debug callback`.
    pub callback_arguments: Option<Vec<SmolStr>>,
}

impl BreakContext {
    #[must_use]
    pub fn new(kind: BreakpointKind, name: impl Into<SmolStr>) -> Self {
        Self {
            previous: ReturnCode::Ok,
            kind,
            name: name.into(),
            header: HeaderFlags::BREAKPOINT,
            arguments: Vec::new(),
            entity: None,
            location: None,
            callback_arguments: None,
        }
    }

    #[must_use]
    pub fn with_previous(mut self, previous: ReturnCode) -> Self {
        self.previous = previous;
        self
    }

    #[must_use]
    pub fn with_arguments(mut self, arguments: &[SmolStr]) -> Self {
        self.arguments = arguments.to_vec();
        self
    }

    #[must_use]
    pub fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }

    #[must_use]
    pub fn with_header(mut self, header: HeaderFlags) -> Self {
        self.header |= header;
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: ScriptLocation) -> Self {
        self.location = Some(location);
        self
    }
}
