//! Call frames and the call-frame stack.

#![allow(missing_docs)]

mod level;
mod stack;

use bitflags::bitflags;
use smol_str::SmolStr;

use crate::var::VariableTable;

pub use level::{LevelSpec, LevelTarget};
pub use stack::{CallStack, SavedFrame};

bitflags! {
    /// Capabilities and purpose tags of a call frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FrameFlags: u32 {
        const GLOBAL = 1;
        const PROCEDURE = 1 << 1;
        const EVALUATE = 1 << 2;
        const SUBSTITUTE = 1 << 3;
        const SOURCE = 1 << 4;
        const DEBUGGER = 1 << 5;
        const RESTRICTED = 1 << 6;
        const TRACKING = 1 << 7;
        const UPLEVEL = 1 << 8;
        const INVISIBLE = 1 << 9;
        const NO_VARIABLES = 1 << 10;
        const VARIABLES = 1 << 11;
    }
}

/// Frame identifier; stable for the lifetime of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u32);

/// Bits changed on a frame by a mark, kept until the matching unmark.
///
/// Nested uplevels mark the same frame more than once; each mark pushes its
/// own stash and each unmark pops the most recent one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarkStash {
    pub added: FrameFlags,
    pub removed: FrameFlags,
    pub guarded: FrameFlags,
}

/// One entry of the call-frame stack.
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub id: FrameId,
    pub name: SmolStr,
    pub flags: FrameFlags,
    pub variables: Option<VariableTable>,
    /// Frame this one was pushed on top of.
    pub caller: Option<FrameId>,
    /// Frame whose variables this frame uses (uplevel target).
    pub scope: Option<FrameId>,
    pub info_level: usize,
    pub(crate) marks: Vec<MarkStash>,
}

impl CallFrame {
    /// A frame without its own variables; lookups fall through to its caller.
    #[must_use]
    pub fn tracking(name: impl Into<SmolStr>, flags: FrameFlags) -> Self {
        Self {
            id: FrameId(u32::MAX),
            name: name.into(),
            flags: flags | FrameFlags::TRACKING,
            variables: None,
            caller: None,
            scope: None,
            info_level: 0,
            marks: Vec::new(),
        }
    }

    /// A frame with its own, initially empty, variable table.
    #[must_use]
    pub fn procedure(name: impl Into<SmolStr>) -> Self {
        Self {
            variables: Some(VariableTable::new()),
            ..Self::tracking(name, FrameFlags::PROCEDURE)
        }
        .without(FrameFlags::TRACKING)
    }

    #[must_use]
    pub fn with_flags(mut self, flags: FrameFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    fn without(mut self, flags: FrameFlags) -> Self {
        self.flags -= flags;
        self
    }

    #[must_use]
    pub fn is_marked(&self) -> bool {
        !self.marks.is_empty()
    }
}
