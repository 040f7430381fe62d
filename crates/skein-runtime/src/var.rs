//! Variable entries and watchpoint flags.

#![allow(missing_docs)]

use bitflags::bitflags;
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::frame::FrameId;

bitflags! {
    /// Flags stored on a variable entry.
    ///
    /// Only the watch bits are managed by the watchpoint store; the rest
    /// belong to variable storage and are preserved by every watch update.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VariableFlags: u32 {
        const BREAK_ON_GET = 1;
        const BREAK_ON_SET = 1 << 1;
        const BREAK_ON_UNSET = 1 << 2;
        const MUTABLE = 1 << 3;
        const LINK = 1 << 8;
        const READ_ONLY = 1 << 9;
        const ARRAY = 1 << 10;
        const UNDEFINED = 1 << 11;
    }
}

impl VariableFlags {
    /// Bits owned by the watchpoint store.
    pub const WATCH: Self = Self::BREAK_ON_GET
        .union(Self::BREAK_ON_SET)
        .union(Self::BREAK_ON_UNSET)
        .union(Self::MUTABLE);
}

/// Non-owning reference to a variable in some frame's table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarRef {
    pub frame: FrameId,
    pub name: SmolStr,
}

/// Kind of variable access that may trigger a watchpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarAccess {
    Get,
    Set,
    Unset,
}

impl VarAccess {
    #[must_use]
    pub fn watch_flag(self) -> VariableFlags {
        match self {
            Self::Get => VariableFlags::BREAK_ON_GET,
            Self::Set => VariableFlags::BREAK_ON_SET,
            Self::Unset => VariableFlags::BREAK_ON_UNSET,
        }
    }
}

/// A variable entry owned by a call frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Variable {
    pub value: Option<String>,
    pub flags: VariableFlags,
    pub link: Option<VarRef>,
}

impl Variable {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// A link entry forwarding to `target`.
    #[must_use]
    pub fn link(target: VarRef) -> Self {
        Self {
            value: None,
            flags: VariableFlags::LINK,
            link: Some(target),
        }
    }

    #[must_use]
    pub fn is_link(&self) -> bool {
        self.flags.contains(VariableFlags::LINK) && self.link.is_some()
    }
}

/// Variables of one frame, in creation order.
pub type VariableTable = IndexMap<SmolStr, Variable>;

/// Watch bits currently set on `variable`.
#[must_use]
pub fn get_flags(variable: &Variable) -> VariableFlags {
    variable.flags & VariableFlags::WATCH
}

/// Replace the watch bits of `variable` with those in `mask`.
///
/// Bits of `mask` outside the watch set are ignored and unrelated bits of the
/// variable are kept. Returns the resulting watch bits.
pub fn set_flags(variable: &mut Variable, mask: VariableFlags) -> VariableFlags {
    variable.flags = (variable.flags - VariableFlags::WATCH) | (mask & VariableFlags::WATCH);
    get_flags(variable)
}

/// Names of the variables in `table` that carry any break-on flag.
#[must_use]
pub fn watched(table: &VariableTable) -> Vec<SmolStr> {
    let breaks = VariableFlags::WATCH - VariableFlags::MUTABLE;
    table
        .iter()
        .filter(|(_, variable)| variable.flags.intersects(breaks))
        .map(|(name, _)| name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_flags_preserves_unrelated_bits() {
        let mut variable = Variable::new("1");
        variable.flags = VariableFlags::READ_ONLY | VariableFlags::BREAK_ON_GET;

        let result = set_flags(
            &mut variable,
            VariableFlags::BREAK_ON_SET | VariableFlags::ARRAY,
        );

        assert_eq!(result, VariableFlags::BREAK_ON_SET);
        assert_eq!(
            variable.flags,
            VariableFlags::READ_ONLY | VariableFlags::BREAK_ON_SET
        );
    }

    #[test]
    fn mutable_alone_is_not_a_watchpoint() {
        let mut table = VariableTable::new();
        let mut quiet = Variable::new("a");
        set_flags(&mut quiet, VariableFlags::MUTABLE);
        let mut loud = Variable::new("b");
        set_flags(&mut loud, VariableFlags::BREAK_ON_UNSET);
        table.insert("quiet".into(), quiet);
        table.insert("loud".into(), loud);

        assert_eq!(watched(&table), vec![SmolStr::new("loud")]);
    }
}
