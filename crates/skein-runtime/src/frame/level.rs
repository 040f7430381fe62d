//! Level specifiers for uplevel-style frame lookup.

#![allow(missing_docs)]

use std::fmt;

use smol_str::SmolStr;

use super::FrameId;

/// How a caller names a frame on the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelSpec {
    /// `N`: N levels below the current frame (negative counts upward).
    Relative(i64),
    /// `#N`: absolute depth, the global frame being `#0`.
    Absolute(usize),
    /// `@name`: nearest frame below the current one with this name.
    Named(SmolStr),
}

impl LevelSpec {
    /// Parse an argument that must be a level.
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(rest) = text.strip_prefix('#') {
            return rest.parse::<usize>().ok().map(Self::Absolute);
        }
        if let Some(rest) = text.strip_prefix('@') {
            return (!rest.is_empty()).then(|| Self::Named(SmolStr::new(rest)));
        }
        text.parse::<i64>().ok().map(Self::Relative)
    }

    /// Parse an optional leading level argument.
    ///
    /// Returns the level and whether the argument was consumed; anything that
    /// does not look like a level selects the caller's frame (`1`).
    #[must_use]
    pub fn parse_optional(text: &str) -> (Self, bool) {
        match Self::parse(text) {
            Some(level) => (level, true),
            None => (Self::Relative(1), false),
        }
    }
}

impl fmt::Display for LevelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relative(level) => write!(f, "{level}"),
            Self::Absolute(level) => write!(f, "#{level}"),
            Self::Named(name) => write!(f, "@{name}"),
        }
    }
}

/// A resolved level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelTarget {
    pub frame: FrameId,
    /// Absolute depth of `frame`.
    pub level: usize,
    pub absolute: bool,
    /// True when the target differs from the current frame and frames in
    /// between must be marked visible.
    pub mark: bool,
}
