//! The call-frame stack.
//!
//! Frames live in an arena keyed by [`FrameId`]; `order` records the stack
//! itself, global frame first. `caller` and `scope` links are plain ids, so
//! popping a frame never has to untangle shared ownership.
//!
//! Levels count *level frames* only: the global frame and frames pushed for
//! procedures. Tracking frames (eval, subst, debugger bookkeeping) and uplevel
//! frames borrow a scope and are skipped when levels are numbered.

#![allow(missing_docs)]

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::error::RuntimeError;
use crate::var::{VarRef, Variable, VariableTable};

use super::{CallFrame, FrameFlags, FrameId, LevelSpec, LevelTarget, MarkStash};

/// Longest chain of variable links followed before giving up.
const MAX_LINK_DEPTH: usize = 32;

/// Token returned by [`CallStack::push_uplevel_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedFrame {
    pub frame: FrameId,
    pub current: FrameId,
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub struct CallStack {
    frames: FxHashMap<FrameId, CallFrame>,
    order: Vec<FrameId>,
    next_frame_id: u32,
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}

impl CallStack {
    /// A stack holding only the global frame.
    #[must_use]
    pub fn new() -> Self {
        let global = FrameId(0);
        let frame = CallFrame {
            id: global,
            name: SmolStr::new_static("global"),
            flags: FrameFlags::GLOBAL,
            variables: Some(VariableTable::new()),
            caller: None,
            scope: None,
            info_level: 0,
            marks: Vec::new(),
        };
        let mut frames = FxHashMap::default();
        frames.insert(global, frame);
        Self {
            frames,
            order: vec![global],
            next_frame_id: 1,
        }
    }

    #[must_use]
    pub fn global(&self) -> FrameId {
        self.order[0]
    }

    #[must_use]
    pub fn current(&self) -> FrameId {
        self.order[self.order.len() - 1]
    }

    /// Number of frames on the stack, global frame included.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn frame(&self, id: FrameId) -> Option<&CallFrame> {
        self.frames.get(&id)
    }

    pub fn frame_mut(&mut self, id: FrameId) -> Option<&mut CallFrame> {
        self.frames.get_mut(&id)
    }

    /// Frames from the top of the stack down to the global frame.
    pub fn frames(&self) -> impl Iterator<Item = &CallFrame> + '_ {
        self.order.iter().rev().filter_map(|id| self.frames.get(id))
    }

    pub fn push(&mut self, mut frame: CallFrame) -> FrameId {
        let id = FrameId(self.next_frame_id);
        self.next_frame_id += 1;
        frame.id = id;
        if frame.caller.is_none() {
            frame.caller = Some(self.current());
        }
        self.frames.insert(id, frame);
        self.order.push(id);
        id
    }

    /// Pop the top frame. The global frame is never popped.
    pub fn pop(&mut self) -> Result<CallFrame, RuntimeError> {
        if self.order.len() <= 1 {
            return Err(RuntimeError::StackUnderflow);
        }
        let id = self.order.pop().ok_or(RuntimeError::StackUnderflow)?;
        self.frames
            .remove(&id)
            .ok_or(RuntimeError::FrameNotOnStack(id.0))
    }

    /// Pop `id` together with any frames left open above it.
    pub fn pop_through(&mut self, id: FrameId) -> Result<usize, RuntimeError> {
        let index = self.index_of(id)?;
        if index == 0 {
            return Err(RuntimeError::StackUnderflow);
        }
        Ok(self.truncate(index))
    }

    fn truncate(&mut self, index: usize) -> usize {
        let removed: Vec<FrameId> = self.order.drain(index..).collect();
        for id in &removed {
            self.frames.remove(id);
        }
        removed.len()
    }

    fn index_of(&self, id: FrameId) -> Result<usize, RuntimeError> {
        self.order
            .iter()
            .position(|candidate| *candidate == id)
            .ok_or(RuntimeError::FrameNotOnStack(id.0))
    }

    fn is_level_frame(frame: &CallFrame) -> bool {
        !frame
            .flags
            .intersects(FrameFlags::TRACKING | FrameFlags::UPLEVEL)
    }

    fn level_frames(&self) -> Vec<FrameId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.frames.get(id).is_some_and(Self::is_level_frame))
            .collect()
    }

    /// Level frame whose scope is in effect at the top of the stack.
    #[must_use]
    pub fn current_level_frame(&self) -> FrameId {
        for id in self.order.iter().rev() {
            let Some(frame) = self.frames.get(id) else {
                continue;
            };
            if frame.flags.contains(FrameFlags::UPLEVEL) {
                if let Some(scope) = frame.scope {
                    return scope;
                }
            }
            if Self::is_level_frame(frame) {
                return *id;
            }
        }
        self.global()
    }

    /// Resolve a level specifier against the current scope.
    pub fn resolve(&self, spec: &LevelSpec) -> Result<LevelTarget, RuntimeError> {
        let levels = self.level_frames();
        let current = self.current_level_frame();
        let current_level = levels
            .iter()
            .position(|id| *id == current)
            .ok_or(RuntimeError::FrameNotOnStack(current.0))?;
        let bad_level = || RuntimeError::InvalidFrame(SmolStr::new(spec.to_string()));

        let level = match spec {
            LevelSpec::Relative(delta) => {
                let level = i64::try_from(current_level)
                    .ok()
                    .and_then(|level| level.checked_sub(*delta))
                    .ok_or_else(bad_level)?;
                usize::try_from(level).map_err(|_| bad_level())?
            }
            LevelSpec::Absolute(level) => *level,
            LevelSpec::Named(name) => levels[..current_level]
                .iter()
                .rposition(|id| self.frames.get(id).is_some_and(|frame| frame.name == *name))
                .ok_or_else(bad_level)?,
        };
        if level > current_level {
            return Err(bad_level());
        }
        let frame = levels[level];
        Ok(LevelTarget {
            frame,
            level,
            absolute: matches!(spec, LevelSpec::Absolute(_)),
            mark: frame != current,
        })
    }

    /// Indexes in `order` walked by a mark: from `from` down to the level
    /// frame at `to_level`, both inclusive.
    fn mark_span(&self, from: FrameId, to_level: usize) -> Result<Vec<usize>, RuntimeError> {
        let top = self.index_of(from)?;
        let target = self
            .level_frames()
            .get(to_level)
            .copied()
            .ok_or_else(|| RuntimeError::InvalidFrame(SmolStr::new(format!("#{to_level}"))))?;
        let bottom = self.index_of(target)?;
        if bottom > top {
            return Ok(Vec::new());
        }
        Ok((bottom..=top).rev().collect())
    }

    /// Apply `add` and clear `remove` on every frame from `from` down to the
    /// level frame at `to_level`, remembering exactly what changed and the
    /// prior value of the `guard` bits. Marks nest: each call pushes one
    /// stash per frame. Returns the number of frames touched.
    pub fn mark_range(
        &mut self,
        from: FrameId,
        to_level: usize,
        add: FrameFlags,
        remove: FrameFlags,
        guard: FrameFlags,
    ) -> Result<usize, RuntimeError> {
        let span = self.mark_span(from, to_level)?;
        for index in &span {
            let id = self.order[*index];
            let Some(frame) = self.frames.get_mut(&id) else {
                continue;
            };
            frame.marks.push(MarkStash {
                added: add - frame.flags,
                removed: remove & frame.flags,
                guarded: frame.flags & guard,
            });
            frame.flags = (frame.flags | add) - remove;
        }
        Ok(span.len())
    }

    /// Undo the most recent [`Self::mark_range`] over the same walk. Called
    /// with the complementary masks it restores every touched frame exactly.
    pub fn unmark_range(
        &mut self,
        from: FrameId,
        to_level: usize,
        add: FrameFlags,
        remove: FrameFlags,
        guard: FrameFlags,
    ) -> Result<usize, RuntimeError> {
        let span = self.mark_span(from, to_level)?;
        for index in &span {
            let id = self.order[*index];
            if !self.frames.get(&id).is_some_and(CallFrame::is_marked) {
                return Err(RuntimeError::MarkMismatch {
                    frame: id.0,
                    reason: "frame is not marked",
                });
            }
        }
        for index in &span {
            let id = self.order[*index];
            let Some(frame) = self.frames.get_mut(&id) else {
                continue;
            };
            let Some(stash) = frame.marks.pop() else {
                continue;
            };
            frame.flags -= stash.added & remove;
            frame.flags |= stash.removed & add;
            frame.flags = (frame.flags - guard) | stash.guarded;
        }
        Ok(span.len())
    }

    /// Build a frame that evaluates in the variable scope of `other` while
    /// recording `current` as its caller.
    #[must_use]
    pub fn new_uplevel_frame(
        name: impl Into<SmolStr>,
        info_level: usize,
        flags: FrameFlags,
        mark: bool,
        current: FrameId,
        other: FrameId,
    ) -> CallFrame {
        let mut flags = flags | FrameFlags::UPLEVEL;
        if mark {
            flags |= FrameFlags::VARIABLES;
        }
        CallFrame {
            id: FrameId(u32::MAX),
            name: name.into(),
            flags,
            variables: None,
            caller: Some(current),
            scope: Some(other),
            info_level,
            marks: Vec::new(),
        }
    }

    pub fn push_uplevel_frame(
        &mut self,
        current: FrameId,
        frame: CallFrame,
    ) -> Result<SavedFrame, RuntimeError> {
        self.index_of(current)?;
        if let Some(scope) = frame.scope {
            self.index_of(scope)?;
        }
        let depth = self.order.len();
        let frame = self.push(frame);
        Ok(SavedFrame {
            frame,
            current,
            depth,
        })
    }

    /// Restore the stack to its shape before the matching push, dropping any
    /// frames left above the uplevel frame.
    pub fn pop_uplevel_frame(&mut self, saved: SavedFrame) -> Result<usize, RuntimeError> {
        if self.order.get(saved.depth) != Some(&saved.frame) {
            return Err(RuntimeError::FrameNotOnStack(saved.frame.0));
        }
        let popped = self.truncate(saved.depth);
        if self.current() != saved.current {
            return Err(RuntimeError::MarkMismatch {
                frame: saved.current.0,
                reason: "caller is no longer the current frame",
            });
        }
        Ok(popped)
    }

    fn has_visible_variables(frame: &CallFrame) -> bool {
        frame.variables.is_some()
            && (frame.flags.contains(FrameFlags::VARIABLES)
                || !frame
                    .flags
                    .intersects(FrameFlags::INVISIBLE | FrameFlags::NO_VARIABLES))
    }

    /// Frame whose variable table is used when evaluating in `id`.
    #[must_use]
    pub fn variable_frame(&self, id: FrameId) -> FrameId {
        let mut next = Some(id);
        for _ in 0..=self.order.len() {
            let Some(frame) = next.and_then(|id| self.frames.get(&id)) else {
                break;
            };
            if let Some(scope) = frame.scope {
                next = Some(scope);
                continue;
            }
            if Self::has_visible_variables(frame) || frame.flags.contains(FrameFlags::GLOBAL) {
                return frame.id;
            }
            next = frame.caller;
        }
        self.global()
    }

    /// Follow `name` from the current frame through any links to the entry
    /// that holds, or would hold, its value. `::name` always names a global.
    pub fn resolve_target(&self, name: &str) -> Result<VarRef, RuntimeError> {
        let mut reference = self.local_ref(name);
        for _ in 0..MAX_LINK_DEPTH {
            match self.variable(&reference) {
                Some(variable) if variable.is_link() => match &variable.link {
                    Some(target) => reference = target.clone(),
                    None => return Ok(reference),
                },
                _ => return Ok(reference),
            }
        }
        Err(RuntimeError::LinkCycle(SmolStr::new(name)))
    }

    /// Like [`Self::resolve_target`], but the entry must exist.
    pub fn resolve_variable(&self, name: &str) -> Result<VarRef, RuntimeError> {
        let reference = self.resolve_target(name)?;
        if self.variable(&reference).is_some() {
            Ok(reference)
        } else {
            Err(RuntimeError::NoSuchVariable(SmolStr::new(name)))
        }
    }

    #[must_use]
    pub fn table(&self, frame: FrameId) -> Option<&VariableTable> {
        self.frames.get(&frame)?.variables.as_ref()
    }

    pub fn table_mut(&mut self, frame: FrameId) -> Option<&mut VariableTable> {
        self.frames.get_mut(&frame)?.variables.as_mut()
    }

    #[must_use]
    pub fn variable(&self, reference: &VarRef) -> Option<&Variable> {
        self.table(reference.frame)?.get(&reference.name)
    }

    pub fn variable_mut(&mut self, reference: &VarRef) -> Option<&mut Variable> {
        self.table_mut(reference.frame)?.get_mut(&reference.name)
    }

    /// Reference `name` would be created under in the current scope.
    #[must_use]
    pub fn local_ref(&self, name: &str) -> VarRef {
        match name.strip_prefix("::") {
            Some(rest) => VarRef {
                frame: self.global(),
                name: SmolStr::new(rest),
            },
            None => VarRef {
                frame: self.variable_frame(self.current()),
                name: SmolStr::new(name),
            },
        }
    }

    /// Insert or replace the entry behind `reference`.
    pub fn insert_variable(
        &mut self,
        reference: &VarRef,
        variable: Variable,
    ) -> Result<(), RuntimeError> {
        let table = self
            .table_mut(reference.frame)
            .ok_or(RuntimeError::FrameNotOnStack(reference.frame.0))?;
        table.insert(reference.name.clone(), variable);
        Ok(())
    }

    pub fn remove_variable(&mut self, reference: &VarRef) -> Option<Variable> {
        self.table_mut(reference.frame)?
            .shift_remove(&reference.name)
    }
}
