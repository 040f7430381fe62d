//! Breakpoint registry: kind bits, token locations and per-entity flags.

#![allow(missing_docs)]

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::error::RuntimeError;

use super::{BreakpointKind, EntityId, EntityKind, ScriptLocation};

#[derive(Debug, Clone)]
pub struct BreakpointRegistry {
    kinds: BreakpointKind,
    locations: IndexSet<ScriptLocation>,
    entities: FxHashMap<EntityId, BreakpointKind>,
}

impl Default for BreakpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakpointRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            kinds: BreakpointKind::DEFAULT,
            locations: IndexSet::new(),
            entities: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn is_enabled_for(&self, kind: BreakpointKind) -> bool {
        !kind.is_empty() && self.kinds.contains(kind)
    }

    /// Set the enabled bit of `kind`; returns the previous value.
    pub fn set_kind(&mut self, kind: BreakpointKind, enabled: bool) -> bool {
        let previous = self.is_enabled_for(kind);
        self.kinds.set(kind, enabled);
        previous
    }

    /// Set `kind` to `enabled`, or flip it when `enabled` is `None`.
    /// Returns the new value.
    pub fn toggle_kind(&mut self, kind: BreakpointKind, enabled: Option<bool>) -> bool {
        let next = enabled.unwrap_or_else(|| !self.is_enabled_for(kind));
        self.set_kind(kind, next);
        next
    }

    #[must_use]
    pub fn kinds(&self) -> BreakpointKind {
        self.kinds
    }

    pub fn set_kinds(&mut self, kinds: BreakpointKind) {
        self.kinds = kinds;
    }

    /// Add a token breakpoint; returns true when it was already present.
    pub fn set_breakpoint(&mut self, location: ScriptLocation) -> bool {
        !self.locations.insert(location)
    }

    /// Remove a token breakpoint; returns true when it was present.
    pub fn clear_breakpoint(&mut self, location: &ScriptLocation) -> bool {
        self.locations.shift_remove(location)
    }

    #[must_use]
    pub fn matches(&self, location: &ScriptLocation) -> bool {
        self.locations.contains(location)
    }

    /// Token breakpoints whose file name matches the glob `pattern`.
    pub fn locations(&self, pattern: Option<&str>) -> Result<Vec<ScriptLocation>, RuntimeError> {
        let pattern = pattern
            .map(|text| {
                glob::Pattern::new(text).map_err(|_| RuntimeError::InvalidPattern(SmolStr::new(text)))
            })
            .transpose()?;
        Ok(self
            .locations
            .iter()
            .filter(|location| {
                pattern
                    .as_ref()
                    .is_none_or(|pattern| pattern.matches(&location.file_name))
            })
            .cloned()
            .collect())
    }

    /// Make an entity known so its breakpoint flag can be set.
    pub fn register_entity(&mut self, entity: EntityId) {
        self.entities.entry(entity).or_default();
    }

    #[must_use]
    pub fn is_registered(&self, entity: &EntityId) -> bool {
        self.entities.contains_key(entity)
    }

    #[must_use]
    pub fn has(&self, entity: &EntityId) -> bool {
        self.entities
            .get(entity)
            .is_some_and(|flags| flags.contains(Self::entity_flag(entity.kind)))
    }

    /// Set the breakpoint flag of `entity`; returns the previous value.
    ///
    /// Test names are not dispatched entities, so they are registered on
    /// first use; every other entity must already be known.
    pub fn set(&mut self, entity: &EntityId, enabled: bool) -> Result<bool, RuntimeError> {
        let flag = Self::entity_flag(entity.kind);
        if entity.kind == EntityKind::Test {
            self.register_entity(entity.clone());
        }
        let flags = self
            .entities
            .get_mut(entity)
            .ok_or_else(|| RuntimeError::EntityNotFound {
                kind: entity.kind.as_str(),
                name: entity.name.clone(),
            })?;
        let previous = flags.contains(flag);
        flags.set(flag, enabled);
        Ok(previous)
    }

    /// Names of the entities of `kind` whose breakpoint flag is set, sorted.
    #[must_use]
    pub fn flagged(&self, kind: EntityKind) -> Vec<SmolStr> {
        let flag = Self::entity_flag(kind);
        let mut names: Vec<SmolStr> = self
            .entities
            .iter()
            .filter(|(entity, flags)| entity.kind == kind && flags.contains(flag))
            .map(|(entity, _)| entity.name.clone())
            .collect();
        names.sort();
        names
    }

    fn entity_flag(kind: EntityKind) -> BreakpointKind {
        match kind {
            EntityKind::Test => BreakpointKind::TEST,
            _ => BreakpointKind::EXECUTE,
        }
    }
}
