//! Interpreter tree.
//!
//! The registry is the only place that knows how interpreters relate to each
//! other; components that need cross-interpreter lookup get it passed in.

#![allow(missing_docs)]

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::debug;

use crate::config::InterpConfig;
use crate::error::RuntimeError;
use crate::eval::Evaluator;
use crate::interp::{Interp, InterpId};

#[derive(Debug)]
struct Entry {
    interp: Interp,
    parent: Option<InterpId>,
    children: IndexMap<SmolStr, InterpId>,
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: FxHashMap<InterpId, Entry>,
    next_id: u32,
}

#[derive(Debug, Default)]
pub struct InterpRegistry {
    state: Mutex<RegistryState>,
}

impl InterpRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(state: &mut RegistryState) -> InterpId {
        let id = InterpId(state.next_id);
        state.next_id += 1;
        id
    }

    /// Create a root interpreter.
    pub fn create_root(
        &self,
        name: impl Into<SmolStr>,
        config: &InterpConfig,
        evaluator: Arc<dyn Evaluator>,
    ) -> Result<Interp, RuntimeError> {
        let mut state = self.state.lock();
        let id = Self::allocate(&mut state);
        let interp = Interp::build(id, name.into(), config, evaluator)?;
        state.entries.insert(
            id,
            Entry {
                interp: interp.clone(),
                parent: None,
                children: IndexMap::new(),
            },
        );
        Ok(interp)
    }

    /// Create a child of `parent` sharing its evaluator, host and loop.
    pub fn create_child(
        &self,
        parent: &Interp,
        name: impl Into<SmolStr>,
        config: &InterpConfig,
    ) -> Result<Interp, RuntimeError> {
        let name = name.into();
        let mut state = self.state.lock();
        let parent_id = parent.id();
        let parent_entry = state
            .entries
            .get(&parent_id)
            .filter(|entry| entry.interp.same(parent))
            .ok_or_else(|| RuntimeError::InterpreterNotFound(parent.name().clone()))?;
        if parent_entry.children.contains_key(&name) {
            return Err(RuntimeError::InvalidConfig(
                format!("interpreter named \"{name}\" already exists").into(),
            ));
        }
        let id = Self::allocate(&mut state);
        let child = Interp::build(id, name.clone(), config, parent.evaluator())?;
        child.set_interactive_loop(Some(parent.interactive_loop()));
        if let Some(entry) = state.entries.get_mut(&parent_id) {
            entry.children.insert(name.clone(), id);
        }
        state.entries.insert(
            id,
            Entry {
                interp: child.clone(),
                parent: Some(parent_id),
                children: IndexMap::new(),
            },
        );
        debug!(parent = %parent.name(), child = %name, safe = config.safe, "child interpreter created");
        Ok(child)
    }

    /// Delete the child `name` of `parent` together with its descendants.
    pub fn delete_child(&self, parent: &Interp, name: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        let id = state
            .entries
            .get_mut(&parent.id())
            .and_then(|entry| entry.children.shift_remove(name))
            .ok_or_else(|| RuntimeError::InterpreterNotFound(SmolStr::new(name)))?;
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            if let Some(entry) = state.entries.remove(&id) {
                pending.extend(entry.children.values().copied());
            }
        }
        Ok(())
    }

    /// Resolve a whitespace separated child path relative to `caller`. An
    /// empty path names `caller` itself.
    pub fn resolve_child(&self, caller: &Interp, path: &str) -> Result<Interp, RuntimeError> {
        let state = self.state.lock();
        let not_found = || RuntimeError::InterpreterNotFound(SmolStr::new(path));
        let mut entry = state
            .entries
            .get(&caller.id())
            .filter(|entry| entry.interp.same(caller))
            .ok_or_else(not_found)?;
        for name in path.split_whitespace() {
            let id = entry.children.get(name).ok_or_else(not_found)?;
            entry = state.entries.get(id).ok_or_else(not_found)?;
        }
        Ok(entry.interp.clone())
    }

    #[must_use]
    pub fn children(&self, parent: &Interp) -> Vec<SmolStr> {
        let state = self.state.lock();
        state
            .entries
            .get(&parent.id())
            .map(|entry| entry.children.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn parent(&self, child: &Interp) -> Option<Interp> {
        let state = self.state.lock();
        let parent = state.entries.get(&child.id())?.parent?;
        state.entries.get(&parent).map(|entry| entry.interp.clone())
    }
}
