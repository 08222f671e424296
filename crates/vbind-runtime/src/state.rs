#![forbid(unsafe_code)]

//! Per-view state value tables.
//!
//! A state value overrides one field path while the view is in a named
//! state. The first override declared for a path also records a default
//! entry holding the value the path had at that moment, so switching back
//! to the default state restores it. Ordinary writes made while the view is
//! in the default state keep that snapshot current.
//!
//! # Invariants
//!
//! 1. Once any override exists for a path, exactly one default entry
//!    exists for it.
//! 2. State names compare exactly; paths compare exactly.

use std::rc::Rc;

use vbind_core::Value;

/// One `(state, path, value)` override.
#[derive(Clone, Debug, PartialEq)]
pub struct StateValue {
    pub state: Rc<str>,
    pub path: Rc<str>,
    pub value: Value,
}

#[derive(Debug, Default)]
pub(crate) struct StateTable {
    entries: Vec<StateValue>,
}

impl StateTable {
    /// Declare `value` for `path` in `state`.
    ///
    /// `current` is consulted only when a default entry must be created.
    pub(crate) fn add(
        &mut self,
        default_state: &str,
        state: &str,
        path: &str,
        value: Value,
        current: impl FnOnce() -> Value,
    ) {
        if state != default_state && self.find(default_state, path).is_none() {
            self.entries.push(StateValue {
                state: default_state.into(),
                path: path.into(),
                value: current(),
            });
        }
        match self.find_mut(state, path) {
            Some(entry) => entry.value = value,
            None => self.entries.push(StateValue {
                state: state.into(),
                path: path.into(),
                value,
            }),
        }
    }

    /// Refresh the default snapshot of `path` if one exists.
    pub(crate) fn update_default(&mut self, default_state: &str, path: &str, value: &Value) -> bool {
        match self.find_mut(default_state, path) {
            Some(entry) => {
                entry.value = value.clone();
                true
            }
            None => false,
        }
    }

    /// Distinct overridden paths, in declaration order.
    pub(crate) fn paths(&self) -> Vec<Rc<str>> {
        let mut paths: Vec<Rc<str>> = Vec::new();
        for entry in &self.entries {
            if !paths.iter().any(|p| *p == entry.path) {
                paths.push(Rc::clone(&entry.path));
            }
        }
        paths
    }

    /// Value `path` takes in `state`, falling back to the default entry.
    pub(crate) fn resolve(&self, default_state: &str, state: &str, path: &str) -> Option<Value> {
        self.find(state, path)
            .or_else(|| self.find(default_state, path))
            .map(|e| e.value.clone())
    }

    pub(crate) fn entries(&self) -> &[StateValue] {
        &self.entries
    }

    fn find(&self, state: &str, path: &str) -> Option<&StateValue> {
        self.entries
            .iter()
            .find(|e| &*e.state == state && &*e.path == path)
    }

    fn find_mut(&mut self, state: &str, path: &str) -> Option<&mut StateValue> {
        self.entries
            .iter_mut()
            .find(|e| &*e.state == state && &*e.path == path)
    }
}
