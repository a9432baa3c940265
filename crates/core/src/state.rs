//! Ordered state list shared by every entity of one simulation run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::LookupError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub usize);

impl StateId {
    pub const IDLE: StateId = StateId(0);
    pub const WORKING: StateId = StateId(1);
    pub const BREAKDOWN: StateId = StateId(2);
    pub const MAINTENANCE: StateId = StateId(3);
}

/// The ordered state names of a run. Fixed once built; the first four entries
/// are always Idle, Working, Breakdown and Maintenance.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSet {
    names: Vec<String>,
    working: Vec<bool>,
    index: HashMap<String, StateId>,
}

impl StateSet {
    pub fn standard() -> Self {
        Self::with_working_substates::<&str>(&[])
    }

    /// Appends extra states that count as working time, e.g. `Loading` or `Hauling`.
    /// Duplicates of an existing name are ignored.
    pub fn with_working_substates<S: AsRef<str>>(extra: &[S]) -> Self {
        let mut set = Self {
            names: Vec::new(),
            working: Vec::new(),
            index: HashMap::new(),
        };
        set.push("Idle", false);
        set.push("Working", true);
        set.push("Breakdown", false);
        set.push("Maintenance", false);
        for name in extra {
            set.push(name.as_ref(), true);
        }
        set
    }

    fn push(&mut self, name: &str, working: bool) {
        let key = name.to_lowercase();
        if self.index.contains_key(&key) {
            return;
        }
        self.index.insert(key, StateId(self.names.len()));
        self.names.push(name.to_string());
        self.working.push(working);
    }

    /// Case-insensitive lookup.
    pub fn lookup(&self, name: &str) -> Result<StateId, LookupError> {
        self.index
            .get(&name.to_lowercase())
            .copied()
            .ok_or_else(|| LookupError::UnknownState {
                name: name.to_string(),
            })
    }

    pub fn name(&self, id: StateId) -> Option<&str> {
        self.names.get(id.0).map(String::as_str)
    }

    pub fn is_working(&self, id: StateId) -> bool {
        self.working.get(id.0).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for StateSet {
    fn default() -> Self {
        Self::standard()
    }
}
