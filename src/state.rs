//! Immutable state snapshots and the patches that replace them.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::merge::{update, MergeError};

/// An immutable snapshot of the state tree.
///
/// Cloning is cheap (the map is shared). There is no way to obtain a
/// mutable reference to the underlying map: every change goes through
/// [`State::merge`] or [`State::with`] and yields a new snapshot.
#[derive(Clone, Default, PartialEq)]
pub struct State {
    inner: Arc<Map<String, Value>>,
}

impl State {
    /// An empty state, `{}`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Copy of the snapshot as a plain JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object((*self.inner).clone())
    }

    /// True if both handles point at the same snapshot.
    pub fn ptr_eq(a: &State, b: &State) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// New snapshot with `patch` shallow-merged over this one.
    pub fn merge(&self, patch: &Map<String, Value>) -> State {
        let mut merged = (*self.inner).clone();
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }
        State::from(merged)
    }

    /// New snapshot with a single top-level key replaced.
    pub fn with(&self, key: impl Into<String>, value: Value) -> State {
        let mut merged = (*self.inner).clone();
        merged.insert(key.into(), value);
        State::from(merged)
    }
}

impl From<Map<String, Value>> for State {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            inner: Arc::new(map),
        }
    }
}

impl TryFrom<Value> for State {
    type Error = MergeError;

    /// Falsy values become `{}`; any other non-object is rejected.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(State::from(map)),
            other => update([Some(&other)]).map(State::from),
        }
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&*self.inner) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (*self.inner).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for State {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(State::from)
    }
}

/// What a source asks the engine to commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// The returned object becomes the whole new state. A source that
    /// wants to keep other keys builds this from the current state.
    Replace(State),
    /// Keys shallow-merged over the current state.
    Merge(Map<String, Value>),
}

impl Patch {
    /// Resolve the patch against `current`.
    ///
    /// Returns `None` when the patch is the current snapshot itself.
    pub fn apply(self, current: &State) -> Option<State> {
        match self {
            Patch::Replace(next) if State::ptr_eq(&next, current) => None,
            Patch::Replace(next) => Some(next),
            Patch::Merge(keys) => Some(current.merge(&keys)),
        }
    }
}

impl From<State> for Patch {
    fn from(state: State) -> Self {
        Patch::Replace(state)
    }
}

impl From<Map<String, Value>> for Patch {
    fn from(keys: Map<String, Value>) -> Self {
        Patch::Merge(keys)
    }
}
