//! The store's state mapping and its merge rules

use crate::error::{Error, Result};
use crate::path::KeyPath;
use crate::value::{Value, ValueMap};
use serde::{Deserialize, Serialize};

/// Ordered mapping of top-level keys to values
///
/// Every write to a store produces a complete new `State` by shallow-merging
/// a partial state onto the current one: keys of the partial win, all other
/// keys are kept. Merges are never deep.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State(ValueMap);

impl State {
    /// Create an empty state
    pub fn new() -> Self {
        Self(ValueMap::new())
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert or replace a top-level value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Get a top-level value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Resolve a one- or two-segment path.
    ///
    /// A missing key at either level resolves to `None`. Reading a nested key
    /// under a value that is not a map is an error.
    pub fn lookup(&self, path: &KeyPath) -> Result<Option<&Value>> {
        match path {
            KeyPath::Local(key) => Ok(self.0.get(key)),
            KeyPath::Namespaced(ns, key) => match self.0.get(ns) {
                None => Ok(None),
                Some(Value::Map(map)) => Ok(map.get(key)),
                Some(other) => Err(Error::NotAMap {
                    path: path.to_string(),
                    found: other.type_name(),
                }),
            },
        }
    }

    /// Shallow-merge `patch` onto this state in place
    pub fn merge(&mut self, patch: State) {
        for (key, value) in patch.0 {
            self.0.insert(key, value);
        }
    }

    /// Shallow-merge `patch` onto a copy of this state
    pub fn merged(&self, patch: &State) -> State {
        let mut next = self.clone();
        for (key, value) in &patch.0 {
            next.0.insert(key.clone(), value.clone());
        }
        next
    }

    /// Nest `inner` under `namespace`, replacing whatever was there
    pub fn nest(&mut self, namespace: impl Into<String>, inner: State) {
        self.0.insert(namespace.into(), Value::Map(inner.0));
    }

    /// Canonical text form used for change detection and persistence.
    ///
    /// Field order is insertion order.
    pub fn to_canonical_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Parse a state from JSON text. The document must be an object.
    pub fn from_json(text: &str) -> Result<State> {
        Ok(serde_json::from_str(text)?)
    }

    /// Structural equality by canonical serialization
    pub fn canonical_eq(&self, other: &State) -> Result<bool> {
        Ok(self.to_canonical_json()? == other.to_canonical_json()?)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &ValueMap {
        &self.0
    }

    /// Consume into the underlying map
    pub fn into_map(self) -> ValueMap {
        self.0
    }
}

impl From<ValueMap> for State {
    fn from(map: ValueMap) -> Self {
        Self(map)
    }
}

impl From<State> for Value {
    fn from(state: State) -> Self {
        Value::Map(state.0)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for State {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for State {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
