//! Order-preserving documents for adapter-defined data
//!
//! Subscription options and checkpoints, as well as per-source configuration,
//! are owned by the adapter that wrote them. The core only stores and moves
//! them around, so they are kept as a generic JSON object rather than a fixed
//! record. Adapters that want a typed view go through [`Dynamic::to_typed`] and
//! [`Dynamic::from_typed`].

use crate::error::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON object whose keys keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dynamic(Map<String, Value>);

impl Dynamic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the text form. A blank string is treated as an empty document.
    pub fn from_json(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        Ok(serde_json::from_str(text)?)
    }

    /// Transport-safe text form, always a JSON object.
    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// Build a document from any value that serializes to a JSON object.
    pub fn from_typed<T: Serialize>(value: &T) -> Result<Self> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
                "expected an object, got {}",
                other
            ))
            .into()),
        }
    }

    /// Deserialize the whole document into an adapter-defined type.
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.0.clone()))?)
    }

    /// Typed lookup; `Ok(None)` when the key is absent or null.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<()> {
        self.0.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(|v| !v.is_null())
    }

    /// Overwrite keys from `other`, appending the ones not present yet.
    pub fn merge(&mut self, other: &Dynamic) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Dynamic {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl std::str::FromStr for Dynamic {
    type Err = crate::error::HoardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_json(s)
    }
}

impl std::fmt::Display for Dynamic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_json())
    }
}
