//! Cache Key Module
//!
//! Derives deterministic cache keys from the arguments of a memoized call.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Number of hex characters of the digest kept in a key.
pub const KEY_DIGEST_LEN: usize = 16;

// == Call Arguments ==
/// The arguments of one call to a memoized producer.
///
/// Positional arguments keep their order; keyword arguments are held
/// sorted by name so call-site ordering never changes the key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallArgs {
    args: Vec<Value>,
    kwargs: BTreeMap<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Sets a keyword argument, replacing an earlier one of the same name.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }

    /// Appends a positional argument from any serializable value.
    pub fn try_arg<T: Serialize + ?Sized>(mut self, value: &T) -> serde_json::Result<Self> {
        self.args.push(serde_json::to_value(value)?);
        Ok(self)
    }

    pub fn positional(&self) -> &[Value] {
        &self.args
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.kwargs.get(name)
    }

    // == Canonical Form ==
    /// Compact JSON of `{"args": [...], "kwargs": {...}}` with object keys
    /// sorted at every depth.
    pub fn canonical_json(&self) -> String {
        let kwargs: Map<String, Value> = self
            .kwargs
            .iter()
            .map(|(name, value)| (name.clone(), canonicalize(value)))
            .collect();

        let mut root = Map::new();
        root.insert(
            "args".to_string(),
            Value::Array(self.args.iter().map(canonicalize).collect()),
        );
        root.insert("kwargs".to_string(), Value::Object(kwargs));

        Value::Object(root).to_string()
    }
}

/// Rebuilds a value with every object's keys inserted in sorted order,
/// so the rendering is stable whatever map ordering serde_json is built with.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(map) => {
            let mut sorted: Vec<(&String, &Value)> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        other => other.clone(),
    }
}

// == Stable Key ==
/// Digest of the canonical arguments: the first 16 hex chars of SHA-256.
pub fn args_digest(args: &CallArgs) -> String {
    let digest = Sha256::digest(args.canonical_json().as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(KEY_DIGEST_LEN);
    hex
}

/// Builds the memoization key for a call, `name:digest` when the producer
/// is named and the bare digest otherwise.
pub fn stable_key(name: Option<&str>, args: &CallArgs) -> String {
    let digest = args_digest(args);
    match name {
        Some(name) if !name.is_empty() => format!("{name}:{digest}"),
        _ => digest,
    }
}
