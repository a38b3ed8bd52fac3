//! The canonical style object produced by evaluation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key of the section holding unscoped rules.
pub const GLOBAL_KEY: &str = "@global";

/// Prefix of keyframe animation section keys.
pub const KEYFRAMES_PREFIX: &str = "@keyframes ";

/// A fully forced style tree, ready to hash and hand to a sheet engine.
///
/// Top-level keys are class names, `@global`, or `@keyframes <name>`. Values
/// are rule bodies: objects whose entries are either property values
/// (strings or numbers) or nested selector blocks.
///
/// Keys keep their declaration order, which is the order a sheet engine
/// emits them in. Equality ignores order; so does the
/// [`Fingerprint`](crate::Fingerprint).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalStyle {
    rules: Map<String, Value>,
}

impl CanonicalStyle {
    /// Creates an empty style object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a top-level rule.
    pub fn insert(&mut self, key: impl Into<String>, body: Map<String, Value>) {
        self.rules.insert(key.into(), Value::Object(body));
    }

    /// Returns the body of a top-level rule.
    pub fn get(&self, key: &str) -> Option<&Map<String, Value>> {
        self.rules.get(key).and_then(Value::as_object)
    }

    /// Iterates over every top-level entry.
    pub fn rules(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over the declared class names (keys not starting with `@`).
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.rules
            .keys()
            .map(|k| k.as_str())
            .filter(|k| !k.starts_with('@'))
    }

    /// Returns the merged global section, if any global rule was produced.
    pub fn globals(&self) -> Option<&Map<String, Value>> {
        self.get(GLOBAL_KEY)
    }

    /// Returns the stops of the named keyframe animation.
    pub fn keyframes(&self, name: &str) -> Option<&Map<String, Value>> {
        self.get(&format!("{KEYFRAMES_PREFIX}{name}"))
    }

    /// Returns the number of top-level entries.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if evaluation produced nothing.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Borrows the underlying JSON map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.rules
    }

    /// Converts into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.rules)
    }
}

impl From<Map<String, Value>> for CanonicalStyle {
    fn from(rules: Map<String, Value>) -> Self {
        Self { rules }
    }
}
