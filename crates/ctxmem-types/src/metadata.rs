use serde_json::Value;
use std::collections::BTreeMap;

/// Free-form key/value metadata attached to an event.
///
/// Backed by a `BTreeMap` (not a `HashMap`) so serialized output and
/// iteration order are deterministic, which matters for content hashing
/// and snapshot tests.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn turn_id(&self) -> Option<&str> {
        self.get("turn_id").and_then(Value::as_str)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.get("namespace").and_then(Value::as_str)
    }

    pub fn category_path(&self) -> Option<&str> {
        self.get("categoryPath").and_then(Value::as_str)
    }

    /// Look up a value by a dotted path, e.g. `"tool.success"`.
    ///
    /// Each segment indexes into a JSON object; the walk stops (returning
    /// `None`) as soon as a segment doesn't resolve to an object field.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Equality check used by scope filters: compares a dotted path against
    /// an expected JSON value.
    pub fn path_equals(&self, path: &str, expected: &Value) -> bool {
        self.get_path(path) == Some(expected)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.0
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn from_json_str(s: &str) -> Self {
        serde_json::from_str(s).unwrap_or_default()
    }
}

impl From<BTreeMap<String, Value>> for Metadata {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}
