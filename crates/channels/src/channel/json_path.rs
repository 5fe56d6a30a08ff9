//! Navigation into JSON payloads by a short list of path segments.

use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// Object member
    Key(&'static str),
    /// Array element
    Index(usize),
    /// The `index`-th array element whose `key` member equals `value`
    Filter {
        key: &'static str,
        value: &'static str,
        index: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsonPath(pub Vec<PathSegment>);

impl JsonPath {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Path of plain object keys.
    pub fn keys(keys: &[&'static str]) -> Self {
        Self(keys.iter().map(|k| PathSegment::Key(*k)).collect())
    }

    pub fn key(mut self, key: &'static str) -> Self {
        self.0.push(PathSegment::Key(key));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.0.push(PathSegment::Index(index));
        self
    }

    pub fn filter(mut self, key: &'static str, value: &'static str, index: usize) -> Self {
        self.0.push(PathSegment::Filter { key, value, index });
        self
    }

    /// Resolves the path, returning `None` at the first step that does not exist.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for segment in &self.0 {
            let next = match segment {
                PathSegment::Key(key) => current.get(*key),
                PathSegment::Index(index) => current.get(*index),
                PathSegment::Filter { key, value, index } => current
                    .as_array()
                    .and_then(|items| {
                        items
                            .iter()
                            .filter(|item| item.get(*key).and_then(Value::as_str) == Some(*value))
                            .nth(*index)
                    }),
            };

            match next {
                Some(value) => current = value,
                None => {
                    debug!("json path step {:?} not found", segment);
                    return None;
                }
            }
        }
        Some(current)
    }

    /// Resolves the path and turns the result into parser records: the
    /// elements of an array, a single object, or nothing.
    pub fn records(&self, root: &Value) -> Vec<Value> {
        match self.resolve(root) {
            Some(Value::Array(items)) => items.clone(),
            Some(value @ Value::Object(_)) => vec![value.clone()],
            Some(Value::Null) | None => vec![],
            Some(other) => {
                debug!("json path resolved to a scalar: {}", other);
                vec![]
            }
        }
    }
}

/// Reads a string or number member as a string.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
