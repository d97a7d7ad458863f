use std::collections::HashMap;

use thiserror::Error;

use super::Value;

/// Errors produced when decoding a [`DataContext`] from JSON.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("invalid JSON data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("data must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },
}

/// Attribute data a rule is evaluated against, keyed by dot-separated paths.
///
/// Supports nested paths like `"user.profile.age"`.
#[derive(Debug, Clone, Default)]
pub struct DataContext {
    data: HashMap<String, ContextValue>,
}

#[derive(Debug, Clone)]
enum ContextValue {
    Leaf(Value),
    Nested(HashMap<String, ContextValue>),
}

impl DataContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value at a dot-separated path. Creates intermediate nested maps as needed.
    #[must_use]
    pub fn set(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.insert(path, value.into());
        self
    }

    /// Insert a value at a dot-separated path (mutable reference version).
    pub fn insert(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        Self::insert_recursive(&mut self.data, &segments, value);
    }

    /// Look up a value by dot-separated path.
    /// Returns `None` if the path does not exist or points to a nested map.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let segments: Vec<&str> = path.split('.').collect();
        Self::get_recursive(&self.data, &segments)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode a JSON object into a context.
    ///
    /// Numbers, strings and booleans become [`Value`]s and nested objects
    /// become dotted paths. `null` and arrays have no [`Value`] form and are
    /// left out, so rules that test them evaluate to `false`.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError`] if the input is not valid JSON or its top
    /// level is not an object.
    pub fn from_json(json: &str) -> Result<Self, ContextError> {
        let parsed: serde_json::Value = serde_json::from_str(json)?;
        Self::from_json_value(&parsed)
    }

    /// Build a context from an already decoded JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::NotAnObject`] if `json` is not an object.
    pub fn from_json_value(json: &serde_json::Value) -> Result<Self, ContextError> {
        match json {
            serde_json::Value::Object(map) => {
                let mut ctx = Self::new();
                ctx.absorb_object(&[], map);
                Ok(ctx)
            }
            other => Err(ContextError::NotAnObject {
                found: json_kind(other),
            }),
        }
    }

    /// Insert every leaf of `map` under `prefix`. Keys are split on `.` the
    /// same way [`insert`](Self::insert) splits paths, so `{"user.age": 41}`
    /// and `{"user": {"age": 41}}` decode alike.
    fn absorb_object<'j>(
        &mut self,
        prefix: &[&'j str],
        map: &'j serde_json::Map<String, serde_json::Value>,
    ) {
        for (key, value) in map {
            let mut segments = prefix.to_vec();
            segments.extend(key.split('.'));
            let leaf = match value {
                serde_json::Value::Bool(b) => Value::Bool(*b),
                serde_json::Value::Number(n) => match n.as_f64() {
                    Some(n) => Value::Number(n),
                    None => continue,
                },
                serde_json::Value::String(s) => Value::Text(s.clone()),
                serde_json::Value::Object(inner) => {
                    self.absorb_object(&segments, inner);
                    continue;
                }
                serde_json::Value::Null | serde_json::Value::Array(_) => continue,
            };
            Self::insert_recursive(&mut self.data, &segments, leaf);
        }
    }

    fn insert_recursive(map: &mut HashMap<String, ContextValue>, segments: &[&str], value: Value) {
        match segments {
            [] => {}
            [last] => {
                map.insert((*last).to_owned(), ContextValue::Leaf(value));
            }
            [first, rest @ ..] => {
                let entry = map
                    .entry((*first).to_owned())
                    .or_insert_with(|| ContextValue::Nested(HashMap::new()));
                match entry {
                    ContextValue::Nested(nested) => {
                        Self::insert_recursive(nested, rest, value);
                    }
                    ContextValue::Leaf(_) => {
                        let mut nested = HashMap::new();
                        Self::insert_recursive(&mut nested, rest, value);
                        *entry = ContextValue::Nested(nested);
                    }
                }
            }
        }
    }

    fn get_recursive<'a>(
        map: &'a HashMap<String, ContextValue>,
        segments: &[&str],
    ) -> Option<&'a Value> {
        match segments {
            [] => None,
            [last] => match map.get(*last)? {
                ContextValue::Leaf(v) => Some(v),
                ContextValue::Nested(_) => None,
            },
            [first, rest @ ..] => match map.get(*first)? {
                ContextValue::Nested(nested) => Self::get_recursive(nested, rest),
                ContextValue::Leaf(_) => None,
            },
        }
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for DataContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = DataContext::new();
        for (path, value) in iter {
            ctx.insert(path.as_ref(), value.into());
        }
        ctx
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
