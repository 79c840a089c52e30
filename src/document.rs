//! Insertion-ordered column/value pairs for DML statements.

use crate::error::{RelqError, Result};
use crate::values::Value;

/// An ordered mapping of column names to values.
///
/// The DML builders number parameters in document order, so iteration order
/// equals the order in which entries were supplied. Setting an existing
/// column replaces its value in place without changing its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column value, keeping the column's original position when it
    /// was already present.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    /// Builds a document from a JSON object, preserving key order.
    ///
    /// Anything other than an object (arrays included) is rejected with
    /// [`RelqError::InvalidDocument`].
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = value else {
            return Err(RelqError::InvalidDocument {
                received: value.to_string(),
                expected: "a JSON object of column values".to_string(),
            });
        };
        let entries = map
            .iter()
            .map(|(name, v)| (name.clone(), Value::from(v)))
            .collect();
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Renders the document as JSON for error diagnostics.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            map.insert(name.clone(), value.to_json());
        }
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preserves_insertion_order() {
        let doc = Document::new().set("b", 1).set("a", 2).set("c", 3);
        let names: Vec<&str> = doc.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn replaces_in_place() {
        let doc = Document::new().set("a", 1).set("b", 2).set("a", 9);
        let entries: Vec<(&str, &Value)> = doc.iter().collect();
        assert_eq!(entries[0], ("a", &Value::Bigint(9)));
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn from_json_requires_an_object() {
        assert!(Document::from_json(&json!({"name": "x"})).is_ok());
        assert!(matches!(
            Document::from_json(&json!([1, 2])),
            Err(RelqError::InvalidDocument { .. })
        ));
        assert!(matches!(
            Document::from_json(&json!("scalar")),
            Err(RelqError::InvalidDocument { .. })
        ));
    }
}
