//! Ordered field-name → value mappings.
//!
//! A `Record` is both the input to insert/update and the decoded output of a
//! find. Insertion order is kept because it decides column order in rendered
//! `INSERT` statements.

use crate::value::Value;

/// An ordered set of `(field, value)` pairs with unique field names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty record with room for `capacity` fields.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Builder-style [`Record::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Set `field` to `value`, replacing an existing entry in place.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(name, _)| *name == field) {
            slot.1 = value;
        } else {
            self.entries.push((field, value));
        }
    }

    /// Get the value of `field`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Check whether `field` is present.
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Field names in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Iterate `(field, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the record holds no fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (field, value) in iter {
            record.set(field, value);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_kept() {
        let record = Record::new().with("name", "ayla").with("level", 3).with("gold", 1.5);
        let fields: Vec<_> = record.fields().collect();
        assert_eq!(fields, vec!["name", "level", "gold"]);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut record = Record::new().with("a", 1).with("b", 2);
        record.set("a", 10);
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("a"), Some(&Value::Int(10)));
        assert_eq!(record.fields().next(), Some("a"));
    }

    #[test]
    fn test_from_iterator() {
        let record: Record = vec![("x", 1), ("y", 2)].into_iter().collect();
        assert!(record.contains("y"));
        assert!(!record.contains("z"));
        assert!(!record.is_empty());
    }
}
