//! Ordered column→value rows.
//!
//! A [`Record`] is what executors return for each row and what entities hand to the
//! mutation builders. Column order is preserved so INSERT column lists follow the
//! declaration order of the entity.

use crate::value::{TryGetable, Value, ValueExtractionError};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `column` to `value`, replacing an existing entry in place.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(name, _)| name == column)?;
        Some(self.fields.remove(idx).1)
    }

    /// Remove `column` and decode it as `T`. A missing column decodes as `Null`.
    pub fn take<T: TryGetable>(&mut self, column: &str) -> Result<T, ValueExtractionError> {
        T::try_get(self.remove(column).unwrap_or(Value::Null))
    }

    /// Keep only the columns for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &Value) -> bool) {
        self.fields.retain(|(name, value)| keep(name, value));
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.set(column, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut record = Record::new().with("a", 1).with("b", 2);
        record.set("a", 3);
        let cols: Vec<_> = record.columns().collect();
        assert_eq!(cols, vec!["a", "b"]);
        assert_eq!(record.get("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_take_missing_column_is_null() {
        let mut record = Record::new();
        let v: Option<i32> = record.take("missing").unwrap();
        assert_eq!(v, None);
        assert!(matches!(
            record.take::<i32>("missing"),
            Err(ValueExtractionError::NullValue)
        ));
    }

    #[test]
    fn test_serializes_as_map() {
        let record = Record::new().with("id", 1).with("name", "x");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"id":1,"name":"x"}"#);
    }
}
