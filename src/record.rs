//! Record types for hojear.
//!
//! A [`Record`] is one row of a tabular dataset: an insertion-ordered
//! mapping from field name to JSON value. Records are immutable once
//! loaded into a [`Dataset`](crate::Dataset).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The reserved field carrying a record's unique integer id.
pub const ID_FIELD: &str = "id";

/// One row of a dataset, keyed by field name.
///
/// Serializes transparently as the underlying JSON object, so a
/// `Vec<Record>` is wire-compatible with a plain JSON array of rows.
///
/// # Example
///
/// ```
/// use hojear::Record;
///
/// let record: Record = serde_json::from_str(
///     r#"{"id": 1, "legal_name": "Acme Freight", "power_units": 12}"#,
/// ).unwrap();
///
/// assert_eq!(record.id(), Some(1));
/// assert_eq!(record.text("power_units").as_deref(), Some("12"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Creates a record from a field map.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Returns the value of a field, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns the record's integer id, if it carries one.
    ///
    /// Datasets guarantee every record has a unique id after loading;
    /// a standalone record may not.
    pub fn id(&self) -> Option<i64> {
        self.0.get(ID_FIELD).and_then(Value::as_i64)
    }

    /// Returns the field names in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the string coercion of a field value, used for filtering
    /// and grouping.
    ///
    /// Strings pass through, numbers and booleans use their canonical
    /// string form, null and absent fields coerce to `None` (they never
    /// match a filter). Nested arrays and objects also coerce to `None`.
    pub fn text(&self, field: &str) -> Option<String> {
        self.0.get(field).and_then(value_text)
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// String coercion of a single JSON value.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn carrier() -> Record {
        let Value::Object(fields) = json!({
            "id": 7,
            "legal_name": "Acme Freight LLC",
            "entity_type": "CARRIER",
            "power_units": 12,
            "dba_name": null,
        }) else {
            panic!("expected object");
        };
        Record::new(fields)
    }

    #[test]
    fn test_id_lookup() {
        assert_eq!(carrier().id(), Some(7));

        let record = Record::new(Map::new());
        assert_eq!(record.id(), None);
    }

    #[test]
    fn test_text_coercion() {
        let record = carrier();
        assert_eq!(record.text("legal_name").as_deref(), Some("Acme Freight LLC"));
        assert_eq!(record.text("power_units").as_deref(), Some("12"));
        // Null and absent fields never coerce
        assert_eq!(record.text("dba_name"), None);
        assert_eq!(record.text("missing"), None);
    }

    #[test]
    fn test_serde_transparent() {
        let record = carrier();
        let encoded = serde_json::to_string(&record).expect("serialize");
        assert!(encoded.starts_with('{'));
        let decoded: Record = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_field_order_preserved() {
        let record = carrier();
        let fields: Vec<&str> = record.fields().collect();
        assert_eq!(
            fields,
            vec!["id", "legal_name", "entity_type", "power_units", "dba_name"]
        );
    }
}
