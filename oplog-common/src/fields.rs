//! OP log record fields
//!
//! The recognition service returns a flat JSON object describing one OP log
//! sheet. Each value is held as display text for editing. A value the user
//! has not edited is sent back to the store exactly as it was received; an
//! edited value is sent as a JSON number when its field is numeric and
//! parses, otherwise as a string.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Value kind of a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
}

/// One entry of the record field catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Key used on the wire
    pub key: &'static str,
    /// Short label for display
    pub label: &'static str,
    pub kind: FieldKind,
}

/// Known record fields, in display order
pub const FIELD_CATALOG: [FieldSpec; 15] = [
    FieldSpec { key: "id", label: "ID", kind: FieldKind::Text },
    FieldSpec { key: "date", label: "Date", kind: FieldKind::Text },
    FieldSpec { key: "sex", label: "Sex", kind: FieldKind::Number },
    FieldSpec { key: "age", label: "Age", kind: FieldKind::Number },
    FieldSpec { key: "side", label: "Side", kind: FieldKind::Number },
    FieldSpec { key: "diagnosis", label: "Diag", kind: FieldKind::Text },
    FieldSpec { key: "cement", label: "Cement", kind: FieldKind::Text },
    FieldSpec { key: "stem", label: "Stem", kind: FieldKind::Text },
    FieldSpec { key: "mdm", label: "MDM", kind: FieldKind::Number },
    FieldSpec { key: "cup", label: "Cup", kind: FieldKind::Text },
    FieldSpec { key: "screw", label: "Screw", kind: FieldKind::Text },
    FieldSpec { key: "head", label: "Head", kind: FieldKind::Text },
    FieldSpec { key: "time", label: "Time", kind: FieldKind::Number },
    FieldSpec { key: "bleeding", label: "Bleeding", kind: FieldKind::Number },
    FieldSpec { key: "comment", label: "Comment", kind: FieldKind::Text },
];

/// Key of the surgery date field, used to order batch saves
pub const DATE_FIELD: &str = "date";

/// Look up a catalog entry by key
pub fn field_spec(key: &str) -> Option<&'static FieldSpec> {
    FIELD_CATALOG.iter().find(|spec| spec.key == key)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldValue {
    text: String,
    /// Value as received from the recognition service; `None` once edited
    received: Option<Value>,
}

impl FieldValue {
    fn edited(text: String) -> Self {
        Self {
            text,
            received: None,
        }
    }

    fn to_wire(&self, key: &str) -> Value {
        if let Some(received) = &self.received {
            return received.clone();
        }
        match field_spec(key) {
            Some(spec) if spec.kind == FieldKind::Number => {
                parse_number(&self.text).unwrap_or_else(|| Value::String(self.text.clone()))
            }
            _ => Value::String(self.text.clone()),
        }
    }
}

/// Field name → value mapping for one record
///
/// Unknown keys returned by the recognition service are kept as-is.
/// Serializes as the JSON body sent to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFields(BTreeMap<String, FieldValue>);

impl RecordFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a recognition response body
    ///
    /// Strings are kept, other scalars are shown as their JSON text, nulls
    /// are dropped and nested values keep their JSON text. The received
    /// value is retained for [`RecordFields::to_json`].
    pub fn from_json(value: Value) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(Error::InvalidInput(format!(
                    "expected a JSON object, got {}",
                    json_type_name(&other)
                )))
            }
        };

        let fields = map
            .into_iter()
            .filter_map(|(key, value)| {
                let text = match &value {
                    Value::Null => return None,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some((
                    key,
                    FieldValue {
                        text,
                        received: Some(value),
                    },
                ))
            })
            .collect();

        Ok(Self(fields))
    }

    /// Convert to the JSON body sent to the store
    ///
    /// Unedited values are sent as received. Edited numeric catalog fields
    /// holding a parseable number are sent as JSON numbers; other edited
    /// values are sent as strings.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(key, value)| (key.clone(), value.to_wire(key)))
            .collect();

        Value::Object(map)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|value| value.text.as_str())
    }

    /// Set a field, returning the previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0
            .insert(key.into(), FieldValue::edited(value.into()))
            .map(|previous| previous.text)
    }

    /// Value of the `date` field, if present
    pub fn date(&self) -> Option<&str> {
        self.get(DATE_FIELD)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.text.as_str()))
    }
}

impl Serialize for RecordFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RecordFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(value).map_err(serde::de::Error::custom)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RecordFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), FieldValue::edited(v.into())))
                .collect(),
        )
    }
}

fn parse_number(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalog_keys_unique() {
        for (i, a) in FIELD_CATALOG.iter().enumerate() {
            for b in &FIELD_CATALOG[i + 1..] {
                assert_ne!(a.key, b.key);
            }
        }
        assert_eq!(field_spec("bleeding").unwrap().kind, FieldKind::Number);
        assert!(field_spec("unknown").is_none());
    }

    #[test]
    fn test_from_json_stringifies_scalars() {
        let fields = RecordFields::from_json(json!({
            "id": "9606882",
            "date": "2025/01/01",
            "sex": 1,
            "age": 70,
            "cement": true,
            "head": null,
            "comment": ["a", "b"],
        }))
        .unwrap();

        assert_eq!(fields.get("id"), Some("9606882"));
        assert_eq!(fields.get("sex"), Some("1"));
        assert_eq!(fields.get("age"), Some("70"));
        assert_eq!(fields.get("cement"), Some("true"));
        assert_eq!(fields.get("head"), None);
        assert_eq!(fields.get("comment"), Some(r#"["a","b"]"#));
        assert_eq!(fields.date(), Some("2025/01/01"));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let err = RecordFields::from_json(json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("array")));
    }

    #[test]
    fn test_to_json_numbers_only_for_numeric_fields() {
        let fields: RecordFields = [
            ("age", "70"),
            ("time", " 86 "),
            ("bleeding", "12.5"),
            ("side", "left"),
            ("cup", "50"),
            ("extra", "7"),
        ]
        .into_iter()
        .collect();

        let body = fields.to_json();
        assert_eq!(body["age"], json!(70));
        assert_eq!(body["time"], json!(86));
        assert_eq!(body["bleeding"], json!(12.5));
        assert_eq!(body["side"], json!("left"));
        assert_eq!(body["cup"], json!("50"));
        assert_eq!(body["extra"], json!("7"));
    }

    #[test]
    fn test_to_json_keeps_received_values_until_edited() {
        let mut fields = RecordFields::from_json(json!({
            "id": 9606882,
            "diagnosis": 1,
            "cement": 1,
            "cup": 50,
            "age": "70",
            "bleeding": 12.5,
            "comment": "none",
        }))
        .unwrap();
        assert_eq!(fields.get("cup"), Some("50"));

        let body = fields.to_json();
        assert_eq!(body["id"], json!(9606882));
        assert_eq!(body["diagnosis"], json!(1));
        assert_eq!(body["cement"], json!(1));
        assert_eq!(body["cup"], json!(50));
        assert_eq!(body["age"], json!("70"));
        assert_eq!(body["bleeding"], json!(12.5));
        assert_eq!(body["comment"], json!("none"));

        fields.set("cup", "52");
        fields.set("age", "71");
        let body = fields.to_json();
        assert_eq!(body["cup"], json!("52"));
        assert_eq!(body["age"], json!(71));
        assert_eq!(body["cement"], json!(1));
    }

    #[test]
    fn test_serialize_matches_store_body() {
        let fields = RecordFields::from_json(json!({ "sex": 1, "date": "2025/01/01" })).unwrap();
        let text = serde_json::to_string(&fields).unwrap();
        assert_eq!(text, r#"{"date":"2025/01/01","sex":1}"#);

        let back: RecordFields = serde_json::from_str(&text).unwrap();
        assert_eq!(back, fields);
    }

    #[test]
    fn test_set_returns_previous_value() {
        let mut fields = RecordFields::new();
        assert!(fields.is_empty());
        assert_eq!(fields.set("date", "2024/02/10"), None);
        assert_eq!(
            fields.set("date", "2024/01/05"),
            Some("2024/02/10".to_string())
        );
        assert_eq!(fields.len(), 1);
    }
}
