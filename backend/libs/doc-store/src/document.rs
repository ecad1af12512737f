//! Documents and write payloads

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::StoreResult;
use crate::path::DocPath;

/// Render a timestamp the way the store persists it.
///
/// Fixed microsecond precision keeps lexical order equal to time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A stored document: its path plus a JSON object of fields
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocPath,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(path: DocPath, fields: Map<String, Value>) -> Self {
        Self { path, fields }
    }

    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Deserialize the fields into `T`, exposing the document id as `id`
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut object = self.fields.clone();
        object.insert("id".to_string(), Value::String(self.id().to_string()));
        Ok(serde_json::from_value(Value::Object(object))?)
    }
}

/// Value of a single field in a write
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Value(Value),
    /// Replaced by the store's clock when the write is applied
    ServerTimestamp,
}

/// Field set for `set`/`add`/`toggle` writes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(BTreeMap<String, FieldValue>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), FieldValue::Value(value.into()));
        self
    }

    pub fn with_server_timestamp(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into(), FieldValue::ServerTimestamp);
        self
    }

    pub fn has_server_timestamps(&self) -> bool {
        self.0
            .values()
            .any(|v| matches!(v, FieldValue::ServerTimestamp))
    }

    /// Materialize the write, stamping server timestamps with `now`
    pub fn resolve(self, now: DateTime<Utc>) -> Map<String, Value> {
        let stamp = format_timestamp(now);
        self.0
            .into_iter()
            .map(|(key, value)| match value {
                FieldValue::Value(v) => (key, v),
                FieldValue::ServerTimestamp => (key, Value::String(stamp.clone())),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        id: String,
        content: String,
    }

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp(a), "2024-01-02T03:04:05.000000Z");

        let b = a + chrono::Duration::microseconds(1);
        assert!(format_timestamp(a) < format_timestamp(b));
    }

    #[test]
    fn test_resolve_stamps_server_timestamps() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let fields = Fields::new()
            .with("content", "hi")
            .with_server_timestamp("createdAt");
        assert!(fields.has_server_timestamps());

        let resolved = fields.resolve(now);
        assert_eq!(resolved["content"], "hi");
        assert_eq!(resolved["createdAt"], "2024-05-01T12:00:00.000000Z");
    }

    #[test]
    fn test_decode_injects_id() {
        let path = DocPath::new("posts/7").unwrap();
        let fields = Fields::new().with("content", "hello").resolve(Utc::now());
        let doc = Document::new(path, fields);

        let sample: Sample = doc.decode().unwrap();
        assert_eq!(
            sample,
            Sample {
                id: "7".into(),
                content: "hello".into()
            }
        );
    }
}
