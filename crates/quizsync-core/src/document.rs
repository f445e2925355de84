//! Document conversion
//!
//! Maps between the store-agnostic [`Record`] and the remote store's
//! [`RemoteDocument`]. The remote store keys each document by a string
//! identity that lives outside the document body; locally the identity is
//! an ordinary `id` field on the record.
//!
//! No validation happens here. The converter is used for validated and
//! unvalidated record kinds alike.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A store-agnostic record: a JSON object with dynamic fields
pub type Record = serde_json::Map<String, Value>;

/// Identity field injected into local records
pub const ID_FIELD: &str = "id";

/// Fields that exist only in the local cache and never reach the remote
pub const LOCAL_ONLY_FIELDS: &[&str] = &["seq", "validated"];

/// Errors converting between typed values and records
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// A document as the remote store sees it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteDocument {
    /// Store-assigned key
    pub id: String,
    /// Document body (field set inferred from the object shape)
    #[serde(default)]
    pub fields: Record,
}

impl RemoteDocument {
    pub fn new(id: impl Into<String>, fields: Record) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Bidirectional record/remote-document mapping
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentConverter;

impl DocumentConverter {
    pub fn new() -> Self {
        Self
    }

    /// Body to write remotely for a local record
    ///
    /// Copies every field except the identity (carried by the document key)
    /// and the local-only fields.
    pub fn to_remote(&self, record: &Record) -> Record {
        record
            .iter()
            .filter(|(key, _)| {
                key.as_str() != ID_FIELD && !LOCAL_ONLY_FIELDS.contains(&key.as_str())
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Local record for a remote document
    ///
    /// The store-assigned key always wins over any `id` in the payload.
    pub fn from_remote(&self, document: RemoteDocument) -> Record {
        let RemoteDocument { id, mut fields } = document;
        fields.insert(ID_FIELD.to_string(), Value::String(id));
        fields
    }
}

/// Serialize a typed value into a record
pub fn record_from<T: Serialize>(value: &T) -> Result<Record, ConvertError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(ConvertError::NotAnObject(json_kind(&other))),
    }
}

/// Deserialize a record into a typed value
pub fn record_into<T: DeserializeOwned>(record: &Record) -> Result<T, ConvertError> {
    Ok(serde_json::from_value(Value::Object(record.clone()))?)
}

/// Human-readable JSON type name
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
