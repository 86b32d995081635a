use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::{DocumentPath, StoreError};

/// The opaque, monotonically-assigned timestamp type of the store.
pub type Timestamp = DateTime<Utc>;

/// The field map of a document.
pub type Fields = Map<String, Value>;

/// A document read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocumentPath,
    pub fields: Fields,
}

impl Document {
    /// Decodes the document's fields into a concrete record.
    pub fn deserialize<T>(&self) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|e| {
            StoreError::Malformed {
                path: self.path.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

/// Encodes a record into a field map for writing.
pub fn to_fields<T>(value: &T) -> Result<Fields, StoreError>
where
    T: Serialize,
{
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(StoreError::Internal(
            "only key-value records can be stored as documents".into(),
        )),
        Err(e) => Err(StoreError::Internal(Box::new(e))),
    }
}
