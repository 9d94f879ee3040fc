//! Structural document helpers.
//!
//! Items cross the store seam as [`serde_json::Value`] documents. The
//! helpers here bridge typed items to that form and extract the pieces the
//! binders care about: the identity field and the partition key path.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

/// Converts a typed item into its document form.
pub fn to_document<T: Serialize>(item: &T) -> Result<Value> {
    serde_json::to_value(item)
        .map_err(|e| Error::serialization("item could not be serialized to a document").with_source(e))
}

/// Converts a document back into a typed item.
pub fn from_document<T: DeserializeOwned>(document: Value) -> Result<T> {
    serde_json::from_value(document)
        .map_err(|e| Error::serialization("document could not be deserialized to the item type").with_source(e))
}

/// Parses a raw JSON string into a document.
///
/// The store interface accepts structured documents, not text, so
/// string-shaped items are parsed before being sent.
pub fn parse_raw(text: &str) -> Result<Value> {
    serde_json::from_str(text)
        .map_err(|e| Error::serialization("raw item is not valid JSON").with_source(e))
}

/// Extracts the identity field from a document.
///
/// The field must be the lowercase `"id"` key; stores reject documents
/// without it. Non-string scalars are rendered to text so numeric ids
/// still compare predictably.
pub fn item_id(document: &Value) -> Option<String> {
    match document.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Normalizes a partition key into the path form the store expects.
///
/// Container creation takes a `/path` style partition key path; descriptors
/// commonly carry just the property name.
pub fn normalize_partition_key_path(partition_key: &str) -> String {
    if partition_key.starts_with('/') {
        partition_key.to_owned()
    } else {
        format!("/{partition_key}")
    }
}

/// Treats a zero throughput hint as unset.
pub fn normalize_throughput(throughput: Option<u32>) -> Option<u32> {
    throughput.filter(|&t| t != 0)
}
