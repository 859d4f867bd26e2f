//! Composite-field codec between stored JSON text and structured values.
//!
//! # Responsibility
//! - Encode list/map fields to the single-column text form the tables use.
//! - Decode stored text back, absorbing corruption instead of failing the
//!   surrounding record read.
//!
//! # Invariants
//! - `decode(encode(v)) == v` for every valid value.
//! - Decoding absent or corrupt text yields the empty container and logs a
//!   `composite_decode` warning; it never returns an error.
//! - Enum fields are NOT handled here: enum identity is higher-stakes and
//!   decodes strictly beside each repository.

use log::warn;
use std::collections::BTreeMap;

/// Encodes a string list for single-column storage.
pub fn encode_string_list(values: &[String]) -> String {
    // Vec<String> -> JSON array cannot fail to serialize.
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

/// Decodes a stored string list; corrupt or absent input becomes empty.
pub fn decode_string_list(column: &str, stored: Option<&str>) -> Vec<String> {
    let Some(text) = stored else {
        return Vec::new();
    };
    match serde_json::from_str(text) {
        Ok(values) => values,
        Err(err) => {
            warn!(
                "event=composite_decode module=model status=fallback column={column} error={err}"
            );
            Vec::new()
        }
    }
}

/// Encodes a string map for single-column storage.
pub fn encode_string_map(values: &BTreeMap<String, String>) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "{}".to_string())
}

/// Decodes a stored string map; corrupt or absent input becomes empty.
pub fn decode_string_map(column: &str, stored: Option<&str>) -> BTreeMap<String, String> {
    let Some(text) = stored else {
        return BTreeMap::new();
    };
    match serde_json::from_str(text) {
        Ok(values) => values,
        Err(err) => {
            warn!(
                "event=composite_decode module=model status=fallback column={column} error={err}"
            );
            BTreeMap::new()
        }
    }
}
