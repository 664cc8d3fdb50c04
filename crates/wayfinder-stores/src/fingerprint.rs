//! Deterministic cache-key fingerprints.
//!
//! A fingerprint is the normalized string a tool call's parameters reduce
//! to; two calls with equivalent parameters must produce the identical key
//! regardless of whitespace, casing, or map ordering.

use serde_json::Value;
use sha2::{Digest, Sha256};

const HASH_PREFIX_LEN: usize = 16;
const FLOAT_PRECISION: i32 = 6;

/// Lowercase and collapse all internal whitespace to single spaces.
pub fn normalize_text(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Short hash of a bounding box, stable across float formatting quirks.
pub fn hash_bbox(bbox: &[f64]) -> String {
    let formatted = bbox
        .iter()
        .map(|v| format!("{v:.6}"))
        .collect::<Vec<_>>()
        .join(",");
    short_sha256(formatted.as_bytes())
}

/// Short hash of a JSON payload serialized in canonical form.
///
/// serde_json orders object keys, so equal payloads built in different key
/// orders serialize identically.
pub fn stable_json_hash(payload: &Value) -> String {
    let serialized = serde_json::to_string(payload).unwrap_or_default();
    short_sha256(serialized.as_bytes())
}

/// One component of a cache key.
#[derive(Debug, Clone)]
pub enum KeyPart {
    Text(String),
    Float(f64),
    Int(i64),
    Json(Value),
    None,
}

impl KeyPart {
    fn render(&self) -> String {
        match self {
            KeyPart::Text(text) => normalize_text(text),
            KeyPart::Float(value) => {
                let scale = 10f64.powi(FLOAT_PRECISION);
                let rounded = (value * scale).round() / scale;
                format!("{rounded}")
            }
            KeyPart::Int(value) => value.to_string(),
            KeyPart::Json(value) => stable_json_hash(value),
            KeyPart::None => "none".to_string(),
        }
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Text(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        KeyPart::Text(value)
    }
}

impl From<f64> for KeyPart {
    fn from(value: f64) -> Self {
        KeyPart::Float(value)
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        KeyPart::Int(value)
    }
}

impl From<usize> for KeyPart {
    fn from(value: usize) -> Self {
        KeyPart::Int(value as i64)
    }
}

impl From<Value> for KeyPart {
    fn from(value: Value) -> Self {
        KeyPart::Json(value)
    }
}

/// Join a normalized prefix and rendered parts with `:`.
pub fn make_cache_key(prefix: &str, parts: &[KeyPart]) -> String {
    let mut segments = Vec::with_capacity(parts.len() + 1);
    segments.push(normalize_text(prefix));
    for part in parts {
        segments.push(part.render());
    }
    segments.join(":")
}

fn short_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hex::encode(hasher.finalize());
    digest[..HASH_PREFIX_LEN].to_string()
}
