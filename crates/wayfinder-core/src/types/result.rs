//! Standard specialist result envelope
//!
//! Every agent returns the same envelope: a data payload plus
//! provenance, self-reported confidence, warnings, and the cache
//! fingerprint that produced the value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Provenance for one piece of retrieved information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub source: String,
    pub title: String,
    pub snippet: String,
    pub retrieved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Why a raw payload failed to parse as a [`StandardAgentResult`].
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("payload does not match the standard result envelope: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("confidence {0} outside the 0.0..=1.0 range")]
    ConfidenceOutOfRange(f64),
}

/// The uniform envelope every specialist handler must produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardAgentResult {
    /// Specialist-specific payload
    pub data: Map<String, Value>,
    /// Provenance backing the payload
    #[serde(default)]
    pub evidence: Vec<EvidenceItem>,
    /// Self-reported confidence in 0.0..=1.0
    pub confidence: f64,
    /// Human-readable caveats
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Fingerprint of the tool call that produced this value
    pub cache_key: String,
}

impl StandardAgentResult {
    /// Parse a raw handler payload, enforcing the confidence bounds.
    ///
    /// An empty `cache_key` parses fine; the executor flags it as a
    /// consistency issue rather than a schema failure.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let result: Self = serde_json::from_value(value)?;
        if !(0.0..=1.0).contains(&result.confidence) {
            return Err(SchemaError::ConfidenceOutOfRange(result.confidence));
        }
        Ok(result)
    }
}
