//! Chunk metadata restricted to primitive scalar values.
//!
//! Raw metadata arrives as arbitrary JSON. Before it reaches the vector index
//! every value goes through [`MetadataValue::try_from`]; structural values
//! (arrays, objects) are rejected by that conversion and then either
//! stringified or dropped according to [`MetadataPolicy`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Metadata as produced by the ingestion stages, before sanitization.
pub type RawMetadata = serde_json::Map<String, serde_json::Value>;

/// Sanitized metadata as persisted next to each vector.
pub type Metadata = BTreeMap<String, MetadataValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Null,
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
            Self::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self { Self::Str(v.to_string()) }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self { Self::Str(v) }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self { Self::Int(v) }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self { Self::Bool(v) }
}

/// Fails with the original value when it is an array or an object.
impl TryFrom<serde_json::Value> for MetadataValue {
    type Error = serde_json::Value;

    fn try_from(value: serde_json::Value) -> std::result::Result<Self, Self::Error> {
        use serde_json::Value;
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::String(s) => Ok(Self::Str(s)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Self::Float(f))
                } else {
                    // u64 above i64::MAX
                    Ok(Self::Str(n.to_string()))
                }
            }
            other @ (Value::Array(_) | Value::Object(_)) => Err(other),
        }
    }
}

/// What to do with a structural value found in raw metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataPolicy {
    /// Replace the value with its compact JSON text.
    #[default]
    Stringify,
    /// Remove the key.
    Drop,
}

impl FromStr for MetadataPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stringify" => Ok(Self::Stringify),
            "drop" => Ok(Self::Drop),
            other => Err(Error::Configuration(format!("unknown metadata policy '{other}' (expected stringify|drop)"))),
        }
    }
}

pub fn sanitize(raw: RawMetadata, policy: MetadataPolicy) -> Metadata {
    let mut out = Metadata::new();
    for (key, value) in raw {
        match MetadataValue::try_from(value) {
            Ok(v) => {
                out.insert(key, v);
            }
            Err(structural) => match policy {
                MetadataPolicy::Stringify => {
                    out.insert(key, MetadataValue::Str(structural.to_string()));
                }
                MetadataPolicy::Drop => {
                    tracing::debug!(key = %key, "dropping structural metadata value");
                }
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: serde_json::Value) -> RawMetadata {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn scalars_pass_through() {
        let m = sanitize(raw(json!({"s": "x", "i": 3, "f": 1.5, "b": true, "n": null})), MetadataPolicy::Drop);
        assert_eq!(m.get("s"), Some(&MetadataValue::Str("x".into())));
        assert_eq!(m.get("i"), Some(&MetadataValue::Int(3)));
        assert_eq!(m.get("f"), Some(&MetadataValue::Float(1.5)));
        assert_eq!(m.get("b"), Some(&MetadataValue::Bool(true)));
        assert_eq!(m.get("n"), Some(&MetadataValue::Null));
    }

    #[test]
    fn structural_values_follow_policy() {
        let input = json!({"tags": ["a", "b"], "nested": {"k": 1}, "id": "7"});
        let stringified = sanitize(raw(input.clone()), MetadataPolicy::Stringify);
        assert_eq!(stringified.get("tags"), Some(&MetadataValue::Str("[\"a\",\"b\"]".into())));
        assert_eq!(stringified.get("nested"), Some(&MetadataValue::Str("{\"k\":1}".into())));

        let dropped = sanitize(raw(input), MetadataPolicy::Drop);
        assert!(!dropped.contains_key("tags"));
        assert!(!dropped.contains_key("nested"));
        assert_eq!(dropped.len(), 1);
    }

    #[test]
    fn untagged_serde_keeps_types() {
        let mut m = Metadata::new();
        m.insert("chunk_id".into(), MetadataValue::Int(2));
        m.insert("product".into(), "Credit card".into());
        m.insert("score".into(), MetadataValue::Float(0.25));
        let text = serde_json::to_string(&m).expect("serialize");
        let back: Metadata = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, m);
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("Drop".parse::<MetadataPolicy>().ok(), Some(MetadataPolicy::Drop));
        assert!("keep".parse::<MetadataPolicy>().is_err());
    }
}
