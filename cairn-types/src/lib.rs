//! Shared row value model for Cairn.
//!
//! Local analysis data lives in embedded SQL databases, so a row is an
//! ordered mapping from column name to a closed value union mirroring the
//! SQLite storage classes. The cloud wire format is JSON; blobs serialize
//! as lowercase hex strings so every value has a deterministic JSON form.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A single column value as read from a local database.
#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// An ordered column-name → value mapping for one local row.
pub type Row = BTreeMap<String, RowValue>;

impl RowValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RowValue::Null)
    }

    /// Returns the value as an integer if it is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RowValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a string slice if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RowValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for RowValue {
    fn from(v: &str) -> Self {
        RowValue::Text(v.to_string())
    }
}

impl From<String> for RowValue {
    fn from(v: String) -> Self {
        RowValue::Text(v)
    }
}

impl From<i64> for RowValue {
    fn from(v: i64) -> Self {
        RowValue::Int(v)
    }
}

impl From<f64> for RowValue {
    fn from(v: f64) -> Self {
        RowValue::Float(v)
    }
}

impl From<bool> for RowValue {
    fn from(v: bool) -> Self {
        RowValue::Bool(v)
    }
}

impl From<Vec<u8>> for RowValue {
    fn from(v: Vec<u8>) -> Self {
        RowValue::Blob(v)
    }
}

impl Serialize for RowValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RowValue::Null => serializer.serialize_none(),
            RowValue::Bool(v) => serializer.serialize_bool(*v),
            RowValue::Int(v) => serializer.serialize_i64(*v),
            RowValue::Float(v) => serializer.serialize_f64(*v),
            RowValue::Text(v) => serializer.serialize_str(v),
            RowValue::Blob(v) => serializer.serialize_str(&hex::encode(v)),
        }
    }
}

impl<'de> Deserialize<'de> for RowValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowValueVisitor;

        impl<'de> Visitor<'de> for RowValueVisitor {
            type Value = RowValue;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("null, a boolean, a number, or a string")
            }

            fn visit_unit<E: de::Error>(self) -> Result<RowValue, E> {
                Ok(RowValue::Null)
            }

            fn visit_none<E: de::Error>(self) -> Result<RowValue, E> {
                Ok(RowValue::Null)
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<RowValue, D::Error> {
                d.deserialize_any(RowValueVisitor)
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<RowValue, E> {
                Ok(RowValue::Bool(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<RowValue, E> {
                Ok(RowValue::Int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<RowValue, E> {
                i64::try_from(v)
                    .map(RowValue::Int)
                    .map_err(|_| E::custom("integer out of range for i64"))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<RowValue, E> {
                Ok(RowValue::Float(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<RowValue, E> {
                Ok(RowValue::Text(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<RowValue, E> {
                Ok(RowValue::Text(v))
            }
        }

        deserializer.deserialize_any(RowValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn blob_serializes_as_lowercase_hex() {
        let v = RowValue::Blob(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"deadbeef\"");
    }

    #[test]
    fn null_round_trips() {
        let json = serde_json::to_string(&RowValue::Null).unwrap();
        assert_eq!(json, "null");
        let back: RowValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RowValue::Null);
    }

    #[test]
    fn scalars_round_trip() {
        for v in [
            RowValue::Bool(true),
            RowValue::Int(-42),
            RowValue::Text("src/main.rs".into()),
        ] {
            let json = serde_json::to_string(&v).unwrap();
            let back: RowValue = serde_json::from_str(&json).unwrap();
            assert_eq!(back, v);
        }
    }

    #[test]
    fn row_preserves_key_order() {
        let mut row = Row::new();
        row.insert("b".into(), RowValue::Int(2));
        row.insert("a".into(), RowValue::Int(1));
        let keys: Vec<_> = row.keys().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn accessors() {
        assert!(RowValue::Null.is_null());
        assert_eq!(RowValue::Int(7).as_i64(), Some(7));
        assert_eq!(RowValue::Text("x".into()).as_i64(), None);
        assert_eq!(RowValue::Text("x".into()).as_str(), Some("x"));
    }
}
