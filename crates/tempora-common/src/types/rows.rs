//! Row and field value types.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::KeyError;
use crate::types::Key;

/// A row: an open map of named fields.
///
/// Exactly one field — designated when the table is opened — serves as the
/// row's sort key. Rows are immutable once written except by
/// overwrite-on-put.
pub type Row = BTreeMap<String, Datum>;

/// A single row field value.
///
/// The subset of `Datum` kinds with a key ordering (`Number`, `Timestamp`,
/// `Text`, `Bytes`, `Array` of those) can be designated as the key field;
/// `Null` and `Bool` cannot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Datum {
    /// Absent / null field.
    Null,
    /// Boolean field.
    Bool(bool),
    /// Numeric field.
    Number(f64),
    /// Wall-clock field, unix milliseconds.
    Timestamp(i64),
    /// UTF-8 text field.
    Text(String),
    /// Raw byte-string field.
    Bytes(Bytes),
    /// Array field.
    Array(Vec<Datum>),
}

impl Datum {
    /// Returns a human-readable name for the datum's kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Timestamp(_) => "timestamp",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Array(_) => "array",
        }
    }
}

impl TryFrom<&Datum> for Key {
    type Error = KeyError;

    fn try_from(datum: &Datum) -> Result<Self, Self::Error> {
        match datum {
            Datum::Number(v) => Ok(Key::Number(*v)),
            Datum::Timestamp(v) => Ok(Key::Timestamp(*v)),
            Datum::Text(v) => Ok(Key::Text(v.clone())),
            Datum::Bytes(v) => Ok(Key::Bytes(v.clone())),
            Datum::Array(parts) => {
                let mut key_parts = Vec::with_capacity(parts.len());
                for part in parts {
                    match part {
                        Datum::Array(_) => return Err(KeyError::NestedComposite),
                        other => key_parts.push(Key::try_from(other)?),
                    }
                }
                Ok(Key::Composite(key_parts))
            }
            other => Err(KeyError::Unsupported { kind: other.kind() }),
        }
    }
}

impl From<f64> for Datum {
    #[inline]
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Datum {
    #[inline]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for Datum {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Datum {
    #[inline]
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Datum {
    #[inline]
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datum_to_key() {
        let key = Key::try_from(&Datum::Number(1.5)).unwrap();
        assert_eq!(key, Key::from(1.5));

        let key = Key::try_from(&Datum::Text("btc".to_string())).unwrap();
        assert_eq!(key, Key::from("btc"));
    }

    #[test]
    fn test_datum_to_key_composite() {
        let datum = Datum::Array(vec![Datum::Text("btc".to_string()), Datum::Number(60.0)]);
        let key = Key::try_from(&datum).unwrap();
        assert_eq!(
            key,
            Key::composite(vec![Key::from("btc"), Key::from(60.0)])
        );
    }

    #[test]
    fn test_datum_to_key_rejects_nesting() {
        let datum = Datum::Array(vec![Datum::Array(vec![Datum::Number(1.0)])]);
        assert_eq!(Key::try_from(&datum), Err(KeyError::NestedComposite));
    }

    #[test]
    fn test_datum_to_key_rejects_unorderable() {
        assert_eq!(
            Key::try_from(&Datum::Bool(true)),
            Err(KeyError::Unsupported { kind: "bool" })
        );
        assert_eq!(
            Key::try_from(&Datum::Null),
            Err(KeyError::Unsupported { kind: "null" })
        );
    }
}
