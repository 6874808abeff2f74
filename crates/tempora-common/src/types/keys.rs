//! Logical key and encoded identifier types.

use bytes::Bytes;
use std::cmp::Ordering;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A logical table key: a scalar or a one-level array of scalars.
///
/// Keys carry a total order that the key codec reproduces byte-for-byte in
/// the physical store. Different key kinds compare by kind first, in this
/// fixed order:
///
/// `Number < Timestamp < Text < Bytes < Composite`
///
/// Numbers compare by IEEE-754 total order (`f64::total_cmp`), so `-0.0`
/// sorts strictly before `0.0` and NaN — while ordered here — is rejected by
/// the codec before it can ever reach a store.
///
/// # Example
///
/// ```rust
/// use tempora_common::types::Key;
///
/// let a = Key::from(1_626_814_980_i64);
/// let b = Key::from(1_626_815_040_i64);
/// assert!(a < b);
/// ```
#[derive(Debug, Clone)]
pub enum Key {
    /// A numeric key (the common case for timestamps-as-numbers).
    Number(f64),
    /// A wall-clock key, unix milliseconds.
    Timestamp(i64),
    /// A UTF-8 text key.
    Text(String),
    /// A raw byte-string key.
    Bytes(Bytes),
    /// A composite key: an ordered sequence of scalar keys.
    ///
    /// Composites compare element-wise, shorter prefixes first. Nesting
    /// another composite inside is rejected at encode time.
    Composite(Vec<Key>),
}

impl Key {
    /// Creates a timestamp key from unix milliseconds.
    #[inline]
    #[must_use]
    pub const fn timestamp(unix_millis: i64) -> Self {
        Self::Timestamp(unix_millis)
    }

    /// Creates a composite key from scalar parts.
    #[inline]
    #[must_use]
    pub fn composite(parts: Vec<Key>) -> Self {
        Self::Composite(parts)
    }

    /// Returns a human-readable name for the key's kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Timestamp(_) => "timestamp",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Composite(_) => "composite",
        }
    }

    /// Rank of the key's kind in the cross-kind sort order.
    const fn rank(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::Timestamp(_) => 1,
            Self::Text(_) => 2,
            Self::Bytes(_) => 3,
            Self::Composite(_) => 4,
        }
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            (Self::Composite(a), Self::Composite(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.cmp(y) {
                        Ordering::Equal => {}
                        ord => return ord,
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Key {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Key {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl From<f64> for Key {
    #[inline]
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Key {
    /// Integer keys ride on the numeric key kind, matching the source data
    /// model where timestamps are plain numbers. Exact up to 2^53.
    #[inline]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for Key {
    #[inline]
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Key {
    #[inline]
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Bytes> for Key {
    #[inline]
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<u8>> for Key {
    #[inline]
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<Vec<Key>> for Key {
    #[inline]
    fn from(parts: Vec<Key>) -> Self {
        Self::Composite(parts)
    }
}

impl From<SystemTime> for Key {
    fn from(value: SystemTime) -> Self {
        let millis = match value.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_millis() as i64,
            Err(e) => -(e.duration().as_millis() as i64),
        };
        Self::Timestamp(millis)
    }
}

/// A physical identifier: the byte sequence actually stored as the engine
/// key, produced by the key codec from `(table, marker, key)`.
///
/// Identifiers are write-only — they are never decoded, the stored value
/// carries the row.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EncodedId(Vec<u8>);

impl EncodedId {
    /// Wraps an encoded byte sequence.
    #[inline]
    #[must_use]
    pub const fn from_vec(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the identifier as a byte slice.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the identifier in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the identifier is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the identifier, returning the underlying bytes.
    #[inline]
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for EncodedId {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for EncodedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncodedId(0x")?;
        for byte in &self.0[..self.0.len().min(32)] {
            write!(f, "{byte:02x}")?;
        }
        if self.0.len() > 32 {
            write!(f, "...")?;
        }
        write!(f, ")")
    }
}
