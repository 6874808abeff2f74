//! Order-preserving key encoding.
//!
//! Every physical identifier encodes the ordered triple
//! `[table, marker, key]` such that the engine's plain byte comparison
//! reproduces the intended logical order:
//!
//! - the table identity is the most significant component, so two tables'
//!   identifier ranges never interleave inside a shared store;
//! - the marker byte (0 = low sentinel, 1 = row, 2 = high sentinel)
//!   brackets every real row of a table between two virtual boundaries
//!   that are never stored;
//! - the key payload sorts consistently with [`Key`]'s total order for
//!   every supported key kind.
//!
//! # Layout
//!
//! ```text
//! [table bytes, 0x00-escaped, 0x00-terminated][marker][payload]
//! ```
//!
//! Strings and byte strings escape embedded zero bytes as `0x00 0xFF` and
//! terminate with a single `0x00`, so a prefix always sorts first. Numbers
//! use the IEEE-754 total-order transform (flip all bits of negatives,
//! set the sign bit of non-negatives), which is monotonic over all finite
//! doubles — including mixed signs, fractions, and signed zero. Timestamps
//! are sign-flipped big-endian i64. Composite payloads concatenate their
//! tagged elements and close with `0x00`, which sorts below every element
//! tag. Each scalar payload is prefixed with a kind tag, fixing the
//! cross-kind order: number < timestamp < text < bytes < composite.
//!
//! Identifiers are write-only; there is no decoder.

use tempora_common::{EncodedId, Key, KeyError};

/// Marker for the virtual boundary before a table's first row.
pub(crate) const MARKER_LOW: u8 = 0x00;
/// Marker for a real row.
pub(crate) const MARKER_ROW: u8 = 0x01;
/// Marker for the virtual boundary after a table's last row.
pub(crate) const MARKER_HIGH: u8 = 0x02;

const TAG_NUMBER: u8 = 0x10;
const TAG_TIMESTAMP: u8 = 0x20;
const TAG_TEXT: u8 = 0x30;
const TAG_BYTES: u8 = 0x40;
const TAG_ARRAY: u8 = 0x50;

const TERMINATOR: u8 = 0x00;
const ESCAPED_ZERO: [u8; 2] = [0x00, 0xFF];

const SIGN_BIT: u64 = 1 << 63;

/// Identifier sorting before every row of `table`.
pub(crate) fn sentinel_low(table: &str) -> EncodedId {
    sentinel(table, MARKER_LOW)
}

/// Identifier sorting after every row of `table`.
pub(crate) fn sentinel_high(table: &str) -> EncodedId {
    sentinel(table, MARKER_HIGH)
}

/// Encodes the identifier of the row keyed by `key` in `table`.
pub(crate) fn encode_id(table: &str, key: &Key) -> Result<EncodedId, KeyError> {
    let mut buf = Vec::with_capacity(table.len() + 16);
    push_terminated(&mut buf, table.as_bytes());
    buf.push(MARKER_ROW);
    push_key(&mut buf, key, true)?;
    Ok(EncodedId::from_vec(buf))
}

fn sentinel(table: &str, marker: u8) -> EncodedId {
    let mut buf = Vec::with_capacity(table.len() + 2);
    push_terminated(&mut buf, table.as_bytes());
    buf.push(marker);
    EncodedId::from_vec(buf)
}

fn push_key(buf: &mut Vec<u8>, key: &Key, composite_allowed: bool) -> Result<(), KeyError> {
    match key {
        Key::Number(v) => {
            buf.push(TAG_NUMBER);
            buf.extend_from_slice(&number_bits(*v)?.to_be_bytes());
        }
        Key::Timestamp(v) => {
            buf.push(TAG_TIMESTAMP);
            buf.extend_from_slice(&((*v as u64) ^ SIGN_BIT).to_be_bytes());
        }
        Key::Text(v) => {
            buf.push(TAG_TEXT);
            push_terminated(buf, v.as_bytes());
        }
        Key::Bytes(v) => {
            buf.push(TAG_BYTES);
            push_terminated(buf, v);
        }
        Key::Composite(parts) => {
            if !composite_allowed {
                return Err(KeyError::NestedComposite);
            }
            buf.push(TAG_ARRAY);
            for part in parts {
                push_key(buf, part, false)?;
            }
            buf.push(TERMINATOR);
        }
    }
    Ok(())
}

fn push_terminated(buf: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        if byte == 0x00 {
            buf.extend_from_slice(&ESCAPED_ZERO);
        } else {
            buf.push(byte);
        }
    }
    buf.push(TERMINATOR);
}

/// Total-order transform of an f64 into a big-endian-comparable u64.
fn number_bits(value: f64) -> Result<u64, KeyError> {
    if value.is_nan() {
        return Err(KeyError::NanKey);
    }
    let bits = value.to_bits();
    Ok(if bits & SIGN_BIT != 0 {
        !bits
    } else {
        bits | SIGN_BIT
    })
}
