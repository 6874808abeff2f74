//! Key construction and encoding errors.

use thiserror::Error;

/// Errors raised when a value cannot be used as a table key.
///
/// Every variant is a caller mistake surfaced eagerly: a key that cannot be
/// encoded order-preservingly is rejected before anything touches the
/// underlying store, never silently mis-ordered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// NaN has no place in a total order.
    #[error("NaN cannot be used as a key")]
    NanKey,

    /// Composite keys hold scalars only, one level deep.
    #[error("composite keys cannot contain other composite keys")]
    NestedComposite,

    /// The designated key field was absent from a row.
    #[error("row is missing key field '{field}'")]
    MissingField {
        /// Name of the designated key field.
        field: String,
    },

    /// The designated key field held a value type with no key ordering.
    #[error("value of type {kind} cannot be used as a key")]
    Unsupported {
        /// Human-readable name of the offending value type.
        kind: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KeyError::MissingField {
            field: "ts".to_string(),
        };
        assert_eq!(err.to_string(), "row is missing key field 'ts'");
        assert_eq!(KeyError::NanKey.to_string(), "NaN cannot be used as a key");
    }
}
