//! Core types for TemporaDB.

mod keys;
mod rows;

pub use keys::{EncodedId, Key};
pub use rows::{Datum, Row};
