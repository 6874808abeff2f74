//! # tempora-table
//!
//! Time-ordered tables over an embedded, transactional, ordered key-value
//! engine.
//!
//! Each [`Table`] is an append-mostly series of rows keyed by a scalar or
//! composite key (typically a timestamp), supporting "since X", "until X",
//! and "between X and Y" queries with result-count limits. Rows are stored
//! as opaque key/value entries in a fixed pool of physical stores shared by
//! many logical tables inside one database file:
//!
//! - the key codec embeds table identity and two virtual sentinel
//!   boundaries into a single order-preserving binary key space;
//! - the store router assigns each table to one physical store via a
//!   stable hash;
//! - the [`Connection`] recovers automatically from lost engine
//!   connections with a fixed-delay background reopen loop.
//!
//! ```no_run
//! use tempora_table::{Connection, Datum, DbConfig, Row};
//!
//! # fn main() -> tempora_table::TemporaResult<()> {
//! let conn = Connection::open("./data/market.tempora", DbConfig::default())?;
//! let candles = conn.open_table("candles_1m", "ts");
//!
//! let since = candles.get_since(1_626_814_980_i64, 100)?;
//! let last_three = candles.get_until_last(3)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod codec;
mod connection;
mod error;
mod range;
mod router;
mod store;
mod table;

pub use connection::Connection;
pub use error::{TemporaError, TemporaResult};
pub use table::Table;

// Shared types, re-exported so most callers depend on this crate alone.
pub use tempora_common::{config::DbConfig, Datum, EncodedId, Key, KeyError, Row};
