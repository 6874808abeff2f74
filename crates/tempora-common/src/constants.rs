//! System-wide constants and limits.

use std::time::Duration;

/// Default number of physical stores created per database.
pub const DEFAULT_STORE_COUNT: usize = 64;

/// Upper bound on the number of physical stores per database.
///
/// Physical stores are a schema-level resource: they are all created in the
/// initial schema transaction and the count is fixed for the lifetime of the
/// database.
pub const MAX_STORE_COUNT: usize = 1024;

/// Default delay between reopen attempts after a lost connection.
pub const DEFAULT_REOPEN_DELAY: Duration = Duration::from_millis(200);

/// Name of the internal store holding database metadata.
pub const META_STORE_NAME: &str = "__tempora_meta";

/// Meta store key under which the persisted store count lives.
pub const META_KEY_STORE_COUNT: &str = "store_count";
