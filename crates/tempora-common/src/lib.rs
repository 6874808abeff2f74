//! # tempora-common
//!
//! Common types, errors, and configuration for TemporaDB.
//!
//! This crate provides the foundational pieces shared by all TemporaDB
//! components:
//!
//! - **Types**: logical keys ([`types::Key`]), row field values
//!   ([`types::Datum`]), the open-map row model ([`types::Row`]), and the
//!   physical identifier wrapper ([`types::EncodedId`])
//! - **Errors**: key construction/encoding failures ([`error::KeyError`])
//! - **Config**: database configuration ([`config::DbConfig`])
//! - **Constants**: system-wide defaults and limits

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::DbConfig;
pub use error::KeyError;
pub use types::{Datum, EncodedId, Key, Row};
