//! Common types used throughout the apply crate.
//!
//! Re-exports event and batch types, together with the schema and dialect
//! model from the Postgres support crate.

mod batch;
mod event;

pub use batch::*;
pub use event::*;

// Re-exports.
pub use cdc_postgres::dialect::DialectInfo;
pub use cdc_postgres::types::*;
