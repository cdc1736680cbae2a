//! Bulk application of row-change events to a Postgres target.
//!
//! This crate applies an ordered stream of captured row changes
//! (insert/update/delete) to a target table using the fastest channel the
//! target offers: inserts are streamed through `COPY ... FROM STDIN` while
//! every other operation drops to statement-by-statement application. The
//! [`writer::BulkApplyWriter`] interleaves both strategies inside one logical
//! batch while preserving row order and exactly-once-per-row semantics.

pub mod config;
pub mod conversions;
pub mod copy;
pub mod error;
pub mod macros;
pub mod metrics;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
pub mod writer;
