//! Writers that apply change events to a target database.
//!
//! [`base::EventWriter`] is the seam the enclosing batch-apply framework
//! drives; [`bulk::BulkApplyWriter`] is the streaming implementation that
//! decorates a row-by-row fallback writer, and [`statement::PgStatementWriter`]
//! is the statement-based writer used as that fallback for Postgres targets.

pub mod base;
pub mod bulk;
pub mod statement;

pub use base::EventWriter;
pub use bulk::BulkApplyWriter;
pub use statement::PgStatementWriter;
