//! Postgres support types for the CDC apply workspace.
//!
//! Contains the table and column schema model shared by the apply writers,
//! together with the dialect capability value that parameterizes identifier
//! quoting and qualified-name formatting per target database.

pub mod dialect;
pub mod types;
