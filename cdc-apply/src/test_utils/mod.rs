//! Test utilities for exercising writers without a live Postgres target.

pub mod channel;
pub mod writer;
