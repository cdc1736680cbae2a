//! Streaming bulk-load support: row encoding, the copy channel seam, and the
//! session state machine that owns one open channel at a time.

pub mod channel;
pub mod encoding;
pub mod session;
