//! Conversions between the text representations used on the wire and raw bytes.

mod binary;

pub use binary::*;
