//! Request types for HTTP handlers.

mod runs;

pub use runs::*;
