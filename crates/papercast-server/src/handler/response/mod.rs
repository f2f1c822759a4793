//! Response types for HTTP handlers.

mod errors;
mod monitors;
mod runs;

pub use errors::*;
pub use monitors::*;
pub use runs::*;
