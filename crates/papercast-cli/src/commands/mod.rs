//! Subcommand implementations.

mod list;
mod run;
mod serve;

pub use list::list;
pub use run::{RunArgs, run};
pub use serve::serve;
