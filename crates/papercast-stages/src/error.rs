//! Parameter validation errors.

use thiserror::Error;

/// Result type for stage construction.
pub type ParamsResult<T> = Result<T, ParamsError>;

/// Why a stage rejected its parameters.
#[derive(Debug, Error)]
pub enum ParamsError {
    /// No program to run.
    #[error("program must not be empty")]
    EmptyProgram,

    /// An argument references a placeholder that is neither an input port
    /// nor `{{output}}` with an artifact configured.
    #[error("argument `{arg}` references unknown placeholder `{{{name}}}`")]
    UnknownPlaceholder {
        /// Offending argument.
        arg: String,
        /// Placeholder name without braces.
        name: String,
    },

    /// The artifact stem refers to an undeclared input port.
    #[error("artifact stem port `{0}` is not a declared input")]
    UnknownStemPort(String),

    /// Two ports on the same side share a name.
    #[error("port `{0}` is declared more than once")]
    DuplicatePort(String),
}
