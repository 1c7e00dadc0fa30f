//! Macro expansion error types
//!
//! Every variant aborts the whole expansion: no partial SQL is ever returned.

use thiserror::Error;

/// Errors raised while expanding `$__` directives
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MacroError {
    /// Directive name is not in the catalog
    #[error("undefined macro: ${0}")]
    UnknownDirective(String),

    /// Required argument was not supplied
    #[error("missing {argument} argument for macro {directive}")]
    MissingArgument {
        directive: &'static str,
        argument: &'static str,
    },

    /// Directive takes no arguments but some were given
    #[error("macro {0} should have no arguments")]
    UnexpectedArguments(&'static str),

    /// `__timeGroup` was called with fewer than two arguments
    #[error("macro {0} needs time column and interval and optional fill value")]
    MissingGroupArguments(&'static str),

    /// Interval literal could not be parsed as a duration
    #[error("error parsing interval {0}")]
    InvalidInterval(String),

    /// Opening parenthesis of an argument list was never closed
    #[error("unterminated argument list for macro ${directive} at offset {offset}")]
    UnterminatedArguments { directive: String, offset: usize },
}

/// Result type for macro expansion
pub type MacroResult<T> = Result<T, MacroError>;
