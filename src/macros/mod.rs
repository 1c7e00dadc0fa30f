//! Time-window macro expansion for raw SQL
//!
//! Raw SQL may contain `$__` directives that are rewritten against the
//! query's time window before the SQL is handed to the database:
//!
//! ```text
//! $__time(col)                       col AS time
//! $__timeFilter(col)                 col BETWEEN '<from>' AND '<to>'
//! $__timeFrom()                      '<from>'
//! $__timeTo()                        '<to>'
//! $__expandMultiString({'a','b'})    'a','b'
//! $__timeGroup(col, '1m'[, fill])    floor(extract(epoch from col)/60)*60 as time
//! $__unixEpochFilter(col)            col >= <from epoch> AND col <= <to epoch>
//! ```

mod catalog;
mod duration;
mod error;
mod expander;
mod tokenizer;

pub use catalog::{Directive, Fragment};
pub use duration::{format_seconds, parse_duration};
pub use error::{MacroError, MacroResult};
pub use expander::{expand, Expansion};
pub use tokenizer::{tokenize, DirectiveInvocation, Token};
