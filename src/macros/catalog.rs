//! Directive catalog
//!
//! The closed set of `$__` directives and the SQL each one generates. Every
//! evaluator is a pure function of its arguments and the time window.

use tracing::{debug, warn};

use crate::frame::FillPolicy;
use crate::macros::duration::{format_seconds, parse_duration};
use crate::macros::error::{MacroError, MacroResult};
use crate::time::TimeWindow;

/// A known directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// `$__time(col)` → `col AS time`
    Time,
    /// `$__timeFilter(col)` → `col BETWEEN '<from>' AND '<to>'`
    TimeFilter,
    /// `$__timeFrom()` → `'<from>'`
    TimeFrom,
    /// `$__timeTo()` → `'<to>'`
    TimeTo,
    /// `$__expandMultiString(values)` → `'v1','v2'`
    ExpandMultiString,
    /// `$__timeGroup(col, interval[, fill])` → epoch bucketing expression
    TimeGroup,
    /// `$__unixEpochFilter(col)` → `col >= <from> AND col <= <to>`
    UnixEpochFilter,
}

/// SQL generated by one directive, plus any fill policy it selected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub sql: String,
    pub fill_policy: Option<FillPolicy>,
}

impl Fragment {
    fn sql(sql: String) -> Self {
        Self {
            sql,
            fill_policy: None,
        }
    }
}

impl Directive {
    /// Every directive in the catalog
    pub const ALL: [Directive; 7] = [
        Directive::Time,
        Directive::TimeFilter,
        Directive::TimeFrom,
        Directive::TimeTo,
        Directive::ExpandMultiString,
        Directive::TimeGroup,
        Directive::UnixEpochFilter,
    ];

    /// Look up a directive by name (including the leading `__`)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.name() == name)
    }

    /// Name of the directive as written after the `$`
    pub fn name(&self) -> &'static str {
        match self {
            Directive::Time => "__time",
            Directive::TimeFilter => "__timeFilter",
            Directive::TimeFrom => "__timeFrom",
            Directive::TimeTo => "__timeTo",
            Directive::ExpandMultiString => "__expandMultiString",
            Directive::TimeGroup => "__timeGroup",
            Directive::UnixEpochFilter => "__unixEpochFilter",
        }
    }

    /// Whether the argument text is split on top-level commas
    pub fn takes_multiple_arguments(&self) -> bool {
        matches!(self, Directive::TimeGroup)
    }

    /// Generate the SQL fragment for this directive
    pub fn evaluate(&self, args: &[&str], window: &TimeWindow) -> MacroResult<Fragment> {
        debug!(directive = self.name(), ?args, "Evaluating macro");

        match self {
            Directive::Time => {
                let column = self.first_argument(args, "time column")?;
                Ok(Fragment::sql(format!("{} AS time", column)))
            }
            Directive::TimeFilter => {
                let column = self.first_argument(args, "time column")?;
                Ok(Fragment::sql(format!(
                    "{} BETWEEN '{}' AND '{}'",
                    column,
                    window.from_rfc3339_nano(),
                    window.to_rfc3339_nano()
                )))
            }
            Directive::TimeFrom => {
                self.no_arguments(args)?;
                Ok(Fragment::sql(format!("'{}'", window.from_rfc3339_nano())))
            }
            Directive::TimeTo => {
                self.no_arguments(args)?;
                Ok(Fragment::sql(format!("'{}'", window.to_rfc3339_nano())))
            }
            Directive::ExpandMultiString => {
                if args.is_empty() {
                    return Err(MacroError::MissingArgument {
                        directive: self.name(),
                        argument: "selector",
                    });
                }

                let quoted: Vec<String> = args
                    .iter()
                    .map(|arg| format!("'{}'", arg.trim_matches(|c| matches!(c, '{' | '}' | '\''))))
                    .collect();
                Ok(Fragment::sql(quoted.join(",")))
            }
            Directive::TimeGroup => self.time_group(args),
            Directive::UnixEpochFilter => {
                let column = self.first_argument(args, "time column")?;
                Ok(Fragment::sql(format!(
                    "{} >= {} AND {} <= {}",
                    column,
                    window.from_epoch_secs(),
                    column,
                    window.to_epoch_secs()
                )))
            }
        }
    }

    fn time_group(&self, args: &[&str]) -> MacroResult<Fragment> {
        if args.len() < 2 {
            return Err(MacroError::MissingGroupArguments(self.name()));
        }

        let interval = parse_duration(args[1].trim_matches('\''))
            .map_err(|_| MacroError::InvalidInterval(args[1].to_string()))?;
        let seconds = format_seconds(interval);

        let fill_policy = match args.get(2) {
            Some(fill) => {
                let policy = FillPolicy::from_argument(fill);
                if policy.is_none() {
                    warn!(fill = %fill, "Ignoring unrecognized fill value for $__timeGroup");
                }
                policy
            }
            None => None,
        };

        Ok(Fragment {
            sql: format!(
                "floor(extract(epoch from {})/{})*{} as time",
                args[0], seconds, seconds
            ),
            fill_policy,
        })
    }

    fn first_argument<'a>(&self, args: &[&'a str], argument: &'static str) -> MacroResult<&'a str> {
        args.first().copied().ok_or(MacroError::MissingArgument {
            directive: self.name(),
            argument,
        })
    }

    fn no_arguments(&self, args: &[&str]) -> MacroResult<()> {
        if args.is_empty() {
            Ok(())
        } else {
            Err(MacroError::UnexpectedArguments(self.name()))
        }
    }
}
