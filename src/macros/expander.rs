//! Macro expansion
//!
//! Drives the tokenizer over raw SQL, evaluates every directive against the
//! query's time window and splices the generated fragments back in.
//!
//! # Examples
//!
//! ```text
//! SELECT $__timeGroup(ts, '1m', previous), avg(v) FROM t WHERE $__timeFilter(ts)
//!   → SELECT floor(extract(epoch from ts)/60)*60 as time, avg(v) FROM t
//!     WHERE ts BETWEEN '2021-01-01T12:00:00Z' AND '2021-01-25T12:00:00Z'
//!   fill policy: previous, time grouped: true
//! ```

use tracing::debug;

use crate::frame::FillPolicy;
use crate::macros::catalog::Directive;
use crate::macros::error::{MacroError, MacroResult};
use crate::macros::tokenizer::{tokenize, Token};
use crate::time::TimeWindow;

/// Result of expanding one raw SQL string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// SQL with every directive replaced
    pub sql: String,
    /// Fill policy selected by `$__timeGroup`, if any
    pub fill_policy: Option<FillPolicy>,
    /// Whether `$__timeGroup` appeared in the raw SQL
    pub time_grouped: bool,
}

/// Expand all `$__` directives in `raw_sql`
///
/// Any unknown directive or argument error aborts the whole expansion.
pub fn expand(raw_sql: &str, window: &TimeWindow) -> MacroResult<Expansion> {
    let tokens = tokenize(raw_sql)?;

    let mut sql = String::with_capacity(raw_sql.len());
    let mut fill_policy = None;
    let mut time_grouped = false;

    for token in tokens {
        match token {
            Token::Literal(text) => sql.push_str(text),
            Token::Directive(invocation) => {
                let directive = Directive::from_name(invocation.name)
                    .ok_or_else(|| MacroError::UnknownDirective(invocation.name.to_string()))?;

                let args = invocation.arguments(directive.takes_multiple_arguments());
                let fragment = directive.evaluate(&args, window)?;

                if directive == Directive::TimeGroup {
                    time_grouped = true;
                }
                if fragment.fill_policy.is_some() {
                    fill_policy = fragment.fill_policy;
                }

                sql.push_str(&fragment.sql);
            }
        }
    }

    debug!(raw = raw_sql, expanded = %sql, "Expanded macros");

    Ok(Expansion {
        sql,
        fill_policy,
        time_grouped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2021, 1, 1, 12, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2021, 1, 25, 12, 0, 0).unwrap(),
        )
    }

    fn expand_sql(raw: &str) -> MacroResult<String> {
        expand(raw, &window()).map(|e| e.sql)
    }

    #[test]
    fn test_no_directives_is_unchanged() {
        let raw = "select * from test where a = '$1' and b > 2";
        let expansion = expand(raw, &window()).unwrap();

        assert_eq!(expansion.sql, raw);
        assert_eq!(expansion.fill_policy, None);
        assert!(!expansion.time_grouped);
    }

    #[test]
    fn test_time_with_nested_call() {
        assert_eq!(
            expand_sql("select $__time(date_trunc('HOUR', current_timestamp))").unwrap(),
            "select date_trunc('HOUR', current_timestamp) AS time"
        );
    }

    #[test]
    fn test_time_filter() {
        assert_eq!(
            expand_sql("select * from test where $__timeFilter(end_time)").unwrap(),
            "select * from test where end_time BETWEEN '2021-01-01T12:00:00Z' AND '2021-01-25T12:00:00Z'"
        );
    }

    #[test]
    fn test_time_from_and_to() {
        assert_eq!(
            expand_sql("select $__timeFrom(), $__timeTo()").unwrap(),
            "select '2021-01-01T12:00:00Z', '2021-01-25T12:00:00Z'"
        );
    }

    #[test]
    fn test_expand_multi_string() {
        assert_eq!(
            expand_sql("select * from nodes where node_name in ($__expandMultiString({'v_vmart_node0001','v_vmart_node0002'}))")
                .unwrap(),
            "select * from nodes where node_name in ('v_vmart_node0001','v_vmart_node0002')"
        );
    }

    #[test]
    fn test_unix_epoch_filter() {
        assert_eq!(
            expand_sql("select * from test where $__unixEpochFilter(time)").unwrap(),
            "select * from test where time >= 1609502400 AND time <= 1611576000"
        );
    }

    #[test]
    fn test_time_group() {
        let expansion = expand(
            "select $__timeGroup(test_time, '1m'), avg(v) from t group by 1",
            &window(),
        )
        .unwrap();

        assert_eq!(
            expansion.sql,
            "select floor(extract(epoch from test_time)/60)*60 as time, avg(v) from t group by 1"
        );
        assert!(expansion.time_grouped);
        assert_eq!(expansion.fill_policy, None);
    }

    #[test]
    fn test_time_group_fill_policy() {
        let expansion = expand("select $__timeGroup(ts, '1h', previous)", &window()).unwrap();
        assert_eq!(expansion.fill_policy, Some(FillPolicy::Previous));

        let expansion = expand("select $__timeGroup(ts, 30s, 0)", &window()).unwrap();
        assert_eq!(expansion.fill_policy, Some(FillPolicy::ValueZero));
        assert_eq!(expansion.sql, "select floor(extract(epoch from ts)/30)*30 as time");
    }

    #[test]
    fn test_time_group_arity_error() {
        let err = expand_sql("select $__timeGroup(test_time)").unwrap_err();
        assert!(err.to_string().contains("time column and interval"));
    }

    #[test]
    fn test_unknown_directive_aborts() {
        let err = expand_sql("select $__time(a), $__test(b)").unwrap_err();
        assert_eq!(err, MacroError::UnknownDirective("__test".to_string()));
        assert_eq!(err.to_string(), "undefined macro: $__test");
    }

    #[test]
    fn test_argument_error_aborts() {
        assert!(expand_sql("select $__timeFrom(x) from t").is_err());
        assert!(expand_sql("select $__time() from t").is_err());
    }

    #[test]
    fn test_unterminated_argument_list() {
        assert!(matches!(
            expand_sql("select $__timeFilter(ts from t"),
            Err(MacroError::UnterminatedArguments { .. })
        ));
    }

    #[test]
    fn test_multiple_directives() {
        assert_eq!(
            expand_sql("select $__time(ts), v from t where $__timeFilter(ts) and $__unixEpochFilter(e)")
                .unwrap(),
            "select ts AS time, v from t where ts BETWEEN '2021-01-01T12:00:00Z' AND '2021-01-25T12:00:00Z' and e >= 1609502400 AND e <= 1611576000"
        );
    }
}
