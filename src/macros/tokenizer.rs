//! Directive tokenizer
//!
//! Splits raw SQL into a flat sequence of literal text and directive
//! invocations. A directive is `$__` followed by identifier characters,
//! optionally followed *immediately* by a parenthesized argument list:
//!
//! ```text
//! SELECT $__time(date_trunc('HOUR', ts)) FROM t WHERE $__timeFilter(ts)
//! └literal┘└──────── directive ────────┘└──literal──┘└──directive──┘
//! ```
//!
//! Parentheses inside the argument list are depth-tracked, so arguments may
//! contain function calls. Nothing else about the SQL is interpreted.

use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::char,
    combinator::recognize,
    sequence::{pair, preceded},
    IResult,
};
use std::ops::Range;

use crate::macros::error::{MacroError, MacroResult};

/// One token of raw SQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Text copied through unchanged
    Literal(&'a str),
    /// A `$__name(...)` occurrence
    Directive(DirectiveInvocation<'a>),
}

/// A single parsed directive occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveInvocation<'a> {
    /// Directive name including the leading underscores, e.g. `__time`
    pub name: &'a str,
    /// Text between the directive's own parentheses, if it has an argument list
    pub raw_args: Option<&'a str>,
    /// Byte span of the directive and its argument list in the raw SQL
    pub span: Range<usize>,
}

impl<'a> DirectiveInvocation<'a> {
    /// Split the raw argument text into trimmed arguments.
    ///
    /// With `multiple` set, the text is split on commas at parenthesis depth
    /// zero; otherwise the whole text is a single argument. An empty or
    /// missing argument list yields no arguments.
    pub fn arguments(&self, multiple: bool) -> Vec<&'a str> {
        let raw = match self.raw_args {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Vec::new(),
        };

        if !multiple {
            return vec![raw.trim()];
        }

        split_top_level(raw).into_iter().map(str::trim).collect()
    }
}

/// Tokenize raw SQL into literal and directive tokens
pub fn tokenize(sql: &str) -> MacroResult<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(offset) = sql[cursor..].find('$') {
        let start = cursor + offset;

        let (rest, name) = match directive_name(&sql[start..]) {
            Ok(parsed) => parsed,
            Err(_) => {
                // A bare `$` is ordinary SQL text
                cursor = start + 1;
                continue;
            }
        };

        let mut end = sql.len() - rest.len();
        let raw_args = if rest.starts_with('(') {
            let close = matching_paren(rest).ok_or_else(|| MacroError::UnterminatedArguments {
                directive: name.to_string(),
                offset: start,
            })?;
            end += close + 1;
            Some(&rest[1..close])
        } else {
            None
        };

        if literal_start < start {
            tokens.push(Token::Literal(&sql[literal_start..start]));
        }
        tokens.push(Token::Directive(DirectiveInvocation {
            name,
            raw_args,
            span: start..end,
        }));

        literal_start = end;
        cursor = end;
    }

    if literal_start < sql.len() {
        tokens.push(Token::Literal(&sql[literal_start..]));
    }

    Ok(tokens)
}

/// Parse `$__identifier`, returning the name without the `$`
fn directive_name(input: &str) -> IResult<&str, &str> {
    preceded(
        char('$'),
        recognize(pair(
            tag("__"),
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        )),
    )(input)
}

/// Byte offset of the parenthesis closing the one at `input[0]`
fn matching_paren(input: &str) -> Option<usize> {
    let mut depth = 0usize;

    for (idx, byte) in input.bytes().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }

    None
}

/// Split on commas that are not nested inside parentheses
fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (idx, byte) in input.bytes().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(&input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }

    parts.push(&input[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directives<'a>(tokens: &'a [Token<'a>]) -> Vec<&'a DirectiveInvocation<'a>> {
        tokens
            .iter()
            .filter_map(|t| match t {
                Token::Directive(d) => Some(d),
                Token::Literal(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_plain_sql_is_single_literal() {
        let tokens = tokenize("select * from test").unwrap();
        assert_eq!(tokens, vec![Token::Literal("select * from test")]);
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").unwrap().is_empty());
    }

    #[test]
    fn test_directive_with_arguments() {
        let sql = "SELECT a FROM t WHERE $__timeFilter(end_time) LIMIT 5";
        let tokens = tokenize(sql).unwrap();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], Token::Literal("SELECT a FROM t WHERE "));
        assert_eq!(tokens[2], Token::Literal(" LIMIT 5"));

        let found = directives(&tokens);
        assert_eq!(found[0].name, "__timeFilter");
        assert_eq!(found[0].raw_args, Some("end_time"));
        assert_eq!(&sql[found[0].span.clone()], "$__timeFilter(end_time)");
    }

    #[test]
    fn test_nested_parentheses() {
        let tokens = tokenize("select $__time(date_trunc('HOUR', current_timestamp))").unwrap();
        let found = directives(&tokens);

        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].raw_args,
            Some("date_trunc('HOUR', current_timestamp)")
        );
    }

    #[test]
    fn test_directive_without_argument_list() {
        let tokens = tokenize("select $__timeFrom , 1").unwrap();
        let found = directives(&tokens);

        assert_eq!(found[0].name, "__timeFrom");
        assert_eq!(found[0].raw_args, None);
        assert_eq!(tokens.last(), Some(&Token::Literal(" , 1")));
    }

    #[test]
    fn test_bare_dollar_is_literal() {
        let tokens = tokenize("select '$5', $1, $_x from t").unwrap();
        assert_eq!(tokens, vec![Token::Literal("select '$5', $1, $_x from t")]);
    }

    #[test]
    fn test_unterminated_arguments() {
        let err = tokenize("select $__time(a, (b)").unwrap_err();
        assert!(matches!(
            err,
            MacroError::UnterminatedArguments { ref directive, offset: 7 } if directive == "__time"
        ));
    }

    #[test]
    fn test_arguments_single_keeps_commas() {
        let tokens = tokenize("$__expandMultiString('a','b')").unwrap();
        let found = directives(&tokens);
        assert_eq!(found[0].arguments(false), vec!["'a','b'"]);
    }

    #[test]
    fn test_arguments_multiple_splits_top_level() {
        let tokens = tokenize("$__timeGroup(coalesce(a, b) , '5m', previous)").unwrap();
        let found = directives(&tokens);
        assert_eq!(
            found[0].arguments(true),
            vec!["coalesce(a, b)", "'5m'", "previous"]
        );
    }

    #[test]
    fn test_empty_argument_list() {
        let tokens = tokenize("$__timeTo()").unwrap();
        let found = directives(&tokens);
        assert_eq!(found[0].raw_args, Some(""));
        assert!(found[0].arguments(false).is_empty());
        assert!(found[0].arguments(true).is_empty());
    }

    #[test]
    fn test_adjacent_directives() {
        let tokens = tokenize("$__timeFrom()$__timeTo()").unwrap();
        assert_eq!(directives(&tokens).len(), 2);
        assert_eq!(tokens.len(), 2);
    }
}
