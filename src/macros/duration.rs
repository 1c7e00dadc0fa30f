//! Interval literal parser
//!
//! Parses the duration literals accepted by `$__timeGroup`, e.g. `1m`,
//! `1h30m`, `1.5h` or `7d`. A literal is one or more `<number><unit>`
//! components; the supported units are:
//!
//! ```text
//! ns  us  µs  ms  s  m  h  d (24h)  w (7d)  M (30d)  y (365d)
//! ```

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1},
    combinator::{all_consuming, map_opt, opt, value},
    multi::many1,
    sequence::{preceded, tuple},
    IResult,
};
use std::time::Duration;

use crate::macros::error::{MacroError, MacroResult};

const NANOS_PER_SECOND: u128 = 1_000_000_000;
const SECONDS_PER_DAY: u128 = 24 * 60 * 60;

/// Parse an interval literal into a duration
///
/// Zero-length intervals are rejected since they would produce a division
/// by zero in the generated SQL.
pub fn parse_duration(input: &str) -> MacroResult<Duration> {
    let invalid = || MacroError::InvalidInterval(input.to_string());

    let (_, components) = all_consuming(many1(parse_component))(input.trim())
        .map_err(|_| invalid())?;

    let total = components
        .into_iter()
        .try_fold(0u128, |acc, nanos| acc.checked_add(nanos))
        .ok_or_else(invalid)?;

    if total == 0 {
        return Err(invalid());
    }

    let nanos = u64::try_from(total).map_err(|_| invalid())?;
    Ok(Duration::from_nanos(nanos))
}

/// Render a duration as seconds using the shortest decimal form (`60`, `0.5`)
pub fn format_seconds(duration: Duration) -> String {
    duration.as_secs_f64().to_string()
}

/// Parse a single `<number>[.<fraction>]<unit>` component into nanoseconds
fn parse_component(input: &str) -> IResult<&str, u128> {
    map_opt(
        tuple((digit1, opt(preceded(char('.'), digit1)), parse_unit)),
        |(whole, fraction, unit): (&str, Option<&str>, u128)| {
            component_nanos(whole, fraction, unit)
        },
    )(input)
}

/// Parse a unit suffix into its length in nanoseconds
fn parse_unit(input: &str) -> IResult<&str, u128> {
    alt((
        value(1u128, tag("ns")),
        value(1_000u128, alt((tag("us"), tag("µs")))),
        value(1_000_000u128, tag("ms")),
        value(NANOS_PER_SECOND, tag("s")),
        value(60 * NANOS_PER_SECOND, tag("m")),
        value(60 * 60 * NANOS_PER_SECOND, tag("h")),
        value(SECONDS_PER_DAY * NANOS_PER_SECOND, tag("d")),
        value(7 * SECONDS_PER_DAY * NANOS_PER_SECOND, tag("w")),
        value(30 * SECONDS_PER_DAY * NANOS_PER_SECOND, tag("M")),
        value(365 * SECONDS_PER_DAY * NANOS_PER_SECOND, tag("y")),
    ))(input)
}

fn component_nanos(whole: &str, fraction: Option<&str>, unit: u128) -> Option<u128> {
    let mut nanos = whole.parse::<u128>().ok()?.checked_mul(unit)?;

    if let Some(fraction) = fraction {
        // Precision beyond 18 digits is below nanosecond resolution for every unit
        let digits = &fraction[..fraction.len().min(18)];
        let scale = 10u128.pow(digits.len() as u32);
        nanos = nanos.checked_add(digits.parse::<u128>().ok()? * unit / scale)?;
    }

    Some(nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration("1w").unwrap(), Duration::from_secs(604800));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_compound_and_fractional() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("0.5s").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration(" 10m ").unwrap(), Duration::from_secs(600));
    }

    #[test]
    fn test_month_is_distinct_from_minute() {
        assert_eq!(parse_duration("1M").unwrap(), Duration::from_secs(30 * 86400));
        assert_eq!(parse_duration("1y").unwrap(), Duration::from_secs(365 * 86400));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("1x").is_err());
        assert!(parse_duration("-1m").is_err());
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("1m junk").is_err());
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(Duration::from_secs(60)), "60");
        assert_eq!(format_seconds(Duration::from_millis(500)), "0.5");
        assert_eq!(format_seconds(Duration::from_secs(86400)), "86400");
    }
}
