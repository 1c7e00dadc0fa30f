//! Column type resolution
//!
//! Maps a driver-reported storage type name to a semantic type, applying the
//! name-based rules for `time` and `metric` columns.

use tracing::debug;

use crate::frame::error::{FrameError, FrameResult};
use crate::frame::types::SemanticType;

/// Raw type names a `metric` column may never have
const METRIC_DISALLOWED_TYPES: &[&str] = &[
    "date",
    "timestamp",
    "timestamptz",
    "time",
    "timetz",
    "bigint",
    "int",
    "smallint",
    "mediumint",
    "tinyint",
    "double",
    "decimal",
    "float",
];

/// Resolve the semantic type of a result column
///
/// `time_grouped` is set when `$__timeGroup` appeared in the query; a column
/// named `time` is then always TIME.
pub fn resolve(column_name: &str, type_name: &str, time_grouped: bool) -> FrameResult<SemanticType> {
    if column_name == "time" && time_grouped {
        return Ok(SemanticType::Time);
    }

    let base = base_type_name(type_name);
    let resolved = map_type_name(&base);

    if resolved == SemanticType::Unknown {
        debug!(column = column_name, type_name, "Unrecognized column type");
    }

    if column_name == "metric" {
        check_metric(type_name, &base, resolved)?;
    }

    Ok(resolved)
}

/// Uppercased type name with any `(precision)` suffix removed
fn base_type_name(type_name: &str) -> String {
    let without_suffix = match type_name.find('(') {
        Some(idx) => &type_name[..idx],
        None => type_name,
    };
    without_suffix
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

fn map_type_name(base: &str) -> SemanticType {
    match base {
        "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" | "MEDIUMINT" | "INT2" | "INT4"
        | "INT8" => SemanticType::Integer,
        "REAL" | "NUMERIC" | "DOUBLE" | "DOUBLE PRECISION" | "FLOAT" | "FLOAT4" | "FLOAT8"
        | "DECIMAL" | "NUMBER" | "MONEY" => SemanticType::Float,
        "NULL" | "TEXT" | "BLOB" | "VARCHAR" | "LONG VARCHAR" | "CHAR" | "UUID" | "VARBINARY"
        | "LONG VARBINARY" | "BINARY" => SemanticType::String,
        "TIME" | "TIMETZ" | "TIMESTAMP" | "TIMESTAMPTZ" | "DATE" | "DATETIME" => SemanticType::Time,
        "BOOL" | "BOOLEAN" => SemanticType::Boolean,
        _ => SemanticType::Unknown,
    }
}

fn check_metric(type_name: &str, base: &str, resolved: SemanticType) -> FrameResult<()> {
    let lowered = base.to_ascii_lowercase();
    let disallowed_name = METRIC_DISALLOWED_TYPES.contains(&lowered.as_str());
    let disallowed_type = matches!(
        resolved,
        SemanticType::Time | SemanticType::Integer | SemanticType::Float
    );

    if disallowed_name || disallowed_type {
        return Err(FrameError::TypeConflict {
            column: "metric".to_string(),
            reason: format!(
                "column type {} resolves to {}, metric must be a string",
                type_name, resolved
            ),
        });
    }

    Ok(())
}

/// Check a type a column takes from its first value rather than its header
///
/// A `metric` column whose header gave no type must still end up non-numeric
/// and non-temporal.
pub(crate) fn check_upgraded(column_name: &str, upgraded: SemanticType) -> FrameResult<()> {
    if column_name == "metric"
        && matches!(
            upgraded,
            SemanticType::Time | SemanticType::Integer | SemanticType::Float
        )
    {
        return Err(FrameError::TypeConflict {
            column: "metric".to_string(),
            reason: format!("first value is {}, metric must be a string", upgraded),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_families() {
        let cases = [
            ("INTEGER", SemanticType::Integer),
            ("bigint", SemanticType::Integer),
            ("Float", SemanticType::Float),
            ("NUMERIC(10,2)", SemanticType::Float),
            ("double precision", SemanticType::Float),
            ("VARCHAR(64)", SemanticType::String),
            ("Long Varchar", SemanticType::String),
            ("UUID", SemanticType::String),
            ("TIMESTAMPTZ", SemanticType::Time),
            ("date", SemanticType::Time),
            ("BOOLEAN", SemanticType::Boolean),
            ("INTERVAL", SemanticType::Unknown),
            ("", SemanticType::Unknown),
        ];

        for (type_name, expected) in cases {
            assert_eq!(
                resolve("value", type_name, false).unwrap(),
                expected,
                "type {}",
                type_name
            );
        }
    }

    #[test]
    fn test_time_grouped_forces_time() {
        assert_eq!(resolve("time", "FLOAT", true).unwrap(), SemanticType::Time);
        assert_eq!(resolve("time", "FLOAT", false).unwrap(), SemanticType::Float);
        assert_eq!(resolve("ts", "FLOAT", true).unwrap(), SemanticType::Float);
    }

    #[test]
    fn test_metric_rejects_numeric_and_temporal() {
        for type_name in ["INT", "BIGINT", "FLOAT", "DECIMAL(5,2)", "TIMESTAMP", "DATE", "NUMERIC"] {
            let err = resolve("metric", type_name, false).unwrap_err();
            assert!(
                matches!(err, FrameError::TypeConflict { ref column, .. } if column == "metric"),
                "type {}",
                type_name
            );
        }
    }

    #[test]
    fn test_metric_accepts_strings() {
        assert_eq!(resolve("metric", "VARCHAR", false).unwrap(), SemanticType::String);
        assert_eq!(resolve("metric", "TEXT", false).unwrap(), SemanticType::String);
        assert_eq!(resolve("metric", "", false).unwrap(), SemanticType::Unknown);
    }

    #[test]
    fn test_check_upgraded() {
        assert!(check_upgraded("metric", SemanticType::Integer).is_err());
        assert!(check_upgraded("metric", SemanticType::Float).is_err());
        assert!(check_upgraded("metric", SemanticType::Time).is_err());
        assert!(check_upgraded("metric", SemanticType::String).is_ok());
        assert!(check_upgraded("metric", SemanticType::Boolean).is_ok());
        assert!(check_upgraded("value", SemanticType::Integer).is_ok());
    }
}
