//! Core value and type definitions shared by the materializer and shaper

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Semantic type of an output column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Time,
    Integer,
    Float,
    String,
    Boolean,
    /// Not yet known; decided by the first non-null value
    Unknown,
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticType::Time => "TIME",
            SemanticType::Integer => "INTEGER",
            SemanticType::Float => "FLOAT",
            SemanticType::String => "STRING",
            SemanticType::Boolean => "BOOLEAN",
            SemanticType::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// How null or unconvertible values are materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Append a null
    #[default]
    Null,
    /// Repeat the column's last non-null value
    Previous,
    /// Append the type's zero value
    ValueZero,
}

impl FillPolicy {
    /// Parse the optional third argument of `$__timeGroup`
    ///
    /// Only the exact spellings `previous`, `NULL` and `0` are recognized.
    pub fn from_argument(argument: &str) -> Option<Self> {
        match argument {
            "previous" => Some(FillPolicy::Previous),
            "NULL" => Some(FillPolicy::Null),
            "0" => Some(FillPolicy::ValueZero),
            _ => None,
        }
    }
}

impl fmt::Display for FillPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FillPolicy::Null => "null",
            FillPolicy::Previous => "previous",
            FillPolicy::ValueZero => "value(0)",
        };
        f.write_str(name)
    }
}

/// A single cell as produced by the database driver
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Bool(bool),
    Time(DateTime<Utc>),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Semantic type a column takes when this is its first non-null value
    pub fn natural_type(&self) -> SemanticType {
        match self {
            RawValue::Null => SemanticType::Unknown,
            RawValue::Int(_) => SemanticType::Integer,
            RawValue::Float(_) => SemanticType::Float,
            RawValue::Text(_) | RawValue::Bytes(_) => SemanticType::String,
            RawValue::Bool(_) => SemanticType::Boolean,
            RawValue::Time(_) => SemanticType::Time,
        }
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Int(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Float(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(v: Vec<u8>) -> Self {
        RawValue::Bytes(v)
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        RawValue::Bool(v)
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(v: DateTime<Utc>) -> Self {
        RawValue::Time(v)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(RawValue::Null, Into::into)
    }
}

/// Column header reported by the driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Storage type name as reported by the driver, e.g. `VARCHAR(64)`
    pub type_name: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Declared output shape of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResultFormat {
    #[serde(rename = "table")]
    Table,
    #[default]
    #[serde(rename = "time series", alias = "time_series")]
    TimeSeries,
}

impl ResultFormat {
    /// Parse a declared format, defaulting to time series
    ///
    /// Empty and unrecognized values are logged and treated as time series.
    pub fn from_declared(declared: &str) -> Self {
        match declared.parse() {
            Ok(format) => format,
            Err(()) => {
                if declared.trim().is_empty() {
                    warn!("Format is empty, defaulting to time series");
                } else {
                    warn!(format = declared, "Unrecognized format, defaulting to time series");
                }
                ResultFormat::TimeSeries
            }
        }
    }
}

impl FromStr for ResultFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "table" => Ok(ResultFormat::Table),
            "time series" | "time_series" => Ok(ResultFormat::TimeSeries),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ResultFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultFormat::Table => f.write_str("table"),
            ResultFormat::TimeSeries => f.write_str("time series"),
        }
    }
}
