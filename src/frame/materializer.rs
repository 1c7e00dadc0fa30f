//! Row materializer
//!
//! Turns driver rows into typed, nullable column vectors. Each column has a
//! semantic type resolved up front from its header; columns whose type could
//! not be resolved take the type of their first non-null value.
//!
//! # Fill policy
//!
//! Nulls and values that cannot be converted to the column's type are filled
//! according to the query's `FillPolicy`:
//!
//! ```text
//!             NULL    PREVIOUS                VALUE-ZERO
//! TIME        null    last non-null or null   null
//! INTEGER     null    last non-null or null   0
//! FLOAT       null    last non-null or null   0.0
//! STRING      null    last non-null or null   ""
//! BOOLEAN     null    null                    null
//! ```

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::frame::data::{Column, ColumnValues};
use crate::frame::error::{FrameError, FrameResult, RowScanError};
use crate::frame::resolver::{check_upgraded, resolve};
use crate::frame::types::{ColumnDescriptor, FillPolicy, RawValue, SemanticType};
use crate::time::format_rfc3339_nano;

/// Builds typed columns from a stream of raw rows
#[derive(Debug)]
pub struct RowMaterializer {
    names: Vec<String>,
    builders: Vec<Builder>,
    fill: FillPolicy,
    rows: usize,
}

impl RowMaterializer {
    /// Resolve the column types and prepare empty columns
    ///
    /// Fails if a column header violates a type rule (e.g. a numeric `metric`).
    pub fn new(
        columns: &[ColumnDescriptor],
        time_grouped: bool,
        fill: FillPolicy,
    ) -> FrameResult<Self> {
        let mut names = Vec::with_capacity(columns.len());
        let mut builders = Vec::with_capacity(columns.len());

        for descriptor in columns {
            let semantic = resolve(&descriptor.name, &descriptor.type_name, time_grouped)?;
            names.push(descriptor.name.clone());
            builders.push(Builder::new(semantic));
        }

        Ok(Self {
            names,
            builders,
            fill,
            rows: 0,
        })
    }

    /// Append one row, one value per column
    ///
    /// Fails on a width mismatch, or when a `metric` column with no declared
    /// type receives a numeric or temporal first value.
    pub fn push_row(&mut self, row: Vec<RawValue>) -> FrameResult<()> {
        if row.len() != self.builders.len() {
            return Err(FrameError::RowWidth {
                row: self.rows,
                expected: self.builders.len(),
                actual: row.len(),
            });
        }

        for ((builder, name), value) in self.builders.iter_mut().zip(&self.names).zip(row) {
            builder.push(name, value, self.fill)?;
        }

        self.rows += 1;
        Ok(())
    }

    /// Drain a row cursor, stopping at the first scan failure
    pub fn consume<I>(&mut self, rows: I) -> FrameResult<()>
    where
        I: IntoIterator<Item = Result<Vec<RawValue>, RowScanError>>,
    {
        for row in rows {
            let row = row.map_err(|source| FrameError::RowScan {
                row: self.rows,
                source,
            })?;
            self.push_row(row)?;
        }
        Ok(())
    }

    /// Rows appended so far
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Finalize into columns, in header order
    pub fn finish(self) -> Vec<Column> {
        self.names
            .into_iter()
            .zip(self.builders)
            .map(|(name, builder)| Column::new(name, builder.finish()))
            .collect()
    }
}

/// Materialize a complete result set into columns
pub fn materialize<I>(
    columns: &[ColumnDescriptor],
    rows: I,
    time_grouped: bool,
    fill: FillPolicy,
) -> FrameResult<Vec<Column>>
where
    I: IntoIterator<Item = Result<Vec<RawValue>, RowScanError>>,
{
    let mut materializer = RowMaterializer::new(columns, time_grouped, fill)?;
    materializer.consume(rows)?;
    Ok(materializer.finish())
}

/// Values of one column plus the last non-null value seen
#[derive(Debug)]
struct Typed<T> {
    values: Vec<Option<T>>,
    last: Option<T>,
}

impl<T: Clone> Typed<T> {
    fn with_leading_nulls(count: usize) -> Self {
        let mut values = Vec::with_capacity(count);
        values.resize_with(count, || None);
        Self { values, last: None }
    }

    fn push(&mut self, value: T) {
        self.last = Some(value.clone());
        self.values.push(Some(value));
    }

    fn push_missing(&mut self, fill: FillPolicy, zero: Option<T>) {
        let value = match fill {
            FillPolicy::Null => None,
            FillPolicy::Previous => self.last.clone(),
            FillPolicy::ValueZero => zero,
        };
        self.values.push(value);
    }

    fn append(
        &mut self,
        column: &str,
        target: SemanticType,
        value: RawValue,
        fill: FillPolicy,
        zero: Option<T>,
        coerce: impl FnOnce(&RawValue) -> Option<T>,
    ) {
        if value.is_null() {
            return self.push_missing(fill, zero);
        }

        match coerce(&value) {
            Some(converted) => self.push(converted),
            None => {
                warn_coercion(column, target, &value);
                self.push_missing(fill, zero);
            }
        }
    }
}

#[derive(Debug)]
enum Builder {
    Unknown { pending_nulls: usize },
    Time(Typed<DateTime<Utc>>),
    Integer(Typed<i64>),
    Float(Typed<f64>),
    String(Typed<String>),
    Boolean(Vec<Option<bool>>),
}

impl Builder {
    fn new(semantic: SemanticType) -> Self {
        Self::with_leading_nulls(semantic, 0)
    }

    fn with_leading_nulls(semantic: SemanticType, count: usize) -> Self {
        match semantic {
            SemanticType::Unknown => Builder::Unknown {
                pending_nulls: count,
            },
            SemanticType::Time => Builder::Time(Typed::with_leading_nulls(count)),
            SemanticType::Integer => Builder::Integer(Typed::with_leading_nulls(count)),
            SemanticType::Float => Builder::Float(Typed::with_leading_nulls(count)),
            SemanticType::String => Builder::String(Typed::with_leading_nulls(count)),
            SemanticType::Boolean => Builder::Boolean(vec![None; count]),
        }
    }

    fn push(&mut self, column: &str, value: RawValue, fill: FillPolicy) -> FrameResult<()> {
        match self {
            Builder::Unknown { pending_nulls } => {
                if value.is_null() {
                    *pending_nulls += 1;
                    return Ok(());
                }
                let upgraded = value.natural_type();
                check_upgraded(column, upgraded)?;
                let leading = *pending_nulls;
                *self = Builder::with_leading_nulls(upgraded, leading);
                return self.push(column, value, fill);
            }
            Builder::Time(col) => {
                col.append(column, SemanticType::Time, value, fill, None, to_time)
            }
            Builder::Integer(col) => {
                col.append(column, SemanticType::Integer, value, fill, Some(0), to_integer)
            }
            Builder::Float(col) => {
                col.append(column, SemanticType::Float, value, fill, Some(0.0), to_float)
            }
            Builder::String(col) => col.append(
                column,
                SemanticType::String,
                value,
                fill,
                Some(String::new()),
                to_text,
            ),
            Builder::Boolean(values) => {
                let converted = to_bool(&value);
                if converted.is_none() && !value.is_null() {
                    warn_coercion(column, SemanticType::Boolean, &value);
                }
                values.push(converted);
            }
        }
        Ok(())
    }

    fn finish(self) -> ColumnValues {
        match self {
            Builder::Unknown { pending_nulls } => ColumnValues::String(vec![None; pending_nulls]),
            Builder::Time(col) => ColumnValues::Time(col.values),
            Builder::Integer(col) => ColumnValues::Integer(col.values),
            Builder::Float(col) => ColumnValues::Float(col.values),
            Builder::String(col) => ColumnValues::String(col.values),
            Builder::Boolean(values) => ColumnValues::Boolean(values),
        }
    }
}

fn warn_coercion(column: &str, target: SemanticType, value: &RawValue) {
    warn!(
        column,
        target = %target,
        value = ?value,
        "Could not convert value, applying fill policy"
    );
}

fn text_of(value: &RawValue) -> Option<&str> {
    match value {
        RawValue::Text(s) => Some(s.trim()),
        RawValue::Bytes(b) => std::str::from_utf8(b).ok().map(str::trim),
        _ => None,
    }
}

fn float_to_i64(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

fn to_time(value: &RawValue) -> Option<DateTime<Utc>> {
    match value {
        RawValue::Time(t) => Some(*t),
        RawValue::Int(secs) => DateTime::from_timestamp(*secs, 0),
        RawValue::Float(f) => float_to_i64(*f).and_then(|secs| DateTime::from_timestamp(secs, 0)),
        RawValue::Text(_) | RawValue::Bytes(_) => {
            let text = text_of(value)?;
            match DateTime::parse_from_rfc3339(text) {
                Ok(dt) => Some(dt.with_timezone(&Utc)),
                Err(_) => text
                    .parse::<i64>()
                    .ok()
                    .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            }
        }
        RawValue::Bool(_) | RawValue::Null => None,
    }
}

fn to_integer(value: &RawValue) -> Option<i64> {
    match value {
        RawValue::Int(i) => Some(*i),
        RawValue::Float(f) => float_to_i64(*f),
        RawValue::Text(_) | RawValue::Bytes(_) => text_of(value)?.parse().ok(),
        RawValue::Bool(b) => Some(i64::from(*b)),
        RawValue::Time(_) | RawValue::Null => None,
    }
}

fn to_float(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Float(f) => Some(*f),
        RawValue::Int(i) => Some(*i as f64),
        RawValue::Text(_) | RawValue::Bytes(_) => text_of(value)?.parse().ok(),
        RawValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        RawValue::Time(_) | RawValue::Null => None,
    }
}

fn to_bool(value: &RawValue) -> Option<bool> {
    match value {
        RawValue::Bool(b) => Some(*b),
        RawValue::Int(i) => parse_bool(&i.to_string()),
        RawValue::Float(f) => parse_bool(&f.to_string()),
        RawValue::Text(_) | RawValue::Bytes(_) => parse_bool(text_of(value)?),
        RawValue::Time(_) | RawValue::Null => None,
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn to_text(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Text(s) => Some(s.clone()),
        RawValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
        RawValue::Int(i) => Some(i.to_string()),
        RawValue::Float(f) => Some(f.to_string()),
        RawValue::Bool(b) => Some(b.to_string()),
        RawValue::Time(t) => Some(format_rfc3339_nano(t)),
        RawValue::Null => None,
    }
}
