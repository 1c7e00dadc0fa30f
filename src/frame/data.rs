//! Result frame data structures
//!
//! A `Frame` is a named, ordered list of typed, nullable columns plus the
//! SQL that produced it. Every column of a frame has the same length.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::frame::types::SemanticType;
use crate::time::format_rfc3339_nano;

/// Typed, nullable values of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum ColumnValues {
    Time(Vec<Option<DateTime<Utc>>>),
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    String(Vec<Option<String>>),
    Boolean(Vec<Option<bool>>),
}

impl ColumnValues {
    /// Number of entries
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Time(v) => v.len(),
            ColumnValues::Integer(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::String(v) => v.len(),
            ColumnValues::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn semantic_type(&self) -> SemanticType {
        match self {
            ColumnValues::Time(_) => SemanticType::Time,
            ColumnValues::Integer(_) => SemanticType::Integer,
            ColumnValues::Float(_) => SemanticType::Float,
            ColumnValues::String(_) => SemanticType::String,
            ColumnValues::Boolean(_) => SemanticType::Boolean,
        }
    }

    /// Whether the entry at `idx` is null; out-of-range entries count as null
    pub fn is_null(&self, idx: usize) -> bool {
        match self {
            ColumnValues::Time(v) => v.get(idx).map_or(true, Option::is_none),
            ColumnValues::Integer(v) => v.get(idx).map_or(true, Option::is_none),
            ColumnValues::Float(v) => v.get(idx).map_or(true, Option::is_none),
            ColumnValues::String(v) => v.get(idx).map_or(true, Option::is_none),
            ColumnValues::Boolean(v) => v.get(idx).map_or(true, Option::is_none),
        }
    }

    /// `len` nulls of the same type
    pub fn nulls_like(&self, len: usize) -> Self {
        match self {
            ColumnValues::Time(_) => ColumnValues::Time(vec![None; len]),
            ColumnValues::Integer(_) => ColumnValues::Integer(vec![None; len]),
            ColumnValues::Float(_) => ColumnValues::Float(vec![None; len]),
            ColumnValues::String(_) => ColumnValues::String(vec![None; len]),
            ColumnValues::Boolean(_) => ColumnValues::Boolean(vec![None; len]),
        }
    }

    /// Copy the entry at `src_idx` of `src` into slot `dst_idx`
    ///
    /// Mismatched types or an index outside either column leave the slot
    /// untouched.
    pub fn set_from(&mut self, dst_idx: usize, src: &ColumnValues, src_idx: usize) {
        fn copy<T: Clone>(dst: &mut [Option<T>], dst_idx: usize, src: &[Option<T>], src_idx: usize) {
            if let (Some(slot), Some(value)) = (dst.get_mut(dst_idx), src.get(src_idx)) {
                *slot = value.clone();
            }
        }

        match (self, src) {
            (ColumnValues::Time(d), ColumnValues::Time(s)) => copy(d, dst_idx, s, src_idx),
            (ColumnValues::Integer(d), ColumnValues::Integer(s)) => copy(d, dst_idx, s, src_idx),
            (ColumnValues::Float(d), ColumnValues::Float(s)) => copy(d, dst_idx, s, src_idx),
            (ColumnValues::String(d), ColumnValues::String(s)) => copy(d, dst_idx, s, src_idx),
            (ColumnValues::Boolean(d), ColumnValues::Boolean(s)) => copy(d, dst_idx, s, src_idx),
            _ => {}
        }
    }

    /// Render the entry at `idx` for display; nulls and out-of-range entries
    /// render as `null`
    pub fn display(&self, idx: usize) -> String {
        let rendered = match self {
            ColumnValues::Time(v) => v.get(idx).copied().flatten().as_ref().map(format_rfc3339_nano),
            ColumnValues::Integer(v) => v.get(idx).copied().flatten().map(|x| x.to_string()),
            ColumnValues::Float(v) => v.get(idx).copied().flatten().map(|x| x.to_string()),
            ColumnValues::String(v) => v.get(idx).cloned().flatten(),
            ColumnValues::Boolean(v) => v.get(idx).copied().flatten().map(|x| x.to_string()),
        };
        rendered.unwrap_or_else(|| "null".to_string())
    }
}

/// One output field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Series labels, set when a long frame is pivoted to wide
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub values: ColumnValues,
}

impl Column {
    pub fn new(name: impl Into<String>, values: ColumnValues) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
            values,
        }
    }

    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn semantic_type(&self) -> SemanticType {
        self.values.semantic_type()
    }
}

/// Frame metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMeta {
    /// SQL actually sent to the database
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_query_string: Option<String>,
}

/// A named, ordered collection of columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub meta: FrameMeta,
}

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            meta: FrameMeta::default(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_executed_query(mut self, sql: impl Into<String>) -> Self {
        self.meta.executed_query_string = Some(sql.into());
        self
    }

    /// Number of rows, taken from the first column
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    /// Column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Same name and metadata, no columns
    pub fn emptied(&self) -> Self {
        Self {
            name: self.name.clone(),
            columns: Vec::new(),
            meta: self.meta.clone(),
        }
    }
}
