//! Frame shaping
//!
//! Decides whether a materialized frame is returned as-is or pivoted from
//! long to wide form.
//!
//! # Examples
//!
//! A long frame with one factor column:
//!
//! ```text
//! time  host  cpu          time  cpu{host=a}  cpu{host=b}
//! t1    a     1.0    →     t1    1.0          2.0
//! t1    b     2.0          t2    3.0          null
//! t2    a     3.0
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use crate::frame::data::{Column, ColumnValues, Frame};
use crate::frame::error::{FrameError, FrameResult};
use crate::frame::types::{ResultFormat, SemanticType};

/// Time series classification of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// No time column or no value columns
    Not,
    /// One time column and value columns only
    Wide,
    /// Time, value and string factor columns
    Long,
}

/// Column roles of a frame viewed as time series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesSchema {
    pub kind: SeriesKind,
    pub time_index: Option<usize>,
    pub factor_indices: Vec<usize>,
    pub value_indices: Vec<usize>,
}

impl TimeSeriesSchema {
    /// Classify the columns of a frame
    ///
    /// The first TIME column is the time index, STRING columns are factors,
    /// everything else is a value.
    pub fn infer(frame: &Frame) -> Self {
        let time_index = frame
            .columns
            .iter()
            .position(|c| c.semantic_type() == SemanticType::Time);

        let mut factor_indices = Vec::new();
        let mut value_indices = Vec::new();

        for (idx, column) in frame.columns.iter().enumerate() {
            if Some(idx) == time_index {
                continue;
            }
            if column.semantic_type() == SemanticType::String {
                factor_indices.push(idx);
            } else {
                value_indices.push(idx);
            }
        }

        let kind = if time_index.is_none() || value_indices.is_empty() {
            SeriesKind::Not
        } else if factor_indices.is_empty() {
            SeriesKind::Wide
        } else {
            SeriesKind::Long
        };

        Self {
            kind,
            time_index,
            factor_indices,
            value_indices,
        }
    }
}

/// Shape a frame for its declared format
pub fn shape(frame: Frame, format: ResultFormat) -> FrameResult<Frame> {
    if format == ResultFormat::Table {
        return Ok(frame);
    }

    let schema = TimeSeriesSchema::infer(&frame);
    debug!(kind = ?schema.kind, rows = frame.row_count(), "Shaping frame");

    match schema.kind {
        SeriesKind::Not | SeriesKind::Wide => Ok(frame),
        SeriesKind::Long if frame.row_count() == 0 => Ok(frame.emptied()),
        SeriesKind::Long => long_to_wide(&frame, &schema),
    }
}

/// Pivot a long frame into one column per (series, value column)
pub fn long_to_wide(frame: &Frame, schema: &TimeSeriesSchema) -> FrameResult<Frame> {
    let time_index = schema
        .time_index
        .ok_or_else(|| FrameError::Reshape("frame has no time column".to_string()))?;
    let time_column = &frame.columns[time_index];
    let times = match &time_column.values {
        ColumnValues::Time(values) => values,
        other => {
            return Err(FrameError::Reshape(format!(
                "time column '{}' has type {}",
                time_column.name,
                other.semantic_type()
            )))
        }
    };

    let mut wide_times = Vec::new();
    let mut series_keys: Vec<Vec<Option<String>>> = Vec::new();
    let mut series_lookup: HashMap<Vec<Option<String>>, usize> = HashMap::new();
    // Per series: (wide row, long row)
    let mut placements: Vec<Vec<(usize, usize)>> = Vec::new();
    let mut seen = HashSet::new();

    for (row, &time) in times.iter().enumerate() {
        let time = time.ok_or_else(|| {
            FrameError::Reshape(format!("null value in time column at row {}", row))
        })?;

        match wide_times.last() {
            Some(last) if time < *last => {
                return Err(FrameError::Reshape(format!(
                    "time column is not sorted ascending at row {}",
                    row
                )))
            }
            Some(last) if time == *last => {}
            _ => wide_times.push(time),
        }
        let wide_row = wide_times.len() - 1;

        let key = factor_key(frame, &schema.factor_indices, row);
        let series = match series_lookup.get(&key) {
            Some(&series) => series,
            None => {
                let series = series_keys.len();
                series_lookup.insert(key.clone(), series);
                series_keys.push(key);
                placements.push(Vec::new());
                series
            }
        };

        if !seen.insert((wide_row, series)) {
            return Err(FrameError::Reshape(format!(
                "duplicate entry for series {} at row {}",
                series_keys[series]
                    .iter()
                    .map(|v| v.as_deref().unwrap_or(""))
                    .collect::<Vec<_>>()
                    .join(","),
                row
            )));
        }
        placements[series].push((wide_row, row));
    }

    let mut columns = Vec::with_capacity(1 + series_keys.len() * schema.value_indices.len());
    columns.push(Column::new(
        time_column.name.clone(),
        ColumnValues::Time(wide_times.iter().copied().map(Some).collect()),
    ));

    for (key, rows) in series_keys.iter().zip(&placements) {
        let labels: BTreeMap<String, String> = schema
            .factor_indices
            .iter()
            .zip(key)
            .map(|(&idx, value)| {
                (
                    frame.columns[idx].name.clone(),
                    value.clone().unwrap_or_default(),
                )
            })
            .collect();

        for &value_index in &schema.value_indices {
            let source = &frame.columns[value_index];
            let mut values = source.values.nulls_like(wide_times.len());
            for &(wide_row, long_row) in rows {
                values.set_from(wide_row, &source.values, long_row);
            }
            columns.push(Column::new(source.name.clone(), values).with_labels(labels.clone()));
        }
    }

    debug!(
        series = series_keys.len(),
        rows = wide_times.len(),
        "Converted long frame to wide"
    );

    Ok(Frame {
        name: frame.name.clone(),
        columns,
        meta: frame.meta.clone(),
    })
}

fn factor_key(frame: &Frame, factor_indices: &[usize], row: usize) -> Vec<Option<String>> {
    factor_indices
        .iter()
        .map(|&idx| match &frame.columns[idx].values {
            ColumnValues::String(values) => values[row].clone(),
            other => Some(other.display(row)),
        })
        .collect()
}
