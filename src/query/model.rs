//! Request and response types
//!
//! A request carries a batch of queries, each with its own reference id,
//! time window and JSON model. The response maps every reference id to the
//! frames or the error that query produced.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::frame::{Frame, ResultFormat};
use crate::query::error::{QueryError, QueryResult};
use crate::time::TimeWindow;

/// User-authored query as sent by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryModel {
    #[serde(default)]
    pub ref_id: String,
    /// SQL containing `$__` directives
    #[serde(default)]
    pub raw_sql: String,
    /// `table` or `time series`
    #[serde(default)]
    pub format: String,
}

impl QueryModel {
    pub fn new(ref_id: impl Into<String>, raw_sql: impl Into<String>, format: ResultFormat) -> Self {
        Self {
            ref_id: ref_id.into(),
            raw_sql: raw_sql.into(),
            format: format.to_string(),
        }
    }

    /// Decode a model from its JSON form
    pub fn from_json(json: &serde_json::Value) -> QueryResult<Self> {
        Ok(serde_json::from_value(json.clone())?)
    }

    /// Declared format, defaulting to time series
    pub fn result_format(&self) -> ResultFormat {
        ResultFormat::from_declared(&self.format)
    }
}

/// One query of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    pub ref_id: String,
    pub window: TimeWindow,
    /// Raw query model, decoded when the query runs
    pub json: serde_json::Value,
}

impl DataQuery {
    pub fn new(ref_id: impl Into<String>, window: TimeWindow, json: serde_json::Value) -> Self {
        Self {
            ref_id: ref_id.into(),
            window,
            json,
        }
    }

    /// Build a query from an already decoded model
    pub fn from_model(model: &QueryModel, window: TimeWindow) -> QueryResult<Self> {
        Ok(Self {
            ref_id: model.ref_id.clone(),
            window,
            json: serde_json::to_value(model)?,
        })
    }
}

/// A batch of queries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDataRequest {
    pub queries: Vec<DataQuery>,
}

/// Outcome of one query
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataResponse {
    pub frames: Vec<Frame>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub error: Option<QueryError>,
}

impl DataResponse {
    pub fn from_frame(frame: Frame) -> Self {
        Self {
            frames: vec![frame],
            error: None,
        }
    }

    pub fn from_error(error: QueryError) -> Self {
        Self {
            frames: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<QueryResult<Frame>> for DataResponse {
    fn from(result: QueryResult<Frame>) -> Self {
        match result {
            Ok(frame) => DataResponse::from_frame(frame),
            Err(error) => DataResponse::from_error(error),
        }
    }
}

/// Responses of a batch, keyed by reference id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryDataResponse {
    pub responses: BTreeMap<String, DataResponse>,
}

impl QueryDataResponse {
    pub fn get(&self, ref_id: &str) -> Option<&DataResponse> {
        self.responses.get(ref_id)
    }

    pub fn error_count(&self) -> usize {
        self.responses.values().filter(|r| r.is_error()).count()
    }
}

fn serialize_error<S: Serializer>(error: &Option<QueryError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_str(&error.to_string()),
        None => serializer.serialize_none(),
    }
}
