//! Query Runner
//!
//! Runs a batch of queries end to end:
//!
//! ```text
//! JSON model → expand macros → execute (with deadline) → materialize → shape
//! ```
//!
//! Every query produces exactly one `DataResponse`; a failing query records
//! its error and the remaining queries still run.

use std::time::Duration;
use tracing::{debug, debug_span, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::QueryConfig;
use crate::frame::{shape, Frame, RowMaterializer};
use crate::macros::expand;
use crate::query::error::{QueryError, QueryResult};
use crate::query::executor::QueryExecutor;
use crate::query::model::{DataQuery, DataResponse, QueryDataRequest, QueryDataResponse, QueryModel};
use crate::time::TimeWindow;

/// Expands, executes and materializes queries against one executor
pub struct QueryRunner<E> {
    executor: E,
    config: QueryConfig,
}

impl<E: QueryExecutor> QueryRunner<E> {
    pub fn new(executor: E, config: QueryConfig) -> Self {
        Self { executor, config }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run every query of a request
    pub async fn query_data(&self, request: QueryDataRequest) -> QueryDataResponse {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("query_data", request_id = %request_id, queries = request.queries.len());

        async move {
            let mut response = QueryDataResponse::default();

            for query in request.queries {
                let ref_id = query.ref_id.clone();
                let result = self
                    .run_data_query(&query)
                    .instrument(debug_span!("query", ref_id = %ref_id))
                    .await;

                if let Err(ref e) = result {
                    error!(ref_id = %ref_id, error = %e, "Query failed");
                }
                response.responses.insert(ref_id, DataResponse::from(result));
            }

            info!(
                responses = response.responses.len(),
                errors = response.error_count(),
                "Finished query batch"
            );
            response
        }
        .instrument(span)
        .await
    }

    /// Decode and run one query of a batch
    pub async fn run_data_query(&self, query: &DataQuery) -> QueryResult<Frame> {
        let model = QueryModel::from_json(&query.json)?;
        self.run_query(&model, &query.window).await
    }

    /// Run a decoded query model over a time window
    pub async fn run_query(&self, model: &QueryModel, window: &TimeWindow) -> QueryResult<Frame> {
        let format = if model.format.trim().is_empty() {
            let format = self.config.default_result_format();
            warn!(ref_id = %model.ref_id, "Format is empty, defaulting to {}", format);
            format
        } else {
            model.result_format()
        };

        let expansion = expand(&model.raw_sql, window)?;
        debug!(sql = %expansion.sql, "Executing query");

        let deadline = Duration::from_secs(self.config.timeout_secs);
        let result = tokio::time::timeout(deadline, self.executor.execute(&expansion.sql))
            .await
            .map_err(|_| QueryError::Timeout(deadline))??;

        let mut materializer = RowMaterializer::new(
            &result.columns,
            expansion.time_grouped,
            expansion.fill_policy.unwrap_or_default(),
        )?;
        materializer.consume(result.rows)?;
        debug!(rows = materializer.row_count(), "Materialized rows");

        let frame = Frame::new(self.config.frame_name.clone())
            .with_columns(materializer.finish())
            .with_executed_query(expansion.sql);

        Ok(shape(frame, format)?)
    }
}
