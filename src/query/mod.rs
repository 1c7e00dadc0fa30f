//! Query Execution
//!
//! Ties macro expansion, database execution and frame building together:
//!
//! - **Model**: request/response types and the JSON query model
//! - **Executor**: the database seam, with a SQLite implementation
//! - **Runner**: per-query and per-batch orchestration
//!
//! # Examples
//!
//! ```rust,ignore
//! use sqlframe::config::QueryConfig;
//! use sqlframe::frame::ResultFormat;
//! use sqlframe::query::{QueryModel, QueryRunner, SqliteExecutor};
//!
//! let executor = SqliteExecutor::open("metrics.db")?;
//! let runner = QueryRunner::new(executor, QueryConfig::default());
//!
//! let model = QueryModel::new(
//!     "A",
//!     "SELECT ts AS time, host, cpu FROM samples WHERE $__timeFilter(ts)",
//!     ResultFormat::TimeSeries,
//! );
//! let frame = runner.run_query(&model, &window).await?;
//! ```

mod error;
mod executor;
mod model;
mod runner;

pub use error::{QueryError, QueryResult};
pub use executor::{QueryExecutor, ResultSet, RowCursor, SqliteExecutor};
pub use model::{DataQuery, DataResponse, QueryDataRequest, QueryDataResponse, QueryModel};
pub use runner::QueryRunner;
