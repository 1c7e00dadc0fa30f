//! # sqlframe
//!
//! Time-window macro expansion for raw SQL and typed result frames.
//!
//! ## Features
//!
//! - **Macro expansion**: `$__timeFilter`, `$__timeGroup` and friends are
//!   rewritten against the query's time window
//! - **Typed columns**: driver rows become null-aware, typed column vectors
//! - **Fill policies**: nulls can be kept, carried forward or zero-filled
//! - **Shaping**: long time series are pivoted into one column per series
//!
//! ## Modules
//!
//! - [`macros`]: Directive tokenizer, catalog and expander
//! - [`frame`]: Type resolution, row materializer and frame shaper
//! - [`query`]: Executor seam, SQLite executor and batch runner
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sqlframe::config::QueryConfig;
//! use sqlframe::frame::ResultFormat;
//! use sqlframe::query::{QueryModel, QueryRunner, SqliteExecutor};
//! use sqlframe::time::TimeWindow;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = SqliteExecutor::open("metrics.db")?;
//!     let runner = QueryRunner::new(executor, QueryConfig::default());
//!
//!     let model = QueryModel::new(
//!         "A",
//!         "SELECT ts AS time, host, cpu FROM samples WHERE $__timeFilter(ts) ORDER BY ts",
//!         ResultFormat::TimeSeries,
//!     );
//!     let window = TimeWindow::last(chrono::Duration::hours(6));
//!
//!     let frame = runner.run_query(&model, &window).await?;
//!     println!("{} columns, {} rows", frame.columns.len(), frame.row_count());
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod frame;
pub mod macros;
pub mod query;
pub mod time;

// Re-export top-level types for convenience
pub use config::{Config, ConfigError, LoggingConfig, QueryConfig, SqliteConfig};

pub use frame::{
    Column, ColumnDescriptor, ColumnValues, FillPolicy, Frame, FrameError, RawValue,
    ResultFormat, SemanticType,
};

pub use macros::{expand, Expansion, MacroError};

pub use query::{
    QueryDataRequest, QueryDataResponse, QueryError, QueryExecutor, QueryModel, QueryRunner,
    SqliteExecutor,
};

pub use time::TimeWindow;
