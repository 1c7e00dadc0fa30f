//! Typed result frames
//!
//! Converts driver result sets into named frames of typed, nullable columns:
//!
//! ```text
//! ColumnDescriptor[] + rows → resolve types → RowMaterializer → Frame → shape
//! ```

mod data;
mod error;
mod materializer;
mod resolver;
mod shaper;
mod types;

pub use data::{Column, ColumnValues, Frame, FrameMeta};
pub use error::{FrameError, FrameResult, RowScanError};
pub use materializer::{materialize, RowMaterializer};
pub use resolver::resolve;
pub use shaper::{long_to_wide, shape, SeriesKind, TimeSeriesSchema};
pub use types::{ColumnDescriptor, FillPolicy, RawValue, ResultFormat, SemanticType};
