//! Wire structures for the coordinator's statement API.
//!
//! These mirror the JSON bodies the coordinator returns for statement
//! submission and page polling. Field names on the wire are camelCase.

pub mod column;
pub mod error_detail;
pub mod query_results;
pub mod stats;
pub mod warning;

pub use column::{ClientTypeSignature, Column};
pub use error_detail::{ErrorLocation, FailureInfo, QueryError};
pub use query_results::QueryResults;
pub use stats::StatementStats;
pub use warning::{PrestoWarning, WarningCode};
