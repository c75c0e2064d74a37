//! Protocol constants for the coordinator's HTTP statement API.
//!
//! Header names follow the `X-Presto-` convention: the client advertises
//! session state on every request, and the coordinator replies with
//! `Set-`/`Clear-` headers that must be folded into the next request.

/// Path on the coordinator that accepts statement submissions.
pub const STATEMENT_PATH: &str = "/v1/statement";

/// Default coordinator port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default value for the `X-Presto-Source` header.
pub const DEFAULT_SOURCE: &str = "presto-link";

pub const HEADER_PREFIX: &str = "X-Presto-";

// Request headers generated from the session snapshot.
pub const HEADER_USER: &str = "X-Presto-User";
pub const HEADER_SOURCE: &str = "X-Presto-Source";
pub const HEADER_CATALOG: &str = "X-Presto-Catalog";
pub const HEADER_SCHEMA: &str = "X-Presto-Schema";
pub const HEADER_TIME_ZONE: &str = "X-Presto-Time-Zone";
pub const HEADER_LANGUAGE: &str = "X-Presto-Language";
pub const HEADER_SESSION: &str = "X-Presto-Session";
pub const HEADER_TRANSACTION: &str = "X-Presto-Transaction-Id";
pub const HEADER_PREPARED_STATEMENT: &str = "X-Presto-Prepared-Statement";

// Response headers carrying session deltas.
pub const HEADER_SET_SESSION: &str = "X-Presto-Set-Session";
pub const HEADER_CLEAR_SESSION: &str = "X-Presto-Clear-Session";
pub const HEADER_SET_CATALOG: &str = "X-Presto-Set-Catalog";
pub const HEADER_SET_SCHEMA: &str = "X-Presto-Set-Schema";
pub const HEADER_STARTED_TRANSACTION: &str = "X-Presto-Started-Transaction-Id";
pub const HEADER_CLEAR_TRANSACTION: &str = "X-Presto-Clear-Transaction-Id";
pub const HEADER_ADDED_PREPARE: &str = "X-Presto-Added-Prepare";
pub const HEADER_DEALLOCATED_PREPARE: &str = "X-Presto-Deallocated-Prepare";

/// Sentinel transaction id meaning "no transaction".
pub const NO_TRANSACTION: &str = "NONE";
