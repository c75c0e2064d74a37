//! Async client for Presto coordinators speaking the HTTP statement
//! protocol.
//!
//! A statement is POSTed to `/v1/statement`; the coordinator answers with
//! pages of results, each naming the URI of the next page, until a page
//! without one ends the query. This crate drives that loop and layers on
//! typed value conversion, session tracking, retry and authentication.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use presto_link::PrestoLinkClient;
//!
//! # async fn run() -> presto_link::Result<()> {
//! let client = PrestoLinkClient::builder("localhost", "alice")
//!     .catalog("hive")
//!     .schema("default")
//!     .build()?;
//!
//! let mut query = client.submit("SELECT nationkey, name FROM nation").await?;
//! while let Some(page) = query.advance().await? {
//!     for row in page.rows {
//!         println!("{:?}", row);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! For a DBAPI-flavored surface with buffered fetches and transactions,
//! wrap the client in a [`Connection`] and use [`Cursor`].

pub mod auth;
pub mod client;
pub mod cursor;
pub mod decode;
pub mod error;
pub mod escape;
pub mod headers;
pub mod models;
pub mod query;
pub mod retry;
pub mod session;
pub mod timeouts;
pub mod transaction;
pub mod transport;
pub mod typing;
pub mod value;

pub use auth::{AuthProvider, ContextNegotiator, SecurityContext, TokenSource};
pub use client::{HttpScheme, PrestoLinkClient, PrestoLinkClientBuilder};
pub use cursor::{Connection, Cursor};
pub use decode::PageDecoder;
pub use error::{PrestoLinkError, Result};
pub use escape::Param;
pub use models::{Column, PrestoWarning, QueryError, QueryResults, StatementStats};
pub use query::{Page, Query, QueryOptions, QueryState};
pub use retry::RetryPolicy;
pub use session::{ClientSession, SessionUpdates};
pub use timeouts::Timeouts;
pub use transaction::IsolationLevel;
pub use transport::{HttpTransport, RedirectPolicy, Transport, TransportResponse};
pub use typing::PrestoType;
pub use value::Value;
