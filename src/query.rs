//! Query lifecycle state machine.
//!
//! One [`Query`] owns one statement's protocol state: the current "next
//! page" URI, the evolving session snapshot, the captured schema and the
//! accumulated statistics. It is driven by repeated [`Query::advance`]
//! calls until it reaches a terminal state, after which it never touches
//! the network again.

use crate::decode::PageDecoder;
use crate::error::{PrestoLinkError, Result};
use crate::models::{Column, PrestoWarning, QueryResults, StatementStats};
use crate::retry::RetryPolicy;
use crate::session::{ClientSession, SessionUpdates};
use crate::transport::{Transport, TransportResponse};
use crate::value::Value;
use log::{debug, warn};
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::sync::Arc;

/// Lifecycle states. `Finished`, `Failed` and `Cancelled` are terminal and
/// never regress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Submitting,
    Queued,
    Running,
    Finished,
    Failed,
    Cancelled,
}

impl QueryState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            QueryState::Finished | QueryState::Failed | QueryState::Cancelled
        )
    }
}

/// One decoded page delivered to the caller. May carry zero rows; an empty
/// page simply means "poll again".
#[derive(Debug, Clone)]
pub struct Page {
    pub rows: Vec<Vec<Value>>,
    pub stats: StatementStats,
    pub warnings: Vec<PrestoWarning>,
}

/// Per-query behavior knobs.
///
/// `server_retry` bounds retries of pages whose error descriptor the server
/// flags as retryable. This counter is deliberately separate from the
/// transport's own network-level retry budget; conflating the two risks
/// unbounded retry loops.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Typed conversion (true) versus raw JSON passthrough (false).
    pub strict_types: bool,

    /// Retry policy for server-flagged retryable query errors.
    pub server_retry: RetryPolicy,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            strict_types: true,
            server_retry: RetryPolicy::default(),
        }
    }
}

/// Live protocol object for one submitted statement.
pub struct Query {
    transport: Arc<dyn Transport>,
    decoder: PageDecoder,
    options: QueryOptions,
    session: ClientSession,
    state: QueryState,
    query_id: String,
    info_uri: Option<String>,
    next_uri: Option<String>,
    stats: StatementStats,
    server_retries: u32,
    /// First page, decoded during submission and handed out by the first
    /// `advance` call.
    pending: Option<Page>,
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("decoder", &self.decoder)
            .field("options", &self.options)
            .field("session", &self.session)
            .field("state", &self.state)
            .field("query_id", &self.query_id)
            .field("info_uri", &self.info_uri)
            .field("next_uri", &self.next_uri)
            .field("stats", &self.stats)
            .field("server_retries", &self.server_retries)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl Query {
    /// Submit a statement: POST it with the session's headers and decode
    /// the first page.
    pub async fn submit(
        transport: Arc<dyn Transport>,
        statement_url: &str,
        statement: &str,
        session: ClientSession,
        options: QueryOptions,
    ) -> Result<Query> {
        let headers = session.request_headers()?;
        debug!(
            "[query] submitting statement ({} bytes) to {}",
            statement.len(),
            statement_url
        );
        let response = transport
            .send(
                Method::POST,
                statement_url,
                headers,
                Some(statement.to_string()),
            )
            .await?;

        let mut query = Query {
            transport,
            decoder: PageDecoder::new(options.strict_types),
            options,
            session,
            state: QueryState::Submitting,
            query_id: String::new(),
            info_uri: None,
            next_uri: None,
            stats: StatementStats::default(),
            server_retries: 0,
            pending: None,
        };
        match query.process_response(response) {
            Ok(page) => {
                debug!(
                    "[query] {} submitted, state {:?}",
                    query.query_id, query.state
                );
                query.pending = Some(page);
                Ok(query)
            }
            // A malformed or rejected initial response is a submission
            // failure, not a paging failure.
            Err(PrestoLinkError::Protocol(msg)) => Err(PrestoLinkError::QuerySubmission(msg)),
            Err(e) => Err(e),
        }
    }

    /// Fetch and decode the next page, or `None` once the query is terminal.
    ///
    /// Pages the server flags as retryable failures are re-polled at the
    /// same URI, bounded by the query's own retry budget; the caller only
    /// sees the eventual outcome.
    pub async fn advance(&mut self) -> Result<Option<Page>> {
        if let Some(page) = self.pending.take() {
            return Ok(Some(page));
        }
        if self.state.is_terminal() {
            return Ok(None);
        }
        loop {
            let Some(uri) = self.next_uri.clone() else {
                self.state = QueryState::Finished;
                return Ok(None);
            };
            let headers = self.session.request_headers()?;
            let response = self.transport.send(Method::GET, &uri, headers, None).await?;
            if self.state == QueryState::Cancelled {
                // Cancelled while the poll was in flight; the late page is
                // discarded.
                debug!("[query] {} cancelled mid-poll, page discarded", self.query_id);
                return Ok(None);
            }
            match self.process_response(response) {
                Ok(page) => {
                    self.server_retries = 0;
                    return Ok(Some(page));
                }
                Err(PrestoLinkError::ServerQuery(error))
                    if error.is_retryable()
                        && self.options.server_retry.allows(self.server_retries) =>
                {
                    let delay = self.options.server_retry.delay_for(self.server_retries);
                    warn!(
                        "[query] {} reported retryable failure ({}), retry {} in {:?}",
                        self.query_id,
                        error,
                        self.server_retries + 1,
                        delay
                    );
                    self.server_retries += 1;
                    // Re-poll the same page URI.
                    self.state = QueryState::Running;
                    self.next_uri = Some(uri);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Best-effort cancellation: DELETE the current page URI.
    ///
    /// The local state flips to `Cancelled` regardless of the network
    /// outcome, because the caller's intent to stop consuming must take
    /// effect immediately. Already-terminal queries are left untouched.
    pub async fn cancel(&mut self) {
        self.pending = None;
        if self.state.is_terminal() {
            return;
        }
        self.state = QueryState::Cancelled;
        if let Some(uri) = self.next_uri.take() {
            let headers = self.session.request_headers().unwrap_or_else(|_| HeaderMap::new());
            match self.transport.send(Method::DELETE, &uri, headers, None).await {
                Ok(_) => debug!("[query] {} cancelled", self.query_id),
                Err(e) => warn!(
                    "[query] cancel of {} failed (state is Cancelled anyway): {}",
                    self.query_id, e
                ),
            }
        }
    }

    /// Interpret one raw response: fold session deltas into a new snapshot,
    /// merge statistics, compute the next state and decode the rows.
    fn process_response(&mut self, response: TransportResponse) -> Result<Page> {
        match response.status {
            200 => {}
            401 | 403 => {
                return Err(PrestoLinkError::Auth(format!(
                    "credentials rejected (HTTP {})",
                    response.status
                )))
            }
            status => {
                return Err(PrestoLinkError::Protocol(format!(
                    "unexpected HTTP status {}: {}",
                    status,
                    truncate(&response.body)
                )))
            }
        }

        let page: QueryResults = serde_json::from_str(&response.body)?;

        // Session snapshots form a causal chain: snapshot N+1 derives only
        // from snapshot N plus this response's deltas.
        let updates = SessionUpdates::from_headers(&response.headers);
        self.session = self.session.apply(&updates);

        self.query_id = page.id.clone();
        if self.info_uri.is_none() {
            self.info_uri = page.info_uri.clone();
        }
        self.next_uri = page.next_uri.clone();
        self.stats.merge_from(&page.stats);

        if let Some(error) = &page.error {
            self.state = QueryState::Failed;
            return Err(PrestoLinkError::ServerQuery(error.clone()));
        }

        self.state = if self.next_uri.is_none() {
            QueryState::Finished
        } else if page.stats.state == "QUEUED" {
            QueryState::Queued
        } else {
            QueryState::Running
        };

        let rows = self.decoder.decode(&page)?;
        debug!(
            "[query] {} page: {} rows, state {:?}",
            self.query_id,
            rows.len(),
            self.state
        );
        Ok(Page {
            rows,
            stats: page.stats,
            warnings: page.warnings,
        })
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    pub fn info_uri(&self) -> Option<&str> {
        self.info_uri.as_deref()
    }

    /// Column descriptors, once a page has carried them.
    pub fn columns(&self) -> Option<&[Column]> {
        self.decoder.columns()
    }

    /// Session snapshot as of the most recently processed response.
    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    /// Accumulated statistics; the final page's values are authoritative.
    pub fn stats(&self) -> &StatementStats {
        &self.stats
    }
}

fn truncate(body: &str) -> &str {
    let limit = 256;
    match body.char_indices().nth(limit) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
