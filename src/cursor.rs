//! DBAPI-style connection and cursor façade.
//!
//! [`Connection`] threads session deltas from one statement into the next,
//! so `USE`, `SET SESSION` and transaction statements take effect for the
//! rest of the connection. [`Cursor`] buffers decoded rows and exposes the
//! familiar fetch calls; all pagination happens in the underlying
//! [`Query`], the cursor never touches URIs itself.

use crate::client::PrestoLinkClient;
use crate::error::{PrestoLinkError, Result};
use crate::escape::{interpolate, Param};
use crate::query::Query;
use crate::session::ClientSession;
use crate::transaction::{IsolationLevel, COMMIT_STATEMENT, ROLLBACK_STATEMENT};
use crate::value::Value;
use log::debug;
use std::collections::VecDeque;

/// Stateful connection: one evolving session over one client.
pub struct Connection {
    client: PrestoLinkClient,
    session: ClientSession,
}

impl Connection {
    pub fn new(client: PrestoLinkClient) -> Self {
        let session = client.session().clone();
        Self { client, session }
    }

    pub fn cursor(&mut self) -> Cursor<'_> {
        Cursor {
            connection: self,
            query: None,
            buffer: VecDeque::new(),
            arraysize: 1,
        }
    }

    /// Current session snapshot, including any deltas picked up from
    /// completed statements.
    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    /// Start a transaction at the given isolation level.
    ///
    /// The coordinator assigns the transaction id via a response header;
    /// once this returns, every subsequent statement on the connection
    /// carries it.
    pub async fn begin(&mut self, level: IsolationLevel) -> Result<()> {
        let Some(statement) = level.start_statement() else {
            // Autocommit is the absence of a transaction.
            return Ok(());
        };
        if self.session.transaction_id.is_some() {
            return Err(PrestoLinkError::Configuration(
                "transaction already started on this connection".into(),
            ));
        }
        self.run_statement(&statement).await?;
        debug!(
            "[connection] transaction started: {:?}",
            self.session.transaction_id
        );
        Ok(())
    }

    /// Commit the open transaction. A no-op when none is open.
    pub async fn commit(&mut self) -> Result<()> {
        if self.session.transaction_id.is_none() {
            return Ok(());
        }
        self.run_statement(COMMIT_STATEMENT).await
    }

    /// Roll back the open transaction. A no-op when none is open.
    pub async fn rollback(&mut self) -> Result<()> {
        if self.session.transaction_id.is_none() {
            return Ok(());
        }
        self.run_statement(ROLLBACK_STATEMENT).await
    }

    /// Close the connection. The coordinator holds no per-connection state,
    /// so this is a local no-op kept for API symmetry.
    pub fn close(self) {}

    /// Run a statement to completion for its session side effects.
    async fn run_statement(&mut self, statement: &str) -> Result<()> {
        let mut query = self
            .client
            .submit_with_session(statement, self.session.clone())
            .await?;
        while query.advance().await?.is_some() {}
        self.session = query.session().clone();
        Ok(())
    }
}

/// Buffered row reader over one statement at a time.
pub struct Cursor<'conn> {
    connection: &'conn mut Connection,
    query: Option<Query>,
    buffer: VecDeque<Vec<Value>>,
    /// Default batch size for [`Cursor::fetch_many`].
    pub arraysize: usize,
}

impl Cursor<'_> {
    /// Submit a statement, replacing any previous one on this cursor.
    pub async fn execute(&mut self, statement: &str) -> Result<()> {
        self.buffer.clear();
        let query = self
            .connection
            .client
            .submit_with_session(statement, self.connection.session.clone())
            .await?;
        self.connection.session = query.session().clone();
        self.query = Some(query);
        Ok(())
    }

    /// Submit a statement with `?` placeholders bound to `params`.
    ///
    /// Parameters render as escaped SQL literals before submission; see
    /// [`Param`] for the supported kinds.
    pub async fn execute_params(&mut self, statement: &str, params: &[Param]) -> Result<()> {
        let statement = interpolate(statement, params)?;
        self.execute(&statement).await
    }

    /// Next row, or `None` once the result set is exhausted.
    pub async fn fetch_one(&mut self) -> Result<Option<Vec<Value>>> {
        self.fill(Some(1)).await?;
        Ok(self.buffer.pop_front())
    }

    /// Up to `size` rows (the cursor's `arraysize` when `None`). An empty
    /// vector means the result set is exhausted.
    pub async fn fetch_many(&mut self, size: Option<usize>) -> Result<Vec<Vec<Value>>> {
        let size = size.unwrap_or(self.arraysize);
        self.fill(Some(size)).await?;
        let take = size.min(self.buffer.len());
        Ok(self.buffer.drain(..take).collect())
    }

    /// All remaining rows.
    pub async fn fetch_all(&mut self) -> Result<Vec<Vec<Value>>> {
        self.fill(None).await?;
        Ok(self.buffer.drain(..).collect())
    }

    /// Column `(name, type)` pairs, once the server has sent the schema.
    pub fn description(&self) -> Option<Vec<(String, String)>> {
        let query = self.query.as_ref()?;
        let columns = query.columns()?;
        Some(
            columns
                .iter()
                .map(|c| (c.name.clone(), c.data_type.clone()))
                .collect(),
        )
    }

    /// Server-side query id of the current statement.
    pub fn query_id(&self) -> Option<&str> {
        self.query.as_ref().map(|q| q.query_id())
    }

    /// Cancel the current statement and discard buffered rows.
    pub async fn cancel(&mut self) -> Result<()> {
        self.buffer.clear();
        if let Some(query) = self.query.as_mut() {
            query.cancel().await;
            self.connection.session = query.session().clone();
        }
        Ok(())
    }

    /// Pull pages until the buffer holds `want` rows, or without bound when
    /// `want` is `None`, syncing session deltas back to the connection.
    async fn fill(&mut self, want: Option<usize>) -> Result<()> {
        let Some(query) = self.query.as_mut() else {
            return Err(PrestoLinkError::Configuration(
                "no statement executed on this cursor".into(),
            ));
        };
        loop {
            if let Some(want) = want {
                if self.buffer.len() >= want {
                    break;
                }
            }
            match query.advance().await? {
                Some(page) => self.buffer.extend(page.rows),
                None => break,
            }
        }
        self.connection.session = query.session().clone();
        Ok(())
    }
}
