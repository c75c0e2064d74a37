//! Coordinator client and its builder.
//!
//! The client owns the shared transport and the default session settings;
//! each call to [`PrestoLinkClient::submit`] produces an independent
//! [`Query`] that can be driven and cancelled on its own.

use crate::auth::AuthProvider;
use crate::error::{PrestoLinkError, Result};
use crate::headers;
use crate::query::{Query, QueryOptions};
use crate::retry::RetryPolicy;
use crate::session::ClientSession;
use crate::timeouts::Timeouts;
use crate::transport::{HttpTransport, RedirectPolicy, Transport};
use log::debug;
use std::sync::Arc;

/// URL scheme used to reach the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpScheme {
    Http,
    Https,
}

impl HttpScheme {
    fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// Client for one coordinator endpoint.
///
/// # Examples
///
/// ```rust,no_run
/// use presto_link::{PrestoLinkClient, AuthProvider, HttpScheme};
///
/// # async fn run() -> presto_link::Result<()> {
/// let client = PrestoLinkClient::builder("presto.example.com", "alice")
///     .scheme(HttpScheme::Https)
///     .port(8443)
///     .auth(AuthProvider::basic("alice", "secret"))
///     .catalog("hive")
///     .schema("default")
///     .build()?;
///
/// let mut query = client.submit("SELECT 1").await?;
/// while let Some(page) = query.advance().await? {
///     for row in page.rows {
///         println!("{:?}", row);
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PrestoLinkClient {
    transport: Arc<dyn Transport>,
    statement_url: String,
    session: ClientSession,
    options: QueryOptions,
}

impl std::fmt::Debug for PrestoLinkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrestoLinkClient")
            .field("statement_url", &self.statement_url)
            .field("session", &self.session)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl PrestoLinkClient {
    pub fn builder(host: impl Into<String>, user: impl Into<String>) -> PrestoLinkClientBuilder {
        PrestoLinkClientBuilder::new(host, user)
    }

    /// URL statements are POSTed to.
    pub fn statement_url(&self) -> &str {
        &self.statement_url
    }

    /// Default session snapshot new queries start from.
    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    /// Submit a statement using the client's default session.
    pub async fn submit(&self, statement: &str) -> Result<Query> {
        self.submit_with_session(statement, self.session.clone()).await
    }

    /// Submit a statement from an explicit session snapshot. Connection
    /// façades use this to thread session deltas from one query into the
    /// next.
    pub async fn submit_with_session(
        &self,
        statement: &str,
        session: ClientSession,
    ) -> Result<Query> {
        if statement.trim().is_empty() {
            return Err(PrestoLinkError::QuerySubmission(
                "statement is empty".into(),
            ));
        }
        Query::submit(
            self.transport.clone(),
            &self.statement_url,
            statement,
            session,
            self.options.clone(),
        )
        .await
    }
}

/// Builder for [`PrestoLinkClient`].
pub struct PrestoLinkClientBuilder {
    host: String,
    port: u16,
    scheme: HttpScheme,
    auth: AuthProvider,
    session: ClientSession,
    timeouts: Timeouts,
    transport_retry: RetryPolicy,
    options: QueryOptions,
    redirect: Option<Arc<dyn RedirectPolicy>>,
    transport: Option<Arc<dyn Transport>>,
}

impl PrestoLinkClientBuilder {
    fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: headers::DEFAULT_PORT,
            scheme: HttpScheme::Http,
            auth: AuthProvider::none(),
            session: ClientSession::new(user),
            timeouts: Timeouts::default(),
            transport_retry: RetryPolicy::default(),
            options: QueryOptions::default(),
            redirect: None,
            transport: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn scheme(mut self, scheme: HttpScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn auth(mut self, auth: AuthProvider) -> Self {
        self.auth = auth;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.session = self.session.with_source(source);
        self
    }

    pub fn catalog(mut self, catalog: impl Into<String>) -> Self {
        self.session = self.session.with_catalog(catalog);
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.session = self.session.with_schema(schema);
        self
    }

    pub fn time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.session = self.session.with_time_zone(time_zone);
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.session = self.session.with_locale(locale);
        self
    }

    pub fn session_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.session = self.session.with_property(name, value);
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Retry policy for network-level failures inside the transport.
    pub fn transport_retry(mut self, retry: RetryPolicy) -> Self {
        self.transport_retry = retry;
        self
    }

    /// Retry policy for query errors the server flags as retryable.
    pub fn server_retry(mut self, retry: RetryPolicy) -> Self {
        self.options.server_retry = retry;
        self
    }

    /// Disable typed conversion; rows carry raw JSON values.
    pub fn raw_values(mut self) -> Self {
        self.options.strict_types = false;
        self
    }

    /// Rewrite request URLs before they are issued, e.g. to normalize
    /// gateway-issued IP-literal page URIs back to a hostname.
    pub fn redirect_policy(mut self, policy: Arc<dyn RedirectPolicy>) -> Self {
        self.redirect = Some(policy);
        self
    }

    /// Substitute the transport. Intended for tests.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<PrestoLinkClient> {
        if self.host.trim().is_empty() {
            return Err(PrestoLinkError::Configuration("host is empty".into()));
        }
        if self.session.user.trim().is_empty() {
            return Err(PrestoLinkError::Configuration("user is empty".into()));
        }
        // Credentials over plaintext HTTP would leak; refuse the combination
        // outright rather than warn.
        if self.auth.is_authenticated() && self.scheme == HttpScheme::Http {
            return Err(PrestoLinkError::Configuration(
                "authentication requires https".into(),
            ));
        }

        let statement_url = format!(
            "{}://{}:{}{}",
            self.scheme.as_str(),
            self.host,
            self.port,
            headers::STATEMENT_PATH
        );
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => {
                let mut transport =
                    HttpTransport::new(self.auth, &self.timeouts, self.transport_retry)?;
                if let Some(policy) = self.redirect {
                    transport = transport.with_redirect_policy(policy);
                }
                Arc::new(transport)
            }
        };
        debug!("[client] configured for {}", statement_url);
        Ok(PrestoLinkClient {
            transport,
            statement_url,
            session: self.session,
            options: self.options,
        })
    }
}
