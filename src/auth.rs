//! Authentication strategies.
//!
//! The transport only ever sees two capabilities: "decorate an outgoing
//! request" and "perform a handshake before the first real request".
//! Strategies are a closed set of variants; the token and negotiation seams
//! are traits so callers can plug in their own credential flows.
//!
//! ## Refreshable tokens
//!
//! Implement [`TokenSource`] to supply bearer tokens lazily; the source is
//! asked for a token before every request and is expected to refresh
//! expired tokens itself (e.g. from a service-account credential file).
//!
//! ```rust,no_run
//! use presto_link::{AuthProvider, TokenSource};
//! use std::sync::Arc;
//!
//! struct FileTokenSource { /* ... */ }
//!
//! #[async_trait::async_trait]
//! impl TokenSource for FileTokenSource {
//!     async fn token(&self) -> presto_link::Result<String> {
//!         // read / refresh the token here
//!         Ok("fresh-token".into())
//!     }
//! }
//!
//! let auth = AuthProvider::oauth(Arc::new(FileTokenSource { /* ... */ }));
//! ```

use crate::error::{PrestoLinkError, Result};
use base64::{engine::general_purpose, Engine as _};
use std::fmt;
use std::sync::{Arc, RwLock};

/// Supplies bearer tokens on demand, refreshing them when expired.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String>;
}

/// Performs a challenge/response exchange (e.g. Kerberos-style) and derives
/// per-request tokens from the established security context.
#[async_trait::async_trait]
pub trait ContextNegotiator: Send + Sync {
    /// Pre-flight exchange with the server; the returned context is cached
    /// for the lifetime of the connection.
    async fn handshake(&self) -> Result<SecurityContext>;

    /// Derive the token attached to one request from the cached context.
    fn request_token(&self, context: &SecurityContext) -> Result<String>;
}

/// Opaque security context produced by a successful negotiation.
#[derive(Debug, Clone)]
pub struct SecurityContext {
    bytes: Vec<u8>,
}

impl SecurityContext {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Authentication strategy attached to a client.
///
/// # Examples
///
/// ```rust
/// use presto_link::AuthProvider;
///
/// let auth = AuthProvider::basic("alice", "secret123");
/// let auth = AuthProvider::bearer("eyJhbGc...");
/// let auth = AuthProvider::none();
/// ```
#[derive(Clone)]
pub enum AuthProvider {
    /// No authentication.
    None,

    /// HTTP Basic credentials (RFC 7617).
    Basic { username: String, password: String },

    /// Static bearer token.
    Bearer(String),

    /// Bearer token fetched from a refreshable source before each request.
    Oauth(Arc<dyn TokenSource>),

    /// Challenge-based negotiation with a cached security context.
    Negotiated {
        negotiator: Arc<dyn ContextNegotiator>,
        context: Arc<RwLock<Option<SecurityContext>>>,
    },
}

impl AuthProvider {
    pub fn none() -> Self {
        Self::None
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    pub fn oauth(source: Arc<dyn TokenSource>) -> Self {
        Self::Oauth(source)
    }

    pub fn negotiated(negotiator: Arc<dyn ContextNegotiator>) -> Self {
        Self::Negotiated {
            negotiator,
            context: Arc::new(RwLock::new(None)),
        }
    }

    /// Whether any credentials are configured.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Whether the strategy can renegotiate after the server signals an
    /// expired security context.
    pub fn supports_renegotiation(&self) -> bool {
        matches!(self, Self::Negotiated { .. })
    }

    /// Attach the strategy's authorization header to an outgoing request.
    ///
    /// Called freshly on every attempt so retries pick up refreshed tokens.
    /// For the negotiated strategy this lazily performs the pre-flight
    /// handshake the first time it runs.
    pub async fn decorate(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        match self {
            Self::None => Ok(request),
            Self::Basic { username, password } => {
                let credentials = format!("{}:{}", username, password);
                let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
                Ok(request.header("Authorization", format!("Basic {}", encoded)))
            }
            Self::Bearer(token) => Ok(request.bearer_auth(token)),
            Self::Oauth(source) => {
                let token = source.token().await?;
                Ok(request.bearer_auth(token))
            }
            Self::Negotiated {
                negotiator,
                context,
            } => {
                let cached = context
                    .read()
                    .map_err(|_| PrestoLinkError::Auth("auth context lock poisoned".into()))?
                    .clone();
                let established = match cached {
                    Some(ctx) => ctx,
                    None => {
                        let ctx = negotiator.handshake().await?;
                        *context
                            .write()
                            .map_err(|_| PrestoLinkError::Auth("auth context lock poisoned".into()))? =
                            Some(ctx.clone());
                        ctx
                    }
                };
                let token = negotiator.request_token(&established)?;
                Ok(request.header("Authorization", format!("Negotiate {}", token)))
            }
        }
    }

    /// Drop the cached security context so the next request renegotiates.
    pub fn invalidate(&self) {
        if let Self::Negotiated { context, .. } = self {
            if let Ok(mut guard) = context.write() {
                *guard = None;
            }
        }
    }
}

impl fmt::Debug for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "AuthProvider::None"),
            Self::Basic { username, .. } => {
                write!(f, "AuthProvider::Basic {{ username: {:?} }}", username)
            }
            Self::Bearer(_) => write!(f, "AuthProvider::Bearer(..)"),
            Self::Oauth(_) => write!(f, "AuthProvider::Oauth(..)"),
            Self::Negotiated { .. } => write!(f, "AuthProvider::Negotiated {{ .. }}"),
        }
    }
}
