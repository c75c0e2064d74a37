//! Timeout configuration for client operations.

use std::time::Duration;

/// Timeouts applied by the HTTP transport.
///
/// # Examples
///
/// ```rust
/// use presto_link::Timeouts;
/// use std::time::Duration;
///
/// // Defaults are fine for most deployments.
/// let timeouts = Timeouts::default();
///
/// // Tighter limits for localhost development.
/// let timeouts = Timeouts::fast();
///
/// // Custom values.
/// let timeouts = Timeouts::default()
///     .with_connect_timeout(Duration::from_secs(5))
///     .with_request_timeout(Duration::from_secs(120));
/// ```
#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Timeout for establishing a connection (TCP + TLS handshake).
    /// Default: 10 seconds.
    pub connect_timeout: Duration,

    /// Per-request timeout covering send, server processing and receive.
    /// Default: 30 seconds.
    pub request_timeout: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Timeouts {
    /// Timeouts optimized for localhost development.
    pub fn fast() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
        }
    }

    /// Timeouts for high-latency or unreliable networks.
    pub fn relaxed() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
        }
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
