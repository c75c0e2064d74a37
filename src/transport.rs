//! HTTP transport with bounded retry and pluggable authentication.
//!
//! [`Transport`] is the seam between the query state machine and the
//! network: the state machine only ever asks for
//! `send(method, url, headers, body)` and gets back raw status, headers and
//! body. Tests substitute a scripted implementation; production uses
//! [`HttpTransport`] over a pooled reqwest client.

use crate::auth::AuthProvider;
use crate::error::{PrestoLinkError, Result};
use crate::retry::{is_retryable_status, RetryPolicy};
use crate::timeouts::Timeouts;
use log::{debug, warn};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use std::sync::Arc;
use std::time::Instant;

/// Raw response surfaced to the state machine.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

/// Issues one HTTP exchange. Implementations must be safe to share across
/// concurrently progressing queries.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<String>,
    ) -> Result<TransportResponse>;
}

/// Rewrites request URLs before they are issued.
///
/// Gateways sometimes hand out page URIs with a raw IP in the host part;
/// negotiated auth needs those mapped back to a hostname that matches the
/// service principal. Returning `None` leaves the URL untouched.
pub trait RedirectPolicy: Send + Sync {
    fn rewrite(&self, url: &str) -> Option<String>;
}

/// Production transport over reqwest.
///
/// Connection-level failures and retryable statuses (request timeout, too
/// many requests, service unavailable, gateway timeout) are retried with
/// exponential backoff; other statuses are passed through for the caller to
/// interpret. Auth decoration runs freshly on every attempt.
pub struct HttpTransport {
    client: reqwest::Client,
    auth: AuthProvider,
    retry: RetryPolicy,
    redirect: Option<Arc<dyn RedirectPolicy>>,
}

impl HttpTransport {
    pub fn new(auth: AuthProvider, timeouts: &Timeouts, retry: RetryPolicy) -> Result<Self> {
        // Keep-alive pooling: page polling issues many small sequential
        // requests against the same coordinator.
        let client = reqwest::Client::builder()
            .timeout(timeouts.request_timeout)
            .connect_timeout(timeouts.connect_timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .map_err(|e| PrestoLinkError::Configuration(e.to_string()))?;
        Ok(Self {
            client,
            auth,
            retry,
            redirect: None,
        })
    }

    /// Install a URL rewrite applied before every request.
    pub fn with_redirect_policy(mut self, policy: Arc<dyn RedirectPolicy>) -> Self {
        self.redirect = Some(policy);
        self
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<String>,
    ) -> Result<TransportResponse> {
        let url = match &self.redirect {
            Some(policy) => match policy.rewrite(url) {
                Some(rewritten) => {
                    debug!("[transport] url rewritten: {} -> {}", url, rewritten);
                    rewritten
                }
                None => url.to_string(),
            },
            None => url.to_string(),
        };
        let url = url.as_str();
        let mut retries = 0u32;
        let mut renegotiated = false;
        loop {
            // Request builders with bodies cannot be cloned; build fresh on
            // each attempt so auth decoration sees current credentials.
            let mut builder = self
                .client
                .request(method.clone(), url)
                .headers(headers.clone());
            if let Some(body) = &body {
                builder = builder.body(body.clone());
            }
            builder = self.auth.decorate(builder).await?;

            let attempt_start = Instant::now();
            debug!(
                "[transport] {} {} (attempt {}/{})",
                method,
                url,
                retries + 1,
                self.retry.max_retries + 1
            );

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    debug!(
                        "[transport] {} {} -> {} in {:?}",
                        method,
                        url,
                        status,
                        attempt_start.elapsed()
                    );

                    if is_retryable_status(status.as_u16()) {
                        if self.retry.allows(retries) {
                            let delay = self.retry.delay_for(retries);
                            warn!(
                                "[transport] retryable status {} from {}, backing off {:?}",
                                status, url, delay
                            );
                            retries += 1;
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        return Err(PrestoLinkError::Transport(format!(
                            "{} from {} after {} retries",
                            status, url, retries
                        )));
                    }

                    if status == StatusCode::UNAUTHORIZED
                        && self.auth.supports_renegotiation()
                        && !renegotiated
                    {
                        // Expired security context: renegotiate once, then
                        // let the 401 pass through if it persists.
                        debug!("[transport] 401 with cached context, renegotiating");
                        self.auth.invalidate();
                        renegotiated = true;
                        continue;
                    }

                    let response_headers = response.headers().clone();
                    let body = response.text().await?;
                    return Ok(TransportResponse {
                        status: status.as_u16(),
                        headers: response_headers,
                        body,
                    });
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && self.retry.allows(retries) => {
                    let delay = self.retry.delay_for(retries);
                    warn!(
                        "[transport] {} to {} failed ({}), backing off {:?}",
                        method, url, e, delay
                    );
                    retries += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
