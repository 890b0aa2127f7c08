//! Authenticated request pipeline.
//!
//! Every logical GET goes through [`RequestPipeline::execute`], which owns
//! the retry state machine for authentication expiry:
//!
//! ```text
//! attempt n ──► gate ──► snapshot ──► headers + cookies ──► transport
//!                                                              │
//!        ┌─────────────── classify status ◄───────────────────┘
//!        │
//!        ├─ 200 ─────────────────────────────► body
//!        ├─ 307 sign-out/TokenExpired, 401 ──► sleep, attempt n+1
//!        └─ anything else ───────────────────► error
//! ```
//!
//! Server errors (500) are classified but not retried here; narrowing the
//! query is the caller's job.

use std::sync::Arc;

use crate::core::auth::Authenticator;
use crate::core::cookies::route_cookies;
use crate::core::endpoints::Endpoints;
use crate::core::envelope;
use crate::core::http::{HttpRequest, HttpResponse, HttpTransport, build_headers};
use crate::core::token_gate::TokenGate;
use crate::error::{FortumError, Result, ServerErrorDetail};

/// Executes GETs with credential renewal and expiry retries.
#[derive(Clone)]
pub struct RequestPipeline {
    auth: Arc<dyn Authenticator>,
    transport: Arc<dyn HttpTransport>,
    endpoints: Endpoints,
    gate: TokenGate,
}

impl RequestPipeline {
    pub fn new(
        auth: Arc<dyn Authenticator>,
        transport: Arc<dyn HttpTransport>,
        endpoints: Endpoints,
    ) -> Self {
        let gate = TokenGate::new(Arc::clone(&auth));
        Self {
            auth,
            transport,
            endpoints,
            gate,
        }
    }

    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    #[must_use]
    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.auth
    }

    /// GET `url`, retrying on authentication expiry.
    ///
    /// Session-cookie credentials get up to 5 attempts with 5, 10, 15, 20
    /// second pauses; token credentials get 2 attempts with a 100 ms pause.
    ///
    /// # Errors
    ///
    /// Returns [`FortumError::MaxRetriesExceeded`] when every attempt
    /// expired, [`FortumError::ServerError`] on HTTP 500, and any other
    /// classified failure unchanged.
    pub async fn execute(&self, url: &str) -> Result<HttpResponse> {
        let mut attempt: u32 = 0;
        loop {
            match self.attempt(url, attempt).await {
                Err(FortumError::TokenExpired) => {
                    let mode = self.auth.snapshot().auth_mode();
                    let next = attempt + 1;
                    let ceiling = mode.max_attempts();
                    if next >= ceiling {
                        tracing::error!(url, attempts = next, "Giving up after repeated token expiry");
                        return Err(FortumError::MaxRetriesExceeded {
                            attempts: next,
                            url: url.to_string(),
                        });
                    }
                    let delay = mode.retry_delay(attempt);
                    tracing::info!(
                        attempt = next,
                        ceiling,
                        mode = mode.label(),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Token expired, retrying request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                other => return other,
            }
        }
    }

    /// GET `url` and decode the response envelope.
    ///
    /// # Errors
    ///
    /// Returns pipeline errors from [`Self::execute`] and decode errors from
    /// [`envelope::decode`].
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let response = self.execute(url).await?;
        envelope::decode(&response.body)
    }

    async fn attempt(&self, url: &str, attempt: u32) -> Result<HttpResponse> {
        self.gate.ensure_valid(true).await?;

        let snapshot = self.auth.snapshot();
        let mode = snapshot.auth_mode();
        tracing::debug!(
            url,
            attempt = attempt + 1,
            ceiling = mode.max_attempts(),
            mode = mode.label(),
            cookies = snapshot.session_cookies.len(),
            "Sending request"
        );

        let request = HttpRequest::get(url)
            .with_headers(build_headers(&snapshot, url, &self.endpoints))
            .with_cookies(route_cookies(&snapshot.session_cookies));
        let response = self.transport.get(request).await?;

        self.classify(response).await
    }

    async fn classify(&self, response: HttpResponse) -> Result<HttpResponse> {
        match response.status {
            307 => {
                let location = response.location.unwrap_or_default();
                if location.contains("sign-out") && location.contains("TokenExpired") {
                    tracing::warn!(%location, "Redirected to sign-out, session expired");
                    Err(FortumError::TokenExpired)
                } else {
                    tracing::warn!(%location, "Unexpected redirect");
                    Err(FortumError::UnexpectedRedirect { location })
                }
            }
            401 => {
                tracing::info!("Access token rejected, refreshing");
                match self.auth.refresh_access_token().await {
                    Ok(()) => Err(FortumError::TokenExpired),
                    Err(e) => Err(FortumError::auth_failed("re-authentication required", e)),
                }
            }
            403 => Err(FortumError::Forbidden),
            500 => Err(server_error(&response.body)),
            200 if response.body.trim().is_empty() => {
                Err(FortumError::invalid_response("Empty response from API"))
            }
            200 => Ok(response),
            status => Err(FortumError::UnexpectedStatus {
                status,
                body: response.body,
            }),
        }
    }
}

fn server_error(body: &str) -> FortumError {
    let detail = match envelope::decode_error(body) {
        Some(rpc) if rpc.is_internal_server_error() => {
            tracing::error!(code = %rpc.code, "Server reported INTERNAL_SERVER_ERROR");
            ServerErrorDetail::ReduceDateRange
        }
        Some(rpc) => {
            tracing::error!(message = %rpc.message, code = %rpc.code, "Server error");
            ServerErrorDetail::Reported {
                message: rpc.message,
                code: rpc.code,
            }
        }
        None => {
            tracing::error!("Server error without error envelope");
            ServerErrorDetail::Generic
        }
    };
    FortumError::ServerError { detail }
}
