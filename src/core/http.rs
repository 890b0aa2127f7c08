//! HTTP transport for the request pipeline.
//!
//! The pipeline talks to a [`HttpTransport`] so retry behavior can be
//! exercised without a network. [`ReqwestTransport`] is the production
//! implementation: one short-lived client per attempt, its own cookie jar,
//! and redirects left to the caller.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::LOCATION;
use reqwest::{Client, ClientBuilder, Url, redirect};

use crate::core::auth::CredentialSnapshot;
use crate::core::cookies::RoutedCookie;
use crate::core::endpoints::{Endpoints, is_cookie_authenticated};
use crate::error::{FortumError, Result};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Browser identity the site expects.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:138.0) Gecko/20100101 Firefox/138.0";

// =============================================================================
// Request / response
// =============================================================================

/// One physical GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    /// Header names are lowercase.
    pub headers: BTreeMap<String, String>,
    pub cookies: Vec<RoutedCookie>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            cookies: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_cookies(mut self, cookies: Vec<RoutedCookie>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Header value by lowercase name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Status, body and redirect target of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub location: Option<String>,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            location: None,
        }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            status: 307,
            body: String::new(),
            location: Some(location.into()),
        }
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Issues a single GET and reports what came back.
///
/// Implementations must not follow redirects.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// # Errors
    ///
    /// Returns [`FortumError::Timeout`] or [`FortumError::Network`] when no
    /// response was received.
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    timeout: Duration,
}

impl ReqwestTransport {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn build_client(&self, cookies: &[RoutedCookie]) -> Result<Client> {
        let jar = Jar::default();
        for cookie in cookies {
            let origin =
                Url::parse(&cookie.origin()).map_err(|e| FortumError::Network(e.to_string()))?;
            jar.add_cookie_str(&cookie.set_cookie_line(), &origin);
        }

        ClientBuilder::new()
            .timeout(self.timeout)
            .cookie_provider(Arc::new(jar))
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| FortumError::Network(e.to_string()))
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse> {
        // Dropped at the end of this call, on success and on error alike.
        let client = self.build_client(&request.cookies)?;

        let mut builder = client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                FortumError::Timeout(self.timeout.as_secs())
            } else {
                FortumError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| FortumError::Network(e.to_string()))?;

        Ok(HttpResponse {
            status,
            body,
            location,
        })
    }
}

// =============================================================================
// Headers
// =============================================================================

/// Headers for one attempt.
///
/// The RPC and session endpoints authenticate by cookie only; everything
/// else gets a bearer token when a real one exists.
#[must_use]
pub fn build_headers(
    snapshot: &CredentialSnapshot,
    url: &str,
    endpoints: &Endpoints,
) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("accept".to_string(), "application/json".to_string());
    headers.insert("user-agent".to_string(), USER_AGENT.to_string());
    headers.insert("content-type".to_string(), "application/json".to_string());
    headers.insert("referer".to_string(), endpoints.referer());

    if !is_cookie_authenticated(url)
        && let Some(token) = snapshot.real_access_token()
    {
        headers.insert("authorization".to_string(), format!("Bearer {token}"));
    }

    headers
}
