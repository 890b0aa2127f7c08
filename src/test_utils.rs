//! Test utilities for mittfortum.
//!
//! Provides test doubles for the two seams of the request pipeline
//! (the [`Authenticator`] collaborator and the [`HttpTransport`]), payload
//! fixtures, and a temporary directory helper.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mittfortum::test_utils::*;
//!
//! let auth = Arc::new(MockAuthenticator::fresh("session_based"));
//! let transport = Arc::new(ScriptedTransport::repeating(HttpResponse::with_status(401, "")));
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};

use crate::core::auth::{Authenticator, CredentialSnapshot};
use crate::core::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::{FortumError, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Mock Authenticator
// =============================================================================

/// In-memory [`Authenticator`] that counts renewal calls.
///
/// A successful refresh or authenticate moves the expiry one hour ahead.
pub struct MockAuthenticator {
    state: Mutex<CredentialSnapshot>,
    refresh_calls: AtomicU32,
    authenticate_calls: AtomicU32,
    fail_refresh: bool,
    fail_authenticate: bool,
}

impl MockAuthenticator {
    fn with_expiry(refresh_token: &str, expires_in: TimeDelta) -> Self {
        Self {
            state: Mutex::new(CredentialSnapshot {
                access_token: Some("access-token".to_string()),
                refresh_token: Some(refresh_token.to_string()),
                expires_at: Some(Utc::now() + expires_in),
                ..CredentialSnapshot::default()
            }),
            refresh_calls: AtomicU32::new(0),
            authenticate_calls: AtomicU32::new(0),
            fail_refresh: false,
            fail_authenticate: false,
        }
    }

    /// Credentials valid for another hour.
    #[must_use]
    pub fn fresh(refresh_token: &str) -> Self {
        Self::with_expiry(refresh_token, TimeDelta::hours(1))
    }

    /// Credentials inside the renewal lead window but not yet expired.
    #[must_use]
    pub fn expiring_soon(refresh_token: &str) -> Self {
        Self::with_expiry(refresh_token, TimeDelta::minutes(2))
    }

    /// Credentials that expired a minute ago.
    #[must_use]
    pub fn expired(refresh_token: &str) -> Self {
        Self::with_expiry(refresh_token, TimeDelta::minutes(-1))
    }

    #[must_use]
    pub fn failing_refresh(mut self) -> Self {
        self.fail_refresh = true;
        self
    }

    #[must_use]
    pub fn failing_authenticate(mut self) -> Self {
        self.fail_authenticate = true;
        self
    }

    #[must_use]
    pub fn with_cookie(self, name: &str, value: &str) -> Self {
        lock(&self.state)
            .session_cookies
            .insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_session_data(self, data: serde_json::Value) -> Self {
        lock(&self.state).session_data = Some(data);
        self
    }

    #[must_use]
    pub fn with_id_token(self, token: &str) -> Self {
        lock(&self.state).id_token = Some(token.to_string());
        self
    }

    #[must_use]
    pub fn refresh_calls(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn authenticate_calls(&self) -> u32 {
        self.authenticate_calls.load(Ordering::SeqCst)
    }

    fn renew(&self) {
        lock(&self.state).expires_at = Some(Utc::now() + TimeDelta::hours(1));
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    fn snapshot(&self) -> CredentialSnapshot {
        lock(&self.state).clone()
    }

    async fn refresh_access_token(&self) -> Result<()> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh {
            return Err(FortumError::Network("refresh endpoint unreachable".to_string()));
        }
        self.renew();
        Ok(())
    }

    async fn authenticate(&self) -> Result<()> {
        self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_authenticate {
            return Err(FortumError::MissingCredentials("login rejected".to_string()));
        }
        self.renew();
        Ok(())
    }
}

// =============================================================================
// Scripted Transport
// =============================================================================

/// [`HttpTransport`] that replays canned responses and records requests.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse>>>,
    fallback: Option<HttpResponse>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    /// Replay `script` in order; calls beyond it fail with a network error.
    #[must_use]
    pub fn new(script: Vec<Result<HttpResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with `response`.
    #[must_use]
    pub fn repeating(response: HttpResponse) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of physical requests sent.
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Every request sent so far.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse> {
        lock(&self.requests).push(request);
        if let Some(next) = lock(&self.script).pop_front() {
            return next;
        }
        self.fallback
            .clone()
            .ok_or_else(|| FortumError::Network("no scripted response left".to_string()))
    }
}

// =============================================================================
// Payload Fixtures
// =============================================================================

pub mod fixtures {
    //! Realistic API payloads.

    use chrono::{DateTime, Utc};
    use serde_json::{Value, json};

    /// Session endpoint body with one delivery site.
    #[must_use]
    pub fn session_body() -> String {
        json!({
            "user": {
                "id": "u-1",
                "customerId": "1234567",
                "name": "Anna Andersson",
                "postalAddress": "Storgatan 1",
                "postOffice": "STOCKHOLM",
                "deliverySites": [
                    {
                        "address": "Storgatan 1",
                        "consumption": {"meteringPointNo": "6094111"}
                    }
                ]
            },
            "expires": "2099-01-01T00:00:00.000Z"
        })
        .to_string()
    }

    /// One time series with two consuming intervals and one idle interval.
    #[must_use]
    pub fn time_series() -> Value {
        json!({
            "deliverySiteCategory": "CONSUMPTION",
            "measurementUnit": "kWh",
            "meteringPointNo": "6094111",
            "priceUnit": "öre/kWh",
            "costUnit": "SEK",
            "temperatureUnit": "°C",
            "series": [
                {
                    "atUTC": "2024-01-01T00:00:00.000Z",
                    "energy": [{"value": 450.25, "type": "ENERGY"}],
                    "cost": [
                        {"total": 300.0, "value": 240.0, "type": "SPOT_VARIABLE_AMOUNT"},
                        {"total": 49.0, "value": 39.2, "type": "FIXED_FEE_AMOUNT"}
                    ],
                    "price": {"total": 66.6, "value": 53.3, "vatAmount": 13.3, "vatPercentage": 25.0},
                    "temperatureReading": {"temperature": -4.2}
                },
                {
                    "atUTC": "2024-02-01T00:00:00.000Z",
                    "energy": [{"value": 0.0, "type": "ENERGY"}]
                },
                {
                    "atUTC": "2024-03-01T00:00:00.000Z",
                    "energy": [{"value": 380.0, "type": "ENERGY"}],
                    "cost": [{"total": 250.5, "value": 200.4, "type": "SPOT_VARIABLE_AMOUNT"}]
                }
            ]
        })
    }

    /// RPC body wrapping [`time_series`] in a one-element list.
    #[must_use]
    pub fn time_series_body() -> String {
        json!([{"result": {"data": {"json": [time_series()]}}}]).to_string()
    }

    /// RPC 500 body asking for a smaller query.
    #[must_use]
    pub fn internal_server_error_body() -> String {
        json!([{
            "error": {"json": {"message": "INTERNAL_SERVER_ERROR", "code": -32603}}
        }])
        .to_string()
    }

    /// Whole days between `fromDate` and `toDate` of a time-series URL.
    ///
    /// # Panics
    ///
    /// Panics if the URL does not carry a time-series input.
    #[must_use]
    pub fn requested_days(url: &str) -> i64 {
        let input = query_input(url);
        let date = |field: &str| -> DateTime<Utc> {
            input["0"]["json"][field]
                .as_str()
                .and_then(|s| s.parse().ok())
                .expect("input carries RFC 3339 dates")
        };
        (date("toDate") - date("fromDate")).num_days()
    }

    /// Decoded `input` parameter of an RPC URL.
    ///
    /// # Panics
    ///
    /// Panics if the URL has no decodable `input` parameter.
    #[must_use]
    pub fn query_input(url: &str) -> Value {
        let encoded = url
            .split_once("input=")
            .map(|(_, rest)| rest)
            .expect("url has an input parameter");
        let decoded = urlencoding::decode(encoded).expect("input is percent-encoded");
        serde_json::from_str(&decoded).expect("input is JSON")
    }
}

/// Credentials file contents for a session-cookie login.
#[must_use]
pub fn make_test_credentials_json(expires_in: TimeDelta) -> String {
    let mut cookies = BTreeMap::new();
    cookies.insert("amlbcookie".to_string(), "01".to_string());
    cookies.insert(
        "__Secure-next-auth.session-token".to_string(),
        "eyJhbGciOiJkaXIiLCJlbmMiOiJBMjU2R0NNIn0".to_string(),
    );
    let snapshot = CredentialSnapshot {
        access_token: Some(crate::core::auth::SESSION_BASED_TOKEN.to_string()),
        refresh_token: Some(crate::core::auth::SESSION_BASED_TOKEN.to_string()),
        id_token: Some(crate::core::auth::SESSION_BASED_TOKEN.to_string()),
        session_cookies: cookies,
        session_data: serde_json::from_str(&fixtures::session_body()).ok(),
        expires_at: Some(Utc::now() + expires_in),
    };
    serde_json::to_string_pretty(&snapshot).unwrap_or_default()
}

// =============================================================================
// Temp Directory Utilities
// =============================================================================

/// A temporary directory for tests with automatic cleanup.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Create a file, including parent directories.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.inner.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        let mut file = fs::File::create(&path).expect("Failed to create test file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test file");
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read_file(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.inner.path().join(name))
    }

    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Test Helpers
// =============================================================================

/// Check if a string contains ANSI escape sequences.
#[must_use]
pub fn has_ansi_codes(text: &str) -> bool {
    text.contains('\x1b')
}

/// Strip ANSI escape codes from a string.
#[must_use]
pub fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if chars.peek() == Some(&'[') {
                chars.next();
                while let Some(&next) = chars.peek() {
                    chars.next();
                    if next.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}
