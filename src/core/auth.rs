//! Capability interface to the external authentication collaborator.
//!
//! The login flow (SSO form, token exchange, cookie acquisition) lives
//! outside this crate. The request pipeline only reads immutable
//! [`CredentialSnapshot`]s and delegates renewal through [`Authenticator`].

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Token value the collaborator stores when authentication is cookie-based.
pub const SESSION_BASED_TOKEN: &str = "session_based";

/// Lead time before expiry at which renewal is done proactively.
pub const RENEWAL_LEAD_TIME: Duration = Duration::from_secs(5 * 60);

/// Read-only view of the collaborator's credential state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialSnapshot {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    /// Session cookies by name.
    #[serde(default)]
    pub session_cookies: BTreeMap<String, String>,
    /// Raw session payload captured at login, if any.
    #[serde(default)]
    pub session_data: Option<serde_json::Value>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CredentialSnapshot {
    /// How renewal has to proceed for these credentials.
    #[must_use]
    pub fn auth_mode(&self) -> AuthMode {
        if self.refresh_token.as_deref() == Some(SESSION_BASED_TOKEN) {
            AuthMode::SessionCookie
        } else {
            AuthMode::CredentialToken
        }
    }

    /// Refresh token usable for a refresh-only renewal.
    #[must_use]
    pub fn real_refresh_token(&self) -> Option<&str> {
        real_token(self.refresh_token.as_deref())
    }

    /// Access token usable as a bearer credential.
    #[must_use]
    pub fn real_access_token(&self) -> Option<&str> {
        real_token(self.access_token.as_deref())
    }

    /// Whether the credentials expire within `lead` of `now`.
    ///
    /// Missing expiry counts as expired.
    #[must_use]
    pub fn expires_within(&self, lead: Duration, now: DateTime<Utc>) -> bool {
        let Some(expires_at) = self.expires_at else {
            return true;
        };
        let Ok(lead) = chrono::Duration::from_std(lead) else {
            return true;
        };
        expires_at
            .checked_sub_signed(lead)
            .is_none_or(|threshold| now >= threshold)
    }
}

fn real_token(token: Option<&str>) -> Option<&str> {
    token.filter(|t| !t.is_empty() && *t != SESSION_BASED_TOKEN)
}

/// How the current credentials are renewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// No real refresh token; renewal means full re-authentication.
    SessionCookie,
    /// Real refresh token available for token-only renewal.
    CredentialToken,
}

impl AuthMode {
    /// Total physical attempts allowed for one logical request.
    #[must_use]
    pub const fn max_attempts(self) -> u32 {
        match self {
            Self::SessionCookie => 5,
            Self::CredentialToken => 2,
        }
    }

    /// Delay before resubmitting after `attempt` (0-based) expired.
    ///
    /// Session cookies take a while to propagate between Fortum's API
    /// hosts, so that mode backs off linearly in 5 second steps.
    #[must_use]
    pub fn retry_delay(self, attempt: u32) -> Duration {
        match self {
            Self::SessionCookie => Duration::from_secs(5 + 5 * u64::from(attempt)),
            Self::CredentialToken => Duration::from_millis(100 << attempt.min(16)),
        }
    }

    /// Label for logs and reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SessionCookie => "session",
            Self::CredentialToken => "oauth",
        }
    }
}

/// External authentication collaborator.
///
/// Implementations own the credential state and must serialize their own
/// `refresh_access_token`/`authenticate` calls when shared between tasks.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Current credential state.
    fn snapshot(&self) -> CredentialSnapshot;

    /// Whether credentials expire within [`RENEWAL_LEAD_TIME`].
    fn needs_renewal(&self) -> bool {
        self.snapshot().expires_within(RENEWAL_LEAD_TIME, Utc::now())
    }

    /// Whether credentials are already expired.
    fn is_token_expired(&self) -> bool {
        self.snapshot().expires_within(Duration::ZERO, Utc::now())
    }

    /// Renew the access token using the refresh token.
    async fn refresh_access_token(&self) -> Result<()>;

    /// Run the full login flow again.
    async fn authenticate(&self) -> Result<()>;
}
