//! Pre-flight credential check run before every request attempt.

use std::sync::Arc;

use crate::core::auth::Authenticator;
use crate::error::{FortumError, Result};

/// Decides whether credentials need renewal and picks the renewal path.
///
/// The gate never touches tokens or cookies itself; all mutation goes
/// through the [`Authenticator`].
#[derive(Clone)]
pub struct TokenGate {
    auth: Arc<dyn Authenticator>,
}

impl TokenGate {
    pub fn new(auth: Arc<dyn Authenticator>) -> Self {
        Self { auth }
    }

    /// Renew credentials if they are expired, or about to expire when
    /// `proactive` is set.
    ///
    /// With a real refresh token a refresh is tried first and full
    /// re-authentication is the fallback. Session-cookie credentials always
    /// re-authenticate.
    ///
    /// # Errors
    ///
    /// Returns [`FortumError::AuthFailed`] if re-authentication fails.
    pub async fn ensure_valid(&self, proactive: bool) -> Result<()> {
        let needs_renewal = (proactive && self.auth.needs_renewal()) || self.auth.is_token_expired();
        if !needs_renewal {
            return Ok(());
        }

        let snapshot = self.auth.snapshot();
        if snapshot.real_refresh_token().is_some() {
            tracing::debug!("Credentials near expiry, refreshing access token");
            match self.auth.refresh_access_token().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(error = %e, "Token refresh failed, re-authenticating");
                }
            }
        } else {
            tracing::debug!(
                mode = snapshot.auth_mode().label(),
                "No refresh token available, re-authenticating"
            );
        }

        self.auth
            .authenticate()
            .await
            .map_err(|e| FortumError::auth_failed("re-authentication failed", e))
    }
}
