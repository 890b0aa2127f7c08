//! Cookie domain routing for Fortum's multi-host session.
//!
//! The session spans the SSO host and the main site. A cookie set on the
//! wrong domain is silently ignored by the backend, which shows up later as
//! an unexplained 401 or sign-out redirect, so the mapping must be exact.

use std::collections::BTreeMap;

/// Domain of the identity provider.
pub const SSO_DOMAIN: &str = ".sso.fortum.com";
/// Domain of the main site.
pub const MAIN_DOMAIN: &str = "www.fortum.com";

/// Cookies issued by the SSO load balancer and session service.
const SSO_COOKIES: [&str; 2] = ["amlbcookie", "18dddeef3f61363"];
const SECURE_PREFIXES: [&str; 2] = ["__Host-", "__Secure-"];
const LOCALE_COOKIE: &str = "NEXT_LOCALE";

/// Cookie scope domain for `name`.
#[must_use]
pub fn domain_for(name: &str) -> &'static str {
    if SSO_COOKIES.contains(&name) {
        return SSO_DOMAIN;
    }
    if SECURE_PREFIXES.iter().any(|p| name.starts_with(p)) || name == LOCALE_COOKIE {
        return MAIN_DOMAIN;
    }
    MAIN_DOMAIN
}

/// Session cookie with its scope domain resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedCookie {
    pub name: String,
    pub value: String,
    pub domain: &'static str,
}

impl RoutedCookie {
    /// `Set-Cookie` style line for loading into a cookie jar.
    #[must_use]
    pub fn set_cookie_line(&self) -> String {
        format!("{}={}; Domain={}; Path=/", self.name, self.value, self.domain)
    }

    /// Origin URL the cookie is scoped to.
    #[must_use]
    pub fn origin(&self) -> String {
        format!("https://{}/", self.domain.trim_start_matches('.'))
    }
}

/// Route every session cookie to its domain.
#[must_use]
pub fn route_cookies(cookies: &BTreeMap<String, String>) -> Vec<RoutedCookie> {
    cookies
        .iter()
        .map(|(name, value)| {
            let domain = domain_for(name);
            tracing::debug!(
                cookie = %name,
                value = %preview(value),
                domain,
                "Added cookie to request"
            );
            RoutedCookie {
                name: name.clone(),
                value: value.clone(),
                domain,
            }
        })
        .collect()
}

/// First 20 characters of a secret, for logs.
#[must_use]
pub fn preview(secret: &str) -> &str {
    secret
        .char_indices()
        .nth(20)
        .map_or(secret, |(idx, _)| &secret[..idx])
}
