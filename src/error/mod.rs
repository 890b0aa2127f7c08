//! Error types for mittfortum.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Every error reports an [`ErrorKind`] which drives retry decisions:
//! - **TransientAuthExpired**: the session or token expired mid-request; the
//!   request pipeline resolves it locally by retrying
//! - **TransientServer**: the backend failed a query; the time-series
//!   executor narrows the date range and tries again
//! - **FatalAuth**: authentication is exhausted or forbidden
//! - **MalformedResponse**: the payload did not have the expected shape
//! - **UnexpectedStatus**: any HTTP status or redirect the client does not handle
//!
//! Transport, configuration and internal failures get their own kinds so
//! that nothing is ever classified by inspecting message text.
//!
//! Each error also has a stable error code (e.g., `MF-A001`) for programmatic handling.

use thiserror::Error;

/// Boxed cause carried by errors that wrap another failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FortumError>;

// =============================================================================
// Error Kinds
// =============================================================================

/// Retry-relevant classification of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Session or token expired; retried by the request pipeline.
    TransientAuthExpired,
    /// Backend server failure; retried by narrowing the query.
    TransientServer,
    /// Authentication failed or access was forbidden.
    FatalAuth,
    /// Structurally invalid payload.
    MalformedResponse,
    /// Unhandled HTTP status or redirect.
    UnexpectedStatus,
    /// Connection, timeout or TLS failure below HTTP.
    Transport,
    /// Invalid configuration or arguments.
    Configuration,
    /// Local I/O, serialization or unclassified failures.
    Internal,
}

impl ErrorKind {
    /// Whether some layer of the client retries errors of this kind.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::TransientAuthExpired | Self::TransientServer)
    }
}

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for user-facing classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Authentication issues (expired, refused, missing credentials).
    Authentication,
    /// Network issues (timeout, connection refused).
    Network,
    /// Configuration issues (parse errors, invalid values).
    Configuration,
    /// Fortum API issues (server errors, bad payloads, unexpected statuses).
    Api,
    /// Internal errors (I/O, serialization).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Authentication => "Authentication error",
            Self::Network => "Network error",
            Self::Configuration => "Configuration error",
            Self::Api => "API error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Authentication => "A",
            Self::Network => "N",
            Self::Configuration => "C",
            Self::Api => "P",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Server error detail
// =============================================================================

/// What the backend said when it answered with HTTP 500.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerErrorDetail {
    /// The RPC layer reported `INTERNAL_SERVER_ERROR`; usually the date
    /// range or resolution is too large.
    ReduceDateRange,
    /// The RPC layer reported some other message.
    Reported { message: String, code: String },
    /// No decodable error envelope in the body.
    Generic,
}

impl std::fmt::Display for ServerErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReduceDateRange => {
                write!(f, "Server error - try reducing date range or changing resolution")
            }
            Self::Reported { message, .. } => write!(f, "Server error: {message}"),
            Self::Generic => write!(f, "Server internal error - try again later"),
        }
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes used by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Authentication failed or credentials missing
    AuthError = 2,
    /// Parse/config errors
    ParseError = 3,
    /// Timeout
    Timeout = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

/// Main error type for mittfortum operations.
#[derive(Error, Debug)]
pub enum FortumError {
    // ==========================================================================
    // Authentication
    // ==========================================================================
    /// Session or token expired; the request should be retried.
    #[error("Token expired - retry required")]
    TokenExpired,

    /// Authentication failed and cannot be recovered by retrying.
    #[error("Authentication failed - {reason}")]
    AuthFailed {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The backend answered 403.
    #[error("Access forbidden - authentication may be required")]
    Forbidden,

    /// All attempts allowed for the current auth mode ended in token expiry.
    #[error("Maximum retry attempts ({attempts}) exceeded for {url}")]
    MaxRetriesExceeded { attempts: u32, url: String },

    /// No usable credentials were available.
    #[error("credentials not available: {0}")]
    MissingCredentials(String),

    // ==========================================================================
    // API
    // ==========================================================================
    /// The backend answered 500.
    #[error("{detail}")]
    ServerError { detail: ServerErrorDetail },

    /// The payload did not have the expected structure.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Redirect to anywhere other than the token-expired sign-out page.
    #[error("Unexpected redirect to: {location}")]
    UnexpectedRedirect { location: String },

    /// Any HTTP status the pipeline does not handle.
    #[error("Unexpected status code {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The customer has no metering points to query.
    #[error("No metering points found for customer")]
    NoMeteringPoints,

    /// The customer ID could not be determined.
    #[error("customer ID unavailable: {0}")]
    CustomerId(String),

    // ==========================================================================
    // Network
    // ==========================================================================
    /// Request timed out.
    #[error("request timeout after {0} seconds")]
    Timeout(u64),

    /// Connection or protocol failure.
    #[error("network error: {0}")]
    Network(String),

    // ==========================================================================
    // Configuration
    // ==========================================================================
    /// Invalid configuration value or file.
    #[error("configuration error: {0}")]
    Config(String),

    /// Locale other than SV or FI.
    #[error("Unsupported locale: {0}")]
    UnsupportedLocale(String),

    // ==========================================================================
    // Internal
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FortumError {
    /// Build an authentication failure with a chained cause.
    pub fn auth_failed<S, E>(reason: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        Self::AuthFailed {
            reason: reason.into(),
            source: Some(source.into()),
        }
    }

    /// Build an invalid-response error without a cause.
    pub fn invalid_response<S: Into<String>>(message: S) -> Self {
        Self::InvalidResponse {
            message: message.into(),
            source: None,
        }
    }

    /// Build an invalid-response error that keeps the original cause.
    pub fn invalid_response_from<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        Self::InvalidResponse {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Retry-relevant classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::TokenExpired => ErrorKind::TransientAuthExpired,
            Self::ServerError { .. } => ErrorKind::TransientServer,
            Self::AuthFailed { .. }
            | Self::Forbidden
            | Self::MaxRetriesExceeded { .. }
            | Self::MissingCredentials(_) => ErrorKind::FatalAuth,
            Self::InvalidResponse { .. } | Self::NoMeteringPoints | Self::CustomerId(_) => {
                ErrorKind::MalformedResponse
            }
            Self::UnexpectedRedirect { .. } | Self::UnexpectedStatus { .. } => {
                ErrorKind::UnexpectedStatus
            }
            Self::Timeout(_) | Self::Network(_) => ErrorKind::Transport,
            Self::Config(_) | Self::UnsupportedLocale(_) => ErrorKind::Configuration,
            Self::Io(_) | Self::Json(_) => ErrorKind::Internal,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self.kind() {
            ErrorKind::TransientAuthExpired | ErrorKind::FatalAuth => ErrorCategory::Authentication,
            ErrorKind::TransientServer
            | ErrorKind::MalformedResponse
            | ErrorKind::UnexpectedStatus => ErrorCategory::Api,
            ErrorKind::Transport => ErrorCategory::Network,
            ErrorKind::Configuration => ErrorCategory::Configuration,
            ErrorKind::Internal => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `MF-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::TokenExpired => "MF-A001",
            Self::AuthFailed { .. } => "MF-A002",
            Self::Forbidden => "MF-A003",
            Self::MaxRetriesExceeded { .. } => "MF-A004",
            Self::MissingCredentials(_) => "MF-A005",

            Self::ServerError { .. } => "MF-P001",
            Self::InvalidResponse { .. } => "MF-P002",
            Self::UnexpectedRedirect { .. } => "MF-P003",
            Self::UnexpectedStatus { .. } => "MF-P004",
            Self::NoMeteringPoints => "MF-P010",
            Self::CustomerId(_) => "MF-P011",

            Self::Timeout(_) => "MF-N001",
            Self::Network(_) => "MF-N099",

            Self::Config(_) => "MF-C001",
            Self::UnsupportedLocale(_) => "MF-C002",

            Self::Io(_) => "MF-X001",
            Self::Json(_) => "MF-X002",
        }
    }

    /// Whether some layer of the client retries this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind().is_transient()
    }

    /// Map error to a CLI exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self.kind() {
            ErrorKind::FatalAuth | ErrorKind::TransientAuthExpired => ExitCode::AuthError,
            ErrorKind::Configuration | ErrorKind::MalformedResponse => ExitCode::ParseError,
            ErrorKind::Transport if matches!(self, Self::Timeout(_)) => ExitCode::Timeout,
            _ => ExitCode::GeneralError,
        }
    }
}
