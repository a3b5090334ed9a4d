//! Error types for the credential broker
//!
//! Every failure in the broker is terminal for the invocation: there are no
//! retries, and the CLI exits non-zero with the message. Protocol failures
//! always carry the raw diagnostic (status code and response body) so
//! operators can see what the identity service actually said.

use thiserror::Error;

/// Convenience result alias used throughout the crate.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors produced by the authentication core.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required setting is absent or invalid. Reported before the flow
    /// starts; missing settings are listed together, not one at a time.
    #[error("{0}")]
    Config(String),

    /// Caller-supplied input was rejected before any network call.
    #[error("{0}")]
    Input(String),

    /// The callback listener could not bind its local port.
    #[error("failed to bind callback listener on port {port}: {source}")]
    Bind {
        /// The configured redirect port.
        port: u16,
        /// The underlying bind error.
        #[source]
        source: std::io::Error,
    },

    /// Transport-level failure talking to the IdP or identity service.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with an error; the raw diagnostic is
    /// preserved verbatim.
    #[error("{context} failed: {detail}")]
    Protocol {
        /// Which step failed (e.g. "token exchange").
        context: String,
        /// Status code and/or response body from the service.
        detail: String,
    },

    /// The identity provider redirected back with an OAuth error.
    #[error("authorization failed: {error}: {description}")]
    Oauth {
        /// The OAuth error code (e.g. "access_denied").
        error: String,
        /// Human-readable description, if the provider sent one.
        description: String,
    },

    /// No callback arrived within the flow's wait window.
    #[error("timeout waiting for callback")]
    CallbackTimeout,

    /// The state echoed by the identity provider does not match the one
    /// generated at flow start.
    #[error("callback state does not match login attempt (possible CSRF)")]
    StateMismatch,

    /// The service reported success but the X-Subject-Token header was
    /// missing from the response.
    #[error("no token in response")]
    NoToken,

    /// A cached token's stored expiry is already in the past. Callers treat
    /// this identically to a missing cache file.
    #[error("cached token expired")]
    TokenExpired,

    /// Filesystem failure reading or writing local state.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON in a response body or the cache file.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
