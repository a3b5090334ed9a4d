//! # OTC credential broker
//!
//! Multi-protocol authentication core for the Open Telekom Cloud identity
//! service. Turns a user's identity assertion — browser-based federated
//! login with PKCE, or direct username/password — into a chain of
//! progressively scoped API tokens, and finally into short-lived access-key
//! credentials for cloud-native tooling.
//!
//! The pieces, in flow order:
//!
//! - [`pkce`] — verifier/challenge pairs and anti-CSRF state
//! - [`callback`] — the transient loopback listener the browser redirects to
//! - [`oidc`] — the authorization-code flow end to end
//! - [`iam`] — the direct username/password path
//! - [`identity`] — unscoped → domain-scoped → project-scoped token chain
//! - [`credentials`] — temporary access-key issuance and the shell script
//! - [`cache`] — the persisted unscoped token between invocations
//!
//! Every external call either succeeds or fails the invocation; the broker
//! never retries. The human at the terminal is the retry loop.

pub mod cache;
pub mod callback;
pub mod config;
pub mod credentials;
pub mod error;
pub mod iam;
pub mod identity;
pub mod oidc;
pub mod pkce;
pub mod status;

pub use cache::{TokenCache, TokenCacheEntry, default_cache_path};
pub use callback::{AuthCode, CallbackListener};
pub use config::{AuthConfig, iam_endpoint_for_region};
pub use credentials::TemporaryCredentials;
pub use error::{AuthError, AuthResult};
pub use iam::IamAuthenticator;
pub use identity::{IdentityClient, Project, select_project};
pub use oidc::{OidcAuthenticator, TokenBundle};
pub use pkce::{CodeChallengeMethod, PkceChallenge, generate_state};
pub use status::StatusReporter;
