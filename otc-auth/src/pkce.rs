//! PKCE (Proof Key for Code Exchange) and anti-CSRF state generation
//!
//! RFC 7636: Proof Key for Code Exchange by OAuth Public Clients.
//! The verifier is generated once per login attempt and only ever leaves the
//! process in the final back-channel token exchange; the challenge is what
//! travels in the authorization request.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// PKCE code challenge method (RFC 7636 Section 4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodeChallengeMethod {
    /// `BASE64URL(SHA256(verifier))` — the only method suitable for
    /// production use.
    #[default]
    S256,
    /// Challenge equals the verifier. The secret travels in the
    /// authorization request itself, so this is development-only.
    Plain,
}

impl CodeChallengeMethod {
    /// Parse a configured method string. Unrecognized values fall back to
    /// S256 rather than erroring: the safe method is also the safe default.
    pub fn parse_lossy(s: &str) -> Self {
        match s {
            "plain" => Self::Plain,
            _ => Self::S256,
        }
    }

    /// Wire representation used in the authorization request.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

/// A verifier/challenge pair bound to one login attempt.
///
/// Created per attempt and discarded after the token exchange, whether it
/// succeeded or not.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// The secret; sent only in the back-channel token exchange.
    pub verifier: String,
    /// The derived value sent in the authorization request.
    pub challenge: String,
    /// Method that produced `challenge`.
    pub method: CodeChallengeMethod,
}

impl PkceChallenge {
    /// Generate a fresh verifier (32 bytes from a CSPRNG, URL-safe base64)
    /// and derive the challenge with the given method.
    pub fn generate(method: CodeChallengeMethod) -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let verifier = base64_url::encode(&bytes);

        let challenge = match method {
            CodeChallengeMethod::S256 => {
                let mut hasher = Sha256::new();
                hasher.update(verifier.as_bytes());
                base64_url::encode(&hasher.finalize())
            }
            CodeChallengeMethod::Plain => verifier.clone(),
        };

        Self {
            verifier,
            challenge,
            method,
        }
    }
}

/// Generate a random state parameter for CSRF protection (128 bits).
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64_url::encode(&bytes)
}
