//! Direct IAM authentication
//!
//! The alternate entry path: a single round trip exchanging domain name +
//! username + password for an unscoped token, with no browser or PKCE
//! involved.

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::identity::subject_token;
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Password-grant authenticator against the identity service.
pub struct IamAuthenticator<'a> {
    cfg: &'a AuthConfig,
    http: reqwest::Client,
}

impl<'a> IamAuthenticator<'a> {
    /// Build an authenticator over the given configuration.
    pub fn new(cfg: &'a AuthConfig) -> Self {
        Self {
            cfg,
            http: reqwest::Client::new(),
        }
    }

    /// Exchange username/password for an unscoped token.
    ///
    /// Input and configuration problems are reported before any network
    /// call, naming the missing piece.
    pub async fn get_unscoped_token(
        &self,
        username: &str,
        password: &str,
    ) -> AuthResult<String> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::Input(
                "username and password are required".to_string(),
            ));
        }
        self.cfg.validate_iam()?;

        let payload = json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": username,
                            "password": password,
                            "domain": { "name": self.cfg.domain_name }
                        }
                    }
                }
            }
        });

        let url = format!("{}/v3/auth/tokens", self.cfg.auth_url);
        let resp = self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Protocol {
                context: "IAM authentication".to_string(),
                detail: format!("{status}: {body}"),
            });
        }

        subject_token(&resp)
    }

    /// Best-effort liveness probe for a token: try to re-authenticate with
    /// it. Any failure — network, rejection, missing header — means
    /// "invalid"; this is a query, not a command, and never hard-errors.
    pub async fn validate_token(&self, token: &str) -> bool {
        if token.is_empty() || self.cfg.auth_url.is_empty() {
            return false;
        }

        let payload = json!({
            "auth": {
                "identity": {
                    "methods": ["token"],
                    "token": { "id": token }
                }
            }
        });

        let url = format!("{}/v3/auth/tokens", self.cfg.auth_url);
        match self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&payload)
            .send()
            .await
        {
            Ok(resp) => {
                let ok = resp.status().is_success();
                if !ok {
                    debug!(status = %resp.status(), "token validation rejected");
                }
                ok
            }
            Err(e) => {
                debug!("token validation failed: {e}");
                false
            }
        }
    }
}
