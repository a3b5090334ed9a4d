//! Browser-based OAuth2 authorization-code flow with PKCE
//!
//! Public-client flow: no client secret, the code verifier is the proof of
//! possession. The caller owns the callback listener so that it stays
//! available after a failure — the final status message can still reach the
//! open browser tab before the listener closes.

use crate::callback::CallbackListener;
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::pkce::{CodeChallengeMethod, PkceChallenge, generate_state};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// How long the flow waits for the browser redirect.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Token bundle returned by the identity provider's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenBundle {
    /// OAuth access token.
    #[serde(default)]
    pub access_token: String,
    /// OIDC identity token; this is what the federation exchange consumes.
    #[serde(default)]
    pub id_token: String,
    /// Refresh token, if the provider issued one.
    #[serde(default)]
    pub refresh_token: String,
    /// Token type, normally "Bearer".
    #[serde(default)]
    pub token_type: String,
    /// Lifetime of the access token in seconds, when the provider says.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenBundle {
    /// Absolute expiry to cache the derived unscoped token under:
    /// `expires_in` when the provider reported one, else a conservative
    /// one hour.
    pub fn cache_expiry(&self) -> DateTime<Utc> {
        match self.expires_in {
            Some(secs) => Utc::now() + TimeDelta::seconds(secs as i64),
            None => Utc::now() + TimeDelta::hours(1),
        }
    }
}

/// Drives the authorization-code-with-PKCE flow end to end.
pub struct OidcAuthenticator<'a> {
    cfg: &'a AuthConfig,
    http: reqwest::Client,
}

impl<'a> OidcAuthenticator<'a> {
    /// Build an authenticator over the given configuration.
    pub fn new(cfg: &'a AuthConfig) -> Self {
        Self {
            cfg,
            http: reqwest::Client::new(),
        }
    }

    /// Run the full flow: PKCE + state, authorization URL, browser launch,
    /// callback wait (5 minutes), code-for-token exchange.
    ///
    /// The listener must not have been started yet; it is bound here so a
    /// port conflict surfaces before a browser opens. On return — success or
    /// failure — the caller still owns the listener and is responsible for
    /// pushing a final status and closing it.
    pub async fn authenticate(&self, listener: &mut CallbackListener) -> AuthResult<TokenBundle> {
        let method = CodeChallengeMethod::parse_lossy(&self.cfg.code_challenge_method);
        let pkce = PkceChallenge::generate(method);
        let state = generate_state();

        listener.start().await?;
        let redirect_uri = listener.redirect_uri();
        let auth_url = self.authorization_url(&pkce, &state, &redirect_uri)?;

        if self.cfg.no_browser {
            eprintln!("Open this URL in your browser to continue:\n  {auth_url}");
        } else if open::that(auth_url.as_str()).is_err() {
            eprintln!("Could not open a browser automatically. Please visit:\n  {auth_url}");
        } else {
            debug!("browser opened for authentication");
        }

        let auth_code = listener.wait_for_code(CALLBACK_TIMEOUT).await?;

        // The provider must echo the state generated at flow start. A
        // mismatch means the code belongs to somebody else's login attempt.
        if auth_code.state != state {
            return Err(AuthError::StateMismatch);
        }

        self.exchange_code(&auth_code.code, &redirect_uri, &pkce.verifier)
            .await
    }

    fn authorization_url(
        &self,
        pkce: &PkceChallenge,
        state: &str,
        redirect_uri: &str,
    ) -> AuthResult<Url> {
        let mut url = Url::parse(&format!(
            "{}/protocol/openid-connect/auth",
            self.cfg.idp_url
        ))
        .map_err(|e| AuthError::Config(format!("invalid IDP_URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.cfg.idp_client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.cfg.scopes)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", state)
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", pkce.method.as_str());

        Ok(url)
    }

    /// Back-channel exchange of the authorization code for the token bundle.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> AuthResult<TokenBundle> {
        let token_url = format!("{}/protocol/openid-connect/token", self.cfg.idp_url);

        let resp = self
            .http
            .post(&token_url)
            .timeout(Duration::from_secs(10))
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.cfg.idp_client_id.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("code_verifier", code_verifier),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Protocol {
                context: "token exchange".to_string(),
                detail: format!("{status}: {body}"),
            });
        }

        Ok(resp.json::<TokenBundle>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;

    fn test_config() -> AuthConfig {
        AuthConfig {
            idp_url: "https://idp.example.com/realms/cloud".to_string(),
            idp_client_id: "otc-cli".to_string(),
            scopes: "openid email".to_string(),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn authorization_url_carries_all_flow_parameters() {
        let cfg = test_config();
        let auth = OidcAuthenticator::new(&cfg);
        let pkce = PkceChallenge::generate(CodeChallengeMethod::S256);
        let url = auth
            .authorization_url(&pkce, "xyzstate", "http://localhost:9197/oidc/auth")
            .unwrap();

        assert!(url.as_str().starts_with(
            "https://idp.example.com/realms/cloud/protocol/openid-connect/auth?"
        ));
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("client_id"), Some("otc-cli"));
        assert_eq!(get("response_type"), Some("code"));
        assert_eq!(get("scope"), Some("openid email"));
        assert_eq!(get("redirect_uri"), Some("http://localhost:9197/oidc/auth"));
        assert_eq!(get("state"), Some("xyzstate"));
        assert_eq!(get("code_challenge"), Some(pkce.challenge.as_str()));
        assert_eq!(get("code_challenge_method"), Some("S256"));
    }

    #[test]
    fn malformed_idp_url_is_a_config_error() {
        let cfg = AuthConfig {
            idp_url: "not a url".to_string(),
            ..test_config()
        };
        let auth = OidcAuthenticator::new(&cfg);
        let pkce = PkceChallenge::generate(CodeChallengeMethod::S256);
        let err = auth
            .authorization_url(&pkce, "s", "http://localhost:1/oidc/auth")
            .unwrap_err();
        assert!(matches!(err, AuthError::Config(_)));
    }

    #[test]
    fn token_bundle_tolerates_missing_optional_fields() {
        let bundle: TokenBundle =
            serde_json::from_str(r#"{"access_token":"at","id_token":"idt"}"#).unwrap();
        assert_eq!(bundle.access_token, "at");
        assert_eq!(bundle.id_token, "idt");
        assert!(bundle.refresh_token.is_empty());
        assert_eq!(bundle.expires_in, None);
    }

    #[test]
    fn cache_expiry_follows_expires_in() {
        let bundle: TokenBundle =
            serde_json::from_str(r#"{"id_token":"idt","expires_in":7200}"#).unwrap();
        let expiry = bundle.cache_expiry();
        let delta = expiry - Utc::now();
        assert!(delta > TimeDelta::seconds(7190) && delta <= TimeDelta::seconds(7200));
    }

    #[test]
    fn cache_expiry_defaults_to_one_conservative_hour() {
        let bundle: TokenBundle = serde_json::from_str(r#"{"id_token":"idt"}"#).unwrap();
        let delta = bundle.cache_expiry() - Utc::now();
        assert!(delta > TimeDelta::minutes(59) && delta <= TimeDelta::hours(1));
    }
}
