//! Broker configuration
//!
//! One explicit struct, built once at startup from layered sources
//! (flag > environment > built-in default) and passed by reference into
//! every core call. The core itself never reads the environment.

use crate::error::{AuthError, AuthResult};

/// Default region when none is configured.
pub const DEFAULT_REGION: &str = "eu-de";

/// Default local port for the OAuth redirect listener.
pub const DEFAULT_REDIRECT_PORT: u16 = 9197;

/// Default output file stem for the credential shell script.
pub const DEFAULT_OUTPUT_FILE: &str = "otc-credentials";

/// Default OIDC scopes requested in the authorization request.
pub const DEFAULT_SCOPES: &str = "openid email profile roles groups organization";

/// Settings consumed by the authentication core.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Identity provider base URL (the Keycloak-style realm URL).
    pub idp_url: String,
    /// OAuth client id registered at the identity provider.
    pub idp_client_id: String,
    /// Name of the identity provider as registered with the cloud's
    /// federation service.
    pub idp_provider_name: String,
    /// Federation protocol, "oidc" or "saml".
    pub idp_protocol: String,
    /// Cloud domain (tenant) name.
    pub domain_name: String,
    /// Identity service endpoint; derived from the region when unset.
    pub auth_url: String,
    /// Cloud region.
    pub region: String,
    /// Local port the callback listener binds.
    pub redirect_port: u16,
    /// Output file stem for the credential shell script.
    pub output_file: String,
    /// Print the authorization URL instead of opening a browser.
    pub no_browser: bool,
    /// PKCE method, "S256" or "plain".
    pub code_challenge_method: String,
    /// Space-separated OIDC scopes.
    pub scopes: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            idp_url: String::new(),
            idp_client_id: String::new(),
            idp_provider_name: String::new(),
            idp_protocol: "oidc".to_string(),
            domain_name: String::new(),
            auth_url: iam_endpoint_for_region(DEFAULT_REGION),
            region: DEFAULT_REGION.to_string(),
            redirect_port: DEFAULT_REDIRECT_PORT,
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            no_browser: false,
            code_challenge_method: "S256".to_string(),
            scopes: DEFAULT_SCOPES.to_string(),
        }
    }
}

/// Identity endpoint for a region. `eu-ch2` uses the public Swiss endpoint.
pub fn iam_endpoint_for_region(region: &str) -> String {
    match region {
        "eu-ch2" => "https://iam-pub.eu-ch2.sc.otc.t-systems.com".to_string(),
        _ => format!("https://iam.{region}.otc.t-systems.com"),
    }
}

impl AuthConfig {
    /// Validate everything the federated flow needs. All missing settings
    /// are reported together so the user can fix them in one pass.
    pub fn validate_federated(&self) -> AuthResult<()> {
        let mut missing = Vec::new();
        if self.domain_name.is_empty() {
            missing.push("OS_DOMAIN_NAME / --domain-name");
        }
        if self.idp_url.is_empty() {
            missing.push("IDP_URL / --idp-url");
        }
        if self.idp_client_id.is_empty() {
            missing.push("IDP_CLIENT_ID / --idp-client-id");
        }
        if self.idp_provider_name.is_empty() {
            missing.push("IDP_PROVIDER_NAME / --idp-provider");
        }
        if !missing.is_empty() {
            return Err(AuthError::Config(format!(
                "missing required configuration: {}",
                missing.join(", ")
            )));
        }
        self.validate_code_challenge_method()
    }

    /// Validate everything the direct IAM flow needs.
    pub fn validate_iam(&self) -> AuthResult<()> {
        if self.domain_name.is_empty() {
            return Err(AuthError::Config(
                "OS_DOMAIN_NAME / --domain-name is not configured".to_string(),
            ));
        }
        if self.auth_url.is_empty() {
            return Err(AuthError::Config(
                "OS_AUTH_URL / --auth-url is not configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Reject method strings that are neither "S256" nor "plain".
    ///
    /// Note the asymmetry with [`crate::pkce::CodeChallengeMethod::parse_lossy`]:
    /// configuration is validated strictly up front, while the generator
    /// falls back to S256 if handed something unexpected anyway.
    pub fn validate_code_challenge_method(&self) -> AuthResult<()> {
        match self.code_challenge_method.as_str() {
            "S256" | "plain" => Ok(()),
            other => Err(AuthError::Config(format!(
                "invalid code_challenge_method: {other} (must be S256 or plain)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_derives_iam_endpoint() {
        assert_eq!(
            iam_endpoint_for_region("eu-de"),
            "https://iam.eu-de.otc.t-systems.com"
        );
        assert_eq!(
            iam_endpoint_for_region("eu-nl"),
            "https://iam.eu-nl.otc.t-systems.com"
        );
        assert_eq!(
            iam_endpoint_for_region("eu-ch2"),
            "https://iam-pub.eu-ch2.sc.otc.t-systems.com"
        );
    }

    #[test]
    fn federated_validation_lists_all_missing_settings() {
        let cfg = AuthConfig {
            domain_name: String::new(),
            idp_url: String::new(),
            idp_client_id: String::new(),
            idp_provider_name: String::new(),
            ..AuthConfig::default()
        };

        let err = cfg.validate_federated().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("OS_DOMAIN_NAME"));
        assert!(msg.contains("IDP_URL"));
        assert!(msg.contains("IDP_CLIENT_ID"));
        assert!(msg.contains("IDP_PROVIDER_NAME"));
    }

    #[test]
    fn federated_validation_passes_when_complete() {
        let cfg = AuthConfig {
            domain_name: "OTC-EU-DE-000000".to_string(),
            idp_url: "https://idp.example.com/realms/cloud".to_string(),
            idp_client_id: "otc-cli".to_string(),
            idp_provider_name: "corp-idp".to_string(),
            ..AuthConfig::default()
        };
        assert!(cfg.validate_federated().is_ok());
    }

    #[test]
    fn invalid_challenge_method_is_rejected_up_front() {
        let cfg = AuthConfig {
            code_challenge_method: "md5".to_string(),
            ..AuthConfig::default()
        };
        let err = cfg.validate_code_challenge_method().unwrap_err();
        assert!(err.to_string().contains("md5"));
    }

    #[test]
    fn iam_validation_names_the_missing_setting() {
        let cfg = AuthConfig {
            domain_name: String::new(),
            ..AuthConfig::default()
        };
        let err = cfg.validate_iam().unwrap_err();
        assert!(err.to_string().contains("OS_DOMAIN_NAME"));
    }
}
