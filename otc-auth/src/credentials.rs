//! Temporary access-key credentials
//!
//! Exchanges a project-scoped token for short-lived access-key/secret/
//! session-token credentials, and renders them as a sourceable shell script.
//! One parameterized primitive serves both the interactive login (24 hours)
//! and the generic issuer command (caller-chosen duration).

use crate::error::{AuthError, AuthResult};
use crate::identity::IdentityClient;
use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Short-lived credentials for cloud-native tooling. The terminal artifact
/// of the whole chain — not itself a token.
#[derive(Debug, Clone, Deserialize)]
pub struct TemporaryCredentials {
    /// Access key id.
    pub access: String,
    /// Secret access key.
    pub secret: String,
    /// Session/security token accompanying the key pair.
    #[serde(rename = "securitytoken")]
    pub security_token: String,
    /// Absolute expiry timestamp as reported by the service.
    pub expires_at: String,
}

#[derive(Debug, Deserialize)]
struct CredentialResponse {
    credential: TemporaryCredentials,
}

impl IdentityClient<'_> {
    /// Issue temporary credentials valid for `duration_seconds`, using a
    /// project-scoped token as the auth credential.
    pub async fn create_temporary_credentials(
        &self,
        project_token: &str,
        duration_seconds: u32,
    ) -> AuthResult<TemporaryCredentials> {
        let payload = json!({
            "auth": {
                "identity": {
                    "methods": ["token"],
                    "token": { "duration_seconds": duration_seconds }
                }
            }
        });

        let url = format!(
            "{}/v3.0/OS-CREDENTIAL/securitytokens",
            self.config().auth_url
        );
        let resp = self
            .client()
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("X-Auth-Token", project_token)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Protocol {
                context: "credential issuance".to_string(),
                detail: format!("{status}: {body}"),
            });
        }

        let body: CredentialResponse = resp.json().await?;
        Ok(body.credential)
    }
}

impl TemporaryCredentials {
    /// Render the bundle as a sourceable shell script exporting both the
    /// native `OS_*` names and the S3-compatible `AWS_*` names.
    pub fn shell_script(&self, region: &str) -> String {
        format!(
            r#"#!/bin/bash
# Temporary cloud credentials
# Generated: {generated}
# Expires: {expires}

export OS_REGION_NAME={region}
export OS_ACCESS_KEY="{access}"
export OS_SECRET_KEY="{secret}"
export OS_SECURITY_TOKEN="{token}"

export AWS_ACCESS_KEY_ID="$OS_ACCESS_KEY"
export AWS_SECRET_ACCESS_KEY="$OS_SECRET_KEY"
export AWS_SESSION_TOKEN="$OS_SECURITY_TOKEN"

echo "Temporary credentials loaded (expires {expires}, region {region})"
"#,
            generated = Utc::now().format("%Y-%m-%d %H:%M:%S"),
            expires = self.expires_at,
            access = self.access,
            secret = self.secret,
            token = self.security_token,
        )
    }

    /// Write the shell script with owner-only permissions; the file holds
    /// live secrets.
    pub fn write_shell_script(&self, path: &Path, region: &str) -> AuthResult<()> {
        std::fs::write(path, self.shell_script(region))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
        }

        Ok(())
    }
}
