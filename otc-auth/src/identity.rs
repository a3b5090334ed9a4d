//! Identity-service client: federated exchange, token scoping, projects
//!
//! The shared backbone both entry paths funnel into. An unscoped token is
//! re-authenticated into a domain-scoped token (which can list projects but
//! not touch them) and finally into a project-scoped token (which resource
//! and credential operations require).
//!
//! The identity service returns tokens in the `X-Subject-Token` response
//! header, not the body; a success status without that header is an error.

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::status::StatusReporter;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Response header carrying newly issued tokens.
pub const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Request timeout for identity-service calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A project the authenticated domain can see.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Project {
    /// Service-assigned project id.
    pub id: String,
    /// Human-readable project name.
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ProjectList {
    projects: Vec<Project>,
}

/// Client for the cloud's identity (IAM) service.
pub struct IdentityClient<'a> {
    cfg: &'a AuthConfig,
    http: reqwest::Client,
}

impl<'a> IdentityClient<'a> {
    /// Build a client over the given configuration.
    pub fn new(cfg: &'a AuthConfig) -> Self {
        Self {
            cfg,
            http: reqwest::Client::new(),
        }
    }

    pub(crate) fn config(&self) -> &AuthConfig {
        self.cfg
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.http
    }

    /// Exchange a federation identity token for an unscoped token.
    ///
    /// The assertion travels in a `Bearer` Authorization header for OIDC,
    /// or in `X-Auth-Token` for SAML. Progress is pushed through `status`
    /// at the pending/success/failure points so the browser tab stays in
    /// sync while the CLI works.
    pub async fn get_unscoped_token(
        &self,
        id_token: &str,
        status: Option<&dyn StatusReporter>,
    ) -> AuthResult<String> {
        let protocol = if self.cfg.idp_protocol.is_empty() {
            "oidc"
        } else {
            self.cfg.idp_protocol.as_str()
        };
        let url = format!(
            "{}/v3/OS-FEDERATION/identity_providers/{}/protocols/{}/auth",
            self.cfg.auth_url, self.cfg.idp_provider_name, protocol
        );

        debug!(protocol, "validating organization access");
        if let Some(s) = status {
            s.report("pending", "Validating...");
        }

        let req = self.http.post(&url).timeout(REQUEST_TIMEOUT);
        let req = if protocol == "saml" {
            req.header("X-Auth-Token", id_token)
        } else {
            req.bearer_auth(id_token)
        };

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => {
                if let Some(s) = status {
                    s.report("failed", "Network error");
                }
                return Err(e.into());
            }
        };

        let http_status = resp.status();
        if http_status != StatusCode::OK && http_status != StatusCode::CREATED {
            let body = resp.text().await.unwrap_or_default();
            let message = extract_error_message(&body);
            if let Some(s) = status {
                s.report("failed", &message);
                // Let the browser's next poll pick up the failure before
                // the flow tears the listener down.
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            return Err(AuthError::Protocol {
                context: "organization validation".to_string(),
                detail: message,
            });
        }

        let token = subject_token(&resp)?;
        if let Some(s) = status {
            s.report("success", "Your organization has been validated successfully!");
        }
        Ok(token)
    }

    /// Re-authenticate an unscoped token into a domain-scoped token.
    pub async fn get_domain_scoped_token(&self, unscoped_token: &str) -> AuthResult<String> {
        let payload = json!({
            "auth": {
                "identity": {
                    "methods": ["token"],
                    "token": { "id": unscoped_token }
                },
                "scope": {
                    "domain": { "name": self.cfg.domain_name }
                }
            }
        });
        self.scoped_token_request(payload, "domain-scoped token request")
            .await
    }

    /// Re-authenticate an unscoped token into a project-scoped token.
    pub async fn get_project_scoped_token(
        &self,
        unscoped_token: &str,
        project_id: &str,
    ) -> AuthResult<String> {
        let payload = json!({
            "auth": {
                "identity": {
                    "methods": ["token"],
                    "token": { "id": unscoped_token }
                },
                "scope": {
                    "project": { "id": project_id }
                }
            }
        });
        self.scoped_token_request(payload, "project-scoped token request")
            .await
    }

    /// List the projects visible to a domain-scoped token, in the exact
    /// order the service returned them.
    pub async fn list_projects(&self, domain_token: &str) -> AuthResult<Vec<Project>> {
        let url = format!("{}/v3/auth/projects", self.cfg.auth_url);

        let resp = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("Content-Type", "application/json")
            .header("X-Auth-Token", domain_token)
            .send()
            .await?;

        let http_status = resp.status();
        if http_status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Protocol {
                context: "project listing".to_string(),
                detail: format!("{http_status}: {body}"),
            });
        }

        let list: ProjectList = resp.json().await?;
        Ok(list.projects)
    }

    /// Shared shape of every scoping call: POST the token-identity body,
    /// require 200/201, pull the token out of the dedicated header.
    async fn scoped_token_request(
        &self,
        payload: serde_json::Value,
        context: &str,
    ) -> AuthResult<String> {
        let url = format!("{}/v3/auth/tokens", self.cfg.auth_url);

        let resp = self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&payload)
            .send()
            .await?;

        let http_status = resp.status();
        if http_status != StatusCode::OK && http_status != StatusCode::CREATED {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Protocol {
                context: context.to_string(),
                detail: format!("{http_status}: {body}"),
            });
        }

        subject_token(&resp)
    }
}

/// Extract the token from the dedicated response header.
pub(crate) fn subject_token(resp: &reqwest::Response) -> AuthResult<String> {
    resp.headers()
        .get(SUBJECT_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .ok_or(AuthError::NoToken)
}

/// Pull the service's own error message out of a failure body, falling back
/// to a generic denial when the body is not the expected shape.
fn extract_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| "Access denied".to_string())
}

/// Resolve a requested project (id or name) against the service's list.
///
/// Exact id or exact name match wins. An unknown value is passed through
/// unchanged with a warning — the caller may know better than the list. An
/// empty request selects the first project in service order. Returns `None`
/// only when there is nothing to select from.
pub fn select_project(projects: &[Project], requested: &str) -> Option<String> {
    if requested.is_empty() {
        return projects.first().map(|p| p.id.clone());
    }

    for project in projects {
        if project.id == requested || project.name == requested {
            return Some(project.id.clone());
        }
    }

    warn!(project = requested, "project not found, using as-is");
    Some(requested.to_string())
}
