//! The `login` command: federated OIDC by default, direct IAM with --iam.

use super::helper;
use crate::cli::LoginArgs;
use anyhow::{Context, bail};
use chrono::{TimeDelta, Utc};
use colored::Colorize;
use otc_auth::{AuthConfig, IamAuthenticator, TokenCache, TokenCacheEntry};

/// Interactive logins issue day-long credentials.
const LOGIN_CREDENTIAL_DURATION_SECS: u32 = 86_400;

/// Service-side lifetime of password-issued v3 tokens.
const IAM_TOKEN_LIFETIME_HOURS: i64 = 24;

pub async fn login(args: LoginArgs) -> anyhow::Result<()> {
    let cfg = args.config.to_config();

    if args.iam {
        login_iam(&cfg, args.username, args.password).await
    } else {
        login_federated(&cfg).await
    }
}

async fn login_federated(cfg: &AuthConfig) -> anyhow::Result<()> {
    cfg.validate_federated()?;

    let (bundle, unscoped) = helper::federated_authenticate(cfg).await?;

    let cache = TokenCache::open_default();
    let entry = TokenCacheEntry {
        unscoped_token: unscoped.clone(),
        id_token: bundle.id_token.clone(),
        refresh_token: bundle.refresh_token.clone(),
        expires_at: bundle.cache_expiry(),
        domain: cfg.domain_name.clone(),
        region: cfg.region.clone(),
    };
    helper::save_cache(&cache, &entry);

    helper::issue_credentials(cfg, &unscoped, "", LOGIN_CREDENTIAL_DURATION_SECS).await?;

    println!("{} successfully authenticated", "✓".green());
    Ok(())
}

async fn login_iam(
    cfg: &AuthConfig,
    username: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    // Flag > environment (via clap) > interactive prompt.
    let username = match username {
        Some(u) if !u.is_empty() => u,
        _ => helper::prompt("IAM username")?,
    };
    let password = match password {
        Some(p) if !p.is_empty() => p,
        _ => helper::prompt("IAM password")?,
    };
    if username.is_empty() || password.is_empty() {
        bail!("username and password are required");
    }

    let iam = IamAuthenticator::new(cfg);
    let unscoped = iam
        .get_unscoped_token(&username, &password)
        .await
        .context("IAM authentication failed")?;
    println!("{} IAM authentication successful", "✓".green());

    let cache = TokenCache::open_default();
    let entry = TokenCacheEntry {
        unscoped_token: unscoped.clone(),
        id_token: unscoped.clone(),
        refresh_token: String::new(),
        expires_at: Utc::now() + TimeDelta::hours(IAM_TOKEN_LIFETIME_HOURS),
        domain: cfg.domain_name.clone(),
        region: cfg.region.clone(),
    };
    helper::save_cache(&cache, &entry);

    helper::issue_credentials(cfg, &unscoped, "", LOGIN_CREDENTIAL_DURATION_SECS).await?;

    println!("{} successfully authenticated with IAM", "✓".green());
    Ok(())
}
