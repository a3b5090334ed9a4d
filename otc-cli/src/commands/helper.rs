//! Shared flow pieces: the federated dance, the cached-token fast path, and
//! the scoping-to-credentials tail every login variant ends with.

use anyhow::{Context, bail};
use colored::Colorize;
use otc_auth::{
    AuthConfig, AuthError, CallbackListener, IdentityClient, OidcAuthenticator, TokenBundle,
    TokenCache, TokenCacheEntry, select_project,
};
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

/// Run the browser flow and the federated unscoped-token exchange, keeping
/// the still-open browser tab updated through the listener's status channel.
/// The listener is always closed before returning, after a short linger so
/// the tab's next poll can pick up the final status.
pub async fn federated_authenticate(cfg: &AuthConfig) -> anyhow::Result<(TokenBundle, String)> {
    let mut listener = CallbackListener::new(cfg.redirect_port);
    let oidc = OidcAuthenticator::new(cfg);

    let bundle = match oidc.authenticate(&mut listener).await {
        Ok(bundle) => bundle,
        Err(e) => {
            listener.set_validation_status("failed", &format!("Authentication failed: {e}"));
            tokio::time::sleep(Duration::from_secs(2)).await;
            listener.close().await;
            return Err(anyhow::Error::new(e).context("authentication failed"));
        }
    };
    println!("{} authenticated", "✓".green());

    let identity = IdentityClient::new(cfg);
    let unscoped = match identity
        .get_unscoped_token(&bundle.id_token, Some(&listener))
        .await
    {
        Ok(token) => token,
        Err(e) => {
            // The exchange already pushed the failure status and lingered
            // for the browser's next poll.
            listener.close().await;
            return Err(anyhow::Error::new(e).context("failed to get unscoped token"));
        }
    };
    println!("{} organization access validated", "✓".green());

    listener.set_validation_status("success", "All validations passed! Check your terminal.");
    tokio::time::sleep(Duration::from_secs(1)).await;
    listener.close().await;

    Ok((bundle, unscoped))
}

/// Use the cached unscoped token when it is comfortably fresh; otherwise run
/// the federated flow and refresh the cache.
pub async fn ensure_authenticated(cfg: &AuthConfig) -> anyhow::Result<TokenCacheEntry> {
    let cache = TokenCache::open_default();

    match cache.load() {
        Ok(entry) if entry.is_fresh() => {
            println!(
                "{} using cached token (expires {})",
                "✓".green(),
                entry.expires_at.format("%Y-%m-%d %H:%M")
            );
            return Ok(entry);
        }
        Ok(_) | Err(AuthError::TokenExpired) => {
            println!("{} cached token expired or expiring soon", "warn:".yellow());
        }
        Err(e) => tracing::debug!("token cache unavailable: {e}"),
    }
    println!("{} no valid cached token, running login", "warn:".yellow());

    cfg.validate_federated()?;
    let (bundle, unscoped) = federated_authenticate(cfg).await?;

    let entry = TokenCacheEntry {
        unscoped_token: unscoped,
        id_token: bundle.id_token.clone(),
        refresh_token: bundle.refresh_token.clone(),
        expires_at: bundle.cache_expiry(),
        domain: cfg.domain_name.clone(),
        region: cfg.region.clone(),
    };
    save_cache(&cache, &entry);

    Ok(entry)
}

/// Cache persistence is best-effort: a failed save costs a re-login later,
/// not this invocation.
pub fn save_cache(cache: &TokenCache, entry: &TokenCacheEntry) {
    match cache.save(entry) {
        Ok(()) => println!(
            "{} token cached at {}",
            "✓".green(),
            cache.path().display()
        ),
        Err(e) => println!("{} failed to save token cache: {e}", "warn:".yellow()),
    }
}

/// The tail of every login variant: domain token, project selection,
/// project token, temporary credentials, shell script.
pub async fn issue_credentials(
    cfg: &AuthConfig,
    unscoped_token: &str,
    requested_project: &str,
    duration_seconds: u32,
) -> anyhow::Result<()> {
    let identity = IdentityClient::new(cfg);

    let domain_token = identity
        .get_domain_scoped_token(unscoped_token)
        .await
        .context("failed to get domain token")?;
    println!("{} domain token obtained", "✓".green());

    let projects = identity
        .list_projects(&domain_token)
        .await
        .context("failed to list projects")?;
    if projects.is_empty() {
        bail!("no projects found for domain {}", cfg.domain_name);
    }
    println!("{} found {} project(s)", "✓".green(), projects.len());

    let project_id = match select_project(&projects, requested_project) {
        Some(id) => id,
        None => bail!("no project available"),
    };
    match projects.iter().find(|p| p.id == project_id) {
        Some(p) => println!("  using project: {} ({})", p.name.cyan(), p.id),
        None => println!("  using project: {}", project_id.cyan()),
    }

    let project_token = identity
        .get_project_scoped_token(unscoped_token, &project_id)
        .await
        .context("failed to get project token")?;

    let creds = identity
        .create_temporary_credentials(&project_token, duration_seconds)
        .await
        .context("failed to create credentials")?;

    let script_path = format!("{}.sh", cfg.output_file);
    creds
        .write_shell_script(Path::new(&script_path), &cfg.region)
        .context("failed to save credentials")?;

    println!();
    println!("{} credentials saved to {script_path}", "✓".green());
    println!("  expires: {}", creds.expires_at);
    println!();
    println!("Load credentials:");
    println!("  source {script_path}");

    Ok(())
}

/// Read one line from the terminal, trimmed.
pub fn prompt(label: &str) -> anyhow::Result<String> {
    eprint!("{label}: ");
    io::stderr().flush()?;
    let mut buf = String::new();
    io::stdin()
        .read_line(&mut buf)
        .context("failed to read input")?;
    Ok(buf.trim().to_string())
}
