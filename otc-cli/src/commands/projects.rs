//! The `projects` command: show what the domain token can see.

use super::helper;
use crate::cli::ProjectsArgs;
use anyhow::{Context, Result};
use otc_auth::IdentityClient;

pub async fn projects(args: ProjectsArgs) -> Result<()> {
    let cfg = args.config.to_config();

    let entry = helper::ensure_authenticated(&cfg).await?;
    let identity = IdentityClient::new(&cfg);

    let domain_token = identity
        .get_domain_scoped_token(&entry.unscoped_token)
        .await
        .context("failed to get domain token")?;
    let projects = identity
        .list_projects(&domain_token)
        .await
        .context("failed to list projects")?;

    if projects.is_empty() {
        println!("no projects found for domain {}", cfg.domain_name);
        return Ok(());
    }

    for project in projects {
        println!("{}  {}", project.id, project.name);
    }
    Ok(())
}
