//! The `credentials` command: temporary access keys with a caller-chosen
//! lifetime, reusing the cached token when possible.

use super::helper;
use crate::cli::CredentialArgs;
use anyhow::Result;

pub async fn credentials(args: CredentialArgs) -> Result<()> {
    let cfg = args.config.to_config();

    let entry = helper::ensure_authenticated(&cfg).await?;
    helper::issue_credentials(&cfg, &entry.unscoped_token, &args.project, args.duration).await
}
