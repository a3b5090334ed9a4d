//! The `logout` command: drop the cached token.

use anyhow::Result;
use colored::Colorize;
use otc_auth::{AuthError, TokenCache};

pub async fn logout() -> Result<()> {
    let cache = TokenCache::open_default();

    match cache.clear() {
        Ok(()) => {
            println!("{} logged out", "✓".green());
            Ok(())
        }
        // Nothing cached is not a failure, but the user should know the
        // difference.
        Err(AuthError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("no cached token to clear");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
