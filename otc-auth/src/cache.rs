//! Local token cache
//!
//! Persists the unscoped token and its expiry so subsequent invocations can
//! skip re-authentication. One JSON record at a fixed path under a private
//! per-user directory (0o700 dir, 0o600 file), rewritten on every successful
//! authentication and deleted on logout.
//!
//! A load that finds a past expiry fails closed — callers treat it exactly
//! like a missing file and re-authenticate.

use crate::error::{AuthError, AuthResult};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Freshness buffer applied before trusting a cached expiry, covering clock
/// skew and in-flight request latency.
const EXPIRY_BUFFER_MINUTES: i64 = 5;

/// One cached authentication record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCacheEntry {
    /// The cached unscoped token.
    pub unscoped_token: String,
    /// The identity token it was derived from (federated path) or a copy of
    /// the unscoped token (direct path).
    pub id_token: String,
    /// Refresh token, when the provider issued one.
    pub refresh_token: String,
    /// Absolute expiry of the unscoped token.
    pub expires_at: DateTime<Utc>,
    /// Domain the token was issued for.
    pub domain: String,
    /// Region the token was issued in.
    pub region: String,
}

impl TokenCacheEntry {
    /// Whether the entry is still comfortably inside its lifetime (expiry
    /// at least five minutes away).
    pub fn is_fresh(&self) -> bool {
        Utc::now() + TimeDelta::minutes(EXPIRY_BUFFER_MINUTES) < self.expires_at
    }
}

/// File-backed token cache.
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    /// Cache at an explicit path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Cache at the fixed per-user default, `~/.otc-cli/token.json`.
    pub fn open_default() -> Self {
        Self::new(default_cache_path())
    }

    /// Where this cache reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize the entry, full overwrite, owner-only permissions.
    pub fn save(&self, entry: &TokenCacheEntry) -> AuthResult<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
            }
        }

        let data = serde_json::to_vec_pretty(entry)?;
        fs::write(&self.path, data)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Load the cached entry. Fails with [`AuthError::TokenExpired`] when
    /// the stored expiry is already in the past; callers treat that
    /// identically to a missing file.
    pub fn load(&self) -> AuthResult<TokenCacheEntry> {
        let data = fs::read(&self.path)?;
        let entry: TokenCacheEntry = serde_json::from_slice(&data)?;

        if entry.expires_at <= Utc::now() {
            return Err(AuthError::TokenExpired);
        }

        Ok(entry)
    }

    /// Delete the cache file. Deleting a nonexistent file surfaces the I/O
    /// error so "logout with nothing cached" stays distinguishable.
    pub fn clear(&self) -> AuthResult<()> {
        fs::remove_file(&self.path)?;
        Ok(())
    }
}

/// Fixed cache location under the user's home directory.
pub fn default_cache_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".otc-cli")
        .join("token.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(expires_at: DateTime<Utc>) -> TokenCacheEntry {
        TokenCacheEntry {
            unscoped_token: "unscoped-123".to_string(),
            id_token: "id-456".to_string(),
            refresh_token: "refresh-789".to_string(),
            expires_at,
            domain: "OTC-EU-DE-000000".to_string(),
            region: "eu-de".to_string(),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("token.json"));

        let saved = entry(Utc::now() + TimeDelta::hours(1));
        cache.save(&saved).unwrap();
        let loaded = cache.load().unwrap();

        assert_eq!(loaded, saved);
    }

    #[test]
    fn past_expiry_fails_like_a_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("token.json"));

        cache.save(&entry(Utc::now() - TimeDelta::hours(1))).unwrap();
        assert!(matches!(cache.load(), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn load_without_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("token.json"));
        assert!(matches!(cache.load(), Err(AuthError::Io(_))));
    }

    #[test]
    fn clear_surfaces_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("token.json"));

        cache.save(&entry(Utc::now() + TimeDelta::hours(1))).unwrap();
        cache.clear().unwrap();
        assert!(cache.clear().is_err());
    }

    #[test]
    fn freshness_applies_the_five_minute_buffer() {
        assert!(entry(Utc::now() + TimeDelta::hours(1)).is_fresh());
        assert!(!entry(Utc::now() + TimeDelta::minutes(3)).is_fresh());
        assert!(!entry(Utc::now() - TimeDelta::minutes(1)).is_fresh());
    }

    #[cfg(unix)]
    #[test]
    fn cache_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("token.json"));
        cache.save(&entry(Utc::now() + TimeDelta::hours(1))).unwrap();

        let mode = fs::metadata(cache.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
