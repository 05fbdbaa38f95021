use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::error::AuthError;
use super::responses::TokenResponse;

/// Access tokens closer than this to expiry are not reused.
const EXPIRY_MARGIN_MINUTES: i64 = 5;

const MAX_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// Token material persisted between runs.
#[derive(Clone, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

impl CachedToken {
    pub fn from_response(resp: &TokenResponse, now: DateTime<Utc>) -> Self {
        let lifetime = i64::try_from(resp.expires_in)
            .unwrap_or(MAX_LIFETIME_SECS)
            .min(MAX_LIFETIME_SECS);
        Self {
            access_token: resp.access_token.clone(),
            refresh_token: resp.refresh_token.clone(),
            expires_at: now + Duration::seconds(lifetime),
            scope: resp.scope.clone(),
        }
    }

    /// Whether the access token still has more than five minutes left at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > Duration::minutes(EXPIRY_MARGIN_MINUTES)
    }
}

/// Read the cache; a missing, unreadable or corrupt file yields `None`.
pub async fn load(path: &Path) -> Option<CachedToken> {
    let contents = match fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("Could not read token cache {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(token) => {
            tracing::debug!("Loaded token cache from {}", path.display());
            Some(token)
        }
        Err(e) => {
            tracing::warn!(
                "Token cache {} is invalid, starting fresh: {}",
                path.display(),
                e
            );
            None
        }
    }
}

pub async fn save(path: &Path, token: &CachedToken) -> Result<(), AuthError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, serde_json::to_string_pretty(token)?).await?;
    #[cfg(unix)]
    {
        // Refresh tokens grant long-lived access; owner-only.
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)?;
    }
    tracing::debug!("Saved token cache to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn token(expires_at: DateTime<Utc>) -> CachedToken {
        CachedToken {
            access_token: "at".into(),
            refresh_token: Some("rt".into()),
            expires_at,
            scope: Some("Files.Read".into()),
        }
    }

    #[test]
    fn test_expiry_margin() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        assert!(token(now + Duration::minutes(6)).is_valid_at(now));
        assert!(!token(now + Duration::minutes(5)).is_valid_at(now));
        assert!(!token(now - Duration::minutes(1)).is_valid_at(now));
    }

    #[test]
    fn test_from_response() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let resp: TokenResponse = serde_json::from_str(
            r#"{"access_token": "a", "refresh_token": "r", "expires_in": 3599}"#,
        )
        .unwrap();
        let cached = CachedToken::from_response(&resp, now);
        assert_eq!(cached.expires_at, now + Duration::seconds(3599));
        assert_eq!(cached.refresh_token.as_deref(), Some("r"));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let rendered = format!("{:?}", token(Utc::now()));
        assert!(!rendered.contains("\"at\""));
        assert!(!rendered.contains("\"rt\""));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token_cache.json");
        let expires = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
        save(&path, &token(expires)).await.unwrap();

        let loaded = load(&path).await.unwrap();
        assert_eq!(loaded.access_token, "at");
        assert_eq!(loaded.expires_at, expires);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_missing_and_corrupt_cache() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("absent.json")).await.is_none());

        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, "{not json").unwrap();
        assert!(load(&corrupt).await.is_none());
    }
}
