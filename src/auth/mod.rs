//! Microsoft identity platform sign-in for delegated, read-only Graph access.
//!
//! Token acquisition order: cached access token → refresh-token grant →
//! interactive flow (device code by default, authorization code on request).

pub mod auth_code;
pub mod device_code;
pub mod endpoints;
pub mod error;
pub mod responses;
pub mod token_cache;

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;

use self::endpoints::Endpoints;
use self::error::AuthError;
use self::responses::{OAuthErrorResponse, TokenResponse};
use self::token_cache::CachedToken;
use crate::types::AuthFlow;

/// Delegated permissions requested for every flow.
pub const SCOPES: &str = "Files.Read Files.Read.All offline_access";

const AUTH_TIMEOUT_SECS: u64 = 30;

/// Everything needed to sign in; built from the CLI.
#[derive(Clone)]
pub struct AuthConfig {
    pub client_id: String,
    pub tenant: String,
    pub client_secret: Option<String>,
    pub flow: AuthFlow,
    pub redirect_uri: String,
    pub token_cache: PathBuf,
    pub authority_host: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("client_id", &self.client_id)
            .field("tenant", &self.tenant)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("flow", &self.flow)
            .field("redirect_uri", &self.redirect_uri)
            .field("token_cache", &self.token_cache)
            .field("authority_host", &self.authority_host)
            .finish()
    }
}

/// Return a usable access token, signing in interactively only when the cache
/// and refresh token cannot provide one.
pub async fn acquire_token(config: &AuthConfig) -> Result<String, AuthError> {
    if config.client_id.trim().is_empty() {
        return Err(AuthError::MissingClientId);
    }
    let endpoints = Endpoints::for_tenant(&config.authority_host, &config.tenant)?;
    let http = Client::builder()
        .timeout(Duration::from_secs(AUTH_TIMEOUT_SECS))
        .build()?;

    let cached = token_cache::load(&config.token_cache).await;
    if let Some(token) = &cached {
        if token.is_valid_at(Utc::now()) {
            tracing::info!("Using cached access token (expires {})", token.expires_at);
            return Ok(token.access_token.clone());
        }
    }

    if let Some(refresh) = cached.and_then(|t| t.refresh_token) {
        tracing::debug!("Cached access token expired, refreshing");
        match refresh_token(&http, &endpoints, config, &refresh).await {
            Ok(resp) => {
                tracing::info!("Refreshed access token");
                return store(config, &resp, Some(refresh)).await;
            }
            Err(e) => tracing::warn!("Token refresh failed, signing in again: {}", e),
        }
    }

    let resp = match config.flow {
        AuthFlow::DeviceCode => {
            device_code::run(&http, &endpoints, &config.client_id, SCOPES).await?
        }
        AuthFlow::AuthCode => {
            let secret = config
                .client_secret
                .as_deref()
                .filter(|s| !s.is_empty())
                .ok_or(AuthError::MissingClientSecret)?;
            let app = auth_code::ConfidentialClient {
                client_id: &config.client_id,
                client_secret: secret,
                redirect_uri: &config.redirect_uri,
            };
            auth_code::run(&http, &endpoints, app, SCOPES).await?
        }
    };
    tracing::info!("Signed in successfully");
    store(config, &resp, None).await
}

async fn refresh_token(
    http: &Client,
    endpoints: &Endpoints,
    config: &AuthConfig,
    refresh: &str,
) -> Result<TokenResponse, AuthError> {
    let mut form = vec![
        ("grant_type", "refresh_token"),
        ("client_id", config.client_id.as_str()),
        ("refresh_token", refresh),
        ("scope", SCOPES),
    ];
    if let Some(secret) = config.client_secret.as_deref().filter(|s| !s.is_empty()) {
        form.push(("client_secret", secret));
    }
    request_token(http, &endpoints.token, &form).await
}

/// Persist a fresh token, keeping the previous refresh token when the
/// response carries none. A cache write failure is logged, not fatal.
async fn store(
    config: &AuthConfig,
    resp: &TokenResponse,
    previous_refresh: Option<String>,
) -> Result<String, AuthError> {
    let mut token = CachedToken::from_response(resp, Utc::now());
    if token.refresh_token.is_none() {
        token.refresh_token = previous_refresh;
    }
    if let Err(e) = token_cache::save(&config.token_cache, &token).await {
        tracing::warn!(
            "Could not write token cache {}: {}",
            config.token_cache.display(),
            e
        );
    }
    Ok(token.access_token)
}

/// POST a form and return the body of a 2xx response.
///
/// OAuth error bodies become [`AuthError::OAuth`] so callers can branch on
/// the error code.
pub(crate) async fn post_form(
    http: &Client,
    url: &str,
    form: &[(&str, &str)],
) -> Result<String, AuthError> {
    let response = http.post(url).form(form).send().await?;
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }
    match serde_json::from_str::<OAuthErrorResponse>(&body) {
        Ok(err) => Err(AuthError::OAuth {
            description: err.error_description.unwrap_or_default(),
            error: err.error,
        }),
        Err(_) => Err(AuthError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        }),
    }
}

pub(crate) async fn request_token(
    http: &Client,
    token_url: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, AuthError> {
    let body = post_form(http, token_url, form).await?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, cache: PathBuf) -> AuthConfig {
        AuthConfig {
            client_id: "cid".into(),
            tenant: "common".into(),
            client_secret: None,
            flow: AuthFlow::DeviceCode,
            redirect_uri: "http://localhost".into(),
            token_cache: cache,
            authority_host: server.uri(),
        }
    }

    async fn write_cache(path: &std::path::Path, expires_in_minutes: i64, refresh: Option<&str>) {
        let token = CachedToken {
            access_token: "cached-at".into(),
            refresh_token: refresh.map(str::to_string),
            expires_at: Utc::now() + ChronoDuration::minutes(expires_in_minutes),
            scope: None,
        };
        token_cache::save(path, &token).await.unwrap();
    }

    #[tokio::test]
    async fn test_valid_cache_needs_no_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token_cache.json");
        write_cache(&cache, 60, Some("rt")).await;

        let token = acquire_token(&config(&server, cache)).await.unwrap();
        assert_eq!(token, "cached-at");
    }

    #[tokio::test]
    async fn test_expired_cache_uses_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/common/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old-rt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "new-at",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token_cache.json");
        write_cache(&cache, 2, Some("old-rt")).await;

        let token = acquire_token(&config(&server, cache.clone())).await.unwrap();
        assert_eq!(token, "new-at");

        let saved = token_cache::load(&cache).await.unwrap();
        assert_eq!(saved.access_token, "new-at");
        assert_eq!(saved.refresh_token.as_deref(), Some("old-rt"));
        assert!(saved.is_valid_at(Utc::now()));
    }

    #[tokio::test]
    async fn test_missing_client_id_and_secret() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(&server, dir.path().join("c.json"));
        cfg.client_id = " ".into();
        assert!(matches!(
            acquire_token(&cfg).await,
            Err(AuthError::MissingClientId)
        ));

        let mut cfg = config(&server, dir.path().join("c.json"));
        cfg.flow = AuthFlow::AuthCode;
        assert!(matches!(
            acquire_token(&cfg).await,
            Err(AuthError::MissingClientSecret)
        ));
    }

    #[tokio::test]
    async fn test_post_form_maps_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "AADSTS70000"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/html"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let http = Client::new();
        let err = post_form(&http, &format!("{}/oauth", server.uri()), &[])
            .await
            .unwrap_err();
        assert_eq!(err.oauth_code(), Some("invalid_grant"));

        let err = post_form(&http, &format!("{}/html", server.uri()), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UnexpectedStatus { status: 502, .. }));
    }
}
