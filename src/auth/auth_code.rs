//! OAuth 2.0 authorization-code grant for confidential clients.
//!
//! The user opens the authorize URL, signs in, and pastes the URL the browser
//! was redirected to (or just the `code` value) back into the terminal.

use std::io::{self, Write};

use rand::distr::{Alphanumeric, SampleString};
use reqwest::Client;
use url::Url;

use super::endpoints::Endpoints;
use super::error::AuthError;
use super::request_token;
use super::responses::TokenResponse;

/// Client registration used to redeem a code.
#[derive(Debug, Clone, Copy)]
pub struct ConfidentialClient<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub redirect_uri: &'a str,
}

pub async fn run(
    http: &Client,
    endpoints: &Endpoints,
    app: ConfidentialClient<'_>,
    scope: &str,
) -> Result<TokenResponse, AuthError> {
    let state = Alphanumeric.sample_string(&mut rand::rng(), 16);
    let url = authorize_url(endpoints, app.client_id, app.redirect_uri, scope, &state)?;

    println!("\nOpen this URL in a browser and sign in:\n{}\n", url);

    let input = tokio::task::spawn_blocking(|| {
        print!("Paste the full URL you were redirected to: ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        Ok::<String, io::Error>(line.trim().to_string())
    })
    .await
    .map_err(io::Error::other)??;

    let code = extract_code(&input, &state)?;
    exchange_code(http, endpoints, app, scope, &code).await
}

pub fn authorize_url(
    endpoints: &Endpoints,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    state: &str,
) -> Result<Url, AuthError> {
    Url::parse_with_params(
        &endpoints.authorize,
        &[
            ("client_id", client_id),
            ("response_type", "code"),
            ("redirect_uri", redirect_uri),
            ("response_mode", "query"),
            ("scope", scope),
            ("state", state),
        ],
    )
    .map_err(|e| AuthError::InvalidEndpoint(format!("{}: {}", endpoints.authorize, e)))
}

/// Pull the authorization code out of a redirected URL, or accept a bare code.
///
/// A `state` present in the URL must match the one that was sent.
pub fn extract_code(input: &str, expected_state: &str) -> Result<String, AuthError> {
    let input = input.trim();
    if let Ok(url) = Url::parse(input) {
        let mut code = None;
        let mut state = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => {
                    return Err(AuthError::OAuth {
                        error: value.into_owned(),
                        description: url
                            .query_pairs()
                            .find(|(k, _)| k == "error_description")
                            .map(|(_, v)| v.into_owned())
                            .unwrap_or_default(),
                    })
                }
                _ => {}
            }
        }
        if state.as_deref().is_some_and(|s| s != expected_state) {
            return Err(AuthError::StateMismatch);
        }
        return code
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::NoAuthorizationCode);
    }

    if input.is_empty() || input.chars().any(char::is_whitespace) {
        return Err(AuthError::NoAuthorizationCode);
    }
    Ok(input.to_string())
}

pub async fn exchange_code(
    http: &Client,
    endpoints: &Endpoints,
    app: ConfidentialClient<'_>,
    scope: &str,
    code: &str,
) -> Result<TokenResponse, AuthError> {
    request_token(
        http,
        &endpoints.token,
        &[
            ("grant_type", "authorization_code"),
            ("client_id", app.client_id),
            ("client_secret", app.client_secret),
            ("redirect_uri", app.redirect_uri),
            ("scope", scope),
            ("code", code),
        ],
    )
    .await
}
