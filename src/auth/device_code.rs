//! OAuth 2.0 device authorization grant.

use std::time::{Duration, Instant};

use reqwest::Client;

use super::endpoints::Endpoints;
use super::error::AuthError;
use super::responses::{DeviceCodeResponse, TokenResponse};
use super::{post_form, request_token};

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Extra wait added to the poll interval on every `slow_down`.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Run the whole flow: request a code, show the sign-in instructions, poll.
pub async fn run(
    http: &Client,
    endpoints: &Endpoints,
    client_id: &str,
    scope: &str,
) -> Result<TokenResponse, AuthError> {
    let device = request_device_code(http, endpoints, client_id, scope).await?;

    let message = device.message.clone().unwrap_or_else(|| {
        format!(
            "To sign in, open {} and enter the code {}",
            device.verification_uri, device.user_code
        )
    });
    println!("\n{}\n", message);

    poll_for_token(http, endpoints, client_id, &device).await
}

pub async fn request_device_code(
    http: &Client,
    endpoints: &Endpoints,
    client_id: &str,
    scope: &str,
) -> Result<DeviceCodeResponse, AuthError> {
    tracing::debug!("Requesting device code from {}", endpoints.device_code);
    let body = post_form(
        http,
        &endpoints.device_code,
        &[("client_id", client_id), ("scope", scope)],
    )
    .await?;
    Ok(serde_json::from_str(&body)?)
}

/// Poll the token endpoint until the user completes sign-in.
///
/// `authorization_pending` keeps polling, `slow_down` widens the interval,
/// anything else ends the flow.
pub async fn poll_for_token(
    http: &Client,
    endpoints: &Endpoints,
    client_id: &str,
    device: &DeviceCodeResponse,
) -> Result<TokenResponse, AuthError> {
    let deadline = Instant::now() + Duration::from_secs(device.expires_in);
    let mut interval = Duration::from_secs(device.interval);

    loop {
        tokio::time::sleep(interval).await;
        if Instant::now() >= deadline {
            return Err(AuthError::Expired);
        }

        let result = request_token(
            http,
            &endpoints.token,
            &[
                ("grant_type", DEVICE_CODE_GRANT),
                ("client_id", client_id),
                ("device_code", &device.device_code),
            ],
        )
        .await;

        match result {
            Ok(token) => return Ok(token),
            Err(e) => match e.oauth_code() {
                Some("authorization_pending") => {
                    tracing::debug!("Waiting for the user to sign in");
                }
                Some("slow_down") => {
                    interval += SLOW_DOWN_STEP;
                    tracing::debug!("Token endpoint asked to slow down, polling every {:?}", interval);
                }
                Some("authorization_declined") | Some("access_denied") => {
                    return Err(AuthError::Declined)
                }
                Some("expired_token") | Some("code_expired") => return Err(AuthError::Expired),
                _ => return Err(e),
            },
        }
    }
}
