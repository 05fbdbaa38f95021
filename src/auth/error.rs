use thiserror::Error;

/// Errors raised while obtaining a Microsoft identity platform token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No client id configured; pass --client-id or set GRAPH_CLIENT_ID")]
    MissingClientId,

    #[error("The authorization-code flow needs a client secret; pass --client-secret or set GRAPH_CLIENT_SECRET")]
    MissingClientSecret,

    #[error("Invalid tenant '{0}'")]
    InvalidTenant(String),

    #[error("Invalid endpoint URL {0}")]
    InvalidEndpoint(String),

    #[error("Sign-in was declined")]
    Declined,

    #[error("The device code expired before sign-in completed")]
    Expired,

    #[error("No authorization code found in the redirected URL")]
    NoAuthorizationCode,

    #[error("State mismatch in the redirected URL")]
    StateMismatch,

    #[error("Token endpoint error {error}: {description}")]
    OAuth { error: String, description: String },

    #[error("Unexpected response from the token endpoint (HTTP {status}): {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AuthError {
    /// OAuth error code, when the token endpoint returned one.
    pub fn oauth_code(&self) -> Option<&str> {
        match self {
            AuthError::OAuth { error, .. } => Some(error),
            _ => None,
        }
    }
}
