//! REST client for the hosted identity endpoint.
//!
//! The backend exposes an identity-toolkit style API: email/password
//! exchange for an ID token, account creation, and out-of-band
//! password-reset emails. All calls are keyed.

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::Identity;
use crate::config::Config;

use super::ApiError;

/// Default base URL for the identity endpoint
const AUTH_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// HTTP request timeout in seconds.
/// 30s allows for slow mobile networks while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResetRequest<'a> {
    request_type: &'a str,
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(rename = "localId")]
    local_id: String,
    email: Option<String>,
    #[serde(rename = "idToken")]
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Client for the identity endpoint.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AuthClient {
    /// Create a new client with the given API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: AUTH_BASE_URL.to_string(),
            api_key: api_key.into(),
        })
    }

    /// Build a client from the app config, honoring environment overrides
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.api_key().context("No auth API key configured")?;
        let mut client = Self::new(api_key)?;
        if let Some(url) = config.api_base_url() {
            client.base_url = url;
        }
        Ok(client)
    }

    /// Sign in with email and password, returning the authenticated identity
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ApiError> {
        debug!(%email, "Signing in");
        let url = self.endpoint("accounts:signInWithPassword");
        let response = self
            .client
            .post(&url)
            .json(&CredentialsRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        Self::parse_token_response(response).await
    }

    /// Create an account with email and password and sign it in
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, ApiError> {
        debug!(%email, "Creating account");
        let url = self.endpoint("accounts:signUp");
        let response = self
            .client
            .post(&url)
            .json(&CredentialsRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        Self::parse_token_response(response).await
    }

    /// Ask the backend to email a password-reset link
    pub async fn send_password_reset(&self, email: &str) -> Result<(), ApiError> {
        debug!(%email, "Requesting password reset email");
        let url = self.endpoint("accounts:sendOobCode");
        let response = self
            .client
            .post(&url)
            .json(&PasswordResetRequest {
                request_type: "PASSWORD_RESET",
                email,
            })
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}?key={}", self.base_url, action, self.api_key)
    }

    async fn parse_token_response(response: Response) -> Result<Identity, ApiError> {
        let response = Self::check_response(response).await?;
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        Ok(Identity {
            uid: body.local_id,
            email: body.email,
            id_token: body.id_token,
        })
    }

    /// Map an error response to a typed `ApiError`.
    ///
    /// The endpoint reports failures as a JSON body with an upper-case
    /// code in `error.message`; anything else falls back to the HTTP
    /// status.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if let Ok(parsed) = serde_json::from_str::<ErrorBody>(&body) {
            return Err(ApiError::from_error_code(&parsed.error.message));
        }
        Err(ApiError::from_status(status, &body))
    }
}
