//! Authorize call and token wire format
//!
//! One POST to `{instance_url}/v1/authorize` with the API key as a bearer
//! token and an empty JSON body. Exactly one attempt, bounded by the
//! caller-supplied timeout; retries and fallback policy live in
//! [`crate::broker`], not here.

use reqwest::header::{self, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{AUTHORIZE_PATH, DEFAULT_EXPIRES_IN};
use crate::error::ExchangeError;

/// Token handed back to the browser client.
///
/// `mode` is omitted on the live path and `"fallback"` when the grant
/// reuses the API key, matching the wire contract the client expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub token: String,
    /// Seconds until the token expires (delta, not absolute)
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<TokenMode>,
}

/// How the grant was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenMode {
    Live,
    Fallback,
}

impl TokenGrant {
    /// A grant carrying a short-lived token from the authorize endpoint.
    pub fn live(token: String, expires_in: u64) -> Self {
        Self {
            token,
            expires_in,
            mode: None,
        }
    }

    /// A grant that reuses the raw API key as the bearer token. Some
    /// deployments accept the key directly, so handing it out keeps the
    /// client usable when the exchange is down.
    pub fn fallback(api_key: &str) -> Self {
        Self {
            token: api_key.to_owned(),
            expires_in: DEFAULT_EXPIRES_IN,
            mode: Some(TokenMode::Fallback),
        }
    }
}

/// Success body of the authorize endpoint. The token arrives under either
/// `token` or `access_token` depending on the instance; both are accepted,
/// `token` winning when both are present.
#[derive(Debug, Deserialize)]
struct AuthorizeResponse {
    token: Option<String>,
    access_token: Option<String>,
    /// Seconds until expiry; instances may omit it
    expires_in: Option<u64>,
}

impl AuthorizeResponse {
    fn into_token(self) -> Option<String> {
        self.token
            .filter(|t| !t.is_empty())
            .or(self.access_token.filter(|t| !t.is_empty()))
    }
}

/// Perform the single token exchange against `{instance_url}/v1/authorize`.
///
/// The bearer header is pre-shaped by the caller so that a malformed
/// credential is reported as an internal error rather than being conflated
/// with exchange failures. A 2xx body that decodes but carries no token
/// field is an [`ExchangeError::MissingToken`] — an ambiguous success must
/// not be trusted as a token.
pub async fn authorize(
    client: &reqwest::Client,
    bearer: HeaderValue,
    instance_url: &str,
    timeout: Duration,
) -> Result<TokenGrant, ExchangeError> {
    let url = format!("{}{AUTHORIZE_PATH}", instance_url.trim_end_matches('/'));

    let response = client
        .post(&url)
        .header(header::AUTHORIZATION, bearer)
        .header(header::CONTENT_TYPE, "application/json")
        .body("{}")
        .timeout(timeout)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ExchangeError::Status(status));
    }

    let body = response.bytes().await?;
    let parsed: AuthorizeResponse = serde_json::from_slice(&body)?;
    let expires_in = parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
    let token = parsed.into_token().ok_or(ExchangeError::MissingToken)?;

    Ok(TokenGrant::live(token, expires_in))
}
