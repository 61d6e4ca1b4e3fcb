//! Config validation and the token broker
//!
//! The broker is stateless and reentrant: no locks, no cross-request
//! coordination, one outbound call per `acquire`. Connection reuse is the
//! transport's business via the shared `reqwest::Client`.

use reqwest::header::HeaderValue;
use std::time::Duration;
use tracing::{error, info, warn};

use common::Secret;

use crate::constants::AUTHORIZE_TIMEOUT;
use crate::error::ConfigError;
use crate::token::{self, TokenGrant};

/// Borrowed view of configuration that passed validation. Both values are
/// known non-empty.
#[derive(Debug, Clone, Copy)]
pub struct Validated<'a> {
    pub api_key: &'a str,
    pub instance_url: &'a str,
}

/// Check that both required configuration values are present and non-empty.
///
/// First-fail-wins: the credential is checked before the endpoint, so when
/// both are missing only [`ConfigError::MissingCredential`] is surfaced.
/// Emits a diagnostic naming the missing variable; never its contents.
pub fn validate<'a>(
    api_key: Option<&'a Secret<String>>,
    instance_url: Option<&'a str>,
) -> Result<Validated<'a>, ConfigError> {
    let Some(api_key) = api_key
        .map(|key| key.expose().as_str())
        .filter(|key| !key.is_empty())
    else {
        error!("WXO_API_KEY is missing or empty, token exchange not attempted");
        return Err(ConfigError::MissingCredential);
    };

    let Some(instance_url) = instance_url.filter(|url| !url.is_empty()) else {
        error!("WXO_INSTANCE_URL is missing or empty, token exchange not attempted");
        return Err(ConfigError::MissingEndpoint);
    };

    Ok(Validated {
        api_key,
        instance_url,
    })
}

/// Every way a broker call can end. The HTTP layer maps these to
/// status/body pairs and adds nothing of its own.
#[derive(Debug)]
pub enum BrokerOutcome {
    /// Short-lived token from the authorize endpoint
    Live(TokenGrant),
    /// Exchange failed; the grant reuses the raw API key
    Fallback(TokenGrant),
    /// A required configuration value is missing — terminal
    ConfigInvalid(ConfigError),
    /// Failure outside the exchange path itself — terminal. `detail` is
    /// only shown to callers in development mode.
    Internal { message: String, detail: String },
}

/// Per-request token broker. Cheap to clone; the inner client is shared.
#[derive(Clone)]
pub struct TokenBroker {
    client: reqwest::Client,
    timeout: Duration,
}

impl TokenBroker {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_timeout(client, AUTHORIZE_TIMEOUT)
    }

    /// Broker with a non-default exchange timeout. Production uses
    /// [`AUTHORIZE_TIMEOUT`]; tests shorten it.
    pub fn with_timeout(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Validate configuration and perform the token exchange, degrading to
    /// a fallback grant on any exchange failure. Never fails the caller
    /// with a transport error: the availability-over-strictness policy is
    /// that handing the client something usable beats reporting upstream
    /// unavailability.
    pub async fn acquire(
        &self,
        api_key: Option<&Secret<String>>,
        instance_url: Option<&str>,
    ) -> BrokerOutcome {
        let validated = match validate(api_key, instance_url) {
            Ok(validated) => validated,
            Err(err) => return BrokerOutcome::ConfigInvalid(err),
        };

        // A key that cannot form a header value is a server-side defect,
        // not an exchange failure; it must not trigger the fallback.
        let bearer = match HeaderValue::from_str(&format!("Bearer {}", validated.api_key)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                value
            }
            Err(err) => {
                return BrokerOutcome::Internal {
                    message: "API key cannot be used as a bearer token".into(),
                    detail: err.to_string(),
                };
            }
        };

        info!(instance_url = %validated.instance_url, "requesting token from authorize endpoint");

        match token::authorize(&self.client, bearer, validated.instance_url, self.timeout).await {
            Ok(grant) => {
                info!(expires_in = grant.expires_in, "token retrieved");
                BrokerOutcome::Live(grant)
            }
            Err(err) => {
                warn!(error = %err, "token exchange failed, using API key as token");
                BrokerOutcome::Fallback(TokenGrant::fallback(validated.api_key))
            }
        }
    }
}
