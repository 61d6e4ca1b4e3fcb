//! Error types for token brokering
//!
//! Two of the three failure taxonomies live here; they are deliberately
//! disjoint.
//! [`ConfigError`] is terminal and reaches the HTTP caller as a 500 with a
//! remediation hint. [`ExchangeError`] never reaches the caller at all —
//! the broker logs it and degrades to a fallback grant.

use thiserror::Error;

/// A required configuration value is absent or empty. Detected before any
/// network activity; recoverable by operator action, not by retry.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("WXO_API_KEY is not configured. Set the environment variable or wxo.api_key_file.")]
    MissingCredential,

    #[error("WXO_INSTANCE_URL is not configured. Set the environment variable or wxo.instance_url.")]
    MissingEndpoint,
}

impl ConfigError {
    /// Stable machine-readable kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing-credential",
            Self::MissingEndpoint => "missing-endpoint",
        }
    }

    /// Remediation hint included in the HTTP error body.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::MissingCredential => "Example: WXO_API_KEY=your_key_here",
            Self::MissingEndpoint => {
                "Example: WXO_INSTANCE_URL=https://api.dl.watson-orchestrate.ibm.com/instances/YOUR_INSTANCE_ID"
            }
        }
    }
}

/// A failure of the single outbound authorize call. Covers transport
/// errors (timeout, refused connection, DNS), non-2xx statuses, undecodable
/// 2xx bodies, and 2xx bodies that carry no token field.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("authorize request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("authorize endpoint returned {0}")]
    Status(reqwest::StatusCode),

    #[error("authorize response was not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("authorize response contained no token field")]
    MissingToken,
}
