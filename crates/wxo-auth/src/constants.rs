//! Watson Orchestrate authorization constants
//!
//! The authorize path is a fixed contract with the upstream service and
//! must not be altered; the instance URL it is appended to identifies the
//! WXO instance and varies per deployment.

use std::time::Duration;

/// Path suffix appended to the instance URL for the token exchange
pub const AUTHORIZE_PATH: &str = "/v1/authorize";

/// Hard bound on the single authorize request. Expiry is handled the same
/// as any other exchange failure (fallback), never surfaced separately.
pub const AUTHORIZE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Expiry (seconds) used when the upstream omits `expires_in`, and for
/// fallback grants.
pub const DEFAULT_EXPIRES_IN: u64 = 3600;
