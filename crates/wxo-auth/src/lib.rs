//! Watson Orchestrate token brokering library
//!
//! Exchanges a long-lived WXO API key for a short-lived bearer token so the
//! browser client never sees the key itself. This crate is a standalone
//! library with no dependency on the service binary — it can be tested and
//! used independently.
//!
//! Request flow:
//! 1. `broker::validate()` confirms the API key and instance URL are set
//! 2. `token::authorize()` POSTs to `{instance_url}/v1/authorize` once,
//!    bounded by a 5 s timeout
//! 3. On any exchange failure the broker degrades to a fallback grant that
//!    reuses the API key as the bearer token
//!
//! The broker never propagates exchange errors to its caller: every call to
//! [`TokenBroker::acquire`] ends in a [`BrokerOutcome`].

pub mod broker;
pub mod constants;
pub mod error;
pub mod token;

pub use broker::{BrokerOutcome, TokenBroker, Validated, validate};
pub use constants::*;
pub use error::{ConfigError, ExchangeError};
pub use token::{TokenGrant, TokenMode, authorize};
