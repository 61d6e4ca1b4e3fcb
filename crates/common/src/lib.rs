//! Shared types for the WXO token broker workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
