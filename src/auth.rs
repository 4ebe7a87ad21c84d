//! Secrets, cached bearer tokens, and the client-credentials token manager.

pub mod manager;
pub mod secret;
pub mod token;

pub use manager::*;
pub use secret::*;
pub use token::{CachedToken, TokenCache, TokenGrant};
