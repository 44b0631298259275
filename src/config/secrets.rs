//! Secret handling.
//!
//! Re-exports the secrecy types used by [`StorageConfig`](super::StorageConfig)
//! so callers need not depend on secrecy directly.

pub use secrecy::{ExposeSecret, SecretString};
