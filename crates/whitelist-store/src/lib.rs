//! Whitelist Store - Persistence around published whitelists.
//!
//! - [`WhitelistArtifact`]: the JSON document holding root and proofs
//! - [`NonceStore`]: per-identity login nonces behind a trait
//! - [`WhitelistGate`]: nonces handed out only to whitelisted identities

pub mod artifact;
pub mod nonce;
pub mod error;

pub use artifact::{ArtifactEntry, WhitelistArtifact};
pub use nonce::{MemoryNonceStore, NonceStore, WhitelistGate, NONCE_RANGE};
pub use error::StoreError;
