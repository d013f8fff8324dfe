//! Whitelist Types - Core type definitions for Merkle whitelists.
//!
//! This crate provides:
//! - Hashes (32-byte digests for leaves, nodes and roots)
//! - Identities (the raw bytes of a whitelisted entity)

pub mod hash;
pub mod identity;
pub mod error;

#[cfg(feature = "serde")]
mod serialization;

pub use hash::Hash;
pub use identity::Identity;
pub use error::TypesError;
