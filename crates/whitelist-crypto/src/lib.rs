//! Whitelist Crypto - Merkle trees for whitelist membership.
//!
//! This crate provides:
//! - Keccak-256 and Blake3 hashers behind [`MerkleHasher`]
//! - Sorted-pair Merkle trees and inclusion proofs
//! - Fail-closed proof verification

pub mod hash;
pub mod merkle;
pub mod error;

pub use hash::{Blake3, HashAlgorithm, Keccak256, MerkleHasher};
pub use merkle::{
    is_node_preimage, leaf_hash, verify, verify_hex, verify_leaf, MerkleProof, MerkleTree,
    MAX_PROOF_DEPTH, NODE_PREIMAGE_LEN,
};
pub use error::MerkleError;
