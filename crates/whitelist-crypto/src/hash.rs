use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256 as Keccak256Digest};
use std::fmt;
use std::str::FromStr;
use whitelist_types::{Hash, Identity};

use crate::error::MerkleError;
use crate::merkle;

/// Hash function used for both leaves and internal nodes.
pub trait MerkleHasher {
    /// Name recorded in artifacts and logs.
    const NAME: &'static str;

    /// Hash arbitrary bytes.
    fn hash(data: &[u8]) -> Hash;

    /// Hash the concatenation of several slices.
    fn hash_multi(data: &[&[u8]]) -> Hash;

    /// Parent of two nodes: the pair is sorted byte-wise before hashing, so
    /// the result does not depend on which child is left.
    fn hash_sorted_pair(a: &Hash, b: &Hash) -> Hash {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self::hash_multi(&[lo.as_bytes(), hi.as_bytes()])
    }
}

/// Keccak-256, as used by Solidity's `keccak256`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Keccak256;

impl MerkleHasher for Keccak256 {
    const NAME: &'static str = "keccak256";

    fn hash(data: &[u8]) -> Hash {
        Hash::from_bytes(Keccak256Digest::digest(data).into())
    }

    fn hash_multi(data: &[&[u8]]) -> Hash {
        let mut hasher = Keccak256Digest::new();
        for chunk in data {
            hasher.update(chunk);
        }
        Hash::from_bytes(hasher.finalize().into())
    }
}

/// Blake3 with the default 32-byte output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3;

impl MerkleHasher for Blake3 {
    const NAME: &'static str = "blake3";

    fn hash(data: &[u8]) -> Hash {
        Hash::from_bytes(*blake3::hash(data).as_bytes())
    }

    fn hash_multi(data: &[&[u8]]) -> Hash {
        let mut hasher = blake3::Hasher::new();
        for chunk in data {
            hasher.update(chunk);
        }
        Hash::from_bytes(*hasher.finalize().as_bytes())
    }
}

/// Runtime selection of a [`MerkleHasher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Keccak256,
    Blake3,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Keccak256 => Keccak256::NAME,
            HashAlgorithm::Blake3 => Blake3::NAME,
        }
    }

    /// [`merkle::verify`] with this algorithm.
    pub fn verify(&self, identity: &Identity, proof: &[Hash], root: &Hash) -> bool {
        match self {
            HashAlgorithm::Keccak256 => merkle::verify::<Keccak256>(identity, proof, root),
            HashAlgorithm::Blake3 => merkle::verify::<Blake3>(identity, proof, root),
        }
    }

    /// [`merkle::verify_hex`] with this algorithm.
    pub fn verify_hex<S>(&self, identity: &Identity, proof: &[S], root: &str) -> bool
    where
        S: AsRef<str>,
    {
        match self {
            HashAlgorithm::Keccak256 => merkle::verify_hex::<Keccak256, S>(identity, proof, root),
            HashAlgorithm::Blake3 => merkle::verify_hex::<Blake3, S>(identity, proof, root),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = MerkleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keccak256" | "keccak" => Ok(HashAlgorithm::Keccak256),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(MerkleError::InvalidInput(format!(
                "unknown hash algorithm: {other}"
            ))),
        }
    }
}
