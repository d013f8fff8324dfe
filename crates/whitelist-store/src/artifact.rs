//! Whitelist artifact - the document an issuer publishes next to the root.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use whitelist_crypto::{Blake3, HashAlgorithm, Keccak256, MerkleError, MerkleHasher, MerkleTree};
use whitelist_types::{Hash, Identity};

use crate::StoreError;

/// One whitelisted identity and its proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub identity: Identity,
    pub leaf: Hash,
    pub proof: Vec<Hash>,
}

/// Root plus every member's proof, serialized as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistArtifact {
    pub algorithm: HashAlgorithm,
    pub root: Hash,
    pub entries: Vec<ArtifactEntry>,
}

impl WhitelistArtifact {
    /// Build the tree over `identities` and record every proof.
    pub fn build(algorithm: HashAlgorithm, identities: &[Identity]) -> Result<Self, StoreError> {
        match algorithm {
            HashAlgorithm::Keccak256 => Self::build_with::<Keccak256>(algorithm, identities),
            HashAlgorithm::Blake3 => Self::build_with::<Blake3>(algorithm, identities),
        }
    }

    fn build_with<H: MerkleHasher>(
        algorithm: HashAlgorithm,
        identities: &[Identity],
    ) -> Result<Self, StoreError> {
        let tree = MerkleTree::<H>::from_identities(identities)?;

        let mut seen = HashSet::with_capacity(identities.len());
        let mut entries = Vec::with_capacity(tree.len());
        for identity in identities {
            if !seen.insert(identity) {
                continue;
            }
            let proof = tree.proof_for(identity)?;
            entries.push(ArtifactEntry {
                identity: identity.clone(),
                leaf: proof.leaf,
                proof: proof.siblings,
            });
        }

        tracing::info!(
            %algorithm,
            root = %tree.root(),
            members = entries.len(),
            "built whitelist artifact"
        );

        Ok(Self {
            algorithm,
            root: tree.root(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored entry for an identity.
    pub fn proof_for(&self, identity: &Identity) -> Result<&ArtifactEntry, StoreError> {
        self.entries
            .iter()
            .find(|entry| &entry.identity == identity)
            .ok_or_else(|| {
                MerkleError::NotFound(format!("identity {identity} is not whitelisted")).into()
            })
    }

    /// Check an identity against the stored root using its stored proof.
    pub fn verify(&self, identity: &Identity) -> bool {
        match self.proof_for(identity) {
            Ok(entry) => self.algorithm.verify(identity, &entry.proof, &self.root),
            Err(_) => false,
        }
    }

    /// Recompute everything from the identities and compare.
    pub fn validate(&self) -> Result<(), StoreError> {
        let identities: Vec<Identity> = self.entries.iter().map(|e| e.identity.clone()).collect();
        let rebuilt = Self::build(self.algorithm, &identities).map_err(|e| match e {
            StoreError::Merkle(MerkleError::InvalidInput(msg)) => StoreError::Corrupted(msg),
            other => other,
        })?;

        if rebuilt.root != self.root {
            return Err(StoreError::Corrupted(format!(
                "root mismatch: expected {}, got {}",
                self.root, rebuilt.root
            )));
        }
        if rebuilt.entries != self.entries {
            return Err(StoreError::Corrupted(
                "entries do not match the rebuilt tree".to_string(),
            ));
        }
        Ok(())
    }

    /// Write the artifact as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!(path = %path.display(), "saved whitelist artifact");
        Ok(())
    }

    /// Read and validate an artifact.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        let artifact: Self = serde_json::from_str(&content)?;
        artifact.validate()?;
        tracing::debug!(
            path = %path.display(),
            members = artifact.len(),
            "loaded whitelist artifact"
        );
        Ok(artifact)
    }
}
