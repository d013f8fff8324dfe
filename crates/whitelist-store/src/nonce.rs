//! Login nonces keyed by identity.
//!
//! A backend hands out a nonce, the user signs it, and the nonce is
//! consumed on successful verification so the signature cannot be replayed.

use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use whitelist_types::Identity;

use crate::{StoreError, WhitelistArtifact};

/// Nonces are drawn from `0..NONCE_RANGE`.
pub const NONCE_RANGE: u64 = 10_000_000;

/// Key-value store of outstanding nonces.
pub trait NonceStore: Send + Sync {
    /// Create or rotate the nonce for `identity` and return it.
    fn issue(&self, identity: &Identity) -> u64;

    /// Outstanding nonce, if one was issued.
    fn current(&self, identity: &Identity) -> Option<u64>;

    /// Accept `nonce` if it is the outstanding one, then rotate it.
    fn consume(&self, identity: &Identity, nonce: u64) -> bool;

    /// Forget the identity. Returns whether it was present.
    fn remove(&self, identity: &Identity) -> bool;

    /// Number of identities with an outstanding nonce.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory [`NonceStore`].
pub struct MemoryNonceStore {
    nonces: RwLock<HashMap<Identity, u64>>,
    rng: Mutex<StdRng>,
}

impl MemoryNonceStore {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic nonces, for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            nonces: RwLock::new(HashMap::new()),
            rng: Mutex::new(rng),
        }
    }

    /// Fresh nonce different from `previous`.
    fn draw(&self, previous: Option<u64>) -> u64 {
        let mut rng = self.rng.lock();
        loop {
            let nonce = rng.gen_range(0..NONCE_RANGE);
            if Some(nonce) != previous {
                return nonce;
            }
        }
    }
}

impl Default for MemoryNonceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceStore for MemoryNonceStore {
    fn issue(&self, identity: &Identity) -> u64 {
        let mut nonces = self.nonces.write();
        let nonce = self.draw(nonces.get(identity).copied());
        nonces.insert(identity.clone(), nonce);
        tracing::debug!(%identity, "issued nonce");
        nonce
    }

    fn current(&self, identity: &Identity) -> Option<u64> {
        self.nonces.read().get(identity).copied()
    }

    fn consume(&self, identity: &Identity, nonce: u64) -> bool {
        let mut nonces = self.nonces.write();
        match nonces.get_mut(identity) {
            Some(current) if *current == nonce => {
                *current = self.draw(Some(nonce));
                true
            }
            Some(_) => {
                tracing::warn!(%identity, "nonce mismatch");
                false
            }
            None => false,
        }
    }

    fn remove(&self, identity: &Identity) -> bool {
        self.nonces.write().remove(identity).is_some()
    }

    fn len(&self) -> usize {
        self.nonces.read().len()
    }
}

/// Login front door: nonces only for members of a published whitelist.
///
/// ```
/// use whitelist_crypto::HashAlgorithm;
/// use whitelist_store::{MemoryNonceStore, WhitelistArtifact, WhitelistGate};
/// use whitelist_types::Identity;
///
/// let members: Vec<Identity> = ["alice", "bob"].iter().map(|s| s.parse().unwrap()).collect();
/// let artifact = WhitelistArtifact::build(HashAlgorithm::Keccak256, &members).unwrap();
/// let gate = WhitelistGate::new(artifact, MemoryNonceStore::new());
///
/// let nonce = gate.challenge(&members[0]).unwrap();
/// assert!(gate.redeem(&members[0], nonce));
/// assert!(!gate.redeem(&members[0], nonce));
/// assert!(gate.challenge(&"mallory".parse().unwrap()).is_err());
/// ```
pub struct WhitelistGate<S = MemoryNonceStore> {
    artifact: WhitelistArtifact,
    nonces: S,
}

impl<S: NonceStore> WhitelistGate<S> {
    pub fn new(artifact: WhitelistArtifact, nonces: S) -> Self {
        Self { artifact, nonces }
    }

    pub fn artifact(&self) -> &WhitelistArtifact {
        &self.artifact
    }

    pub fn nonces(&self) -> &S {
        &self.nonces
    }

    /// Issue a login nonce. Identities whose proof does not check out are refused.
    pub fn challenge(&self, identity: &Identity) -> Result<u64, StoreError> {
        self.artifact.proof_for(identity)?;
        if !self.artifact.verify(identity) {
            return Err(StoreError::Corrupted(format!(
                "stored proof for {identity} does not reach the root"
            )));
        }
        Ok(self.nonces.issue(identity))
    }

    /// Accept the outstanding nonce of a member, rotating it.
    pub fn redeem(&self, identity: &Identity, nonce: u64) -> bool {
        if !self.artifact.verify(identity) {
            tracing::warn!(%identity, "login attempt from outside the whitelist");
            return false;
        }
        self.nonces.consume(identity, nonce)
    }

    /// Drop the login state of an identity.
    pub fn logout(&self, identity: &Identity) -> bool {
        self.nonces.remove(identity)
    }
}
