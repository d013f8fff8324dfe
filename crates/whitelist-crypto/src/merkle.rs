use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, warn};
use whitelist_types::{Hash, Identity};

use crate::error::MerkleError;
use crate::hash::{Keccak256, MerkleHasher};

/// Proofs longer than this cannot come from any tree we build.
pub const MAX_PROOF_DEPTH: usize = 256;

/// Length of an internal node preimage (`lo || hi`).
///
/// Leaves are not domain-separated from nodes, so an identity of exactly this
/// length could hash to an internal node and pass with a shortened proof.
/// Such identities are refused both when building and when verifying.
pub const NODE_PREIMAGE_LEN: usize = 2 * Hash::LEN;

/// Binary Merkle tree with sorted-pair nodes.
///
/// Leaves keep input order. When a level has an odd number of nodes the
/// last one is promoted to the next level unchanged.
#[derive(Clone, Debug)]
pub struct MerkleTree<H: MerkleHasher = Keccak256> {
    /// levels[0] are the leaves, the last level holds only the root.
    levels: Vec<Vec<Hash>>,
    positions: HashMap<Hash, usize>,
    _hasher: PhantomData<fn() -> H>,
}

impl<H: MerkleHasher> MerkleTree<H> {
    /// Hash each identity into a leaf and build the tree.
    pub fn from_identities<'a, I>(identities: I) -> Result<Self, MerkleError>
    where
        I: IntoIterator<Item = &'a Identity>,
    {
        let leaves = identities
            .into_iter()
            .map(|id| {
                if is_node_preimage(id) {
                    return Err(MerkleError::InvalidInput(format!(
                        "identity {id} is {NODE_PREIMAGE_LEN} bytes, the size of a node preimage"
                    )));
                }
                Ok(leaf_hash::<H>(id))
            })
            .collect::<Result<Vec<Hash>, _>>()?;
        Self::from_leaves(&leaves)
    }

    /// Build a tree from precomputed leaves.
    ///
    /// Duplicate leaves are dropped, keeping the first occurrence.
    pub fn from_leaves(leaves: &[Hash]) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::InvalidInput(
                "cannot build a tree without leaves".to_string(),
            ));
        }

        let mut positions = HashMap::with_capacity(leaves.len());
        let mut unique = Vec::with_capacity(leaves.len());
        for leaf in leaves {
            if positions.contains_key(leaf) {
                debug!(%leaf, "dropping duplicate leaf");
                continue;
            }
            positions.insert(*leaf, unique.len());
            unique.push(*leaf);
        }

        let levels = build_levels::<H>(unique);
        debug!(
            hasher = H::NAME,
            leaves = levels[0].len(),
            depth = levels.len() - 1,
            root = %levels[levels.len() - 1][0],
            "built merkle tree"
        );

        Ok(Self {
            levels,
            positions,
            _hasher: PhantomData,
        })
    }

    /// Get the root hash.
    pub fn root(&self) -> Hash {
        // Construction guarantees a non-empty top level.
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or(Hash::ZERO)
    }

    /// Leaves in tree order.
    pub fn leaves(&self) -> &[Hash] {
        &self.levels[0]
    }

    /// All levels, leaves first.
    pub fn levels(&self) -> &[Vec<Hash>] {
        &self.levels
    }

    /// Number of leaves
    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    /// Always false: empty trees cannot be built.
    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    /// Number of levels above the leaves.
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Position of the identity's leaf, if it is a member.
    pub fn position(&self, identity: &Identity) -> Option<usize> {
        self.positions.get(&leaf_hash::<H>(identity)).copied()
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.position(identity).is_some()
    }

    /// Proof for an identity in the tree.
    pub fn proof_for(&self, identity: &Identity) -> Result<MerkleProof, MerkleError> {
        let index = self.position(identity).ok_or_else(|| {
            MerkleError::NotFound(format!("identity {identity} is not whitelisted"))
        })?;
        self.proof_at(index)
    }

    /// Proof for the leaf at `index`.
    pub fn proof_at(&self, index: usize) -> Result<MerkleProof, MerkleError> {
        let leaf = *self.leaves().get(index).ok_or_else(|| {
            MerkleError::NotFound(format!("leaf index {index} out of range ({})", self.len()))
        })?;

        let mut siblings = Vec::with_capacity(self.depth());
        let mut position = index;

        // Walk up the tree; a promoted node has no sibling at that level.
        for level in &self.levels[..self.levels.len() - 1] {
            if let Some(sibling) = level.get(position ^ 1) {
                siblings.push(*sibling);
            }
            position /= 2;
        }

        Ok(MerkleProof {
            leaf,
            index,
            siblings,
        })
    }

    fn fmt_node(
        &self,
        f: &mut fmt::Formatter<'_>,
        level: usize,
        index: usize,
        prefix: &str,
        last: bool,
    ) -> fmt::Result {
        let (branch, extension) = if level == self.depth() {
            ("", "")
        } else if last {
            ("└─ ", "   ")
        } else {
            ("├─ ", "│  ")
        };
        writeln!(f, "{prefix}{branch}{}", self.levels[level][index])?;

        if level == 0 {
            return Ok(());
        }
        let child_prefix = format!("{prefix}{extension}");
        let below = &self.levels[level - 1];
        let children: Vec<usize> = [2 * index, 2 * index + 1]
            .into_iter()
            .filter(|&i| i < below.len())
            .collect();
        for (n, child) in children.iter().enumerate() {
            self.fmt_node(f, level - 1, *child, &child_prefix, n + 1 == children.len())?;
        }
        Ok(())
    }
}

impl<H: MerkleHasher> fmt::Display for MerkleTree<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, self.depth(), 0, "", true)
    }
}

fn build_levels<H: MerkleHasher>(leaves: Vec<Hash>) -> Vec<Vec<Hash>> {
    let mut levels = vec![leaves];

    while let Some(current) = levels.last().filter(|level| level.len() > 1) {
        let next: Vec<Hash> = current
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => H::hash_sorted_pair(left, right),
                _ => pair[0],
            })
            .collect();
        levels.push(next);
    }

    levels
}

/// True for identities that cannot be told apart from an internal node.
pub fn is_node_preimage(identity: &Identity) -> bool {
    identity.len() == NODE_PREIMAGE_LEN
}

/// Leaf hash of an identity.
pub fn leaf_hash<H: MerkleHasher>(identity: &Identity) -> Hash {
    H::hash(identity.as_bytes())
}

/// Merkle inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf: Hash,
    pub index: usize,
    pub siblings: Vec<Hash>,
}

impl MerkleProof {
    /// Verify this proof against an expected root.
    pub fn verify<H: MerkleHasher>(&self, root: &Hash) -> bool {
        verify_leaf::<H>(&self.leaf, &self.siblings, root)
    }

    /// Compute the root from this proof.
    pub fn compute_root<H: MerkleHasher>(&self) -> Hash {
        fold_proof::<H>(self.leaf, &self.siblings)
    }

    /// Get proof size (number of siblings)
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// Siblings as `0x`-prefixed hex strings.
    pub fn to_hex(&self) -> Vec<String> {
        self.siblings.iter().map(ToString::to_string).collect()
    }
}

fn fold_proof<H: MerkleHasher>(leaf: Hash, siblings: &[Hash]) -> Hash {
    siblings
        .iter()
        .fold(leaf, |current, sibling| H::hash_sorted_pair(&current, sibling))
}

/// Check that `identity` is a member of the tree committed to by `root`.
pub fn verify<H: MerkleHasher>(identity: &Identity, proof: &[Hash], root: &Hash) -> bool {
    if is_node_preimage(identity) {
        warn!(%identity, "rejecting identity shaped like a node preimage");
        return false;
    }
    verify_leaf::<H>(&leaf_hash::<H>(identity), proof, root)
}

/// Check that `leaf` hashes up to `root` through `proof`.
///
/// The caller vouches that `leaf` came from [`leaf_hash`] of an identity
/// accepted by [`verify`]; an internal node passed here will verify.
pub fn verify_leaf<H: MerkleHasher>(leaf: &Hash, proof: &[Hash], root: &Hash) -> bool {
    if proof.len() > MAX_PROOF_DEPTH {
        warn!(len = proof.len(), "rejecting oversized proof");
        return false;
    }
    fold_proof::<H>(*leaf, proof) == *root
}

/// Like [`verify`] but with hex-encoded proof and root.
///
/// Anything that fails to parse makes the proof invalid.
pub fn verify_hex<H, S>(identity: &Identity, proof: &[S], root: &str) -> bool
where
    H: MerkleHasher,
    S: AsRef<str>,
{
    let Ok(root) = root.parse::<Hash>() else {
        debug!(root, "malformed root");
        return false;
    };
    let siblings: Result<Vec<Hash>, _> =
        proof.iter().map(|s| s.as_ref().parse::<Hash>()).collect();
    match siblings {
        Ok(siblings) => verify::<H>(identity, &siblings, &root),
        Err(e) => {
            debug!(error = %e, "malformed proof sibling");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Blake3;

    const ROOT_ABCD: &str = "0x68203f90e9d07dc5859259d7536e87a6ba9d345f2552b5b9de2999ddce9ce1bf";
    const ROOT_ABCE: &str = "0x89e6d45e9a01e0904ccc677a99d00caef09f04504c1b52972e7e1dc2ced757cf";
    const ROOT_ABC: &str = "0x5842148bc6ebeb52af882a317c765fccd3ae80589b21a9b8cbf21abb630e46a7";

    fn ids(items: &[&str]) -> Vec<Identity> {
        items.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn h(s: &str) -> Hash {
        s.parse().unwrap()
    }

    fn tree(items: &[&str]) -> MerkleTree {
        MerkleTree::from_identities(&ids(items)).unwrap()
    }

    #[test]
    fn test_merkle_tree_empty() {
        let result = MerkleTree::<Keccak256>::from_leaves(&[]);
        assert!(matches!(result, Err(MerkleError::InvalidInput(_))));

        let none: Vec<Identity> = vec![];
        assert!(MerkleTree::<Keccak256>::from_identities(&none).is_err());
    }

    #[test]
    fn test_merkle_tree_single_leaf() {
        let tree = tree(&["a"]);
        let leaf = Keccak256::hash(b"a");

        assert_eq!(tree.root(), leaf);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.depth(), 0);

        let proof = tree.proof_for(&"a".parse().unwrap()).unwrap();
        assert!(proof.siblings.is_empty());
        assert!(proof.verify::<Keccak256>(&tree.root()));
    }

    #[test]
    fn test_merkle_tree_two_leaves() {
        let leaf1 = Keccak256::hash(b"leaf1");
        let leaf2 = Keccak256::hash(b"leaf2");
        let tree = MerkleTree::<Keccak256>::from_leaves(&[leaf1, leaf2]).unwrap();

        assert_eq!(tree.root(), Keccak256::hash_sorted_pair(&leaf1, &leaf2));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_known_root_four_identities() {
        let tree = tree(&["a", "b", "c", "d"]);
        assert_eq!(tree.root(), h(ROOT_ABCD));

        let a: Identity = "a".parse().unwrap();
        let proof = tree.proof_for(&a).unwrap();
        assert_eq!(proof.depth(), 2);
        assert_eq!(
            proof.to_hex(),
            vec![
                "0xb5553de315e0edf504d9150af82dafa5c4667fa618ed0a6f19c69b41166c5510",
                "0xd253a52d4cb00de2895e85f2529e2976e6aaaa5c18106b68ab66813e14415669",
            ]
        );
        assert!(verify::<Keccak256>(&a, &proof.siblings, &tree.root()));

        let other = self::tree(&["a", "b", "c", "e"]);
        assert_eq!(other.root(), h(ROOT_ABCE));
        assert!(!verify::<Keccak256>(&a, &proof.siblings, &other.root()));
    }

    #[test]
    fn test_odd_node_is_promoted() {
        let tree = tree(&["a", "b", "c"]);
        assert_eq!(tree.root(), h(ROOT_ABC));
        assert_eq!(tree.levels()[1][1], Keccak256::hash(b"c"));

        let c: Identity = "c".parse().unwrap();
        let proof = tree.proof_for(&c).unwrap();
        assert_eq!(proof.depth(), 1);

        for item in ["a", "b", "c"] {
            let id: Identity = item.parse().unwrap();
            let proof = tree.proof_for(&id).unwrap();
            assert!(verify::<Keccak256>(&id, &proof.siblings, &tree.root()));
        }
    }

    #[test]
    fn test_merkle_proof() {
        let leaves: Vec<Hash> = (0..8)
            .map(|i| Keccak256::hash(format!("leaf{}", i).as_bytes()))
            .collect();

        let tree = MerkleTree::<Keccak256>::from_leaves(&leaves).unwrap();

        for (i, leaf) in leaves.iter().enumerate() {
            let proof = tree.proof_at(i).unwrap();

            assert_eq!(proof.leaf, *leaf);
            assert_eq!(proof.index, i);
            assert_eq!(proof.depth(), 3);
            assert_eq!(proof.compute_root::<Keccak256>(), tree.root());
            assert!(proof.verify::<Keccak256>(&tree.root()));

            let wrong_root = Keccak256::hash(b"wrong");
            assert!(!proof.verify::<Keccak256>(&wrong_root));
        }
    }

    #[test]
    fn test_merkle_proof_out_of_bounds() {
        let tree = tree(&["a", "b", "c", "d"]);

        assert!(matches!(tree.proof_at(4), Err(MerkleError::NotFound(_))));
        assert!(matches!(tree.proof_at(100), Err(MerkleError::NotFound(_))));
    }

    #[test]
    fn test_proof_for_missing_identity() {
        let tree = tree(&["a", "b"]);
        let missing: Identity = "z".parse().unwrap();
        assert!(!tree.contains(&missing));
        assert!(matches!(tree.proof_for(&missing), Err(MerkleError::NotFound(_))));
    }

    #[test]
    fn test_merkle_deterministic() {
        let tree1 = tree(&["w", "x", "y", "z", "v"]);
        let tree2 = tree(&["w", "x", "y", "z", "v"]);

        assert_eq!(tree1.root(), tree2.root());
        assert_eq!(tree1.proof_at(4).unwrap(), tree2.proof_at(4).unwrap());
    }

    #[test]
    fn test_leaf_order_matters() {
        // Sorting applies to pairs, not to the leaf sequence.
        assert_ne!(tree(&["a", "b", "c"]).root(), tree(&["c", "a", "b"]).root());
        assert_eq!(tree(&["a", "b"]).root(), tree(&["b", "a"]).root());
    }

    #[test]
    fn test_duplicates_dropped() {
        let with_dupes = tree(&["a", "b", "a", "c", "b"]);
        let without = tree(&["a", "b", "c"]);

        assert_eq!(with_dupes.len(), 3);
        assert_eq!(with_dupes.root(), without.root());
        assert_eq!(with_dupes.position(&"c".parse().unwrap()), Some(2));
    }

    #[test]
    fn test_swapped_sibling_order_still_verifies() {
        let leaves: Vec<Hash> = ["a", "b", "c", "d"]
            .iter()
            .map(|s| Keccak256::hash(s.as_bytes()))
            .collect();
        let swapped = [leaves[1], leaves[0], leaves[3], leaves[2]];

        let t1 = MerkleTree::<Keccak256>::from_leaves(&leaves).unwrap();
        let t2 = MerkleTree::<Keccak256>::from_leaves(&swapped).unwrap();
        assert_eq!(t1.root(), t2.root());

        let proof = t2.proof_at(1).unwrap();
        assert_eq!(proof.leaf, leaves[0]);
        assert!(proof.verify::<Keccak256>(&t1.root()));
    }

    #[test]
    fn test_verify_hex_fails_closed() {
        let tree = tree(&["a", "b", "c", "d"]);
        let a: Identity = "a".parse().unwrap();
        let proof = tree.proof_for(&a).unwrap().to_hex();

        assert!(verify_hex::<Keccak256, _>(&a, &proof, ROOT_ABCD));

        let mut truncated = proof.clone();
        truncated[1].truncate(40);
        assert!(!verify_hex::<Keccak256, _>(&a, &truncated, ROOT_ABCD));

        let mut garbage = proof.clone();
        garbage[0] = "0xnot-a-hash".to_string();
        assert!(!verify_hex::<Keccak256, _>(&a, &garbage, ROOT_ABCD));

        assert!(!verify_hex::<Keccak256, _>(&a, &proof, "0x1234"));
        assert!(!verify_hex::<Keccak256, _>(&a, &proof[..1], ROOT_ABCD));
        assert!(!verify_hex::<Keccak256, String>(&a, &[], ROOT_ABCD));
    }

    #[test]
    fn test_oversized_proof_rejected() {
        let leaf = Keccak256::hash(b"a");
        let proof = vec![Hash::ZERO; MAX_PROOF_DEPTH + 1];
        let root = fold_proof::<Keccak256>(leaf, &proof);
        assert!(!verify_leaf::<Keccak256>(&leaf, &proof, &root));
    }

    /// Siblings from an internal node up to the root.
    fn node_proof(tree: &MerkleTree, mut level: usize, mut position: usize) -> Vec<Hash> {
        let levels = tree.levels();
        let mut siblings = Vec::new();
        while level + 1 < levels.len() {
            if let Some(sibling) = levels[level].get(position ^ 1) {
                siblings.push(*sibling);
            }
            position /= 2;
            level += 1;
        }
        siblings
    }

    #[test]
    fn test_sibling_concatenation_is_not_a_member() {
        let tree = tree(&["a", "b", "c", "d", "e"]);
        let root = tree.root();
        let levels = tree.levels();

        // Each sibling pair, joined in sorted order, hashes to its parent.
        for (level, nodes) in levels[..levels.len() - 1].iter().enumerate() {
            for (pair_index, pair) in nodes.chunks_exact(2).enumerate() {
                let (lo, hi) = if pair[0] <= pair[1] {
                    (pair[0], pair[1])
                } else {
                    (pair[1], pair[0])
                };
                let mut bytes = lo.as_bytes().to_vec();
                bytes.extend_from_slice(hi.as_bytes());
                let forged = Identity::from_bytes(bytes).unwrap();

                let parent = levels[level + 1][pair_index];
                assert_eq!(leaf_hash::<Keccak256>(&forged), parent);

                let proof = node_proof(&tree, level + 1, pair_index);
                assert!(verify_leaf::<Keccak256>(&parent, &proof, &root));

                assert!(!tree.contains(&forged));
                assert!(!verify::<Keccak256>(&forged, &proof, &root));
                let hex: Vec<String> = proof.iter().map(ToString::to_string).collect();
                assert!(!verify_hex::<Keccak256, _>(&forged, &hex, &root.to_string()));
            }
        }
    }

    #[test]
    fn test_node_preimage_identity_rejected_at_build() {
        let mut items = ids(&["a", "b"]);
        items.push(Identity::from_bytes(vec![7u8; NODE_PREIMAGE_LEN]).unwrap());
        assert!(matches!(
            MerkleTree::<Keccak256>::from_identities(&items),
            Err(MerkleError::InvalidInput(_))
        ));

        // One byte either side is an ordinary identity.
        for len in [NODE_PREIMAGE_LEN - 1, NODE_PREIMAGE_LEN + 1] {
            let id = Identity::from_bytes(vec![7u8; len]).unwrap();
            let tree = MerkleTree::<Keccak256>::from_identities([&id]).unwrap();
            assert!(verify::<Keccak256>(&id, &[], &tree.root()));
        }
    }

    #[test]
    fn test_hashers_give_different_roots() {
        let items = ids(&["a", "b", "c"]);
        let k = MerkleTree::<Keccak256>::from_identities(&items).unwrap();
        let b = MerkleTree::<Blake3>::from_identities(&items).unwrap();
        assert_ne!(k.root(), b.root());

        let proof = b.proof_for(&items[0]).unwrap();
        assert!(proof.verify::<Blake3>(&b.root()));
        assert!(!proof.verify::<Keccak256>(&b.root()));
    }

    #[test]
    fn test_display_lists_every_node() {
        let tree = tree(&["a", "b", "c"]);
        let rendered = tree.to_string();

        assert!(rendered.starts_with(ROOT_ABC));
        for level in tree.levels() {
            for node in level {
                assert!(rendered.contains(&node.to_string()));
            }
        }
        assert!(rendered.contains("└─ "));
    }
}
