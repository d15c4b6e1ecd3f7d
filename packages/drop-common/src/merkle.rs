use crate::hash::{keccak256, keccak256_concat};
use crate::types::{AllowlistEntry, Hash32, LeafFormat};

/// Compute the leaf hash for an allowlist entry.
///
/// `AddressOnly`:             `keccak256(address)`
/// `AddressWithMaxClaimable`: `keccak256(address ++ uint256_be(max_claimable))`
///
/// Both match Solidity's `keccak256(abi.encodePacked(..))` over the same values.
pub fn compute_leaf_hash(entry: &AllowlistEntry, format: LeafFormat) -> Hash32 {
    match format {
        LeafFormat::AddressOnly => Hash32::new(keccak256(entry.address.as_bytes())),
        LeafFormat::AddressWithMaxClaimable => Hash32::new(keccak256_concat(&[
            entry.address.as_bytes(),
            &entry.max_claimable.to_be_bytes(),
        ])),
    }
}

/// Hash two nodes in sorted order: `keccak256(min(a, b) ++ max(a, b))`.
pub fn hash_sorted_pair(a: &Hash32, b: &Hash32) -> Hash32 {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    Hash32::new(keccak256_concat(&[first.as_bytes(), second.as_bytes()]))
}

/// Verify a Merkle proof against a known root.
///
/// Uses sorted-pair hashing: for each sibling in the proof the pair is
/// ordered before hashing, so the proof carries no left/right flags.
///
/// Returns true if the computed root matches the expected root.
pub fn verify_merkle_proof(root: &Hash32, proof: &[Hash32], leaf: &Hash32) -> bool {
    let computed = proof
        .iter()
        .fold(*leaf, |current, sibling| hash_sorted_pair(&current, sibling));
    computed == *root
}

/// Verify that `entry` is included under `root` for the given leaf format.
pub fn verify_allowlist_proof(
    root: &Hash32,
    entry: &AllowlistEntry,
    proof: &[Hash32],
    format: LeafFormat,
) -> bool {
    verify_merkle_proof(root, proof, &compute_leaf_hash(entry, format))
}

/// A sorted-pair Merkle tree.
///
/// Leaves are sorted before the tree is built and an odd node at the end of a
/// level is promoted unchanged, so the root depends only on the set of leaves.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// All nodes level by level, bottom-up. `layers[0]` = sorted leaves.
    layers: Vec<Vec<Hash32>>,
}

impl MerkleTree {
    pub fn from_leaves(mut leaves: Vec<Hash32>) -> Self {
        if leaves.is_empty() {
            return Self { layers: Vec::new() };
        }
        leaves.sort();

        let mut layers = vec![leaves];
        while let Some(prev) = layers.last().filter(|layer| layer.len() > 1) {
            let next: Vec<Hash32> = prev
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_sorted_pair(left, right),
                    _ => pair[0],
                })
                .collect();
            layers.push(next);
        }

        Self { layers }
    }

    /// The root, or all-zero for an empty tree.
    pub fn root(&self) -> Hash32 {
        self.layers
            .last()
            .and_then(|layer| layer.first())
            .copied()
            .unwrap_or(Hash32::ZERO)
    }

    pub fn leaves(&self) -> &[Hash32] {
        self.layers.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Position of `leaf` among the sorted leaves.
    pub fn leaf_index(&self, leaf: &Hash32) -> Option<usize> {
        self.leaves().binary_search(leaf).ok()
    }

    /// Sibling hashes from the leaf level up to (excluding) the root.
    pub fn proof(&self, leaf_index: usize) -> Option<Vec<Hash32>> {
        if leaf_index >= self.leaves().len() {
            return None;
        }

        let mut siblings = Vec::with_capacity(self.layers.len().saturating_sub(1));
        let mut idx = leaf_index;
        for layer in &self.layers[..self.layers.len() - 1] {
            if let Some(sibling) = layer.get(idx ^ 1) {
                siblings.push(*sibling);
            }
            idx /= 2;
        }
        Some(siblings)
    }

    /// Proof for a leaf hash, if the leaf is part of the tree.
    pub fn proof_for_leaf(&self, leaf: &Hash32) -> Option<Vec<Hash32>> {
        self.leaf_index(leaf).and_then(|idx| self.proof(idx))
    }
}
