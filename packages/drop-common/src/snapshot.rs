use std::collections::{BTreeMap, BTreeSet};

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{from_json, to_json_vec, Uint256};
use tracing::{debug, warn};

use crate::error::CommonError;
use crate::merkle::{compute_leaf_hash, verify_allowlist_proof, MerkleTree};
use crate::traits::ContentStore;
use crate::types::{Address, AllowlistEntry, Hash32, LeafFormat};

/// One claimer as written to the content store.
#[cw_serde]
pub struct SnapshotClaim {
    pub address: Address,
    pub max_claimable: Uint256,
    pub proof: Vec<Hash32>,
}

/// Serialized form of a snapshot. Claims are in ascending address order.
#[cw_serde]
pub struct SnapshotDocument {
    pub merkle_root: Hash32,
    pub leaf_format: LeafFormat,
    pub claims: Vec<SnapshotClaim>,
}

/// A built allowlist: its root, the canonical entry list and a proof for
/// every address.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    merkle_root: Hash32,
    leaf_format: LeafFormat,
    entries: Vec<AllowlistEntry>,
    proofs: BTreeMap<Address, Vec<Hash32>>,
}

impl Snapshot {
    /// Builds the tree over `entries`. Input order does not matter; the same
    /// set of entries always produces the same snapshot.
    pub fn build(entries: Vec<AllowlistEntry>, leaf_format: LeafFormat) -> Result<Self, CommonError> {
        let mut seen = BTreeSet::new();
        for entry in &entries {
            if !seen.insert(entry.address) {
                return Err(CommonError::DuplicateLeaf {
                    address: entry.address.to_string(),
                });
            }
        }

        let mut entries = entries;
        entries.sort_by(|a, b| a.address.cmp(&b.address));

        let leaves: Vec<Hash32> = entries
            .iter()
            .map(|entry| compute_leaf_hash(entry, leaf_format))
            .collect();
        let tree = MerkleTree::from_leaves(leaves.clone());

        let mut proofs = BTreeMap::new();
        for (entry, leaf) in entries.iter().zip(&leaves) {
            // Two AddressOnly entries cannot collide after the duplicate check,
            // so every leaf is present in the tree.
            let proof = tree.proof_for_leaf(leaf).unwrap_or_default();
            proofs.insert(entry.address, proof);
        }

        debug!(
            root = %tree.root(),
            entries = entries.len(),
            ?leaf_format,
            "allowlist snapshot built"
        );

        Ok(Self {
            merkle_root: tree.root(),
            leaf_format,
            entries,
            proofs,
        })
    }

    pub fn merkle_root(&self) -> Hash32 {
        self.merkle_root
    }

    pub fn leaf_format(&self) -> LeafFormat {
        self.leaf_format
    }

    pub fn entries(&self) -> &[AllowlistEntry] {
        &self.entries
    }

    pub fn entry(&self, address: &Address) -> Option<&AllowlistEntry> {
        self.entries
            .binary_search_by(|entry| entry.address.cmp(address))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn proof(&self, address: &Address) -> Result<&[Hash32], CommonError> {
        self.proofs
            .get(address)
            .map(Vec::as_slice)
            .ok_or_else(|| CommonError::NotInAllowlist {
                address: address.to_string(),
            })
    }

    /// Checks `proof` for `entry` against `root` using this snapshot's leaf format.
    pub fn verify(&self, root: &Hash32, entry: &AllowlistEntry, proof: &[Hash32]) -> bool {
        verify_allowlist_proof(root, entry, proof, self.leaf_format)
    }

    pub fn to_document(&self) -> SnapshotDocument {
        SnapshotDocument {
            merkle_root: self.merkle_root,
            leaf_format: self.leaf_format,
            claims: self
                .entries
                .iter()
                .map(|entry| SnapshotClaim {
                    address: entry.address,
                    max_claimable: entry.max_claimable,
                    proof: self.proofs.get(&entry.address).cloned().unwrap_or_default(),
                })
                .collect(),
        }
    }

    /// Rebuilds the tree from a stored document. Stored proofs are not
    /// trusted; the rebuilt root must equal the stored one.
    pub fn from_document(document: SnapshotDocument) -> Result<Self, CommonError> {
        let entries = document
            .claims
            .into_iter()
            .map(|claim| AllowlistEntry::new(claim.address, claim.max_claimable))
            .collect();
        let snapshot = Self::build(entries, document.leaf_format)?;
        if snapshot.merkle_root != document.merkle_root {
            return Err(CommonError::SnapshotRootMismatch {
                stored: document.merkle_root.to_string(),
                rebuilt: snapshot.merkle_root.to_string(),
            });
        }
        Ok(snapshot)
    }
}

/// A snapshot together with where it is stored.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotInfo {
    pub merkle_root: Hash32,
    pub uri: String,
    pub snapshot: Snapshot,
}

/// Writes the snapshot document and returns its location.
pub async fn publish_snapshot(
    store: &dyn ContentStore,
    snapshot: &Snapshot,
) -> Result<String, CommonError> {
    let bytes = to_json_vec(&snapshot.to_document())?;
    let uri = store.put(&bytes).await?;
    debug!(root = %snapshot.merkle_root, %uri, "allowlist snapshot published");
    Ok(uri)
}

/// Builds and publishes in one step.
pub async fn create_snapshot(
    store: &dyn ContentStore,
    entries: Vec<AllowlistEntry>,
    leaf_format: LeafFormat,
) -> Result<SnapshotInfo, CommonError> {
    let snapshot = Snapshot::build(entries, leaf_format)?;
    let uri = publish_snapshot(store, &snapshot).await?;
    Ok(SnapshotInfo {
        merkle_root: snapshot.merkle_root,
        uri,
        snapshot,
    })
}

/// Looks `root` up in a contract's merkle map and loads the snapshot behind
/// it. `None` when the root is unknown or the stored document describes a
/// different root.
pub async fn fetch_snapshot(
    store: &dyn ContentStore,
    root: &Hash32,
    merkle: &BTreeMap<String, String>,
) -> Result<Option<Snapshot>, CommonError> {
    let Some(uri) = merkle.get(&root.to_string()) else {
        return Ok(None);
    };

    let bytes = store.get(uri).await?;
    let document: SnapshotDocument = from_json(&bytes)?;
    if document.merkle_root != *root {
        warn!(
            expected = %root,
            stored = %document.merkle_root,
            %uri,
            "snapshot document root does not match merkle map key"
        );
        return Ok(None);
    }
    Snapshot::from_document(document).map(Some)
}
