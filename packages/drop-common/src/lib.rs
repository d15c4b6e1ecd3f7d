pub mod error;
pub mod hash;
pub mod merkle;
pub mod msg;
pub mod signature;
pub mod snapshot;
#[cfg(feature = "testing")]
pub mod testing;
pub mod traits;
pub mod typed_data;
pub mod types;

pub use error::CommonError;
pub use merkle::{compute_leaf_hash, verify_allowlist_proof, verify_merkle_proof, MerkleTree};
pub use snapshot::{create_snapshot, fetch_snapshot, publish_snapshot, Snapshot, SnapshotInfo};
pub use traits::{ContentStore, Ledger, Roles, SignatureVerifier, Signer, TransactionSubmitter};
pub use types::{
    Address, AllowlistEntry, ClaimPhase, Hash32, LeafFormat, MintRequest, Receipt, Role,
    SignedMintRequest, NATIVE_TOKEN, UNLIMITED,
};
