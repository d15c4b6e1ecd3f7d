use cosmwasm_std::StdError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("invalid address: {value}")]
    InvalidAddress { value: String },

    #[error("invalid hex: {field}")]
    InvalidHex { field: String },

    #[error("duplicate allowlist entry: {address}")]
    DuplicateLeaf { address: String },

    #[error("address {address} is not in the allowlist")]
    NotInAllowlist { address: String },

    #[error("no snapshot stored for merkle root {root}")]
    SnapshotNotFound { root: String },

    #[error("snapshot root mismatch: stored {stored}, rebuilt {rebuilt}")]
    SnapshotRootMismatch { stored: String, rebuilt: String },

    #[error("typed data mismatch: {reason}")]
    TypedDataMismatch { reason: String },
}
