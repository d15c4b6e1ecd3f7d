use cosmwasm_std::StdError;
use drop_common::CommonError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Common(#[from] CommonError),

    #[error("no signer available")]
    NoSignerAvailable,

    #[error("{address} does not have the {role} role")]
    RoleCheckFailed { address: String, role: String },

    #[error("uid {uid} was already used")]
    ReplayRisk { uid: String },

    #[error("mint request is missing {field}")]
    MissingField { field: String },

    #[error("mint request carries {field}, which its layout does not sign")]
    UnexpectedField { field: String },

    #[error("royalty bps {bps} exceeds 10000")]
    InvalidRoyaltyBps { bps: u16 },

    #[error("validity window ends ({end}) before it starts ({start})")]
    InvalidValidityWindow { start: u64, end: u64 },

    #[error("only free mints can be batched")]
    PricedBatchMint,

    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },
}
