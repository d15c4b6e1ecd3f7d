use cosmwasm_std::{StdError, Uint256};
use drop_common::CommonError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Common(#[from] CommonError),

    #[error("invalid price {price:?}: {reason}")]
    InvalidPrice { price: String, reason: String },

    #[error("claim condition index {index} out of range (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("phase {index}: max claimable supply {max} is below supply already claimed {claimed}")]
    SupplyBelowClaimed {
        index: usize,
        max: Uint256,
        claimed: Uint256,
    },

    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("no active claim phase")]
    NoActiveClaimPhase,
}
