use std::collections::BTreeMap;

use cosmwasm_schema::cw_serde;
use cosmwasm_std::StdError;
use drop_common::{Address, ContentStore, LeafFormat, Ledger};
use serde::{Deserialize, Serialize};

use crate::error::ContractError;

#[cw_serde]
pub struct ClaimConditionsConfig {
    /// The drop contract whose claim conditions are managed.
    pub contract: Address,
    /// Leaf encoding the contract verifies allowlist proofs with.
    pub leaf_format: LeafFormat,
}

pub fn validate_config(config: &ClaimConditionsConfig) -> Result<(), ContractError> {
    if config.contract.is_zero() {
        return Err(ContractError::InvalidConfig {
            reason: "contract address must not be zero".to_string(),
        });
    }
    Ok(())
}

/// The contract-level metadata document. Only `merkle` is interpreted here;
/// every other field is carried through untouched.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ContractMetadata {
    /// Hex merkle root to snapshot location.
    #[serde(default)]
    pub merkle: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContractMetadata {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ContractError> {
        serde_json::from_slice(bytes)
            .map_err(|err| StdError::parse_err("ContractMetadata", err).into())
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, ContractError> {
        serde_json::to_vec(self)
            .map_err(|err| StdError::serialize_err("ContractMetadata", err).into())
    }
}

/// Loads the metadata document the contract URI points at. A contract
/// without a URI has empty metadata.
pub async fn load_metadata(
    ledger: &dyn Ledger,
    store: &dyn ContentStore,
    contract: &Address,
) -> Result<ContractMetadata, ContractError> {
    match ledger.contract_uri(contract).await? {
        Some(uri) if !uri.is_empty() => {
            let bytes = store.get(&uri).await?;
            ContractMetadata::from_slice(&bytes)
        }
        _ => Ok(ContractMetadata::default()),
    }
}

pub async fn save_metadata(
    store: &dyn ContentStore,
    metadata: &ContractMetadata,
) -> Result<String, ContractError> {
    let bytes = metadata.to_vec()?;
    Ok(store.put(&bytes).await?)
}
