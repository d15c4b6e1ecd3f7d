use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{StdError, StdResult};
use drop_common::typed_data::Eip712Domain;
use drop_common::{Address, Hash32, MintRequest};

use crate::error::ContractError;
use crate::typed_data::{mint_request_digest, MintRequestVariant, DEFAULT_DOMAIN_VERSION};

#[cw_serde]
pub struct SignatureMintConfig {
    /// The contract that will verify and redeem the requests.
    pub contract: Address,
    pub chain_id: u64,
    pub variant: MintRequestVariant,
    /// Overrides the variant's default EIP-712 domain name.
    pub domain_name: Option<String>,
    /// Defaults to "1".
    pub domain_version: Option<String>,
}

impl SignatureMintConfig {
    pub fn new(contract: Address, chain_id: u64, variant: MintRequestVariant) -> Self {
        Self {
            contract,
            chain_id,
            variant,
            domain_name: None,
            domain_version: None,
        }
    }

    pub fn domain(&self) -> Eip712Domain {
        Eip712Domain {
            name: self
                .domain_name
                .clone()
                .unwrap_or_else(|| self.variant.default_domain_name().to_string()),
            version: self
                .domain_version
                .clone()
                .unwrap_or_else(|| DEFAULT_DOMAIN_VERSION.to_string()),
            chain_id: self.chain_id,
            verifying_contract: self.contract,
        }
    }

    /// EIP-712 digest of `request` under this contract's domain and layout.
    pub fn digest(&self, request: &MintRequest) -> Result<Hash32, ContractError> {
        mint_request_digest(&self.domain(), self.variant, request)
    }
}

pub fn validate_config(config: &SignatureMintConfig) -> Result<(), ContractError> {
    if config.contract.is_zero() {
        return Err(ContractError::InvalidConfig {
            reason: "contract address must not be zero".to_string(),
        });
    }
    if config.chain_id == 0 {
        return Err(ContractError::InvalidConfig {
            reason: "chain id must not be zero".to_string(),
        });
    }
    let blank = |value: &Option<String>| value.as_deref().is_some_and(|v| v.trim().is_empty());
    if blank(&config.domain_name) || blank(&config.domain_version) {
        return Err(ContractError::InvalidConfig {
            reason: "domain name and version must not be blank".to_string(),
        });
    }
    Ok(())
}

/// Uids handed out by one client instance. A batch reserves its uids before
/// uploading or signing anything and releases them if it fails.
#[derive(Default)]
pub struct UidRegistry {
    issued: Mutex<HashSet<Hash32>>,
}

impl UidRegistry {
    fn lock(&self) -> StdResult<MutexGuard<'_, HashSet<Hash32>>> {
        self.issued
            .lock()
            .map_err(|_| StdError::generic_err("uid registry lock poisoned"))
    }

    pub fn contains(&self, uid: &Hash32) -> StdResult<bool> {
        Ok(self.lock()?.contains(uid))
    }

    /// Claims every uid or none of them.
    pub fn reserve(&self, uids: &[Hash32]) -> Result<(), ContractError> {
        let mut issued = self.lock()?;
        if let Some(taken) = uids.iter().find(|uid| issued.contains(*uid)) {
            return Err(ContractError::ReplayRisk {
                uid: taken.to_string(),
            });
        }
        issued.extend(uids.iter().copied());
        Ok(())
    }

    pub fn release(&self, uids: &[Hash32]) -> StdResult<()> {
        let mut issued = self.lock()?;
        for uid in uids {
            issued.remove(uid);
        }
        Ok(())
    }
}
