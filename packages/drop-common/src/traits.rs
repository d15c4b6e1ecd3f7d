use async_trait::async_trait;
use cosmwasm_std::{Binary, StdResult, Uint256};

use crate::typed_data::{Eip712Domain, TypedField, TypedValue};
use crate::types::{Address, ClaimConditionRange, ClaimPhase, Hash32, Receipt, Role};

/// Content-addressed blob storage. Identical bytes map to the same location.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn put(&self, data: &[u8]) -> StdResult<String>;
    async fn get(&self, location: &str) -> StdResult<Binary>;
}

/// Read-only view of a drop contract's on-chain state.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn block_timestamp(&self) -> StdResult<u64>;

    async fn claim_condition_range(&self, contract: &Address) -> StdResult<ClaimConditionRange>;

    async fn claim_condition_by_id(&self, contract: &Address, id: u64) -> StdResult<ClaimPhase>;

    async fn active_claim_condition_id(&self, contract: &Address) -> StdResult<Option<u64>>;

    /// The phase active at the current block, if any.
    async fn active_phase(&self, contract: &Address) -> StdResult<Option<ClaimPhase>> {
        match self.active_claim_condition_id(contract).await? {
            Some(id) => self.claim_condition_by_id(contract, id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Zero if the wallet never claimed under this condition.
    async fn last_claim_timestamp(
        &self,
        contract: &Address,
        condition_id: u64,
        wallet: &Address,
    ) -> StdResult<u64>;

    async fn currency_balance(&self, wallet: &Address, currency: &Address) -> StdResult<Uint256>;

    async fn contract_uri(&self, contract: &Address) -> StdResult<Option<String>>;
}

#[async_trait]
pub trait Roles: Send + Sync {
    async fn has_role(&self, contract: &Address, role: Role, account: &Address) -> StdResult<bool>;
}

/// Holder of a signing key. Produces 65-byte `r ++ s ++ v` signatures over
/// the EIP-712 digest of the given message.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn address(&self) -> StdResult<Address>;

    async fn sign_typed_data(
        &self,
        domain: &Eip712Domain,
        primary_type: &str,
        fields: &[TypedField],
        values: &[TypedValue],
    ) -> StdResult<Binary>;
}

/// Recovers the signing address of a digest. `None` for signatures that do
/// not recover to any key.
pub trait SignatureVerifier: Send + Sync {
    fn recover(&self, digest: &Hash32, signature: &[u8]) -> Option<Address>;
}

#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Submits JSON-encoded `ExecuteMsg` calls against `contract` as one
    /// multicall.
    async fn submit(&self, contract: &Address, calls: Vec<Binary>) -> StdResult<Receipt>;
}

/// Phases in id order, read through the bounded id range.
pub async fn read_claim_phases(
    ledger: &dyn Ledger,
    contract: &Address,
) -> StdResult<Vec<(u64, ClaimPhase)>> {
    let range = ledger.claim_condition_range(contract).await?;
    let mut phases = Vec::with_capacity(range.count as usize);
    for id in range.ids() {
        phases.push((id, ledger.claim_condition_by_id(contract, id).await?));
    }
    Ok(phases)
}

