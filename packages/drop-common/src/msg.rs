use cosmwasm_schema::cw_serde;
use cosmwasm_std::{to_json_binary, Binary, StdResult, Uint256};

use crate::types::{Address, ClaimPhase, Hash32, MintRequest};

/// Calls understood by a drop contract, as handed to the transaction submitter.
#[cw_serde]
pub enum ExecuteMsg {
    /// Point the contract metadata at a new document. Admin only.
    SetContractUri { uri: String },
    /// Replace the whole claim condition list. Admin only.
    /// With `reset_claim_eligibility` the condition ids restart, so supply
    /// claimed and per-wallet history no longer apply.
    SetClaimConditions {
        phases: Vec<ClaimPhase>,
        reset_claim_eligibility: bool,
    },
    /// Claim from the active phase. `native_value` is the amount of native
    /// token attached to the call.
    Claim {
        receiver: Address,
        quantity: Uint256,
        currency: Address,
        price_per_token: Uint256,
        allowlist_proof: AllowlistProof,
        native_value: Uint256,
    },
    /// Redeem a signed mint authorization.
    MintWithSignature {
        request: MintRequest,
        signature: Binary,
    },
}

/// Inclusion proof passed with a claim. `max_claimable` is the limit encoded
/// in the claimer's leaf, zero for address-only allowlists.
#[cw_serde]
#[derive(Default)]
pub struct AllowlistProof {
    pub proof: Vec<Hash32>,
    pub max_claimable: Uint256,
}

/// JSON-encodes calls for `TransactionSubmitter::submit`.
pub fn encode_calls(calls: &[ExecuteMsg]) -> StdResult<Vec<Binary>> {
    calls.iter().map(to_json_binary).collect()
}
