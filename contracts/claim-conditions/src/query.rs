use std::collections::BTreeMap;

use cosmwasm_std::Uint256;
use drop_common::msg::AllowlistProof;
use drop_common::traits::read_claim_phases;
use drop_common::{
    fetch_snapshot, Address, ClaimPhase, CommonError, ContentStore, Hash32, Ledger, Snapshot,
};
use tracing::debug;

use crate::eligibility::{self, EligibilityInput, IneligibilityReason};
use crate::error::ContractError;
use crate::msg::{ClaimConditionView, ClaimVerification};
use crate::state::{load_metadata, ClaimConditionsConfig};

async fn snapshot_for(
    store: &dyn ContentStore,
    merkle: &BTreeMap<String, String>,
    phase: &ClaimPhase,
) -> Result<Option<Snapshot>, ContractError> {
    if !phase.has_allowlist() {
        return Ok(None);
    }
    Ok(fetch_snapshot(store, &phase.merkle_root, merkle).await?)
}

async fn to_view(
    store: &dyn ContentStore,
    merkle: &BTreeMap<String, String>,
    id: u64,
    phase: ClaimPhase,
) -> Result<ClaimConditionView, ContractError> {
    let snapshot = snapshot_for(store, merkle, &phase).await?;
    Ok(ClaimConditionView {
        id,
        available_supply: phase.available_supply(),
        snapshot: snapshot.map(|s| s.entries().to_vec()),
        phase,
    })
}

/// Every stored claim condition, in id order.
pub async fn query_all(
    ledger: &dyn Ledger,
    store: &dyn ContentStore,
    config: &ClaimConditionsConfig,
) -> Result<Vec<ClaimConditionView>, ContractError> {
    let phases = read_claim_phases(ledger, &config.contract).await?;
    let metadata = load_metadata(ledger, store, &config.contract).await?;

    let mut views = Vec::with_capacity(phases.len());
    for (id, phase) in phases {
        views.push(to_view(store, &metadata.merkle, id, phase).await?);
    }
    Ok(views)
}

pub async fn query_active(
    ledger: &dyn Ledger,
    store: &dyn ContentStore,
    config: &ClaimConditionsConfig,
) -> Result<Option<ClaimConditionView>, ContractError> {
    let Some(id) = ledger.active_claim_condition_id(&config.contract).await? else {
        return Ok(None);
    };
    let phase = ledger.claim_condition_by_id(&config.contract, id).await?;
    let metadata = load_metadata(ledger, store, &config.contract).await?;
    to_view(store, &metadata.merkle, id, phase).await.map(Some)
}

/// The wallet's proof under `root`. Empty when the snapshot or the wallet
/// is unknown.
pub async fn query_claimer_proof(
    ledger: &dyn Ledger,
    store: &dyn ContentStore,
    config: &ClaimConditionsConfig,
    wallet: &Address,
    root: &Hash32,
) -> Result<AllowlistProof, ContractError> {
    let metadata = load_metadata(ledger, store, &config.contract).await?;
    let snapshot = fetch_snapshot(store, root, &metadata.merkle).await?;
    Ok(snapshot
        .as_ref()
        .and_then(|s| proof_from_snapshot(s, wallet))
        .unwrap_or_default())
}

fn proof_from_snapshot(snapshot: &Snapshot, wallet: &Address) -> Option<AllowlistProof> {
    let entry = snapshot.entry(wallet)?;
    let proof = snapshot.proof(wallet).ok()?;
    Some(AllowlistProof {
        proof: proof.to_vec(),
        max_claimable: entry.max_claimable,
    })
}

/// Reads what the evaluator needs for `wallet` claiming `quantity` now.
pub async fn eligibility_input(
    ledger: &dyn Ledger,
    store: &dyn ContentStore,
    config: &ClaimConditionsConfig,
    wallet: &Address,
    quantity: Uint256,
) -> Result<EligibilityInput, ContractError> {
    let contract = &config.contract;
    let now = ledger.block_timestamp().await?;
    let mut input = EligibilityInput {
        wallet: *wallet,
        quantity,
        now,
        active_phase: None,
        allowlist_proof: None,
        leaf_format: config.leaf_format,
        last_claim_timestamp: 0,
        currency_balance: Uint256::zero(),
    };

    let Some(id) = ledger.active_claim_condition_id(contract).await? else {
        return Ok(input);
    };
    let phase = ledger.claim_condition_by_id(contract, id).await?;

    if phase.has_allowlist() {
        let metadata = load_metadata(ledger, store, contract).await?;
        let snapshot = snapshot_for(store, &metadata.merkle, &phase).await?;
        input.allowlist_proof = snapshot.as_ref().and_then(|s| proof_from_snapshot(s, wallet));
    }
    input.last_claim_timestamp = ledger.last_claim_timestamp(contract, id, wallet).await?;
    if !phase.price.is_zero() {
        input.currency_balance = ledger.currency_balance(wallet, &phase.currency).await?;
    }
    input.active_phase = Some(phase);
    Ok(input)
}

pub async fn query_ineligibility_reasons(
    ledger: &dyn Ledger,
    store: &dyn ContentStore,
    config: &ClaimConditionsConfig,
    wallet: &Address,
    quantity: Uint256,
) -> Result<Vec<IneligibilityReason>, ContractError> {
    let input = eligibility_input(ledger, store, config, wallet, quantity).await?;
    let reasons = eligibility::ineligibility_reasons(&input);
    if !reasons.is_empty() {
        debug!(%wallet, %quantity, ?reasons, "wallet cannot claim");
    }
    Ok(reasons)
}

/// Claim arguments for the active phase. A restricted phase requires the
/// wallet to be in its snapshot, unless the root is the wallet's own hash.
pub async fn prepare_claim(
    ledger: &dyn Ledger,
    store: &dyn ContentStore,
    config: &ClaimConditionsConfig,
    wallet: &Address,
    quantity: Uint256,
) -> Result<ClaimVerification, ContractError> {
    let contract = &config.contract;
    let id = ledger
        .active_claim_condition_id(contract)
        .await?
        .ok_or(ContractError::NoActiveClaimPhase)?;
    let phase = ledger.claim_condition_by_id(contract, id).await?;

    let mut allowlist_proof = AllowlistProof::default();
    if phase.has_allowlist() && wallet.hash() != phase.merkle_root {
        let metadata = load_metadata(ledger, store, contract).await?;
        let snapshot = snapshot_for(store, &metadata.merkle, &phase)
            .await?
            .ok_or_else(|| CommonError::SnapshotNotFound {
                root: phase.merkle_root.to_string(),
            })?;
        allowlist_proof = proof_from_snapshot(&snapshot, wallet).ok_or_else(|| {
            CommonError::NotInAllowlist {
                address: wallet.to_string(),
            }
        })?;
    }

    let native_value = if phase.currency.is_native_token() {
        phase.price.checked_mul(quantity).map_err(cosmwasm_std::StdError::from)?
    } else {
        Uint256::zero()
    };

    Ok(ClaimVerification {
        condition_id: id,
        allowlist_proof,
        price: phase.price,
        currency: phase.currency,
        native_value,
    })
}
