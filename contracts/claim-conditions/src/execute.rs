use std::collections::BTreeMap;
use std::str::FromStr;

use cosmwasm_std::Uint256;
use drop_common::msg::ExecuteMsg;
use drop_common::traits::read_claim_phases;
use drop_common::{
    publish_snapshot, Address, ClaimPhase, ContentStore, Hash32, LeafFormat, Ledger, Snapshot,
    SnapshotInfo, NATIVE_TOKEN, UNLIMITED,
};
use tracing::{debug, info};

use crate::error::ContractError;
use crate::msg::{ClaimConditionsPlan, PhaseInput};
use crate::state::{load_metadata, save_metadata, ClaimConditionsConfig};

/// Parses a price in the currency's smallest unit.
pub fn parse_price(price: &str) -> Result<Uint256, ContractError> {
    let trimmed = price.trim();
    if trimmed.starts_with('-') {
        return Err(ContractError::InvalidPrice {
            price: price.to_string(),
            reason: "price must not be negative".to_string(),
        });
    }
    Uint256::from_str(trimmed).map_err(|_| ContractError::InvalidPrice {
        price: price.to_string(),
        reason: "price must be an unsigned integer".to_string(),
    })
}

/// Applies defaults to one input. The allowlist is handled by the caller;
/// `supply_claimed` is left at zero.
pub fn normalize_phase(input: &PhaseInput, now: u64) -> Result<ClaimPhase, ContractError> {
    let currency = match input.currency {
        Some(currency) if !currency.is_zero() => currency,
        _ => NATIVE_TOKEN,
    };
    let price = match &input.price {
        Some(price) => parse_price(price)?,
        None => Uint256::zero(),
    };

    Ok(ClaimPhase {
        start_time: input.start_time.unwrap_or(now),
        currency,
        price,
        max_claimable_supply: input
            .max_claimable_supply
            .map_or(UNLIMITED, |limit| limit.to_amount()),
        supply_claimed: Uint256::zero(),
        quantity_limit_per_transaction: input
            .quantity_limit_per_transaction
            .map_or(UNLIMITED, |limit| limit.to_amount()),
        wait_seconds_between_claims: input.wait_seconds_between_claims.unwrap_or_default(),
        merkle_root: input.merkle_root.unwrap_or(Hash32::ZERO),
    })
}

/// Phases ready for submission together with the snapshots their
/// allowlists produced.
#[derive(Clone, Debug)]
pub struct NormalizedPhases {
    pub phases: Vec<ClaimPhase>,
    /// One per distinct non-empty allowlist, in first-seen order.
    pub snapshots: Vec<Snapshot>,
}

/// Normalizes, builds allowlist snapshots, sorts by start time (stable) and
/// carries over the supply already claimed at each position, which the
/// contract keeps unless eligibility is reset. Performs no I/O.
pub fn normalize_phases(
    inputs: &[PhaseInput],
    previous: &[ClaimPhase],
    reset_claim_eligibility: bool,
    now: u64,
    leaf_format: LeafFormat,
) -> Result<NormalizedPhases, ContractError> {
    let mut phases = Vec::with_capacity(inputs.len());
    let mut snapshots: Vec<Snapshot> = Vec::new();

    for input in inputs {
        let mut phase = normalize_phase(input, now)?;
        if let Some(entries) = &input.allowlist {
            let snapshot = Snapshot::build(entries.clone(), leaf_format)?;
            phase.merkle_root = snapshot.merkle_root();
            let known = snapshots
                .iter()
                .any(|s| s.merkle_root() == snapshot.merkle_root());
            if !entries.is_empty() && !known {
                snapshots.push(snapshot);
            }
        }
        phases.push(phase);
    }

    phases.sort_by_key(|phase| phase.start_time);

    for (index, phase) in phases.iter_mut().enumerate() {
        let claimed = if reset_claim_eligibility {
            Uint256::zero()
        } else {
            previous
                .get(index)
                .map(|p| p.supply_claimed)
                .unwrap_or_default()
        };
        if phase.max_claimable_supply < claimed {
            return Err(ContractError::SupplyBelowClaimed {
                index,
                max: phase.max_claimable_supply,
                claimed,
            });
        }
        phase.supply_claimed = claimed;
    }

    Ok(NormalizedPhases { phases, snapshots })
}

/// Replaces the input at `index` with `partial` merged onto it.
pub fn merge_phase_input(
    mut existing: Vec<PhaseInput>,
    index: usize,
    partial: PhaseInput,
) -> Result<Vec<PhaseInput>, ContractError> {
    let len = existing.len();
    let slot = existing
        .get_mut(index)
        .ok_or(ContractError::IndexOutOfRange { index, len })?;
    *slot = std::mem::take(slot).merge(partial);
    Ok(existing)
}

/// Builds the multicall that replaces every claim condition with `inputs`.
pub async fn set_claim_conditions(
    ledger: &dyn Ledger,
    store: &dyn ContentStore,
    config: &ClaimConditionsConfig,
    inputs: Vec<PhaseInput>,
    reset_claim_eligibility: bool,
) -> Result<ClaimConditionsPlan, ContractError> {
    let now = ledger.block_timestamp().await?;
    let previous = current_phases(ledger, &config.contract).await?;
    let normalized = normalize_phases(
        &inputs,
        &previous,
        reset_claim_eligibility,
        now,
        config.leaf_format,
    )?;
    build_plan(ledger, store, config, normalized, reset_claim_eligibility).await
}

/// Builds the multicall that merges `partial` onto the phase at `index` and
/// resubmits the whole list.
pub async fn update_claim_condition(
    ledger: &dyn Ledger,
    store: &dyn ContentStore,
    config: &ClaimConditionsConfig,
    index: usize,
    partial: PhaseInput,
) -> Result<ClaimConditionsPlan, ContractError> {
    let now = ledger.block_timestamp().await?;
    let previous = current_phases(ledger, &config.contract).await?;
    let existing = previous.iter().map(PhaseInput::from_phase).collect();
    let inputs = merge_phase_input(existing, index, partial)?;
    let normalized = normalize_phases(&inputs, &previous, false, now, config.leaf_format)?;
    build_plan(ledger, store, config, normalized, false).await
}

async fn current_phases(
    ledger: &dyn Ledger,
    contract: &Address,
) -> Result<Vec<ClaimPhase>, ContractError> {
    Ok(read_claim_phases(ledger, contract)
        .await?
        .into_iter()
        .map(|(_, phase)| phase)
        .collect())
}

/// Publishes new snapshots, rewrites the merkle map and assembles the calls.
/// Every validation has already passed when this runs.
async fn build_plan(
    ledger: &dyn Ledger,
    store: &dyn ContentStore,
    config: &ClaimConditionsConfig,
    normalized: NormalizedPhases,
    reset_claim_eligibility: bool,
) -> Result<ClaimConditionsPlan, ContractError> {
    let NormalizedPhases { phases, snapshots } = normalized;
    let mut metadata = load_metadata(ledger, store, &config.contract).await?;

    let mut merkle = BTreeMap::new();
    let mut infos = Vec::with_capacity(snapshots.len());
    for snapshot in snapshots {
        let root = snapshot.merkle_root();
        let uri = match metadata.merkle.get(&root.to_string()) {
            Some(uri) => {
                debug!(%root, %uri, "reusing stored allowlist snapshot");
                uri.clone()
            }
            None => publish_snapshot(store, &snapshot).await?,
        };
        merkle.insert(root.to_string(), uri.clone());
        infos.push(SnapshotInfo {
            merkle_root: root,
            uri,
            snapshot,
        });
    }

    // Roots kept from earlier submissions stay mapped; unreferenced ones go.
    for phase in phases.iter().filter(|phase| phase.has_allowlist()) {
        let key = phase.merkle_root.to_string();
        if let Some(uri) = metadata.merkle.get(&key) {
            merkle.entry(key).or_insert_with(|| uri.clone());
        }
    }

    let mut calls = Vec::with_capacity(2);
    let mut metadata_uri = None;
    if merkle != metadata.merkle {
        metadata.merkle = merkle.clone();
        let uri = save_metadata(store, &metadata).await?;
        info!(%uri, roots = merkle.len(), "contract metadata rewritten");
        calls.push(ExecuteMsg::SetContractUri { uri: uri.clone() });
        metadata_uri = Some(uri);
    }
    calls.push(ExecuteMsg::SetClaimConditions {
        phases: phases.clone(),
        reset_claim_eligibility,
    });

    Ok(ClaimConditionsPlan {
        phases,
        merkle,
        snapshots: infos,
        metadata_uri,
        calls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use drop_common::testing::{MockContentStore, MockLedger};
    use drop_common::{AllowlistEntry, Address};

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    fn contract() -> Address {
        Address::new([0xc0; 20])
    }

    fn config() -> ClaimConditionsConfig {
        ClaimConditionsConfig {
            contract: contract(),
            leaf_format: LeafFormat::AddressWithMaxClaimable,
        }
    }

    fn allowlist() -> Vec<AllowlistEntry> {
        vec![
            AllowlistEntry::new(addr(0xaa), 2u64),
            AllowlistEntry::new(addr(0xbb), 1u64),
        ]
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("100").unwrap(), Uint256::from(100u64));
        assert_eq!(parse_price(" 0 ").unwrap(), Uint256::zero());
        assert!(matches!(
            parse_price("-1"),
            Err(ContractError::InvalidPrice { .. })
        ));
        assert!(matches!(
            parse_price("0.5"),
            Err(ContractError::InvalidPrice { .. })
        ));
        assert!(matches!(
            parse_price("abc"),
            Err(ContractError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn test_normalize_phase_defaults() {
        let phase = normalize_phase(&PhaseInput::new(), 1_234).unwrap();
        assert_eq!(phase.start_time, 1_234);
        assert_eq!(phase.currency, NATIVE_TOKEN);
        assert!(phase.price.is_zero());
        assert_eq!(phase.max_claimable_supply, UNLIMITED);
        assert_eq!(phase.quantity_limit_per_transaction, UNLIMITED);
        assert_eq!(phase.wait_seconds_between_claims, 0);
        assert!(phase.merkle_root.is_zero());

        let zero_currency = normalize_phase(&PhaseInput::new().currency(Address::ZERO), 0).unwrap();
        assert_eq!(zero_currency.currency, NATIVE_TOKEN);
    }

    #[test]
    fn test_normalize_phases_sorts_by_start_time() {
        let inputs = vec![
            PhaseInput::new().start_time(200).price("2"),
            PhaseInput::new().start_time(100).price("1"),
            PhaseInput::new().start_time(200).price("3"),
        ];
        let normalized =
            normalize_phases(&inputs, &[], false, 0, LeafFormat::AddressOnly).unwrap();
        let starts: Vec<u64> = normalized.phases.iter().map(|p| p.start_time).collect();
        let prices: Vec<Uint256> = normalized.phases.iter().map(|p| p.price).collect();
        assert_eq!(starts, vec![100, 200, 200]);
        // Ties keep input order
        assert_eq!(
            prices,
            vec![Uint256::from(1u64), Uint256::from(2u64), Uint256::from(3u64)]
        );
    }

    #[test]
    fn test_normalize_phases_builds_snapshots_once() {
        let inputs = vec![
            PhaseInput::new().start_time(1).allowlist(allowlist()),
            PhaseInput::new().start_time(2).allowlist(allowlist()),
        ];
        let normalized = normalize_phases(
            &inputs,
            &[],
            false,
            0,
            LeafFormat::AddressWithMaxClaimable,
        )
        .unwrap();
        assert_eq!(normalized.snapshots.len(), 1);
        assert_eq!(
            normalized.phases[0].merkle_root,
            normalized.snapshots[0].merkle_root()
        );
        assert_eq!(normalized.phases[0].merkle_root, normalized.phases[1].merkle_root);
    }

    #[test]
    fn test_normalize_phases_rejects_supply_below_claimed() {
        let mut claimed = normalize_phase(&PhaseInput::new(), 0).unwrap();
        claimed.supply_claimed = Uint256::from(5u64);

        let inputs = vec![PhaseInput::new().max_claimable_supply(4u64)];
        let err = normalize_phases(&inputs, &[claimed.clone()], false, 0, LeafFormat::AddressOnly)
            .unwrap_err();
        assert!(matches!(
            err,
            ContractError::SupplyBelowClaimed { index: 0, .. }
        ));

        // Resetting eligibility starts the count over
        let normalized =
            normalize_phases(&inputs, &[claimed], true, 0, LeafFormat::AddressOnly).unwrap();
        assert!(normalized.phases[0].supply_claimed.is_zero());
    }

    #[test]
    fn test_merge_phase_input_out_of_range() {
        let err = merge_phase_input(vec![PhaseInput::new()], 1, PhaseInput::new()).unwrap_err();
        assert!(matches!(
            err,
            ContractError::IndexOutOfRange { index: 1, len: 1 }
        ));
    }

    #[tokio::test]
    async fn test_set_claim_conditions_publishes_snapshot_and_metadata() {
        let ledger = MockLedger::default();
        let store = MockContentStore::new();

        let plan = set_claim_conditions(
            &ledger,
            &store,
            &config(),
            vec![PhaseInput::new().start_time(0).allowlist(allowlist())],
            false,
        )
        .await
        .unwrap();

        assert_eq!(plan.snapshots.len(), 1);
        let root = plan.phases[0].merkle_root;
        assert_eq!(plan.merkle.get(&root.to_string()), Some(&plan.snapshots[0].uri));
        assert_eq!(plan.calls.len(), 2);
        assert!(matches!(plan.calls[0], ExecuteMsg::SetContractUri { .. }));
        assert!(matches!(plan.calls[1], ExecuteMsg::SetClaimConditions { .. }));
        // snapshot + metadata
        assert_eq!(store.put_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_validation_happens_before_any_write() {
        let ledger = MockLedger::default();
        let store = MockContentStore::new();

        let err = set_claim_conditions(
            &ledger,
            &store,
            &config(),
            vec![
                PhaseInput::new().allowlist(allowlist()),
                PhaseInput::new().price("-5"),
            ],
            false,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ContractError::InvalidPrice { .. }));
        assert_eq!(store.put_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_phases_leave_metadata_alone() {
        let ledger = MockLedger::default();
        let store = MockContentStore::new();

        let plan = set_claim_conditions(
            &ledger,
            &store,
            &config(),
            vec![PhaseInput::new().start_time(0)],
            false,
        )
        .await
        .unwrap();
        assert!(plan.metadata_uri.is_none());
        assert_eq!(plan.calls.len(), 1);
        assert_eq!(store.put_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_out_of_range_index() {
        let ledger = MockLedger::default();
        let store = MockContentStore::new();
        ledger
            .set_claim_conditions(
                &contract(),
                0,
                vec![normalize_phase(&PhaseInput::new().start_time(0), 0).unwrap()],
            )
            .unwrap();

        let err = update_claim_condition(&ledger, &store, &config(), 1, PhaseInput::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ContractError::IndexOutOfRange { index: 1, len: 1 }
        ));
    }
}
