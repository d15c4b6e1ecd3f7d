use std::collections::BTreeMap;

use cosmwasm_schema::cw_serde;
use cosmwasm_std::Uint256;
use drop_common::msg::{AllowlistProof, ExecuteMsg};
use drop_common::{Address, AllowlistEntry, ClaimPhase, Hash32, Receipt, SnapshotInfo, UNLIMITED};

/// A cap on supply or per-transaction quantity.
#[cw_serde]
#[derive(Copy)]
pub enum SupplyLimit {
    Unlimited,
    Limited(Uint256),
}

impl SupplyLimit {
    pub fn from_amount(amount: Uint256) -> Self {
        if amount == UNLIMITED {
            SupplyLimit::Unlimited
        } else {
            SupplyLimit::Limited(amount)
        }
    }

    /// The on-chain value; `Unlimited` maps to `UNLIMITED`.
    pub fn to_amount(&self) -> Uint256 {
        match self {
            SupplyLimit::Unlimited => UNLIMITED,
            SupplyLimit::Limited(amount) => *amount,
        }
    }
}

impl From<u64> for SupplyLimit {
    fn from(amount: u64) -> Self {
        SupplyLimit::Limited(Uint256::from(amount))
    }
}

/// Owner-supplied description of one claim phase. Every field is optional;
/// absent fields take their defaults when normalized, or keep the existing
/// value when merged onto a phase by `update`.
#[cw_serde]
#[derive(Default)]
pub struct PhaseInput {
    /// Unix seconds. Defaults to the current block time.
    pub start_time: Option<u64>,
    /// Defaults to the native token. The zero address also means native.
    pub currency: Option<Address>,
    /// Unsigned integer in the currency's smallest unit, as a decimal string.
    pub price: Option<String>,
    pub max_claimable_supply: Option<SupplyLimit>,
    pub quantity_limit_per_transaction: Option<SupplyLimit>,
    pub wait_seconds_between_claims: Option<u64>,
    pub merkle_root: Option<Hash32>,
    /// When present, a snapshot is built and its root replaces `merkle_root`.
    pub allowlist: Option<Vec<AllowlistEntry>>,
}

impl PhaseInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// The input that reproduces `phase` exactly.
    pub fn from_phase(phase: &ClaimPhase) -> Self {
        Self {
            start_time: Some(phase.start_time),
            currency: Some(phase.currency),
            price: Some(phase.price.to_string()),
            max_claimable_supply: Some(SupplyLimit::from_amount(phase.max_claimable_supply)),
            quantity_limit_per_transaction: Some(SupplyLimit::from_amount(
                phase.quantity_limit_per_transaction,
            )),
            wait_seconds_between_claims: Some(phase.wait_seconds_between_claims),
            merkle_root: Some(phase.merkle_root),
            allowlist: None,
        }
    }

    /// Fields set in `partial` replace the ones in `self`.
    pub fn merge(self, partial: PhaseInput) -> Self {
        Self {
            start_time: partial.start_time.or(self.start_time),
            currency: partial.currency.or(self.currency),
            price: partial.price.or(self.price),
            max_claimable_supply: partial.max_claimable_supply.or(self.max_claimable_supply),
            quantity_limit_per_transaction: partial
                .quantity_limit_per_transaction
                .or(self.quantity_limit_per_transaction),
            wait_seconds_between_claims: partial
                .wait_seconds_between_claims
                .or(self.wait_seconds_between_claims),
            merkle_root: partial.merkle_root.or(self.merkle_root),
            allowlist: partial.allowlist.or(self.allowlist),
        }
    }

    pub fn start_time(mut self, start_time: u64) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn currency(mut self, currency: Address) -> Self {
        self.currency = Some(currency);
        self
    }

    pub fn price(mut self, price: impl Into<String>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn max_claimable_supply(mut self, limit: impl Into<SupplyLimit>) -> Self {
        self.max_claimable_supply = Some(limit.into());
        self
    }

    pub fn quantity_limit_per_transaction(mut self, limit: impl Into<SupplyLimit>) -> Self {
        self.quantity_limit_per_transaction = Some(limit.into());
        self
    }

    pub fn wait_seconds_between_claims(mut self, seconds: u64) -> Self {
        self.wait_seconds_between_claims = Some(seconds);
        self
    }

    pub fn merkle_root(mut self, root: Hash32) -> Self {
        self.merkle_root = Some(root);
        self
    }

    pub fn allowlist(mut self, entries: Vec<AllowlistEntry>) -> Self {
        self.allowlist = Some(entries);
        self
    }
}

/// Everything `set_all`/`update` would submit, before submission.
#[derive(Clone, Debug)]
pub struct ClaimConditionsPlan {
    /// Normalized phases, sorted by start time.
    pub phases: Vec<ClaimPhase>,
    /// Merkle root to snapshot location, as written to the contract metadata.
    pub merkle: BTreeMap<String, String>,
    /// Snapshots built from the inputs' allowlists.
    pub snapshots: Vec<SnapshotInfo>,
    /// New contract metadata location, if the merkle map changed.
    pub metadata_uri: Option<String>,
    pub calls: Vec<ExecuteMsg>,
}

#[derive(Clone, Debug)]
pub struct ClaimConditionsResponse {
    pub plan: ClaimConditionsPlan,
    pub receipt: Receipt,
}

/// A phase read back from the ledger.
#[cw_serde]
pub struct ClaimConditionView {
    pub id: u64,
    pub phase: ClaimPhase,
    /// `None` for unlimited supply.
    pub available_supply: Option<Uint256>,
    /// Allowlist behind the phase's merkle root, when its snapshot is known.
    pub snapshot: Option<Vec<AllowlistEntry>>,
}

/// Arguments for a claim against the active phase.
#[cw_serde]
pub struct ClaimVerification {
    pub condition_id: u64,
    pub allowlist_proof: AllowlistProof,
    pub price: Uint256,
    pub currency: Address,
    /// Native token to attach; zero unless paying in the native token.
    pub native_value: Uint256,
}

impl ClaimVerification {
    pub fn to_msg(&self, receiver: Address, quantity: Uint256) -> ExecuteMsg {
        ExecuteMsg::Claim {
            receiver,
            quantity,
            currency: self.currency,
            price_per_token: self.price,
            allowlist_proof: self.allowlist_proof.clone(),
            native_value: self.native_value,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClaimResponse {
    pub verification: ClaimVerification,
    pub receipt: Receipt,
}
