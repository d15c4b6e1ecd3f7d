use std::fmt;

use cosmwasm_schema::cw_serde;
use cosmwasm_std::Uint256;
use drop_common::msg::AllowlistProof;
use drop_common::{verify_allowlist_proof, Address, AllowlistEntry, ClaimPhase, LeafFormat};

/// Why a wallet cannot currently claim. Reported in declaration order.
#[cw_serde]
#[derive(Copy, Eq, Hash)]
pub enum IneligibilityReason {
    NoActiveClaimPhase,
    NotEnoughSupply,
    AddressNotAllowed,
    WaitBeforeNextClaimTransaction,
    NotEnoughTokens,
}

impl IneligibilityReason {
    pub fn message(&self) -> &'static str {
        match self {
            IneligibilityReason::NoActiveClaimPhase => {
                "There is no active claim phase at the moment. Please check back in later."
            }
            IneligibilityReason::NotEnoughSupply => "There is not enough supply to claim.",
            IneligibilityReason::AddressNotAllowed => "This address is not on the allowlist.",
            IneligibilityReason::WaitBeforeNextClaimTransaction => {
                "Not enough time since last claim transaction. Please wait."
            }
            IneligibilityReason::NotEnoughTokens => {
                "There are not enough tokens in the wallet to pay for the claim."
            }
        }
    }
}

impl fmt::Display for IneligibilityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Everything the evaluator looks at, already read from the ledger.
#[derive(Clone, Debug)]
pub struct EligibilityInput {
    pub wallet: Address,
    pub quantity: Uint256,
    pub now: u64,
    pub active_phase: Option<ClaimPhase>,
    /// The wallet's snapshot proof, `None` when the wallet has no entry.
    pub allowlist_proof: Option<AllowlistProof>,
    pub leaf_format: LeafFormat,
    /// Zero if the wallet never claimed in the active phase.
    pub last_claim_timestamp: u64,
    /// Balance in the active phase's currency.
    pub currency_balance: Uint256,
}

pub fn ineligibility_reasons(input: &EligibilityInput) -> Vec<IneligibilityReason> {
    let Some(phase) = &input.active_phase else {
        return vec![IneligibilityReason::NoActiveClaimPhase];
    };

    let mut reasons = Vec::new();

    if let Some(available) = phase.available_supply() {
        if available < input.quantity {
            reasons.push(IneligibilityReason::NotEnoughSupply);
        }
    }

    if phase.has_allowlist() && !is_allowed(input, phase) {
        reasons.push(IneligibilityReason::AddressNotAllowed);
    }

    if input.last_claim_timestamp > 0 {
        let next_claim = input
            .last_claim_timestamp
            .saturating_add(phase.wait_seconds_between_claims);
        if input.now < next_claim {
            reasons.push(IneligibilityReason::WaitBeforeNextClaimTransaction);
        }
    }

    if !phase.price.is_zero() {
        let affordable = phase
            .price
            .checked_mul(input.quantity)
            .map(|total| input.currency_balance >= total)
            .unwrap_or(false);
        if !affordable {
            reasons.push(IneligibilityReason::NotEnoughTokens);
        }
    }

    reasons
}

pub fn can_claim(input: &EligibilityInput) -> bool {
    ineligibility_reasons(input).is_empty()
}

fn is_allowed(input: &EligibilityInput, phase: &ClaimPhase) -> bool {
    // A root equal to the wallet's own hash is a one-address allowlist.
    if input.wallet.hash() == phase.merkle_root {
        return true;
    }
    let Some(proof) = &input.allowlist_proof else {
        return false;
    };
    let entry = AllowlistEntry::new(input.wallet, proof.max_claimable);
    let verified = verify_allowlist_proof(&phase.merkle_root, &entry, &proof.proof, input.leaf_format);
    let within_limit = proof.max_claimable.is_zero() || input.quantity <= proof.max_claimable;
    verified && within_limit
}
