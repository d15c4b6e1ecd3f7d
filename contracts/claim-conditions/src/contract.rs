use std::sync::Arc;

use cosmwasm_std::Uint256;
use drop_common::msg::{encode_calls, AllowlistProof};
use drop_common::{Address, ContentStore, Hash32, Ledger, TransactionSubmitter};
use tracing::info;

use crate::eligibility::IneligibilityReason;
use crate::error::ContractError;
use crate::execute;
use crate::msg::{
    ClaimConditionView, ClaimConditionsPlan, ClaimConditionsResponse, ClaimResponse,
    ClaimVerification, PhaseInput,
};
use crate::query;
use crate::state::{validate_config, ClaimConditionsConfig};

/// Claim condition management for one drop contract.
pub struct ClaimConditions {
    config: ClaimConditionsConfig,
    ledger: Arc<dyn Ledger>,
    store: Arc<dyn ContentStore>,
    submitter: Arc<dyn TransactionSubmitter>,
}

impl ClaimConditions {
    pub fn new(
        config: ClaimConditionsConfig,
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn ContentStore>,
        submitter: Arc<dyn TransactionSubmitter>,
    ) -> Result<Self, ContractError> {
        validate_config(&config)?;
        Ok(Self {
            config,
            ledger,
            store,
            submitter,
        })
    }

    pub fn config(&self) -> &ClaimConditionsConfig {
        &self.config
    }

    pub async fn get_all(&self) -> Result<Vec<ClaimConditionView>, ContractError> {
        query::query_all(self.ledger.as_ref(), self.store.as_ref(), &self.config).await
    }

    pub async fn get_active(&self) -> Result<Option<ClaimConditionView>, ContractError> {
        query::query_active(self.ledger.as_ref(), self.store.as_ref(), &self.config).await
    }

    /// Builds the snapshots, metadata and calls for replacing every phase,
    /// without submitting.
    pub async fn prepare_set_all(
        &self,
        inputs: Vec<PhaseInput>,
        reset_claim_eligibility: bool,
    ) -> Result<ClaimConditionsPlan, ContractError> {
        execute::set_claim_conditions(
            self.ledger.as_ref(),
            self.store.as_ref(),
            &self.config,
            inputs,
            reset_claim_eligibility,
        )
        .await
    }

    pub async fn set_all(
        &self,
        inputs: Vec<PhaseInput>,
        reset_claim_eligibility: bool,
    ) -> Result<ClaimConditionsResponse, ContractError> {
        let plan = self.prepare_set_all(inputs, reset_claim_eligibility).await?;
        self.submit_plan(plan).await
    }

    pub async fn prepare_update(
        &self,
        index: usize,
        partial: PhaseInput,
    ) -> Result<ClaimConditionsPlan, ContractError> {
        execute::update_claim_condition(
            self.ledger.as_ref(),
            self.store.as_ref(),
            &self.config,
            index,
            partial,
        )
        .await
    }

    pub async fn update(
        &self,
        index: usize,
        partial: PhaseInput,
    ) -> Result<ClaimConditionsResponse, ContractError> {
        let plan = self.prepare_update(index, partial).await?;
        self.submit_plan(plan).await
    }

    async fn submit_plan(
        &self,
        plan: ClaimConditionsPlan,
    ) -> Result<ClaimConditionsResponse, ContractError> {
        let calls = encode_calls(&plan.calls)?;
        let receipt = self.submitter.submit(&self.config.contract, calls).await?;
        info!(
            contract = %self.config.contract,
            phases = plan.phases.len(),
            tx = %receipt.transaction_hash,
            "claim conditions submitted"
        );
        Ok(ClaimConditionsResponse { plan, receipt })
    }

    pub async fn ineligibility_reasons(
        &self,
        wallet: &Address,
        quantity: Uint256,
    ) -> Result<Vec<IneligibilityReason>, ContractError> {
        query::query_ineligibility_reasons(
            self.ledger.as_ref(),
            self.store.as_ref(),
            &self.config,
            wallet,
            quantity,
        )
        .await
    }

    pub async fn can_claim(&self, wallet: &Address, quantity: Uint256) -> Result<bool, ContractError> {
        Ok(self.ineligibility_reasons(wallet, quantity).await?.is_empty())
    }

    pub async fn claimer_proof(
        &self,
        wallet: &Address,
        merkle_root: &Hash32,
    ) -> Result<AllowlistProof, ContractError> {
        query::query_claimer_proof(
            self.ledger.as_ref(),
            self.store.as_ref(),
            &self.config,
            wallet,
            merkle_root,
        )
        .await
    }

    pub async fn prepare_claim(
        &self,
        wallet: &Address,
        quantity: Uint256,
    ) -> Result<ClaimVerification, ContractError> {
        query::prepare_claim(
            self.ledger.as_ref(),
            self.store.as_ref(),
            &self.config,
            wallet,
            quantity,
        )
        .await
    }

    /// Claims `quantity` tokens for `wallet` from the active phase.
    pub async fn claim(
        &self,
        wallet: &Address,
        quantity: Uint256,
    ) -> Result<ClaimResponse, ContractError> {
        let verification = self.prepare_claim(wallet, quantity).await?;
        let calls = encode_calls(&[verification.to_msg(*wallet, quantity)])?;
        let receipt = self.submitter.submit(&self.config.contract, calls).await?;
        info!(
            contract = %self.config.contract,
            %wallet,
            %quantity,
            condition_id = verification.condition_id,
            tx = %receipt.transaction_hash,
            "claimed"
        );
        Ok(ClaimResponse {
            verification,
            receipt,
        })
    }
}
