use std::sync::Arc;

use cosmwasm_std::StdError;
use drop_common::{
    ContentStore, Ledger, Roles, SignatureVerifier, SignedMintRequest, Signer,
    TransactionSubmitter,
};

use crate::error::ContractError;
use crate::execute;
use crate::msg::{MintRequestInput, MintResponse};
use crate::query;
use crate::state::{validate_config, SignatureMintConfig, UidRegistry};

/// Signs, verifies and redeems mint authorizations for one contract.
/// Validity windows default to start at the ledger's latest block time.
pub struct SignatureMinting {
    config: SignatureMintConfig,
    signer: Option<Arc<dyn Signer>>,
    roles: Arc<dyn Roles>,
    verifier: Arc<dyn SignatureVerifier>,
    store: Arc<dyn ContentStore>,
    ledger: Arc<dyn Ledger>,
    submitter: Arc<dyn TransactionSubmitter>,
    issued: UidRegistry,
}

impl SignatureMinting {
    pub fn new(
        config: SignatureMintConfig,
        signer: Option<Arc<dyn Signer>>,
        roles: Arc<dyn Roles>,
        verifier: Arc<dyn SignatureVerifier>,
        store: Arc<dyn ContentStore>,
        ledger: Arc<dyn Ledger>,
        submitter: Arc<dyn TransactionSubmitter>,
    ) -> Result<Self, ContractError> {
        validate_config(&config)?;
        Ok(Self {
            config,
            signer,
            roles,
            verifier,
            store,
            ledger,
            submitter,
            issued: UidRegistry::default(),
        })
    }

    pub fn config(&self) -> &SignatureMintConfig {
        &self.config
    }

    pub async fn generate(
        &self,
        input: MintRequestInput,
    ) -> Result<SignedMintRequest, ContractError> {
        let mut signed = self.generate_batch(vec![input]).await?;
        signed
            .pop()
            .ok_or_else(|| StdError::generic_err("empty signing batch").into())
    }

    pub async fn generate_batch(
        &self,
        inputs: Vec<MintRequestInput>,
    ) -> Result<Vec<SignedMintRequest>, ContractError> {
        let now = self.ledger.block_timestamp().await?;
        execute::generate_batch(
            self.signer.as_deref(),
            self.roles.as_ref(),
            self.store.as_ref(),
            &self.issued,
            &self.config,
            &inputs,
            now,
        )
        .await
    }

    pub async fn verify(&self, signed: &SignedMintRequest) -> Result<bool, ContractError> {
        query::verify(
            self.verifier.as_ref(),
            self.roles.as_ref(),
            &self.config,
            signed,
        )
        .await
    }

    pub async fn mint(&self, signed: SignedMintRequest) -> Result<MintResponse, ContractError> {
        self.mint_batch(vec![signed]).await
    }

    /// Redeems several free authorizations in one transaction.
    pub async fn mint_batch(
        &self,
        signed: Vec<SignedMintRequest>,
    ) -> Result<MintResponse, ContractError> {
        let receipt = execute::mint(self.submitter.as_ref(), &self.config, &signed).await?;
        Ok(MintResponse {
            uids: signed.iter().map(|s| s.request.uid).collect(),
            quantity: execute::total_quantity(self.config.variant, &signed),
            receipt,
        })
    }
}
