use std::collections::BTreeSet;

use cosmwasm_std::{StdError, Uint256};
use drop_common::msg::{encode_calls, ExecuteMsg};
use drop_common::{
    Address, ContentStore, Hash32, MintRequest, Receipt, Role, Roles, SignedMintRequest, Signer,
    TransactionSubmitter, NATIVE_TOKEN,
};
use futures::future::try_join_all;
use tracing::{debug, info};

use crate::error::ContractError;
use crate::msg::MintRequestInput;
use crate::state::{SignatureMintConfig, UidRegistry};
use crate::typed_data::{MintRequestVariant, PRIMARY_TYPE};

pub const MAX_ROYALTY_BPS: u16 = 10_000;
/// Ten years.
pub const DEFAULT_VALIDITY_SECONDS: u64 = 315_360_000;

/// 16 random bytes, hex-encoded into the 32 bytes of the nonce.
pub fn random_uid() -> Hash32 {
    let encoded = hex::encode(rand::random::<[u8; 16]>());
    let mut uid = [0u8; 32];
    uid.copy_from_slice(encoded.as_bytes());
    Hash32::new(uid)
}

/// Assigns uids and rejects any that repeat within the batch.
fn resolve_uids(inputs: &[MintRequestInput]) -> Result<Vec<Hash32>, ContractError> {
    let mut seen = BTreeSet::new();
    let mut uids = Vec::with_capacity(inputs.len());
    for input in inputs {
        let uid = input.uid.unwrap_or_else(random_uid);
        if !seen.insert(uid) {
            return Err(ContractError::ReplayRisk {
                uid: uid.to_string(),
            });
        }
        uids.push(uid);
    }
    Ok(uids)
}

fn validate_input(
    config: &SignatureMintConfig,
    input: &MintRequestInput,
    now: u64,
) -> Result<(u64, u64), ContractError> {
    let bps = input.royalty_bps.unwrap_or_default();
    if bps > MAX_ROYALTY_BPS {
        return Err(ContractError::InvalidRoyaltyBps { bps });
    }
    if config.variant.requires_quantity() && input.quantity.is_none() {
        return Err(ContractError::MissingField {
            field: "quantity".to_string(),
        });
    }
    if input.uri.is_none() && input.metadata.is_none() {
        return Err(ContractError::MissingField {
            field: "metadata".to_string(),
        });
    }

    let start = input.validity_start.unwrap_or(now);
    let end = input
        .validity_end
        .unwrap_or_else(|| start.saturating_add(DEFAULT_VALIDITY_SECONDS));
    if start > end {
        return Err(ContractError::InvalidValidityWindow { start, end });
    }
    Ok((start, end))
}

fn build_request(
    config: &SignatureMintConfig,
    input: &MintRequestInput,
    uri: String,
    window: (u64, u64),
    uid: Hash32,
) -> MintRequest {
    let currency = match input.currency {
        Some(currency) if !currency.is_zero() => currency,
        _ => NATIVE_TOKEN,
    };
    MintRequest {
        to: input.to.unwrap_or(Address::ZERO),
        royalty_recipient: input.royalty_recipient.unwrap_or(Address::ZERO),
        royalty_bps: input.royalty_bps.unwrap_or_default(),
        primary_sale_recipient: input.primary_sale_recipient.unwrap_or(Address::ZERO),
        uri,
        quantity: if config.variant.requires_quantity() {
            input.quantity
        } else {
            None
        },
        price: input.price.unwrap_or_default(),
        currency,
        validity_start: window.0,
        validity_end: window.1,
        uid,
    }
}

async fn sign_request(
    signer: &dyn Signer,
    config: &SignatureMintConfig,
    request: MintRequest,
) -> Result<SignedMintRequest, ContractError> {
    let values = config.variant.values(&request)?;
    let signature = signer
        .sign_typed_data(&config.domain(), PRIMARY_TYPE, config.variant.fields(), &values)
        .await?;
    Ok(SignedMintRequest { request, signature })
}

/// Signs one authorization per input, in input order.
///
/// Every check runs before anything is uploaded or signed. The signer must
/// hold the minter role, uids must be fresh and each input well formed.
/// Uids stay reserved in `registry` only if the whole batch is signed.
pub async fn generate_batch(
    signer: Option<&dyn Signer>,
    roles: &dyn Roles,
    store: &dyn ContentStore,
    registry: &UidRegistry,
    config: &SignatureMintConfig,
    inputs: &[MintRequestInput],
    now: u64,
) -> Result<Vec<SignedMintRequest>, ContractError> {
    let signer = signer.ok_or(ContractError::NoSignerAvailable)?;
    let signer_address = signer.address().await?;
    if !roles
        .has_role(&config.contract, Role::Minter, &signer_address)
        .await?
    {
        return Err(ContractError::RoleCheckFailed {
            address: signer_address.to_string(),
            role: Role::Minter.as_str().to_string(),
        });
    }

    let uids = resolve_uids(inputs)?;
    let windows = inputs
        .iter()
        .map(|input| validate_input(config, input, now))
        .collect::<Result<Vec<_>, _>>()?;

    registry.reserve(&uids)?;
    let signed = match upload_and_sign(signer, store, config, inputs, windows, &uids).await {
        Ok(signed) => signed,
        Err(err) => {
            registry.release(&uids)?;
            return Err(err);
        }
    };

    info!(
        signer = %signer_address,
        contract = %config.contract,
        count = signed.len(),
        "signed mint requests"
    );
    Ok(signed)
}

async fn upload_and_sign(
    signer: &dyn Signer,
    store: &dyn ContentStore,
    config: &SignatureMintConfig,
    inputs: &[MintRequestInput],
    windows: Vec<(u64, u64)>,
    uids: &[Hash32],
) -> Result<Vec<SignedMintRequest>, ContractError> {
    let mut requests = Vec::with_capacity(inputs.len());
    for ((input, window), uid) in inputs.iter().zip(windows).zip(uids.iter().copied()) {
        let uri = match (&input.uri, &input.metadata) {
            (Some(uri), _) => uri.clone(),
            (None, Some(metadata)) => {
                let document = serde_json::to_vec(metadata)
                    .map_err(|err| StdError::generic_err(err.to_string()))?;
                store.put(&document).await?
            }
            (None, None) => {
                return Err(ContractError::MissingField {
                    field: "metadata".to_string(),
                })
            }
        };
        requests.push(build_request(config, input, uri, window, uid));
    }

    try_join_all(
        requests
            .into_iter()
            .map(|request| sign_request(signer, config, request)),
    )
    .await
}

/// Redeems signed authorizations in one transaction. Batches of more than
/// one request must all be free.
pub async fn mint(
    submitter: &dyn TransactionSubmitter,
    config: &SignatureMintConfig,
    signed: &[SignedMintRequest],
) -> Result<Receipt, ContractError> {
    if signed.len() > 1 && signed.iter().any(|s| !s.request.price.is_zero()) {
        return Err(ContractError::PricedBatchMint);
    }
    let calls = signed
        .iter()
        .map(|s| ExecuteMsg::MintWithSignature {
            request: s.request.clone(),
            signature: s.signature.clone(),
        })
        .collect::<Vec<_>>();
    let receipt = submitter
        .submit(&config.contract, encode_calls(&calls)?)
        .await?;
    debug!(
        tx = %receipt.transaction_hash,
        count = signed.len(),
        "redeemed signed mints"
    );
    Ok(receipt)
}

/// Total tokens a batch authorizes. Single token requests count as one
/// whatever quantity they carry.
pub fn total_quantity(variant: MintRequestVariant, signed: &[SignedMintRequest]) -> Uint256 {
    signed.iter().fold(Uint256::zero(), |total, s| {
        let quantity = match s.request.quantity {
            Some(quantity) if variant.requires_quantity() => quantity,
            _ => Uint256::from(1u64),
        };
        total.saturating_add(quantity)
    })
}
