//! End-to-end tests for the drop clients.
//!
//! Every client runs against the in-memory collaborators from
//! `drop_common::testing`: `MockLedger` plays the drop contract (it applies
//! submitted calls atomically and enforces the same checks the contract
//! does), `MockContentStore` holds snapshots and metadata, and `MockSigner`
//! with `MockSignatureVerifier` stand in for a minter key.
//!
//! Run:
//! ```bash
//! cargo test -p drop-integration-tests
//! ```

use std::sync::Arc;

use cosmwasm_std::{Binary, StdError, Uint256};
use drop_claim_conditions::msg::PhaseInput;
use drop_claim_conditions::state::ClaimConditionsConfig;
use drop_claim_conditions::{ClaimConditions, ContractError as ClaimError, IneligibilityReason};
use drop_common::msg::ExecuteMsg;
use drop_common::testing::{
    MockContentStore, MockLedger, MockRoles, MockSignatureVerifier, MockSigner,
};
use drop_common::{
    verify_allowlist_proof, Address, AllowlistEntry, CommonError, Hash32, LeafFormat, Role,
    Signer, Snapshot,
};
use drop_signature_mint::msg::MintRequestInput;
use drop_signature_mint::state::SignatureMintConfig;
use drop_signature_mint::{ContractError as MintError, MintRequestVariant, SignatureMinting};

// ─── Helpers ───

fn addr(byte: u8) -> Address {
    Address::new([byte; 20])
}

fn drop_contract() -> Address {
    Address::new([0xc0; 20])
}

fn qty(n: u64) -> Uint256 {
    Uint256::from(n)
}

fn allowlist() -> Vec<AllowlistEntry> {
    vec![
        AllowlistEntry::new(addr(0xaa), 2u64),
        AllowlistEntry::new(addr(0xbb), 1u64),
    ]
}

struct Drop {
    ledger: Arc<MockLedger>,
    store: Arc<MockContentStore>,
    claims: ClaimConditions,
}

fn setup_drop(leaf_format: LeafFormat) -> Drop {
    let ledger = Arc::new(MockLedger::new(leaf_format));
    let store = Arc::new(MockContentStore::new());
    let claims = ClaimConditions::new(
        ClaimConditionsConfig {
            contract: drop_contract(),
            leaf_format,
        },
        ledger.clone(),
        store.clone(),
        ledger.clone(),
    )
    .unwrap();
    Drop {
        ledger,
        store,
        claims,
    }
}

struct Minting {
    ledger: Arc<MockLedger>,
    signer: Arc<MockSigner>,
    roles: Arc<MockRoles>,
    client: SignatureMinting,
}

const SIGNING_BLOCK_TIME: u64 = 1_700_000_000;

fn setup_minting(variant: MintRequestVariant) -> Minting {
    let config = SignatureMintConfig::new(drop_contract(), 1, variant);
    let signer = Arc::new(MockSigner::new("minter"));
    let roles = Arc::new(MockRoles::new());
    roles
        .grant(&config.contract, Role::Minter, &signer.account())
        .unwrap();
    let verifier = Arc::new(MockSignatureVerifier::new(&[signer.as_ref()]));
    let digest_config = config.clone();
    let ledger = Arc::new(MockLedger::default().with_mint_authority(
        move |request| {
            digest_config
                .digest(request)
                .map_err(|err| StdError::generic_err(err.to_string()))
        },
        verifier.clone(),
        roles.clone(),
    ));
    ledger.set_block_time(SIGNING_BLOCK_TIME).unwrap();
    let client = SignatureMinting::new(
        config,
        Some(signer.clone() as Arc<dyn Signer>),
        roles.clone(),
        verifier,
        Arc::new(MockContentStore::new()),
        ledger.clone(),
        ledger.clone(),
    )
    .unwrap();
    Minting {
        ledger,
        signer,
        roles,
        client,
    }
}

/// A block well inside the default validity window of a request signed now.
fn block_after_signing(minting: &Minting, signed_at: u64) {
    minting.ledger.set_block_time(signed_at + 60).unwrap();
}

// ─── Merkle snapshots ───

#[test]
fn test_snapshot_root_ignores_entry_order() {
    let entries = vec![
        AllowlistEntry::new(addr(0x01), 5u64),
        AllowlistEntry::new(addr(0x02), 1u64),
        AllowlistEntry::new(addr(0x03), 0u64),
        AllowlistEntry::new(addr(0x04), 9u64),
        AllowlistEntry::new(addr(0x05), 2u64),
    ];
    let base = Snapshot::build(entries.clone(), LeafFormat::AddressWithMaxClaimable).unwrap();

    let mut reversed = entries.clone();
    reversed.reverse();
    let mut rotated = entries;
    rotated.rotate_left(2);

    for permutation in [reversed, rotated] {
        let other = Snapshot::build(permutation, LeafFormat::AddressWithMaxClaimable).unwrap();
        assert_eq!(other.merkle_root(), base.merkle_root());
        assert_eq!(other.to_document(), base.to_document());
    }
}

#[test]
fn test_snapshot_proofs_are_sound() {
    let format = LeafFormat::AddressWithMaxClaimable;
    let snapshot = Snapshot::build(allowlist(), format).unwrap();
    let root = snapshot.merkle_root();

    for entry in snapshot.entries() {
        let proof = snapshot.proof(&entry.address).unwrap();
        assert!(verify_allowlist_proof(&root, entry, proof, format));
    }

    let outsider = addr(0xcc);
    assert!(matches!(
        snapshot.proof(&outsider),
        Err(CommonError::NotInAllowlist { .. })
    ));

    // a listed wallet's proof does not vouch for anyone else
    let borrowed = snapshot.proof(&addr(0xaa)).unwrap();
    assert!(!verify_allowlist_proof(
        &root,
        &AllowlistEntry::new(outsider, 2u64),
        borrowed,
        format
    ));
    // nor for a larger limit
    assert!(!verify_allowlist_proof(
        &root,
        &AllowlistEntry::new(addr(0xaa), 3u64),
        borrowed,
        format
    ));
}

// ─── Claim conditions ───

#[tokio::test]
async fn test_set_all_sorts_by_start_time() {
    let d = setup_drop(LeafFormat::AddressWithMaxClaimable);
    d.claims
        .set_all(
            vec![
                PhaseInput::new().start_time(200),
                PhaseInput::new().start_time(100),
            ],
            false,
        )
        .await
        .unwrap();

    let all = d.claims.get_all().await.unwrap();
    assert_eq!(all[0].phase.start_time, 100);
    assert_eq!(all[1].phase.start_time, 200);

    let submissions = d.ledger.submissions().unwrap();
    let last = submissions.last().unwrap();
    assert!(matches!(
        last.last(),
        Some(ExecuteMsg::SetClaimConditions { phases, .. }) if phases[0].start_time == 100
    ));
}

#[tokio::test]
async fn test_identical_allowlists_share_one_snapshot() {
    let d = setup_drop(LeafFormat::AddressWithMaxClaimable);
    let first = d
        .claims
        .set_all(vec![PhaseInput::new().start_time(0).allowlist(allowlist())], false)
        .await
        .unwrap();
    let blobs = d.store.blob_count().unwrap();
    let puts = d.store.put_count().unwrap();

    let second = d
        .claims
        .set_all(vec![PhaseInput::new().start_time(0).allowlist(allowlist())], false)
        .await
        .unwrap();

    assert_eq!(
        first.plan.phases[0].merkle_root,
        second.plan.phases[0].merkle_root
    );
    assert_eq!(first.plan.merkle, second.plan.merkle);
    assert_eq!(d.store.blob_count().unwrap(), blobs);
    assert_eq!(d.store.put_count().unwrap(), puts);
    assert_eq!(second.plan.merkle.len(), 1);
}

#[tokio::test]
async fn test_no_active_phase_short_circuits() {
    let d = setup_drop(LeafFormat::AddressWithMaxClaimable);
    let reasons = d
        .claims
        .ineligibility_reasons(&addr(0xaa), qty(1))
        .await
        .unwrap();
    assert_eq!(reasons, vec![IneligibilityReason::NoActiveClaimPhase]);

    // phases that have not started yet behave the same
    d.claims
        .set_all(vec![PhaseInput::new().start_time(1_000).price("5")], false)
        .await
        .unwrap();
    d.ledger.set_block_time(10).unwrap();
    let reasons = d
        .claims
        .ineligibility_reasons(&addr(0xaa), qty(1))
        .await
        .unwrap();
    assert_eq!(reasons, vec![IneligibilityReason::NoActiveClaimPhase]);
}

#[tokio::test]
async fn test_allowlist_phase_end_to_end() {
    let d = setup_drop(LeafFormat::AddressWithMaxClaimable);
    d.claims
        .set_all(vec![PhaseInput::new().start_time(0).allowlist(allowlist())], false)
        .await
        .unwrap();
    d.ledger.set_block_time(10).unwrap();

    assert!(d.claims.can_claim(&addr(0xaa), qty(2)).await.unwrap());
    assert!(!d.claims.can_claim(&addr(0xbb), qty(2)).await.unwrap());
    let reasons = d
        .claims
        .ineligibility_reasons(&addr(0xcc), qty(1))
        .await
        .unwrap();
    assert!(reasons.contains(&IneligibilityReason::AddressNotAllowed));

    // the prediction matches what the contract accepts
    d.claims.claim(&addr(0xaa), qty(2)).await.unwrap();
    assert_eq!(
        d.ledger.tokens_owned(&drop_contract(), &addr(0xaa)).unwrap(),
        qty(2)
    );
    let err = d.claims.claim(&addr(0xcc), qty(1)).await.unwrap_err();
    assert!(matches!(
        err,
        ClaimError::Common(CommonError::NotInAllowlist { .. })
    ));
}

#[tokio::test]
async fn test_address_only_allowlist() {
    let d = setup_drop(LeafFormat::AddressOnly);
    let wallets = AllowlistEntry::from_addresses([addr(0x01), addr(0x02), addr(0x03)]);
    d.claims
        .set_all(vec![PhaseInput::new().start_time(0).allowlist(wallets)], false)
        .await
        .unwrap();

    assert!(d.claims.can_claim(&addr(0x02), qty(50)).await.unwrap());
    d.claims.claim(&addr(0x02), qty(50)).await.unwrap();
    assert!(!d.claims.can_claim(&addr(0x04), qty(1)).await.unwrap());
}

#[tokio::test]
async fn test_single_wallet_root() {
    let d = setup_drop(LeafFormat::AddressWithMaxClaimable);
    let wallet = addr(0x42);
    d.claims
        .set_all(
            vec![PhaseInput::new().start_time(0).merkle_root(wallet.hash())],
            false,
        )
        .await
        .unwrap();

    assert!(d.claims.can_claim(&wallet, qty(3)).await.unwrap());
    d.claims.claim(&wallet, qty(3)).await.unwrap();
    assert!(!d.claims.can_claim(&addr(0x43), qty(1)).await.unwrap());
}

#[tokio::test]
async fn test_not_enough_tokens() {
    let d = setup_drop(LeafFormat::AddressWithMaxClaimable);
    let currency = addr(0x77);
    let wallet = addr(0xaa);
    d.claims
        .set_all(
            vec![PhaseInput::new().start_time(0).price("100").currency(currency)],
            false,
        )
        .await
        .unwrap();
    d.ledger.set_balance(&wallet, &currency, qty(50)).unwrap();

    let reasons = d.claims.ineligibility_reasons(&wallet, qty(1)).await.unwrap();
    assert_eq!(reasons, vec![IneligibilityReason::NotEnoughTokens]);
    assert!(d.claims.claim(&wallet, qty(1)).await.is_err());

    d.ledger.set_balance(&wallet, &currency, qty(100)).unwrap();
    assert!(d.claims.can_claim(&wallet, qty(1)).await.unwrap());
    let response = d.claims.claim(&wallet, qty(1)).await.unwrap();
    assert_eq!(response.verification.native_value, Uint256::zero());
}

#[tokio::test]
async fn test_wait_between_claims() {
    let d = setup_drop(LeafFormat::AddressWithMaxClaimable);
    let wallet = addr(0xaa);
    d.claims
        .set_all(
            vec![PhaseInput::new()
                .start_time(0)
                .wait_seconds_between_claims(100)],
            false,
        )
        .await
        .unwrap();
    d.ledger.set_block_time(1_000).unwrap();
    d.claims.claim(&wallet, qty(1)).await.unwrap();

    d.ledger.set_block_time(1_050).unwrap();
    let reasons = d.claims.ineligibility_reasons(&wallet, qty(1)).await.unwrap();
    assert_eq!(
        reasons,
        vec![IneligibilityReason::WaitBeforeNextClaimTransaction]
    );

    d.ledger.set_block_time(1_100).unwrap();
    assert!(d.claims.can_claim(&wallet, qty(1)).await.unwrap());
}

#[tokio::test]
async fn test_reset_clears_claim_history() {
    let d = setup_drop(LeafFormat::AddressWithMaxClaimable);
    let wallet = addr(0xaa);
    let phase = || {
        PhaseInput::new()
            .start_time(0)
            .max_claimable_supply(2u64)
            .wait_seconds_between_claims(1_000)
    };
    d.claims.set_all(vec![phase()], false).await.unwrap();
    d.ledger.set_block_time(10).unwrap();
    d.claims.claim(&wallet, qty(2)).await.unwrap();

    let reasons = d.claims.ineligibility_reasons(&wallet, qty(1)).await.unwrap();
    assert!(reasons.contains(&IneligibilityReason::NotEnoughSupply));
    assert!(reasons.contains(&IneligibilityReason::WaitBeforeNextClaimTransaction));

    // without a reset the claimed supply carries over
    d.claims.set_all(vec![phase()], false).await.unwrap();
    let active = d.claims.get_active().await.unwrap().unwrap();
    assert_eq!(active.phase.supply_claimed, qty(2));

    d.claims.set_all(vec![phase()], true).await.unwrap();
    let active = d.claims.get_active().await.unwrap().unwrap();
    assert_eq!(active.phase.supply_claimed, Uint256::zero());
    assert_eq!(active.id, 1);
    assert!(d.claims.can_claim(&wallet, qty(1)).await.unwrap());
}

#[tokio::test]
async fn test_supply_below_claimed_is_rejected() {
    let d = setup_drop(LeafFormat::AddressWithMaxClaimable);
    d.claims
        .set_all(vec![PhaseInput::new().start_time(0).max_claimable_supply(5u64)], false)
        .await
        .unwrap();
    d.claims.claim(&addr(0xaa), qty(4)).await.unwrap();
    let submitted = d.ledger.submissions().unwrap().len();

    let err = d
        .claims
        .set_all(vec![PhaseInput::new().start_time(0).max_claimable_supply(3u64)], false)
        .await
        .unwrap_err();
    assert!(matches!(err, ClaimError::SupplyBelowClaimed { .. }));
    assert_eq!(d.ledger.submissions().unwrap().len(), submitted);
}

#[tokio::test]
async fn test_update_moves_phase_behind_later_one() {
    const T: u64 = 1_000;
    let d = setup_drop(LeafFormat::AddressWithMaxClaimable);
    d.claims
        .set_all(
            vec![
                PhaseInput::new()
                    .start_time(0)
                    .quantity_limit_per_transaction(1u64),
                PhaseInput::new()
                    .start_time(T)
                    .quantity_limit_per_transaction(2u64),
            ],
            false,
        )
        .await
        .unwrap();

    d.claims
        .update(0, PhaseInput::new().start_time(2 * T))
        .await
        .unwrap();

    let all = d.claims.get_all().await.unwrap();
    assert_eq!(all[0].phase.start_time, T);
    assert_eq!(all[0].phase.quantity_limit_per_transaction, qty(2));
    assert_eq!(all[1].phase.start_time, 2 * T);
    assert_eq!(all[1].phase.quantity_limit_per_transaction, qty(1));

    let err = d
        .claims
        .update(5, PhaseInput::new().start_time(0))
        .await
        .unwrap_err();
    assert!(matches!(err, ClaimError::IndexOutOfRange { index: 5, len: 2 }));
}

#[tokio::test]
async fn test_metadata_keeps_only_live_roots() {
    let d = setup_drop(LeafFormat::AddressWithMaxClaimable);

    let first = d
        .claims
        .set_all(vec![PhaseInput::new().start_time(0).allowlist(allowlist())], false)
        .await
        .unwrap();
    let old_root = first.plan.phases[0].merkle_root;

    let replacement = vec![AllowlistEntry::new(addr(0xdd), 1u64)];
    let second = d
        .claims
        .set_all(
            vec![PhaseInput::new().start_time(0).allowlist(replacement)],
            false,
        )
        .await
        .unwrap();
    let new_root = second.plan.phases[0].merkle_root;

    assert_ne!(old_root, new_root);
    assert!(!second.plan.merkle.contains_key(&old_root.to_string()));
    assert!(second.plan.merkle.contains_key(&new_root.to_string()));

    let proof = d
        .claims
        .claimer_proof(&addr(0xaa), &old_root)
        .await
        .unwrap();
    assert!(proof.proof.is_empty());
}

// ─── Signed mints ───

#[tokio::test]
async fn test_signed_mint_round_trip() {
    let m = setup_minting(MintRequestVariant::WithQuantity);
    let recipient = addr(0x0a);
    let signed = m
        .client
        .generate(
            MintRequestInput::new()
                .to(recipient)
                .uri("mem://token/1")
                .quantity(3u64),
        )
        .await
        .unwrap();
    assert_eq!(signed.request.validity_start, SIGNING_BLOCK_TIME);
    block_after_signing(&m, signed.request.validity_start);

    assert!(m.client.verify(&signed).await.unwrap());
    m.client.mint(signed.clone()).await.unwrap();
    assert_eq!(
        m.ledger.tokens_owned(&drop_contract(), &recipient).unwrap(),
        qty(3)
    );
    assert!(m
        .ledger
        .is_uid_used(&drop_contract(), &signed.request.uid)
        .unwrap());

    // the contract rejects a second redemption
    assert!(m.client.mint(signed).await.is_err());
}

#[tokio::test]
async fn test_single_token_mint() {
    let m = setup_minting(MintRequestVariant::SingleToken);
    let recipient = addr(0x0b);
    let signed = m
        .client
        .generate(MintRequestInput::new().to(recipient).uri("mem://token/2"))
        .await
        .unwrap();
    block_after_signing(&m, signed.request.validity_start);

    assert!(signed.request.quantity.is_none());
    assert!(m.client.verify(&signed).await.unwrap());

    // a quantity the signature never covered is refused everywhere
    let mut inflated = signed.clone();
    inflated.request.quantity = Some(qty(1000));
    assert!(matches!(
        m.client.verify(&inflated).await,
        Err(MintError::UnexpectedField { .. })
    ));
    assert!(m.client.mint(inflated).await.is_err());

    let response = m.client.mint(signed).await.unwrap();
    assert_eq!(response.quantity, qty(1));
    assert_eq!(
        m.ledger.tokens_owned(&drop_contract(), &recipient).unwrap(),
        qty(1)
    );
}

#[tokio::test]
async fn test_forged_mints_revert_on_ledger() {
    let m = setup_minting(MintRequestVariant::WithQuantity);
    let recipient = addr(0x0d);
    let signed = m
        .client
        .generate(
            MintRequestInput::new()
                .to(recipient)
                .uri("mem://token/6")
                .quantity(1u64),
        )
        .await
        .unwrap();
    block_after_signing(&m, signed.request.validity_start);

    // raised quantity under the original signature
    let mut raised = signed.clone();
    raised.request.quantity = Some(qty(50));
    let err = m.client.mint(raised).await.unwrap_err();
    assert!(err.to_string().contains("invalid signature"));

    // garbage signature bytes
    let mut garbled = signed.clone();
    garbled.signature = Binary::from(vec![0u8; 52]);
    assert!(m.client.mint(garbled).await.is_err());

    // signed by an account the drop contract never made a minter
    let outsider = Arc::new(MockSigner::new("outsider"));
    let outsider_roles = Arc::new(MockRoles::new());
    outsider_roles
        .grant(&drop_contract(), Role::Minter, &outsider.account())
        .unwrap();
    let outsider_client = SignatureMinting::new(
        m.client.config().clone(),
        Some(outsider.clone() as Arc<dyn Signer>),
        outsider_roles,
        Arc::new(MockSignatureVerifier::new(&[outsider.as_ref()])),
        Arc::new(MockContentStore::new()),
        m.ledger.clone(),
        m.ledger.clone(),
    )
    .unwrap();
    let forged = outsider_client
        .generate(
            MintRequestInput::new()
                .to(recipient)
                .uri("mem://token/7")
                .quantity(1u64),
        )
        .await
        .unwrap();
    assert!(!m.client.verify(&forged).await.unwrap());
    assert!(m.client.mint(forged).await.is_err());

    assert!(m.ledger.submissions().unwrap().is_empty());
    assert_eq!(
        m.ledger.tokens_owned(&drop_contract(), &recipient).unwrap(),
        qty(0)
    );

    m.client.mint(signed).await.unwrap();
    assert_eq!(
        m.ledger.tokens_owned(&drop_contract(), &recipient).unwrap(),
        qty(1)
    );
}

#[tokio::test]
async fn test_revoked_minter_signature_reverts_on_ledger() {
    let m = setup_minting(MintRequestVariant::WithQuantity);
    let signed = m
        .client
        .generate(MintRequestInput::new().uri("mem://token/8").quantity(1u64))
        .await
        .unwrap();
    block_after_signing(&m, signed.request.validity_start);
    m.roles
        .revoke(&drop_contract(), Role::Minter, &m.signer.account())
        .unwrap();

    let err = m.client.mint(signed.clone()).await.unwrap_err();
    assert!(err.to_string().contains("not a minter"));
    assert!(!m
        .ledger
        .is_uid_used(&drop_contract(), &signed.request.uid)
        .unwrap());
}

#[tokio::test]
async fn test_duplicate_uid_batch_signs_nothing() {
    let m = setup_minting(MintRequestVariant::WithQuantity);
    let uid = Hash32::new([0x5a; 32]);
    let request = MintRequestInput::new()
        .uri("mem://token/3")
        .quantity(1u64)
        .uid(uid);

    let err = m
        .client
        .generate_batch(vec![request.clone(), request.clone()])
        .await
        .unwrap_err();
    assert!(matches!(err, MintError::ReplayRisk { .. }));
    assert_eq!(m.signer.signatures_issued(), 0);

    // once issued, the same uid is refused by this client
    m.client.generate(request.clone()).await.unwrap();
    let err = m.client.generate(request).await.unwrap_err();
    assert!(matches!(err, MintError::ReplayRisk { .. }));
    assert_eq!(m.signer.signatures_issued(), 1);
}

#[tokio::test]
async fn test_minter_role_gates_signing_and_verification() {
    let m = setup_minting(MintRequestVariant::WithQuantity);
    let signed = m
        .client
        .generate(MintRequestInput::new().uri("mem://token/4").quantity(1u64))
        .await
        .unwrap();

    m.roles
        .revoke(&drop_contract(), Role::Minter, &m.signer.account())
        .unwrap();
    assert!(!m.client.verify(&signed).await.unwrap());

    let err = m
        .client
        .generate(MintRequestInput::new().uri("mem://token/5").quantity(1u64))
        .await
        .unwrap_err();
    assert!(matches!(err, MintError::RoleCheckFailed { .. }));
}

#[tokio::test]
async fn test_metadata_batch_uploads_in_order() {
    let m = setup_minting(MintRequestVariant::WithQuantity);
    let recipient = addr(0x0c);
    let signed = m
        .client
        .generate_batch(vec![
            MintRequestInput::new()
                .to(recipient)
                .metadata(serde_json::json!({ "name": "first" }))
                .quantity(1u64),
            MintRequestInput::new()
                .to(recipient)
                .metadata(serde_json::json!({ "name": "second" }))
                .quantity(2u64),
        ])
        .await
        .unwrap();
    block_after_signing(&m, signed[0].request.validity_start);

    assert_ne!(signed[0].request.uri, signed[1].request.uri);
    assert_eq!(signed[1].request.quantity, Some(qty(2)));
    for item in &signed {
        assert!(m.client.verify(item).await.unwrap());
    }

    let response = m.client.mint_batch(signed).await.unwrap();
    assert_eq!(response.uids.len(), 2);
    assert_eq!(
        m.ledger.tokens_owned(&drop_contract(), &recipient).unwrap(),
        qty(3)
    );
}
