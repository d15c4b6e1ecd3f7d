//! In-memory collaborators for tests, backed by `MemoryStorage` the same way
//! contract state is.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{
    from_json, Binary, MemoryStorage, Order, StdError, StdResult, Storage, Uint256,
};
use cw_storage_plus::{Item, Map};
use sha2::{Digest, Sha256};

use crate::hash::{keccak256, keccak256_concat};
use crate::merkle::verify_allowlist_proof;
use crate::msg::{AllowlistProof, ExecuteMsg};
use crate::traits::{ContentStore, Ledger, Roles, SignatureVerifier, Signer, TransactionSubmitter};
use crate::typed_data::{signing_hash, Eip712Domain, TypedField, TypedValue};
use crate::types::{
    active_phase_index, Address, AllowlistEntry, ClaimConditionRange, ClaimPhase, Hash32,
    LeafFormat, MintRequest, Receipt, Role,
};

fn lock(storage: &Mutex<MemoryStorage>) -> StdResult<MutexGuard<'_, MemoryStorage>> {
    storage
        .lock()
        .map_err(|_| StdError::generic_err("mock storage lock poisoned"))
}

fn revert(reason: &str) -> StdError {
    StdError::generic_err(format!("execution reverted: {}", reason))
}

fn key(address: &Address) -> &[u8] {
    address.as_bytes().as_slice()
}

// ---------------------------------------------------------------------------
// Content store
// ---------------------------------------------------------------------------

const BLOBS: Map<&str, Binary> = Map::new("blobs");
const PUT_COUNT: Item<u64> = Item::new("put_count");

/// Content-addressed store keyed by `mem://<sha256>`.
#[derive(Default)]
pub struct MockContentStore {
    storage: Mutex<MemoryStorage>,
}

impl MockContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs stored.
    pub fn blob_count(&self) -> StdResult<usize> {
        let storage = lock(&self.storage)?;
        Ok(BLOBS.keys(&*storage, None, None, Order::Ascending).count())
    }

    /// Number of `put` calls, including ones for already stored content.
    pub fn put_count(&self) -> StdResult<u64> {
        let storage = lock(&self.storage)?;
        Ok(PUT_COUNT.may_load(&*storage)?.unwrap_or_default())
    }
}

#[async_trait]
impl ContentStore for MockContentStore {
    async fn put(&self, data: &[u8]) -> StdResult<String> {
        let location = format!("mem://{}", hex::encode(Sha256::digest(data)));
        let mut storage = lock(&self.storage)?;
        BLOBS.save(&mut *storage, location.as_str(), &Binary::from(data))?;
        let count = PUT_COUNT.may_load(&*storage)?.unwrap_or_default();
        PUT_COUNT.save(&mut *storage, &(count + 1))?;
        Ok(location)
    }

    async fn get(&self, location: &str) -> StdResult<Binary> {
        let storage = lock(&self.storage)?;
        BLOBS
            .may_load(&*storage, location)?
            .ok_or_else(|| StdError::not_found(format!("blob {}", location)))
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[cw_serde]
#[derive(Default)]
struct ConditionRecord {
    current_start_id: u64,
    phases: Vec<ClaimPhase>,
}

const BLOCK_TIME: Item<u64> = Item::new("block_time");
const CONDITIONS: Map<&[u8], ConditionRecord> = Map::new("conditions");
/// (contract, condition id, wallet) -> unix seconds of the last claim
const LAST_CLAIMS: Map<(&[u8], u64, &[u8]), u64> = Map::new("last_claims");
/// (wallet, currency) -> balance
const BALANCES: Map<(&[u8], &[u8]), Uint256> = Map::new("balances");
const CONTRACT_URIS: Map<&[u8], String> = Map::new("contract_uris");
/// (contract, uid)
const USED_UIDS: Map<(&[u8], &[u8]), bool> = Map::new("used_uids");
/// (contract, owner) -> tokens minted or claimed
const TOKENS_OWNED: Map<(&[u8], &[u8]), Uint256> = Map::new("tokens_owned");
const TX_COUNT: Item<u64> = Item::new("tx_count");
const SUBMISSIONS: Map<u64, Vec<ExecuteMsg>> = Map::new("submissions");

/// Typed-data digest of a mint request under the contract's domain. Fails
/// for requests the contract cannot decode.
pub type MintDigestFn = dyn Fn(&MintRequest) -> StdResult<Hash32> + Send + Sync;

/// How the simulated contract authenticates `MintWithSignature`.
struct MintAuthority {
    digest: Box<MintDigestFn>,
    verifier: Arc<dyn SignatureVerifier>,
    roles: Arc<dyn Roles>,
}

/// A single-chain ledger that also executes submitted calls.
///
/// Submitted calls are applied atomically against a copy of the state and
/// enforce the same rules as the drop contract: phase ordering, supply
/// caps, allowlist proofs, wait times, payment, mint signatures and uid
/// reuse. The claim receiver is treated as the paying wallet.
pub struct MockLedger {
    storage: Mutex<MemoryStorage>,
    leaf_format: LeafFormat,
    mint_authority: Option<MintAuthority>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new(LeafFormat::AddressWithMaxClaimable)
    }
}

impl MockLedger {
    /// `leaf_format` is the leaf encoding the simulated contract verifies.
    pub fn new(leaf_format: LeafFormat) -> Self {
        Self {
            storage: Mutex::new(MemoryStorage::new()),
            leaf_format,
            mint_authority: None,
        }
    }

    /// Enables `MintWithSignature`. A request is accepted only when its
    /// signature recovers to an account holding the minter role. Without
    /// this every signed mint reverts.
    pub fn with_mint_authority(
        mut self,
        digest: impl Fn(&MintRequest) -> StdResult<Hash32> + Send + Sync + 'static,
        verifier: Arc<dyn SignatureVerifier>,
        roles: Arc<dyn Roles>,
    ) -> Self {
        self.mint_authority = Some(MintAuthority {
            digest: Box::new(digest),
            verifier,
            roles,
        });
        self
    }

    pub fn set_block_time(&self, timestamp: u64) -> StdResult<()> {
        let mut storage = lock(&self.storage)?;
        BLOCK_TIME.save(&mut *storage, &timestamp)
    }

    pub fn set_balance(&self, wallet: &Address, currency: &Address, amount: Uint256) -> StdResult<()> {
        let mut storage = lock(&self.storage)?;
        BALANCES.save(&mut *storage, (key(wallet), key(currency)), &amount)
    }

    /// Seeds conditions directly, bypassing the submit path.
    pub fn set_claim_conditions(
        &self,
        contract: &Address,
        current_start_id: u64,
        phases: Vec<ClaimPhase>,
    ) -> StdResult<()> {
        let mut storage = lock(&self.storage)?;
        CONDITIONS.save(
            &mut *storage,
            key(contract),
            &ConditionRecord {
                current_start_id,
                phases,
            },
        )
    }

    pub fn set_last_claim(
        &self,
        contract: &Address,
        condition_id: u64,
        wallet: &Address,
        timestamp: u64,
    ) -> StdResult<()> {
        let mut storage = lock(&self.storage)?;
        LAST_CLAIMS.save(&mut *storage, (key(contract), condition_id, key(wallet)), &timestamp)
    }

    pub fn set_contract_uri(&self, contract: &Address, uri: &str) -> StdResult<()> {
        let mut storage = lock(&self.storage)?;
        CONTRACT_URIS.save(&mut *storage, key(contract), &uri.to_string())
    }

    pub fn tokens_owned(&self, contract: &Address, owner: &Address) -> StdResult<Uint256> {
        let storage = lock(&self.storage)?;
        Ok(TOKENS_OWNED
            .may_load(&*storage, (key(contract), key(owner)))?
            .unwrap_or_default())
    }

    pub fn is_uid_used(&self, contract: &Address, uid: &Hash32) -> StdResult<bool> {
        let storage = lock(&self.storage)?;
        Ok(USED_UIDS.has(&*storage, (key(contract), uid.as_bytes().as_slice())))
    }

    /// Every accepted multicall, oldest first.
    pub fn submissions(&self) -> StdResult<Vec<Vec<ExecuteMsg>>> {
        let storage = lock(&self.storage)?;
        SUBMISSIONS
            .range(&*storage, None, None, Order::Ascending)
            .map(|item| item.map(|(_, calls)| calls))
            .collect()
    }

    fn now(storage: &dyn Storage) -> StdResult<u64> {
        Ok(BLOCK_TIME.may_load(storage)?.unwrap_or_default())
    }

    async fn authorize_mint(
        &self,
        contract: &Address,
        request: &MintRequest,
        signature: &Binary,
    ) -> StdResult<()> {
        let authority = self
            .mint_authority
            .as_ref()
            .ok_or_else(|| revert("signature minting is not enabled"))?;
        let digest = (authority.digest)(request).map_err(|_| revert("malformed mint request"))?;
        let signer = authority
            .verifier
            .recover(&digest, signature.as_slice())
            .ok_or_else(|| revert("invalid signature"))?;
        if !authority.roles.has_role(contract, Role::Minter, &signer).await? {
            return Err(revert("signer is not a minter"));
        }
        Ok(())
    }

    fn apply(&self, storage: &mut dyn Storage, contract: &Address, msg: &ExecuteMsg) -> StdResult<()> {
        match msg {
            ExecuteMsg::SetContractUri { uri } => {
                CONTRACT_URIS.save(storage, key(contract), uri)
            }
            ExecuteMsg::SetClaimConditions {
                phases,
                reset_claim_eligibility,
            } => apply_set_claim_conditions(storage, contract, phases, *reset_claim_eligibility),
            ExecuteMsg::Claim {
                receiver,
                quantity,
                currency,
                price_per_token,
                allowlist_proof,
                native_value,
            } => {
                let now = Self::now(storage)?;
                apply_claim(
                    storage,
                    contract,
                    self.leaf_format,
                    now,
                    ClaimCall {
                        receiver,
                        quantity: *quantity,
                        currency,
                        price_per_token: *price_per_token,
                        allowlist_proof,
                        native_value: *native_value,
                    },
                )
            }
            ExecuteMsg::MintWithSignature { request, .. } => {
                let now = Self::now(storage)?;
                apply_mint(storage, contract, now, request)
            }
        }
    }
}

fn apply_set_claim_conditions(
    storage: &mut dyn Storage,
    contract: &Address,
    phases: &[ClaimPhase],
    reset: bool,
) -> StdResult<()> {
    let previous = CONDITIONS
        .may_load(storage, key(contract))?
        .unwrap_or_default();
    let current_start_id = if reset {
        previous.current_start_id + previous.phases.len() as u64
    } else {
        previous.current_start_id
    };

    let mut next = Vec::with_capacity(phases.len());
    for (i, phase) in phases.iter().enumerate() {
        if i > 0 && phase.start_time < phases[i - 1].start_time {
            return Err(revert("start timestamps must be ascending"));
        }
        let supply_claimed = if reset {
            Uint256::zero()
        } else {
            previous
                .phases
                .get(i)
                .map(|p| p.supply_claimed)
                .unwrap_or_default()
        };
        if phase.max_claimable_supply < supply_claimed {
            return Err(revert("max supply claimed already"));
        }
        next.push(ClaimPhase {
            supply_claimed,
            ..phase.clone()
        });
    }

    CONDITIONS.save(
        storage,
        key(contract),
        &ConditionRecord {
            current_start_id,
            phases: next,
        },
    )
}

struct ClaimCall<'a> {
    receiver: &'a Address,
    quantity: Uint256,
    currency: &'a Address,
    price_per_token: Uint256,
    allowlist_proof: &'a AllowlistProof,
    native_value: Uint256,
}

fn apply_claim(
    storage: &mut dyn Storage,
    contract: &Address,
    leaf_format: LeafFormat,
    now: u64,
    call: ClaimCall<'_>,
) -> StdResult<()> {
    let mut record = CONDITIONS
        .may_load(storage, key(contract))?
        .ok_or_else(|| revert("no claim conditions"))?;
    let idx = active_phase_index(&record.phases, now).ok_or_else(|| revert("no active claim phase"))?;
    let condition_id = record.current_start_id + idx as u64;
    let phase = &record.phases[idx];

    if phase.currency != *call.currency || phase.price != call.price_per_token {
        return Err(revert("invalid price or currency"));
    }
    if call.quantity.is_zero() || call.quantity > phase.quantity_limit_per_transaction {
        return Err(revert("invalid quantity"));
    }
    let supply_after = phase.supply_claimed.checked_add(call.quantity)?;
    if !phase.has_unlimited_supply() && supply_after > phase.max_claimable_supply {
        return Err(revert("exceeds max supply"));
    }

    if phase.has_allowlist() {
        let entry = AllowlistEntry::new(*call.receiver, call.allowlist_proof.max_claimable);
        let listed = verify_allowlist_proof(
            &phase.merkle_root,
            &entry,
            &call.allowlist_proof.proof,
            leaf_format,
        ) || call.receiver.hash() == phase.merkle_root;
        if !listed {
            return Err(revert("not in allowlist"));
        }
        let max = call.allowlist_proof.max_claimable;
        if !max.is_zero() && call.quantity > max {
            return Err(revert("exceeds allowlist limit"));
        }
    }

    let last_key = (key(contract), condition_id, key(call.receiver));
    let last = LAST_CLAIMS.may_load(storage, last_key)?.unwrap_or_default();
    if last > 0 && now < last.saturating_add(phase.wait_seconds_between_claims) {
        return Err(revert("cannot claim yet"));
    }

    let total = call.price_per_token.checked_mul(call.quantity)?;
    if call.currency.is_native_token() {
        if call.native_value != total {
            return Err(revert("invalid native value"));
        }
    } else if !call.native_value.is_zero() {
        return Err(revert("native value sent with token payment"));
    }
    if !total.is_zero() {
        let balance_key = (key(call.receiver), key(call.currency));
        let balance = BALANCES.may_load(storage, balance_key)?.unwrap_or_default();
        let remaining = balance
            .checked_sub(total)
            .map_err(|_| revert("insufficient balance"))?;
        BALANCES.save(storage, balance_key, &remaining)?;
    }

    record.phases[idx].supply_claimed = supply_after;
    CONDITIONS.save(storage, key(contract), &record)?;
    LAST_CLAIMS.save(storage, last_key, &now)?;
    credit_tokens(storage, contract, call.receiver, call.quantity)
}

fn apply_mint(
    storage: &mut dyn Storage,
    contract: &Address,
    now: u64,
    request: &MintRequest,
) -> StdResult<()> {
    let uid_key = (key(contract), request.uid.as_bytes().as_slice());
    if USED_UIDS.has(storage, uid_key) {
        return Err(revert("uid already used"));
    }
    if now < request.validity_start || now > request.validity_end {
        return Err(revert("request expired"));
    }
    USED_UIDS.save(storage, uid_key, &true)?;
    // a quantity outside the signed layout fails the digest in authorize_mint
    let quantity = request.quantity.unwrap_or_else(|| Uint256::from(1u64));
    credit_tokens(storage, contract, &request.to, quantity)
}

fn credit_tokens(
    storage: &mut dyn Storage,
    contract: &Address,
    owner: &Address,
    quantity: Uint256,
) -> StdResult<()> {
    TOKENS_OWNED
        .update(storage, (key(contract), key(owner)), |owned| {
            owned.unwrap_or_default().checked_add(quantity).map_err(StdError::from)
        })
        .map(|_| ())
}

fn copy_storage(storage: &MemoryStorage) -> MemoryStorage {
    let mut copy = MemoryStorage::new();
    for (k, v) in storage.range(None, None, Order::Ascending) {
        copy.set(&k, &v);
    }
    copy
}

#[async_trait]
impl Ledger for MockLedger {
    async fn block_timestamp(&self) -> StdResult<u64> {
        let storage = lock(&self.storage)?;
        Self::now(&*storage)
    }

    async fn claim_condition_range(&self, contract: &Address) -> StdResult<ClaimConditionRange> {
        let storage = lock(&self.storage)?;
        Ok(CONDITIONS
            .may_load(&*storage, key(contract))?
            .map(|record| ClaimConditionRange {
                current_start_id: record.current_start_id,
                count: record.phases.len() as u64,
            })
            .unwrap_or_default())
    }

    async fn claim_condition_by_id(&self, contract: &Address, id: u64) -> StdResult<ClaimPhase> {
        let storage = lock(&self.storage)?;
        let record = CONDITIONS
            .may_load(&*storage, key(contract))?
            .unwrap_or_default();
        id.checked_sub(record.current_start_id)
            .and_then(|idx| record.phases.get(idx as usize))
            .cloned()
            .ok_or_else(|| StdError::not_found(format!("claim condition {}", id)))
    }

    async fn active_claim_condition_id(&self, contract: &Address) -> StdResult<Option<u64>> {
        let storage = lock(&self.storage)?;
        let now = Self::now(&*storage)?;
        let record = CONDITIONS
            .may_load(&*storage, key(contract))?
            .unwrap_or_default();
        Ok(active_phase_index(&record.phases, now).map(|idx| record.current_start_id + idx as u64))
    }

    async fn last_claim_timestamp(
        &self,
        contract: &Address,
        condition_id: u64,
        wallet: &Address,
    ) -> StdResult<u64> {
        let storage = lock(&self.storage)?;
        Ok(LAST_CLAIMS
            .may_load(&*storage, (key(contract), condition_id, key(wallet)))?
            .unwrap_or_default())
    }

    async fn currency_balance(&self, wallet: &Address, currency: &Address) -> StdResult<Uint256> {
        let storage = lock(&self.storage)?;
        Ok(BALANCES
            .may_load(&*storage, (key(wallet), key(currency)))?
            .unwrap_or_default())
    }

    async fn contract_uri(&self, contract: &Address) -> StdResult<Option<String>> {
        let storage = lock(&self.storage)?;
        CONTRACT_URIS.may_load(&*storage, key(contract))
    }
}

#[async_trait]
impl TransactionSubmitter for MockLedger {
    async fn submit(&self, contract: &Address, calls: Vec<Binary>) -> StdResult<Receipt> {
        let msgs = calls
            .iter()
            .map(|call| from_json::<ExecuteMsg>(call))
            .collect::<StdResult<Vec<_>>>()?;
        for msg in &msgs {
            if let ExecuteMsg::MintWithSignature { request, signature } = msg {
                self.authorize_mint(contract, request, signature).await?;
            }
        }

        let mut storage = lock(&self.storage)?;
        let mut scratch = copy_storage(&storage);
        for msg in &msgs {
            self.apply(&mut scratch, contract, msg)?;
        }

        let tx = TX_COUNT.may_load(&scratch)?.unwrap_or_default() + 1;
        TX_COUNT.save(&mut scratch, &tx)?;
        SUBMISSIONS.save(&mut scratch, tx, &msgs)?;
        let block_timestamp = Self::now(&scratch)?;
        *storage = scratch;

        let mut preimage = tx.to_be_bytes().to_vec();
        preimage.extend_from_slice(key(contract));
        for call in &calls {
            preimage.extend_from_slice(call.as_slice());
        }
        Ok(Receipt {
            transaction_hash: Hash32::new(keccak256(&preimage)),
            block_timestamp,
        })
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

const ROLES: Map<(&[u8], &str, &[u8]), bool> = Map::new("roles");

#[derive(Default)]
pub struct MockRoles {
    storage: Mutex<MemoryStorage>,
}

impl MockRoles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, contract: &Address, role: Role, account: &Address) -> StdResult<()> {
        let mut storage = lock(&self.storage)?;
        ROLES.save(&mut *storage, (key(contract), role.as_str(), key(account)), &true)
    }

    pub fn revoke(&self, contract: &Address, role: Role, account: &Address) -> StdResult<()> {
        let mut storage = lock(&self.storage)?;
        ROLES.remove(&mut *storage, (key(contract), role.as_str(), key(account)));
        Ok(())
    }
}

#[async_trait]
impl Roles for MockRoles {
    async fn has_role(&self, contract: &Address, role: Role, account: &Address) -> StdResult<bool> {
        let storage = lock(&self.storage)?;
        Ok(ROLES.has(&*storage, (key(contract), role.as_str(), key(account))))
    }
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// Deterministic keyed signer. A signature is `address ++ keccak256(secret ++ digest)`,
/// which only `MockSignatureVerifier` understands.
pub struct MockSigner {
    address: Address,
    secret: [u8; 32],
    signed: AtomicU64,
}

impl MockSigner {
    pub fn new(seed: &str) -> Self {
        let secret = keccak256(seed);
        let hash = keccak256(secret);
        let mut address = [0u8; 20];
        address.copy_from_slice(&hash[12..]);
        Self {
            address: Address::new(address),
            secret,
            signed: AtomicU64::new(0),
        }
    }

    pub fn account(&self) -> Address {
        self.address
    }

    /// Number of signatures produced so far.
    pub fn signatures_issued(&self) -> u64 {
        self.signed.load(Ordering::SeqCst)
    }

    fn tag(&self, digest: &Hash32) -> [u8; 32] {
        keccak256_concat(&[&self.secret, digest.as_bytes()])
    }
}

#[async_trait]
impl Signer for MockSigner {
    async fn address(&self) -> StdResult<Address> {
        Ok(self.address)
    }

    async fn sign_typed_data(
        &self,
        domain: &Eip712Domain,
        primary_type: &str,
        fields: &[TypedField],
        values: &[TypedValue],
    ) -> StdResult<Binary> {
        let digest = signing_hash(domain, primary_type, fields, values)
            .map_err(|err| StdError::generic_err(err.to_string()))?;
        let mut signature = self.address.as_bytes().to_vec();
        signature.extend_from_slice(&self.tag(&digest));
        self.signed.fetch_add(1, Ordering::SeqCst);
        Ok(Binary::from(signature))
    }
}

/// Recovers addresses from `MockSigner` signatures.
#[derive(Default)]
pub struct MockSignatureVerifier {
    keys: Vec<(Address, [u8; 32])>,
}

impl MockSignatureVerifier {
    pub fn new(signers: &[&MockSigner]) -> Self {
        Self {
            keys: signers
                .iter()
                .map(|signer| (signer.address, signer.secret))
                .collect(),
        }
    }
}

impl SignatureVerifier for MockSignatureVerifier {
    fn recover(&self, digest: &Hash32, signature: &[u8]) -> Option<Address> {
        if signature.len() != 52 {
            return None;
        }
        let (claimed, tag) = signature.split_at(20);
        self.keys
            .iter()
            .find(|(address, _)| address.as_bytes().as_slice() == claimed)
            .filter(|(_, secret)| keccak256_concat(&[secret, digest.as_bytes()]) == tag)
            .map(|(address, _)| *address)
    }
}
