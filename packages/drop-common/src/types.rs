use std::fmt;
use std::str::FromStr;

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Binary, Uint256};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CommonError;
use crate::hash::{decode_hex_fixed, keccak256, left_pad_word};

/// Sentinel for "no limit" on supply and per-transaction quantity,
/// matching the contract's `type(uint256).max`.
pub const UNLIMITED: Uint256 = Uint256::MAX;

/// Sentinel currency address meaning "pay in the chain's native token".
pub const NATIVE_TOKEN: Address = Address::new([0xee; 20]);

/// Shared impls for the fixed-width hex types. Both serialize as lowercase
/// `0x`-prefixed strings and parse case-insensitively.
macro_rules! hex_bytes_type {
    ($name:ident, $len:expr) => {
        impl $name {
            pub const ZERO: Self = Self([0u8; $len]);

            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{})", stringify!($name), hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = CommonError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::parse(value)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = String::deserialize(deserializer)?;
                Self::parse(&value).map_err(de::Error::custom)
            }
        }

        impl schemars::JsonSchema for $name {
            fn schema_name() -> String {
                stringify!($name).to_string()
            }

            fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
                String::json_schema(gen)
            }
        }
    };
}

/// A 20-byte account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 20]);

hex_bytes_type!(Address, 20);

impl Address {
    /// Parses a hex address in any case, with or without `0x`.
    pub fn parse(value: &str) -> Result<Self, CommonError> {
        decode_hex_fixed::<20>(value, "address")
            .map(Self)
            .map_err(|_| CommonError::InvalidAddress {
                value: value.to_string(),
            })
    }

    /// The address as a left-padded 32-byte ABI word.
    pub fn to_word(&self) -> [u8; 32] {
        left_pad_word(&self.0)
    }

    /// `keccak256(address)`, the leaf of a single-address allowlist.
    pub fn hash(&self) -> Hash32 {
        Hash32(keccak256(self.0))
    }

    pub fn is_native_token(&self) -> bool {
        *self == NATIVE_TOKEN
    }
}

/// A 32-byte hash or nonce.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash32([u8; 32]);

hex_bytes_type!(Hash32, 32);

impl Hash32 {
    pub fn parse(value: &str) -> Result<Self, CommonError> {
        decode_hex_fixed::<32>(value, "bytes32").map(Self)
    }
}

/// Leaf encoding of an allowlist Merkle tree. Contract generations differ in
/// which one they verify, so the caller selects it explicitly.
#[cw_serde]
#[derive(Copy, Eq, Hash)]
pub enum LeafFormat {
    /// `keccak256(address)`
    AddressOnly,
    /// `keccak256(address ++ uint256(max_claimable))`
    AddressWithMaxClaimable,
}

/// A single allowlisted wallet. `max_claimable` of zero means no per-wallet limit.
#[cw_serde]
pub struct AllowlistEntry {
    pub address: Address,
    #[serde(default)]
    pub max_claimable: Uint256,
}

impl AllowlistEntry {
    pub fn new(address: Address, max_claimable: impl Into<Uint256>) -> Self {
        Self {
            address,
            max_claimable: max_claimable.into(),
        }
    }

    /// Entries without per-wallet limits, one per address.
    pub fn from_addresses(addresses: impl IntoIterator<Item = Address>) -> Vec<Self> {
        addresses
            .into_iter()
            .map(|address| Self::new(address, Uint256::zero()))
            .collect()
    }
}

/// One claim phase as stored by the drop contract.
#[cw_serde]
pub struct ClaimPhase {
    /// Unix seconds at which the phase becomes active.
    pub start_time: u64,
    pub currency: Address,
    /// Price per token in the currency's smallest unit.
    pub price: Uint256,
    /// `UNLIMITED` for no cap.
    pub max_claimable_supply: Uint256,
    pub supply_claimed: Uint256,
    /// `UNLIMITED` for no cap.
    pub quantity_limit_per_transaction: Uint256,
    pub wait_seconds_between_claims: u64,
    /// All-zero means the phase is open to every wallet.
    pub merkle_root: Hash32,
}

impl ClaimPhase {
    pub fn has_unlimited_supply(&self) -> bool {
        self.max_claimable_supply == UNLIMITED
    }

    /// Remaining supply, or `None` when the phase is uncapped.
    pub fn available_supply(&self) -> Option<Uint256> {
        if self.has_unlimited_supply() {
            None
        } else {
            Some(self.max_claimable_supply.saturating_sub(self.supply_claimed))
        }
    }

    pub fn has_allowlist(&self) -> bool {
        !self.merkle_root.is_zero()
    }
}

/// Index of the phase active at `at`: the last phase whose start time has
/// passed. `phases` must already be sorted by start time.
pub fn active_phase_index(phases: &[ClaimPhase], at: u64) -> Option<usize> {
    phases.iter().rposition(|phase| phase.start_time <= at)
}

/// Bounds of the claim condition ids currently stored on chain.
#[cw_serde]
#[derive(Copy, Default)]
pub struct ClaimConditionRange {
    pub current_start_id: u64,
    pub count: u64,
}

impl ClaimConditionRange {
    pub fn ids(&self) -> std::ops::Range<u64> {
        self.current_start_id..self.current_start_id + self.count
    }
}

#[cw_serde]
#[derive(Copy, Eq, Hash)]
pub enum Role {
    Admin,
    Minter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Minter => "minter",
        }
    }
}

/// The payload of a signed mint authorization.
#[cw_serde]
pub struct MintRequest {
    /// Recipient; the zero address lets anyone redeem.
    pub to: Address,
    pub royalty_recipient: Address,
    pub royalty_bps: u16,
    pub primary_sale_recipient: Address,
    pub uri: String,
    /// Present only for quantity-bearing requests.
    pub quantity: Option<Uint256>,
    pub price: Uint256,
    pub currency: Address,
    pub validity_start: u64,
    pub validity_end: u64,
    pub uid: Hash32,
}

#[cw_serde]
pub struct SignedMintRequest {
    pub request: MintRequest,
    pub signature: Binary,
}

/// What the transaction submitter hands back once calls are included.
#[cw_serde]
pub struct Receipt {
    pub transaction_hash: Hash32,
    pub block_timestamp: u64,
}
