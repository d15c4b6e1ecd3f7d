use cosmwasm_schema::cw_serde;
use cosmwasm_std::Uint256;
use drop_common::{Address, Hash32, Receipt};

/// A mint authorization to sign. Absent fields take defaults when the
/// request is generated.
#[cw_serde]
#[derive(Default)]
pub struct MintRequestInput {
    /// Recipient. Defaults to the zero address, which lets anyone redeem.
    pub to: Option<Address>,
    pub royalty_recipient: Option<Address>,
    /// Basis points, at most 10000.
    pub royalty_bps: Option<u16>,
    pub primary_sale_recipient: Option<Address>,
    /// Token URI. Takes precedence over `metadata`.
    pub uri: Option<String>,
    /// Token metadata, uploaded to the content store for its URI.
    pub metadata: Option<serde_json::Value>,
    /// Required by quantity-bearing requests.
    pub quantity: Option<Uint256>,
    /// Per token, in the currency's smallest unit.
    pub price: Option<Uint256>,
    pub currency: Option<Address>,
    /// Unix seconds. Defaults to now.
    pub validity_start: Option<u64>,
    /// Unix seconds. Defaults to ten years after the start.
    pub validity_end: Option<u64>,
    /// Generated when absent.
    pub uid: Option<Hash32>,
}

impl MintRequestInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    pub fn royalty(mut self, recipient: Address, bps: u16) -> Self {
        self.royalty_recipient = Some(recipient);
        self.royalty_bps = Some(bps);
        self
    }

    pub fn primary_sale_recipient(mut self, recipient: Address) -> Self {
        self.primary_sale_recipient = Some(recipient);
        self
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn quantity(mut self, quantity: impl Into<Uint256>) -> Self {
        self.quantity = Some(quantity.into());
        self
    }

    pub fn price(mut self, price: impl Into<Uint256>, currency: Address) -> Self {
        self.price = Some(price.into());
        self.currency = Some(currency);
        self
    }

    pub fn validity(mut self, start: u64, end: u64) -> Self {
        self.validity_start = Some(start);
        self.validity_end = Some(end);
        self
    }

    pub fn uid(mut self, uid: Hash32) -> Self {
        self.uid = Some(uid);
        self
    }
}

#[cw_serde]
pub struct MintResponse {
    pub uids: Vec<Hash32>,
    /// Tokens the redeemed authorizations grant in total.
    pub quantity: Uint256,
    pub receipt: Receipt,
}
