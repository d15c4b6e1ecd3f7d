use cosmwasm_schema::cw_serde;
use cosmwasm_std::Uint256;
use drop_common::typed_data::{signing_hash, Eip712Domain, SolType, TypedField, TypedValue};
use drop_common::{Hash32, MintRequest};

use crate::error::ContractError;

pub const PRIMARY_TYPE: &str = "MintRequest";
pub const DEFAULT_DOMAIN_VERSION: &str = "1";

const WITH_QUANTITY_FIELDS: &[TypedField] = &[
    TypedField::new("to", SolType::Address),
    TypedField::new("royaltyRecipient", SolType::Address),
    TypedField::new("royaltyBps", SolType::Uint256),
    TypedField::new("primarySaleRecipient", SolType::Address),
    TypedField::new("uri", SolType::String),
    TypedField::new("quantity", SolType::Uint256),
    TypedField::new("pricePerToken", SolType::Uint256),
    TypedField::new("currency", SolType::Address),
    TypedField::new("validityStartTimestamp", SolType::Uint128),
    TypedField::new("validityEndTimestamp", SolType::Uint128),
    TypedField::new("uid", SolType::Bytes32),
];

const SINGLE_TOKEN_FIELDS: &[TypedField] = &[
    TypedField::new("to", SolType::Address),
    TypedField::new("royaltyRecipient", SolType::Address),
    TypedField::new("royaltyBps", SolType::Uint256),
    TypedField::new("primarySaleRecipient", SolType::Address),
    TypedField::new("uri", SolType::String),
    TypedField::new("price", SolType::Uint256),
    TypedField::new("currency", SolType::Address),
    TypedField::new("validityStartTimestamp", SolType::Uint128),
    TypedField::new("validityEndTimestamp", SolType::Uint128),
    TypedField::new("uid", SolType::Bytes32),
];

/// The two mint request layouts deployed contracts accept.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum MintRequestVariant {
    /// Signature drops minting `quantity` tokens at `pricePerToken`.
    WithQuantity,
    /// Token contracts minting a single token at `price`.
    SingleToken,
}

impl MintRequestVariant {
    pub fn fields(&self) -> &'static [TypedField] {
        match self {
            MintRequestVariant::WithQuantity => WITH_QUANTITY_FIELDS,
            MintRequestVariant::SingleToken => SINGLE_TOKEN_FIELDS,
        }
    }

    pub fn default_domain_name(&self) -> &'static str {
        match self {
            MintRequestVariant::WithQuantity => "SignatureMintERC721",
            MintRequestVariant::SingleToken => "TokenERC721",
        }
    }

    pub fn requires_quantity(&self) -> bool {
        matches!(self, MintRequestVariant::WithQuantity)
    }

    /// Field values in declaration order. A quantity on a single token
    /// request is rejected since the signature would not cover it.
    pub fn values(&self, request: &MintRequest) -> Result<Vec<TypedValue>, ContractError> {
        let mut values = vec![
            TypedValue::Address(request.to),
            TypedValue::Address(request.royalty_recipient),
            TypedValue::Uint(Uint256::from(u64::from(request.royalty_bps))),
            TypedValue::Address(request.primary_sale_recipient),
            TypedValue::String(request.uri.clone()),
        ];
        match (self.requires_quantity(), request.quantity) {
            (true, Some(quantity)) => values.push(TypedValue::Uint(quantity)),
            (true, None) => {
                return Err(ContractError::MissingField {
                    field: "quantity".to_string(),
                })
            }
            (false, Some(_)) => {
                return Err(ContractError::UnexpectedField {
                    field: "quantity".to_string(),
                })
            }
            (false, None) => {}
        }
        values.extend([
            TypedValue::Uint(request.price),
            TypedValue::Address(request.currency),
            TypedValue::Uint(Uint256::from(request.validity_start)),
            TypedValue::Uint(Uint256::from(request.validity_end)),
            TypedValue::Bytes32(request.uid),
        ]);
        Ok(values)
    }
}

/// The EIP-712 digest a minter signs for `request`.
pub fn mint_request_digest(
    domain: &Eip712Domain,
    variant: MintRequestVariant,
    request: &MintRequest,
) -> Result<Hash32, ContractError> {
    let values = variant.values(request)?;
    Ok(signing_hash(domain, PRIMARY_TYPE, variant.fields(), &values)?)
}
