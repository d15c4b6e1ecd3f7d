//! EIP-712 typed structured data hashing.
//!
//! Only the value kinds used by drop contracts are supported: `address`,
//! `uint256`, `uint128`, `string` and `bytes32`. Nested structs and arrays
//! never appear in mint requests.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::Uint256;

use crate::error::CommonError;
use crate::hash::{keccak256, keccak256_concat};
use crate::types::{Address, Hash32};

const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

#[cw_serde]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Eip712Domain {
    /// `hashStruct(EIP712Domain)`.
    pub fn separator(&self) -> Hash32 {
        Hash32::new(keccak256_concat(&[
            &keccak256(DOMAIN_TYPE),
            &keccak256(&self.name),
            &keccak256(&self.version),
            &Uint256::from(self.chain_id).to_be_bytes(),
            &self.verifying_contract.to_word(),
        ]))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolType {
    Address,
    Uint256,
    Uint128,
    String,
    Bytes32,
}

impl SolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolType::Address => "address",
            SolType::Uint256 => "uint256",
            SolType::Uint128 => "uint128",
            SolType::String => "string",
            SolType::Bytes32 => "bytes32",
        }
    }
}

/// One member of a struct type declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypedField {
    pub name: &'static str,
    pub ty: SolType,
}

impl TypedField {
    pub const fn new(name: &'static str, ty: SolType) -> Self {
        Self { name, ty }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypedValue {
    Address(Address),
    Uint(Uint256),
    String(String),
    Bytes32(Hash32),
}

impl TypedValue {
    fn matches(&self, ty: SolType) -> bool {
        match (self, ty) {
            (TypedValue::Address(_), SolType::Address)
            | (TypedValue::String(_), SolType::String)
            | (TypedValue::Bytes32(_), SolType::Bytes32)
            | (TypedValue::Uint(_), SolType::Uint256) => true,
            (TypedValue::Uint(v), SolType::Uint128) => {
                v.to_be_bytes()[..16].iter().all(|b| *b == 0)
            }
            _ => false,
        }
    }

    fn encode(&self) -> [u8; 32] {
        match self {
            TypedValue::Address(address) => address.to_word(),
            TypedValue::Uint(value) => value.to_be_bytes(),
            TypedValue::String(value) => keccak256(value),
            TypedValue::Bytes32(value) => *value.as_bytes(),
        }
    }
}

/// `Name(type1 name1,type2 name2,...)`
pub fn encode_type(primary_type: &str, fields: &[TypedField]) -> String {
    let members: Vec<String> = fields
        .iter()
        .map(|field| format!("{} {}", field.ty.as_str(), field.name))
        .collect();
    format!("{}({})", primary_type, members.join(","))
}

pub fn type_hash(primary_type: &str, fields: &[TypedField]) -> Hash32 {
    Hash32::new(keccak256(encode_type(primary_type, fields)))
}

/// `keccak256(typeHash ++ encodeData(values))`. Values must line up with the
/// declared fields one-to-one.
pub fn hash_struct(
    primary_type: &str,
    fields: &[TypedField],
    values: &[TypedValue],
) -> Result<Hash32, CommonError> {
    if fields.len() != values.len() {
        return Err(CommonError::TypedDataMismatch {
            reason: format!(
                "{} declares {} fields, got {} values",
                primary_type,
                fields.len(),
                values.len()
            ),
        });
    }

    let mut encoded = Vec::with_capacity(32 * (values.len() + 1));
    encoded.extend_from_slice(type_hash(primary_type, fields).as_bytes());
    for (field, value) in fields.iter().zip(values) {
        if !value.matches(field.ty) {
            return Err(CommonError::TypedDataMismatch {
                reason: format!("field {} is not a valid {}", field.name, field.ty.as_str()),
            });
        }
        encoded.extend_from_slice(&value.encode());
    }
    Ok(Hash32::new(keccak256(&encoded)))
}

/// The digest a signer signs: `keccak256(0x1901 ++ domainSeparator ++ hashStruct(message))`.
pub fn signing_hash(
    domain: &Eip712Domain,
    primary_type: &str,
    fields: &[TypedField],
    values: &[TypedValue],
) -> Result<Hash32, CommonError> {
    let struct_hash = hash_struct(primary_type, fields, values)?;
    Ok(Hash32::new(keccak256_concat(&[
        &[0x19, 0x01],
        domain.separator().as_bytes(),
        struct_hash.as_bytes(),
    ])))
}
