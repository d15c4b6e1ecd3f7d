use cosmwasm_std::Api;

use crate::hash::keccak256;
use crate::traits::SignatureVerifier;
use crate::types::{Address, Hash32};

/// Splits a 65-byte `r ++ s ++ v` signature into the 64-byte compact form
/// and a recovery id. Accepts `v` as 27/28 or 0/1.
pub fn split_signature(signature: &[u8]) -> Option<(&[u8], u8)> {
    if signature.len() != 65 {
        return None;
    }
    let recovery_id = match signature[64] {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return None,
    };
    Some((&signature[..64], recovery_id))
}

/// Address of an uncompressed secp256k1 public key (`0x04 ++ x ++ y`).
pub fn pubkey_to_address(pubkey: &[u8]) -> Option<Address> {
    if pubkey.len() != 65 || pubkey[0] != 0x04 {
        return None;
    }
    let hash = keccak256(&pubkey[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Some(Address::new(address))
}

/// secp256k1 public key recovery through the host `Api`.
pub struct Secp256k1Verifier<A> {
    api: A,
}

impl<A: Api> Secp256k1Verifier<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }
}

impl<A: Api + Send + Sync> SignatureVerifier for Secp256k1Verifier<A> {
    fn recover(&self, digest: &Hash32, signature: &[u8]) -> Option<Address> {
        let (compact, recovery_id) = split_signature(signature)?;
        let pubkey = self
            .api
            .secp256k1_recover_pubkey(digest.as_bytes(), compact, recovery_id)
            .ok()?;
        pubkey_to_address(&pubkey)
    }
}
