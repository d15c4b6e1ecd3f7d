use sha3::{Digest, Keccak256};

use crate::error::CommonError;

/// Keccak-256 of a single byte string.
pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    Keccak256::digest(data.as_ref()).into()
}

/// Keccak-256 over the concatenation of `parts`, without allocating the
/// concatenated buffer. Equivalent to Solidity's `keccak256(abi.encodePacked(..))`
/// for fixed-width inputs.
pub fn keccak256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Strips an optional `0x`/`0X` prefix and surrounding whitespace.
pub fn strip_hex_prefix(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
}

/// Canonical hex form: lowercase, `0x`-prefixed.
pub fn normalize_hex(value: &str) -> String {
    format!("0x{}", strip_hex_prefix(value).to_ascii_lowercase())
}

/// `0x`-prefixed lowercase hex encoding.
pub fn encode_hex(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode a hex string (with or without prefix, any case) into exactly `N` bytes.
pub fn decode_hex_fixed<const N: usize>(value: &str, field: &str) -> Result<[u8; N], CommonError> {
    let mut out = [0u8; N];
    hex::decode_to_slice(strip_hex_prefix(value), &mut out).map_err(|_| {
        CommonError::InvalidHex {
            field: field.to_string(),
        }
    })?;
    Ok(out)
}

/// Left-pads `bytes` to a 32-byte ABI word.
pub fn left_pad_word(bytes: &[u8]) -> [u8; 32] {
    let mut word = [0u8; 32];
    let len = bytes.len().min(32);
    word[32 - len..].copy_from_slice(&bytes[bytes.len() - len..]);
    word
}
