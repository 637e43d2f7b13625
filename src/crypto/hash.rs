//! Hashing utilities for the ledger
//!
//! Every hash in the ledger is a SHA-256 digest rendered as `0x` followed by
//! 64 lowercase hex characters. Transaction ids, Merkle nodes and block
//! header hashes all share this format.

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of a formatted hash string (`0x` + 64 hex characters)
pub const HASH_LEN: usize = 66;

/// Prefix carried by every formatted hash
pub const HASH_PREFIX: &str = "0x";

/// Sentinel used to pad odd-length Merkle levels
pub const NULL_HASH: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";

/// Number of hex digits in a digest, and so the highest reachable difficulty
pub const MAX_DIFFICULTY: u32 = 64;

/// Hash format errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("Malformed hash: {0}")]
    Malformed(String),
}

/// Computes SHA-256 of the input and formats it as `0x` + lowercase hex
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{}{}", HASH_PREFIX, hex::encode(hasher.finalize()))
}

/// Combines two hashes into their parent hash.
///
/// The inputs are put in lexicographic order before being concatenated, so
/// `combine(a, b) == combine(b, a)`. A verifier therefore never needs to know
/// whether a sibling sat on the left or the right.
pub fn combine(a: &str, b: &str) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };

    let mut hasher = Sha256::new();
    hasher.update(first.as_bytes());
    hasher.update(second.as_bytes());
    format!("{}{}", HASH_PREFIX, hex::encode(hasher.finalize()))
}

/// Returns true if `hash` is `0x` followed by 64 lowercase hex characters
pub fn is_valid_hash(hash: &str) -> bool {
    hash.len() == HASH_LEN
        && hash.starts_with(HASH_PREFIX)
        && hash[HASH_PREFIX.len()..]
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Like [`is_valid_hash`] but reports the offending value
pub fn validate_hash(hash: &str) -> Result<(), HashError> {
    if is_valid_hash(hash) {
        Ok(())
    } else {
        Err(HashError::Malformed(hash.to_string()))
    }
}

/// Checks if a hash meets the difficulty target.
/// The first `difficulty` hex digits after the prefix must all be `0`.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let digits = match hash.strip_prefix(HASH_PREFIX) {
        Some(digits) => digits,
        None => return false,
    };

    let required = difficulty as usize;
    digits.len() >= required && digits.bytes().take(required).all(|b| b == b'0')
}
