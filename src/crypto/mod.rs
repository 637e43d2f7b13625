//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 hashing and the canonical pairwise combiner
//! - Merkle tree commitment

pub mod hash;
pub mod merkle;

pub use hash::{
    combine, is_valid_hash, meets_difficulty, sha256_hex, validate_hash, HashError, HASH_LEN,
    MAX_DIFFICULTY, NULL_HASH,
};
pub use merkle::{commit, MerkleError, MerkleTree};
