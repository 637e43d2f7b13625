//! Merkle inclusion proofs
//!
//! A [`Proof`] shows that a transaction hash is committed to by a Merkle
//! root. It is a flat, self-describing record: verification needs only the
//! proof itself and the hash combiner, never the block it came from.
//!
//! `proof_hashes` lists the root-adjacent sibling first and the
//! leaf-adjacent sibling last. Verification therefore walks the list in
//! reverse, starting from the transaction hash.

use crate::core::Block;
use crate::crypto::{combine, commit, validate_hash, HashError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Proof errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("Transaction {0} is not included in this block")]
    NotIncluded(String),
    #[error("Block {0} has no merkle tree")]
    MissingTree(u64),
    #[error("Malformed proof: {0}")]
    MalformedHash(#[from] HashError),
    #[error("Proof does not lead to root {expected} (got {actual})")]
    RootMismatch { expected: String, actual: String },
}

/// Proof that a transaction is included under a Merkle root
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Proof {
    /// The claimed leaf
    pub transaction_hash: String,
    /// Root the proof walks up to
    pub merkle_root: String,
    /// Sibling hashes, root-adjacent first
    pub proof_hashes: Vec<String>,
}

impl Proof {
    /// Create a proof for `tx_hash` in `block`.
    ///
    /// The hash is located in the block's tree (lowest level first) and the
    /// siblings are collected walking up to the root. A one-leaf tree yields
    /// an empty sibling list.
    pub fn generate(block: &Block, tx_hash: &str) -> Result<Self, ProofError> {
        let rebuilt;
        let tree = match block.tree() {
            Some(tree) => tree,
            None if block.transactions().is_empty() => {
                return Err(ProofError::NotIncluded(tx_hash.to_string()))
            }
            None => {
                rebuilt = commit(block.transactions())
                    .map_err(|_| ProofError::MissingTree(block.height()))?;
                &rebuilt
            }
        };

        let (level, position) = tree
            .locate(tx_hash)
            .ok_or_else(|| ProofError::NotIncluded(tx_hash.to_string()))?;

        let mut proof_hashes = tree
            .path(level, position)
            .ok_or(ProofError::MissingTree(block.height()))?;
        proof_hashes.reverse();

        Ok(Self {
            transaction_hash: tx_hash.to_string(),
            merkle_root: tree.root().to_string(),
            proof_hashes,
        })
    }

    /// Fold the siblings into the root the proof leads to
    pub fn computed_root(&self) -> Result<String, ProofError> {
        validate_hash(&self.transaction_hash)?;

        let mut current = self.transaction_hash.clone();
        for sibling in self.proof_hashes.iter().rev() {
            validate_hash(sibling)?;
            current = combine(&current, sibling);
        }

        Ok(current)
    }

    /// Verify the proof, reporting why it fails
    pub fn check(&self) -> Result<(), ProofError> {
        validate_hash(&self.merkle_root)?;

        let actual = self.computed_root()?;
        if actual != self.merkle_root {
            return Err(ProofError::RootMismatch {
                expected: self.merkle_root.clone(),
                actual,
            });
        }

        Ok(())
    }

    /// Verify the proof against its declared root
    pub fn verify(&self) -> bool {
        self.check().is_ok()
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

// =============================================================================
// Tests
// =============================================================================
