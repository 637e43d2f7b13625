//! Block implementation for the ledger
//!
//! A block contains a header with metadata, the ordered transaction list, and
//! the Merkle tree derived from those transactions. The tree is never
//! serialized; it is rebuilt from the transactions whenever a block is loaded.

use crate::core::transaction::Transaction;
use crate::crypto::{commit, meets_difficulty, sha256_hex, MerkleError, MerkleTree, NULL_HASH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Delimiter used by canonical header serialization
pub const HEADER_DELIMITER: &str = ",";

// =============================================================================
// Block Errors
// =============================================================================

/// Block validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("Invalid proof of work")]
    InvalidProofOfWork,
    #[error("Invalid merkle root: header has {expected}, transactions give {actual}")]
    InvalidMerkleRoot { expected: String, actual: String },
    #[error("Invalid block hash")]
    InvalidBlockHash,
    #[error("Transaction count mismatch: header says {0}, block has {1}")]
    TransactionCountMismatch(u64, u64),
    #[error("Merkle error: {0}")]
    Merkle(#[from] MerkleError),
}

// =============================================================================
// Block Header
// =============================================================================

/// Block header containing metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block height (previous + 1)
    pub height: u64,
    /// Hash of the previous block header
    #[serde(rename = "previous_block_header_hash")]
    pub previous_hash: String,
    /// Block timestamp
    pub timestamp: u64,
    /// Merkle root of all transactions
    #[serde(rename = "transactions_merkle_root")]
    pub merkle_root: String,
    /// Number of transactions in the block
    pub transactions_count: u64,
    /// Miner identifier
    pub miner: String,
    /// Nonce used for proof of work
    pub nonce: u64,
    /// Required number of leading zero hex digits
    pub difficulty: u32,
    /// Header hash, empty until mining succeeds
    #[serde(default)]
    pub hash: String,
}

impl BlockHeader {
    /// Canonical serialization used for hashing.
    ///
    /// Order: difficulty, height, miner, nonce, previous hash, timestamp,
    /// transaction count, merkle root.
    pub fn serialize(&self) -> String {
        [
            self.difficulty.to_string(),
            self.height.to_string(),
            self.miner.clone(),
            self.nonce.to_string(),
            self.previous_hash.clone(),
            self.timestamp.to_string(),
            self.transactions_count.to_string(),
            self.merkle_root.clone(),
        ]
        .join(HEADER_DELIMITER)
    }

    /// Calculate the hash of the block header
    pub fn compute_hash(&self) -> String {
        sha256_hex(self.serialize().as_bytes())
    }

    /// Check if the computed hash meets the difficulty target
    pub fn is_valid_hash(&self) -> bool {
        meets_difficulty(&self.compute_hash(), self.difficulty)
    }

    /// Whether mining has finalized this header
    pub fn is_sealed(&self) -> bool {
        !self.hash.is_empty()
    }
}

// =============================================================================
// Block
// =============================================================================

/// A block in the ledger.
///
/// Blocks are immutable once assembled. Deserializing goes through
/// [`Block::from_parts`], so a decoded block always carries its tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "BlockRecord")]
pub struct Block {
    header: BlockHeader,
    transactions: Vec<Transaction>,
    /// Merkle tree over `transactions`; `None` only for an empty block
    #[serde(skip)]
    tree: Option<MerkleTree>,
}

/// Serialized form of a block
#[derive(Deserialize)]
struct BlockRecord {
    header: BlockHeader,
    transactions: Vec<Transaction>,
}

impl TryFrom<BlockRecord> for Block {
    type Error = BlockError;

    fn try_from(record: BlockRecord) -> Result<Self, Self::Error> {
        Block::from_parts(record.header, record.transactions)
    }
}

impl Block {
    /// Assemble a block from a sealed header and the tree it commits to
    pub(crate) fn sealed(
        header: BlockHeader,
        transactions: Vec<Transaction>,
        tree: Option<MerkleTree>,
    ) -> Self {
        Self {
            header,
            transactions,
            tree,
        }
    }

    /// Rebuild a block from persisted parts, recomputing its Merkle tree.
    ///
    /// Fails if the recomputed root disagrees with the header.
    pub fn from_parts(
        header: BlockHeader,
        transactions: Vec<Transaction>,
    ) -> Result<Self, BlockError> {
        let mut block = Self {
            header,
            transactions,
            tree: None,
        };
        block.rebuild_tree()?;
        Ok(block)
    }

    /// Recompute the derived Merkle tree and check it against the header
    pub fn rebuild_tree(&mut self) -> Result<(), BlockError> {
        let tree = if self.transactions.is_empty() {
            None
        } else {
            Some(commit(&self.transactions)?)
        };

        let actual = tree
            .as_ref()
            .map(|t| t.root().to_string())
            .unwrap_or_else(|| NULL_HASH.to_string());

        if actual != self.header.merkle_root {
            return Err(BlockError::InvalidMerkleRoot {
                expected: self.header.merkle_root.clone(),
                actual,
            });
        }

        self.tree = tree;
        Ok(())
    }

    /// Block header
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// Ordered list of transactions
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// The derived Merkle tree
    pub fn tree(&self) -> Option<&MerkleTree> {
        self.tree.as_ref()
    }

    /// Block height
    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Block hash
    pub fn hash(&self) -> &str {
        &self.header.hash
    }

    /// Merkle root from the header
    pub fn merkle_root(&self) -> &str {
        &self.header.merkle_root
    }

    /// Get number of transactions in this block
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Hash of the transaction at `index`
    pub fn transaction_hash(&self, index: usize) -> Option<String> {
        self.transactions.get(index).map(Transaction::hash)
    }

    /// Get the total transaction fees in this block
    pub fn total_fees(&self) -> u64 {
        self.transactions
            .iter()
            .fold(0u64, |total, tx| total.saturating_add(tx.fee))
    }

    /// Check if the proof of work is valid
    pub fn is_valid_pow(&self) -> bool {
        meets_difficulty(&self.header.hash, self.header.difficulty)
    }

    /// Verify the stored hash matches the header contents
    pub fn verify_hash(&self) -> bool {
        self.header.hash == self.header.compute_hash()
    }

    /// Full validation (count + merkle + hash + PoW)
    pub fn validate(&self) -> Result<(), BlockError> {
        let count = self.transactions.len() as u64;
        if count != self.header.transactions_count {
            return Err(BlockError::TransactionCountMismatch(
                self.header.transactions_count,
                count,
            ));
        }

        let actual = if self.transactions.is_empty() {
            NULL_HASH.to_string()
        } else {
            commit(&self.transactions)?.root().to_string()
        };
        if actual != self.header.merkle_root {
            return Err(BlockError::InvalidMerkleRoot {
                expected: self.header.merkle_root.clone(),
                actual,
            });
        }

        let cached = self.tree.as_ref().map(MerkleTree::root).unwrap_or(NULL_HASH);
        if cached != actual {
            return Err(BlockError::InvalidMerkleRoot {
                expected: actual,
                actual: cached.to_string(),
            });
        }

        if !self.verify_hash() {
            return Err(BlockError::InvalidBlockHash);
        }

        if !self.is_valid_pow() {
            return Err(BlockError::InvalidProofOfWork);
        }

        Ok(())
    }
}
