//! Blockchain implementation
//!
//! A single linear, append-only chain of mined blocks. There is no fork
//! handling: the local chain is authoritative.

use crate::core::block::{Block, BlockError, BlockHeader};
use crate::crypto::{MerkleError, NULL_HASH};
use crate::mining::{Miner, MiningError};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default mining difficulty (number of leading zero hex digits)
pub const DEFAULT_DIFFICULTY: u32 = 3;

/// Seconds between consecutive block timestamps
pub const BLOCK_INTERVAL: u64 = 10;

/// Blockchain-related errors
#[derive(Error, Debug)]
pub enum BlockchainError {
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
    #[error("Block not found: {0}")]
    BlockNotFound(u64),
    #[error("Blockchain has no genesis block")]
    EmptyChain,
    #[error("Block error: {0}")]
    Block(#[from] BlockError),
    #[error("Merkle error: {0}")]
    Merkle(#[from] MerkleError),
    #[error("Mining error: {0}")]
    Mining(#[from] MiningError),
}

/// The main blockchain structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blockchain {
    /// The chain of blocks
    pub blocks: Vec<Block>,
    /// Current mining difficulty
    pub difficulty: u32,
}

impl Blockchain {
    /// Create a new blockchain with a mined genesis block.
    ///
    /// The genesis block carries no transactions and commits to the null hash.
    pub fn new(difficulty: u32, timestamp: u64, miner: &Miner) -> Result<Self, BlockchainError> {
        let template = BlockHeader {
            height: 0,
            previous_hash: NULL_HASH.to_string(),
            timestamp,
            merkle_root: NULL_HASH.to_string(),
            transactions_count: 0,
            miner: miner.address.clone(),
            nonce: 0,
            difficulty,
            hash: String::new(),
        };

        let mined = miner.mine(&template, difficulty)?;
        info!("Genesis block mined: {}", mined.header.hash);

        Ok(Self {
            blocks: vec![Block::sealed(mined.header, Vec::new(), None)],
            difficulty,
        })
    }

    /// Rebuild a chain from loaded blocks, recomputing every Merkle tree and
    /// checking the links between blocks
    pub fn from_blocks(blocks: Vec<Block>, difficulty: u32) -> Result<Self, BlockchainError> {
        let mut chain = Self { blocks, difficulty };
        chain.rebuild_trees()?;
        chain.validate()?;
        Ok(chain)
    }

    /// Recompute the derived Merkle tree of every block
    pub fn rebuild_trees(&mut self) -> Result<(), BlockchainError> {
        for block in &mut self.blocks {
            block.rebuild_tree()?;
        }
        debug!("Rebuilt merkle trees for {} blocks", self.blocks.len());
        Ok(())
    }

    /// Get the latest block
    pub fn latest_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Get a block by height
    pub fn get_block(&self, height: u64) -> Result<&Block, BlockchainError> {
        usize::try_from(height)
            .ok()
            .and_then(|index| self.blocks.get(index))
            .ok_or(BlockchainError::BlockNotFound(height))
    }

    /// Height of the latest block (0 for an empty chain)
    pub fn height(&self) -> u64 {
        self.latest_block().map(Block::height).unwrap_or(0)
    }

    /// Timestamp of the next block: previous timestamp plus [`BLOCK_INTERVAL`]
    pub fn next_timestamp(&self) -> Result<u64, BlockchainError> {
        match self.latest_block() {
            Some(prev) => prev
                .header()
                .timestamp
                .checked_add(BLOCK_INTERVAL)
                .ok_or_else(|| {
                    BlockchainError::InvalidBlock(format!(
                        "timestamp overflow after block {}",
                        prev.height()
                    ))
                }),
            None => Ok(0),
        }
    }

    /// Header template for the next block (nonce 0, no hash)
    pub fn next_header(
        &self,
        merkle_root: &str,
        tx_count: usize,
        miner: &str,
    ) -> Result<BlockHeader, BlockchainError> {
        let (height, previous_hash) = match self.latest_block() {
            Some(prev) => (next_height(prev)?, prev.hash().to_string()),
            None => (0, NULL_HASH.to_string()),
        };

        Ok(BlockHeader {
            height,
            previous_hash,
            timestamp: self.next_timestamp()?,
            merkle_root: merkle_root.to_string(),
            transactions_count: tx_count as u64,
            miner: miner.to_string(),
            nonce: 0,
            difficulty: self.difficulty,
            hash: String::new(),
        })
    }

    /// Add a new block to the chain
    pub fn add_block(&mut self, block: Block) -> Result<(), BlockchainError> {
        let prev = self.latest_block().ok_or(BlockchainError::EmptyChain)?;
        Self::validate_link(prev, &block)?;
        block.validate()?;

        self.blocks.push(block);
        Ok(())
    }

    /// Validate the whole chain
    pub fn validate(&self) -> Result<(), BlockchainError> {
        let genesis = self.blocks.first().ok_or(BlockchainError::EmptyChain)?;
        genesis.validate()?;

        for pair in self.blocks.windows(2) {
            Self::validate_link(&pair[0], &pair[1])?;
            pair[1].validate()?;
        }

        Ok(())
    }

    fn validate_link(prev: &Block, block: &Block) -> Result<(), BlockchainError> {
        let expected = next_height(prev)?;
        if block.height() != expected {
            return Err(BlockchainError::InvalidBlock(format!(
                "expected height {}, got {}",
                expected,
                block.height()
            )));
        }

        if block.header().previous_hash != prev.hash() {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {} does not link to {}",
                block.height(),
                prev.hash()
            )));
        }

        Ok(())
    }
}

fn next_height(prev: &Block) -> Result<u64, BlockchainError> {
    prev.height().checked_add(1).ok_or_else(|| {
        BlockchainError::InvalidBlock(format!("no height after {}", prev.height()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Proof, Transaction};
    use crate::mining::DEFAULT_MINER;

    fn chain() -> Blockchain {
        Blockchain::new(1, 1_000, &Miner::new(DEFAULT_MINER)).unwrap()
    }

    #[test]
    fn test_genesis_block() {
        let chain = chain();
        let genesis = chain.latest_block().unwrap();

        assert_eq!(genesis.height(), 0);
        assert_eq!(genesis.header().previous_hash, NULL_HASH);
        assert_eq!(genesis.merkle_root(), NULL_HASH);
        assert!(genesis.is_valid_pow());
        assert!(chain.validate().is_ok());
    }

    #[test]
    fn test_next_header_links_previous() {
        let chain = chain();
        let header = chain.next_header("0xroot", 2, "me").unwrap();

        assert_eq!(header.height, 1);
        assert_eq!(header.previous_hash, chain.blocks[0].hash());
        assert_eq!(header.timestamp, 1_000 + BLOCK_INTERVAL);
        assert_eq!(header.transactions_count, 2);
    }

    #[test]
    fn test_mine_blocks_and_prove() {
        let mut chain = chain();
        let miner = Miner::new(DEFAULT_MINER);
        let txs = vec![
            Transaction::new("a", "b", 10, 3),
            Transaction::new("c", "d", 20, 2),
            Transaction::new("e", "f", 30, 1),
        ];

        let (block, _) = miner.mine_block(&mut chain, txs.clone()).unwrap();
        assert_eq!(chain.height(), 1);
        assert_eq!(block.tx_count(), 3);

        let proof = Proof::generate(chain.get_block(1).unwrap(), &txs[2].hash()).unwrap();
        assert!(proof.verify());
        assert!(chain.validate().is_ok());
    }

    #[test]
    fn test_empty_block_rejected() {
        let mut chain = chain();
        let result = Miner::new(DEFAULT_MINER).mine_block(&mut chain, Vec::new());

        assert!(matches!(
            result,
            Err(BlockchainError::Merkle(MerkleError::EmptyTransactions))
        ));
        assert_eq!(chain.height(), 0);
    }

    #[test]
    fn test_add_block_rejects_bad_link() {
        let mut chain = chain();
        let mut other = Blockchain::new(1, 5_000, &Miner::new("other")).unwrap();
        Miner::new("other")
            .mine_block(&mut other, vec![Transaction::new("a", "b", 1, 1)])
            .unwrap();

        let foreign = other.blocks[1].clone();
        assert!(matches!(
            chain.add_block(foreign),
            Err(BlockchainError::InvalidBlock(_))
        ));
    }

    #[test]
    fn test_from_blocks_rebuilds_trees() {
        let mut chain = chain();
        Miner::new(DEFAULT_MINER)
            .mine_block(&mut chain, vec![Transaction::new("a", "b", 1, 1)])
            .unwrap();

        let json = serde_json::to_string(&chain).unwrap();
        let decoded: Blockchain = serde_json::from_str(&json).unwrap();
        assert!(decoded.blocks[1].tree().is_some());

        let rebuilt = Blockchain::from_blocks(decoded.blocks, decoded.difficulty).unwrap();
        assert!(rebuilt.blocks[1].tree().is_some());
        assert!(rebuilt.validate().is_ok());
    }

    fn chain_at_limit() -> Blockchain {
        let template = BlockHeader {
            height: u64::MAX,
            previous_hash: NULL_HASH.to_string(),
            timestamp: u64::MAX,
            merkle_root: NULL_HASH.to_string(),
            transactions_count: 0,
            miner: DEFAULT_MINER.to_string(),
            nonce: 0,
            difficulty: 0,
            hash: String::new(),
        };
        let mined = Miner::new(DEFAULT_MINER).mine(&template, 0).unwrap();

        Blockchain {
            blocks: vec![Block::sealed(mined.header, Vec::new(), None)],
            difficulty: 0,
        }
    }

    #[test]
    fn test_next_header_overflow_is_an_error() {
        let chain = chain_at_limit();

        assert!(matches!(
            chain.next_timestamp(),
            Err(BlockchainError::InvalidBlock(_))
        ));
        assert!(matches!(
            chain.next_header(NULL_HASH, 0, DEFAULT_MINER),
            Err(BlockchainError::InvalidBlock(_))
        ));
    }

    #[test]
    fn test_link_after_max_height_is_an_error() {
        let mut chain = chain_at_limit();
        let follower = chain.blocks[0].clone();

        assert!(matches!(
            chain.add_block(follower),
            Err(BlockchainError::InvalidBlock(_))
        ));

        chain.blocks.push(chain.blocks[0].clone());
        assert!(matches!(
            chain.validate(),
            Err(BlockchainError::InvalidBlock(_))
        ));
    }

    #[test]
    fn test_get_block_missing() {
        assert!(matches!(
            chain().get_block(7),
            Err(BlockchainError::BlockNotFound(7))
        ));
    }
}
