//! Merkle-ledger: a proof-of-work ledger with Merkle inclusion proofs
//!
//! This crate provides:
//! - Canonical transaction and header hashing (SHA-256, `0x`-prefixed hex)
//! - Merkle commitment of each block's ordered transactions
//! - Portable inclusion proofs that verify without the block
//! - Fee-priority transaction selection with lock times
//! - Proof of work mining with optional parallel nonce search
//! - JSON persistence of the chain and the mempool
//!
//! # Example
//!
//! ```rust
//! use merkle_ledger::core::{Blockchain, Proof, Transaction};
//! use merkle_ledger::mining::{Mempool, Miner, DEFAULT_MINER};
//!
//! // Create a new blockchain
//! let miner = Miner::new(DEFAULT_MINER);
//! let mut blockchain = Blockchain::new(1, 0, &miner).unwrap();
//!
//! // Queue some transactions
//! let mut mempool = Mempool::new();
//! mempool.add(Transaction::new("alice", "bob", 10, 2));
//! mempool.add(Transaction::new("carol", "dave", 5, 7));
//!
//! // Mine a block
//! let selected = mempool.select(100, blockchain.next_timestamp().unwrap());
//! let (block, stats) = miner.mine_block(&mut blockchain, selected).unwrap();
//! println!("Mined block {} in {}ms", block.height(), stats.time_ms);
//!
//! // Prove a transaction is in the block
//! let tx_hash = block.transaction_hash(0).unwrap();
//! let proof = Proof::generate(&block, &tx_hash).unwrap();
//! assert!(proof.verify());
//! ```

pub mod cli;
pub mod core;
pub mod crypto;
pub mod mining;
pub mod storage;

// Re-export commonly used types
pub use core::{
    Block, BlockHeader, Blockchain, Proof, Transaction, TransactionBuilder, BLOCK_INTERVAL,
    DEFAULT_DIFFICULTY,
};
pub use crypto::{combine, MerkleTree, NULL_HASH};
pub use mining::{Mempool, Miner, MinerConfig, DEFAULT_MINER};
pub use storage::{Storage, StorageConfig};
