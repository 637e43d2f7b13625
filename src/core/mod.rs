//! Core ledger components
//!
//! This module contains the fundamental building blocks:
//! - Transactions (canonical serialization and hashing)
//! - Blocks (headers, proof of work checks, derived Merkle tree)
//! - Blockchain (linear append-only chain)
//! - Inclusion proofs

pub mod block;
pub mod blockchain;
pub mod proof;
pub mod transaction;

pub use block::{Block, BlockError, BlockHeader};
pub use blockchain::{Blockchain, BlockchainError, BLOCK_INTERVAL, DEFAULT_DIFFICULTY};
pub use proof::{Proof, ProofError};
pub use transaction::{Transaction, TransactionBuilder};
