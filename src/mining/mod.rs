//! Mining module for block creation and transaction pooling

pub mod mempool;
pub mod miner;

pub use mempool::{select, Mempool, DEFAULT_BLOCK_TXS};
pub use miner::{
    search_nonces, MinedHeader, Miner, MinerConfig, MiningError, MiningStats, NonceRange,
    SearchOutcome, DEFAULT_MINER,
};
