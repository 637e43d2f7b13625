//! Mining engine for the ledger
//!
//! Proof of work searches the nonce space for a header hash with at least
//! `difficulty` leading zero hex digits. The search is an explicit procedure
//! over a nonce range with an injected acceptance predicate, so it can be
//! bounded and split across worker threads.

use crate::core::{Block, BlockHeader, Blockchain, BlockchainError, Transaction};
use crate::crypto::{commit, meets_difficulty, MAX_DIFFICULTY};
use crate::mining::mempool::DEFAULT_BLOCK_TXS;
use log::{debug, info, warn};
use std::panic;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Instant;
use thiserror::Error;

/// Default miner identifier
pub const DEFAULT_MINER: &str = "0xca4388fb6d0ee25d59c24360e49c2dd4c9d02727";

// =============================================================================
// Errors
// =============================================================================

/// Mining errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MiningError {
    #[error("No valid nonce found within {attempts} attempts")]
    ExhaustedSearch { attempts: u64 },
    #[error("Difficulty {0} can never be met (max: {})", MAX_DIFFICULTY)]
    UnreachableDifficulty(u32),
}

// =============================================================================
// Configuration
// =============================================================================

/// Miner configuration
#[derive(Debug, Clone)]
pub struct MinerConfig {
    /// Worker threads used for the nonce search
    pub threads: usize,
    /// Upper bound on nonces tried per header; `None` searches forever
    pub max_attempts: Option<u64>,
    /// Maximum number of transactions selected per block
    pub block_txs: usize,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            max_attempts: None,
            block_txs: DEFAULT_BLOCK_TXS,
        }
    }
}

// =============================================================================
// Nonce search
// =============================================================================

/// A slice of the nonce space: `start, start + stride, ...` below `end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceRange {
    pub start: u64,
    pub stride: u64,
    /// Exclusive upper bound; `None` is unbounded
    pub end: Option<u64>,
}

impl NonceRange {
    /// Every nonce from 0 upward
    pub fn unbounded() -> Self {
        Self {
            start: 0,
            stride: 1,
            end: None,
        }
    }

    /// Split `[0, end)` into `workers` interleaved, disjoint ranges
    pub fn partition(workers: usize, end: Option<u64>) -> Vec<Self> {
        let workers = workers.max(1) as u64;
        (0..workers)
            .map(|start| Self {
                start,
                stride: workers,
                end,
            })
            .collect()
    }
}

/// Result of searching one nonce range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Winning nonce and hash, if any
    pub found: Option<(u64, String)>,
    /// Number of hashes computed
    pub attempts: u64,
}

/// Search `range` for the first nonce whose header hash satisfies `accept`.
///
/// `best` holds the smallest nonce found by any worker so far (`u64::MAX`
/// when none). The search stops once its nonces pass `best`, and a success
/// lowers `best`, so concurrent workers agree on the smallest winner.
pub fn search_nonces<F>(
    template: &BlockHeader,
    range: NonceRange,
    accept: F,
    best: &AtomicU64,
) -> SearchOutcome
where
    F: Fn(&str) -> bool,
{
    let mut header = template.clone();
    let mut attempts = 0u64;
    let mut nonce = range.start;
    let stride = range.stride.max(1);

    loop {
        if range.end.is_some_and(|end| nonce >= end) || nonce >= best.load(Ordering::Acquire) {
            break;
        }

        header.nonce = nonce;
        let hash = header.compute_hash();
        attempts += 1;

        if accept(&hash) {
            best.fetch_min(nonce, Ordering::AcqRel);
            return SearchOutcome {
                found: Some((nonce, hash)),
                attempts,
            };
        }

        nonce = match nonce.checked_add(stride) {
            Some(next) => next,
            None => break,
        };
    }

    SearchOutcome {
        found: None,
        attempts,
    }
}

// =============================================================================
// Miner
// =============================================================================

/// Mining statistics
#[derive(Debug, Clone)]
pub struct MiningStats {
    /// Number of hash attempts
    pub hash_attempts: u64,
    /// Time taken in milliseconds
    pub time_ms: u128,
    /// Hash rate (hashes per second)
    pub hash_rate: f64,
}

impl MiningStats {
    fn new(hash_attempts: u64, start: Instant) -> Self {
        let time_ms = start.elapsed().as_millis();
        let hash_rate = if time_ms > 0 {
            (hash_attempts as f64) / (time_ms as f64 / 1000.0)
        } else {
            hash_attempts as f64
        };

        Self {
            hash_attempts,
            time_ms,
            hash_rate,
        }
    }
}

/// A header finalized by proof of work
#[derive(Debug, Clone)]
pub struct MinedHeader {
    pub header: BlockHeader,
    pub stats: MiningStats,
}

/// Miner for creating new blocks
#[derive(Debug, Clone)]
pub struct Miner {
    /// Miner identifier written into headers
    pub address: String,
    pub config: MinerConfig,
}

impl Miner {
    /// Create a new miner
    pub fn new(address: &str) -> Self {
        Self::with_config(address, MinerConfig::default())
    }

    /// Create a miner with custom settings
    pub fn with_config(address: &str, config: MinerConfig) -> Self {
        Self {
            address: address.to_string(),
            config,
        }
    }

    /// Mine `template` at `difficulty`.
    ///
    /// The nonce starts at 0. The smallest satisfying nonce wins, whatever
    /// the thread count, so results are reproducible.
    pub fn mine(&self, template: &BlockHeader, difficulty: u32) -> Result<MinedHeader, MiningError> {
        if difficulty > MAX_DIFFICULTY {
            return Err(MiningError::UnreachableDifficulty(difficulty));
        }

        let mut header = template.clone();
        header.difficulty = difficulty;
        header.nonce = 0;
        header.hash.clear();

        let start = Instant::now();
        let outcomes = self.search(&header, |hash: &str| meets_difficulty(hash, difficulty));

        let attempts = outcomes.iter().map(|o| o.attempts).sum();
        let winner = outcomes
            .into_iter()
            .filter_map(|o| o.found)
            .min_by_key(|(nonce, _)| *nonce);

        match winner {
            Some((nonce, hash)) => {
                header.nonce = nonce;
                header.hash = hash;
                Ok(MinedHeader {
                    header,
                    stats: MiningStats::new(attempts, start),
                })
            }
            None => Err(MiningError::ExhaustedSearch { attempts }),
        }
    }

    /// Run the nonce search over the configured worker threads.
    ///
    /// A panicking worker is logged and its panic resumed here, so a lost
    /// range never turns into a false exhaustion or a larger nonce.
    fn search<F>(&self, header: &BlockHeader, accept: F) -> Vec<SearchOutcome>
    where
        F: Fn(&str) -> bool + Sync,
    {
        let best = AtomicU64::new(u64::MAX);
        let threads = self.config.threads.max(1);

        if threads == 1 {
            let range = NonceRange {
                end: self.config.max_attempts,
                ..NonceRange::unbounded()
            };
            return vec![search_nonces(header, range, &accept, &best)];
        }

        debug!("Searching nonces on {} threads", threads);
        let ranges = NonceRange::partition(threads, self.config.max_attempts);
        thread::scope(|scope| {
            let handles: Vec<_> = ranges
                .into_iter()
                .map(|range| {
                    let accept = &accept;
                    let best = &best;
                    scope.spawn(move || search_nonces(header, range, accept, best))
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(outcome) => outcome,
                    Err(payload) => {
                        warn!("Mining worker panicked; aborting search");
                        panic::resume_unwind(payload)
                    }
                })
                .collect()
        })
    }

    /// Mine a new block with the given transactions and append it
    pub fn mine_block(
        &self,
        blockchain: &mut Blockchain,
        transactions: Vec<Transaction>,
    ) -> Result<(Block, MiningStats), BlockchainError> {
        let tree = commit(&transactions)?;
        let template = blockchain.next_header(tree.root(), transactions.len(), &self.address)?;

        info!(
            "Mining block {} with difficulty {}...",
            template.height, blockchain.difficulty
        );

        let mined = self.mine(&template, blockchain.difficulty)?;
        let stats = mined.stats;

        info!(
            "Block {} mined in {}ms ({} attempts, {:.2} H/s)",
            mined.header.height, stats.time_ms, stats.hash_attempts, stats.hash_rate
        );

        let block = Block::sealed(mined.header, transactions, Some(tree));
        blockchain.add_block(block.clone())?;

        Ok((block, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::NULL_HASH;

    fn template() -> BlockHeader {
        BlockHeader {
            height: 1,
            previous_hash: NULL_HASH.to_string(),
            timestamp: 10,
            merkle_root: NULL_HASH.to_string(),
            transactions_count: 0,
            miner: DEFAULT_MINER.to_string(),
            nonce: 99,
            difficulty: 0,
            hash: String::new(),
        }
    }

    #[test]
    fn test_difficulty_zero_accepts_first_nonce() {
        let mined = Miner::new(DEFAULT_MINER).mine(&template(), 0).unwrap();

        assert_eq!(mined.header.nonce, 0);
        assert_eq!(mined.stats.hash_attempts, 1);
        assert_eq!(mined.header.hash, mined.header.compute_hash());
    }

    #[test]
    fn test_mined_hash_meets_difficulty() {
        let mined = Miner::new(DEFAULT_MINER).mine(&template(), 2).unwrap();

        assert!(mined.header.hash.starts_with("0x00"));
        assert!(mined.header.is_valid_hash());
        assert_eq!(mined.header.difficulty, 2);
        assert_eq!(mined.stats.hash_attempts, mined.header.nonce + 1);
    }

    #[test]
    fn test_sequential_finds_first_nonce() {
        let mined = Miner::new(DEFAULT_MINER).mine(&template(), 2).unwrap();

        let mut header = mined.header.clone();
        for nonce in 0..mined.header.nonce {
            header.nonce = nonce;
            assert!(!meets_difficulty(&header.compute_hash(), 2));
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential = Miner::new(DEFAULT_MINER).mine(&template(), 2).unwrap();

        let config = MinerConfig {
            threads: 4,
            ..MinerConfig::default()
        };
        let parallel = Miner::with_config(DEFAULT_MINER, config)
            .mine(&template(), 2)
            .unwrap();

        assert_eq!(parallel.header.nonce, sequential.header.nonce);
        assert_eq!(parallel.header.hash, sequential.header.hash);
    }

    #[test]
    fn test_bounded_search_exhausts() {
        let config = MinerConfig {
            max_attempts: Some(3),
            ..MinerConfig::default()
        };
        // Eight leading zero digits is out of reach within three nonces
        let result = Miner::with_config(DEFAULT_MINER, config).mine(&template(), 8);

        assert_eq!(result.unwrap_err(), MiningError::ExhaustedSearch { attempts: 3 });
    }

    #[test]
    fn test_bounded_parallel_search_exhausts() {
        let config = MinerConfig {
            threads: 3,
            max_attempts: Some(10),
            ..MinerConfig::default()
        };
        let result = Miner::with_config(DEFAULT_MINER, config).mine(&template(), 8);

        assert_eq!(result.unwrap_err(), MiningError::ExhaustedSearch { attempts: 10 });
    }

    #[test]
    #[should_panic(expected = "worker failure")]
    fn test_parallel_worker_panic_is_resumed() {
        let config = MinerConfig {
            threads: 2,
            ..MinerConfig::default()
        };
        let miner = Miner::with_config(DEFAULT_MINER, config);

        miner.search(&template(), |hash: &str| {
            if hash.is_empty() {
                return true;
            }
            panic!("worker failure")
        });
    }

    #[test]
    fn test_unreachable_difficulty() {
        let result = Miner::new(DEFAULT_MINER).mine(&template(), 65);
        assert_eq!(result.unwrap_err(), MiningError::UnreachableDifficulty(65));
    }

    #[test]
    fn test_partition_is_disjoint() {
        let ranges = NonceRange::partition(3, Some(9));
        let mut seen: Vec<u64> = ranges
            .iter()
            .flat_map(|r| (r.start..9).step_by(r.stride as usize))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn test_search_respects_best() {
        let best = AtomicU64::new(5);
        let range = NonceRange {
            start: 6,
            stride: 1,
            end: None,
        };
        let outcome = search_nonces(&template(), range, |_| true, &best);

        assert_eq!(outcome.found, None);
        assert_eq!(outcome.attempts, 0);
    }

    #[test]
    fn test_search_with_custom_predicate() {
        let best = AtomicU64::new(u64::MAX);
        let outcome = search_nonces(&template(), NonceRange::unbounded(), |h| h.ends_with('0'), &best);

        let (nonce, hash) = outcome.found.unwrap();
        assert!(hash.ends_with('0'));
        assert_eq!(best.load(Ordering::Acquire), nonce);
        assert_eq!(outcome.attempts, nonce + 1);
    }
}
