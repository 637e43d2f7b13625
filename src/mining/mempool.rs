//! Transaction pool (mempool) for pending transactions
//!
//! Holds transactions waiting to be included in blocks and picks the batch
//! for the next block:
//! - Lock-time filtering against the block timestamp
//! - Fee-based prioritization (highest fee first)
//! - Ties keep pool arrival order, so the resulting Merkle root is stable

use crate::core::Transaction;
use std::collections::HashMap;

// =============================================================================
// Configuration
// =============================================================================

/// Default number of transactions selected per block
pub const DEFAULT_BLOCK_TXS: usize = 100;

// =============================================================================
// Selection
// =============================================================================

/// Select up to `limit` transactions for a block built at `current_time`.
///
/// Transactions whose lock time exceeds `current_time` are skipped. The rest
/// are ordered by fee, highest first; equal fees keep their pool order.
pub fn select(pool: &[Transaction], limit: usize, current_time: u64) -> Vec<Transaction> {
    let mut eligible: Vec<&Transaction> = pool
        .iter()
        .filter(|tx| tx.is_spendable(current_time))
        .collect();

    // Stable sort: equal fees stay in arrival order
    eligible.sort_by(|a, b| b.fee.cmp(&a.fee));

    eligible.into_iter().take(limit).cloned().collect()
}

// =============================================================================
// Mempool
// =============================================================================

/// Memory pool for pending transactions, kept in arrival order
#[derive(Debug, Default, Clone)]
pub struct Mempool {
    transactions: Vec<Transaction>,
}

impl Mempool {
    /// Create a new mempool
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mempool from transactions in arrival order
    pub fn from_transactions(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    /// Add a transaction to the end of the pool
    pub fn add(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    /// Get transactions for mining (highest fee first, up to limit)
    pub fn select(&self, limit: usize, current_time: u64) -> Vec<Transaction> {
        select(&self.transactions, limit, current_time)
    }

    /// Remove one pooled copy per hash in `hashes` (oldest first)
    pub fn remove_included(&mut self, hashes: &[String]) -> usize {
        let mut included: HashMap<&str, usize> = HashMap::new();
        for hash in hashes {
            *included.entry(hash.as_str()).or_insert(0) += 1;
        }

        let before = self.transactions.len();
        self.transactions.retain(|tx| {
            match included.get_mut(tx.hash().as_str()) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    false
                }
                _ => true,
            }
        });
        before - self.transactions.len()
    }

    /// Pending transactions in arrival order
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Get the number of pending transactions
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Get total fees of all transactions
    pub fn total_fees(&self) -> u64 {
        self.transactions
            .iter()
            .fold(0u64, |total, tx| total.saturating_add(tx.fee))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransactionBuilder;

    fn tx(name: &str, fee: u64, lock_time: u64) -> Transaction {
        TransactionBuilder::new()
            .sender(name)
            .receiver("bob")
            .amount(1)
            .fee(fee)
            .lock_time(lock_time)
            .build()
    }

    #[test]
    fn test_select_filters_and_orders() {
        let t1 = tx("t1", 10, 0);
        let t2 = tx("t2", 5, 0);
        let t3 = tx("t3", 20, 1000);
        let pool = vec![t1.clone(), t2.clone(), t3];

        assert_eq!(select(&pool, 2, 0), vec![t1, t2]);
    }

    #[test]
    fn test_select_lock_time_boundary() {
        let pool = vec![tx("a", 1, 50)];
        assert!(select(&pool, 10, 49).is_empty());
        assert_eq!(select(&pool, 10, 50).len(), 1);
    }

    #[test]
    fn test_select_ties_keep_pool_order() {
        let a = tx("a", 5, 0);
        let b = tx("b", 9, 0);
        let c = tx("c", 5, 0);
        let d = tx("d", 5, 0);
        let pool = vec![a.clone(), b.clone(), c.clone(), d.clone()];

        assert_eq!(select(&pool, 10, 0), vec![b, a, c, d]);
    }

    #[test]
    fn test_select_zero_limit_and_empty_pool() {
        let pool = vec![tx("a", 1, 0)];
        assert!(select(&pool, 0, 0).is_empty());
        assert!(select(&[], 5, 0).is_empty());
    }

    #[test]
    fn test_mempool_remove_included() {
        let a = tx("a", 3, 0);
        let b = tx("b", 2, 0);
        let c = tx("c", 1, 0);
        let mut mempool = Mempool::from_transactions(vec![a.clone(), b.clone(), c.clone()]);

        let selected = mempool.select(2, 0);
        let hashes: Vec<String> = selected.iter().map(Transaction::hash).collect();
        assert_eq!(mempool.remove_included(&hashes), 2);

        assert_eq!(mempool.transactions(), &[c]);
        assert_eq!(mempool.total_fees(), 1);
    }

    #[test]
    fn test_mempool_remove_keeps_unselected_duplicate() {
        let a = tx("a", 3, 0);
        let mut mempool = Mempool::from_transactions(vec![a.clone(), a.clone()]);

        assert_eq!(mempool.remove_included(&[a.hash()]), 1);
        assert_eq!(mempool.len(), 1);
    }

    #[test]
    fn test_total_fees_saturates() {
        let mempool = Mempool::from_transactions(vec![tx("a", u64::MAX, 0), tx("b", 1, 0)]);
        assert_eq!(mempool.total_fees(), u64::MAX);
    }

    #[test]
    fn test_mempool_add() {
        let mut mempool = Mempool::new();
        assert!(mempool.is_empty());

        mempool.add(tx("a", 1, 0));
        mempool.add(tx("b", 4, 0));
        assert_eq!(mempool.len(), 2);
        assert_eq!(mempool.total_fees(), 5);
    }
}
