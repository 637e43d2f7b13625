//! Transaction records for the ledger
//!
//! Transactions are created upstream (the mempool file) and are immutable
//! once built. No balance or signature validation happens here; the
//! signature is carried as an opaque string.

use crate::crypto::sha256_hex;
use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Delimiter used by canonical serialization
pub const FIELD_DELIMITER: &str = ",";

// =============================================================================
// Transaction
// =============================================================================

/// A ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    /// Sender identifier
    pub sender: String,
    /// Receiver identifier
    pub receiver: String,
    /// Amount in the smallest unit
    pub amount: u64,
    /// Fee paid to the miner
    #[serde(rename = "transaction_fee")]
    pub fee: u64,
    /// Timestamp below which the transaction cannot be included
    pub lock_time: u64,
    /// Opaque signature
    pub signature: String,
}

impl Transaction {
    /// Create a new transaction with no lock time and an empty signature
    pub fn new(sender: &str, receiver: &str, amount: u64, fee: u64) -> Self {
        Self {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount,
            fee,
            lock_time: 0,
            signature: String::new(),
        }
    }

    /// Canonical serialization.
    ///
    /// Field order (amount, lock time, receiver, sender, signature, fee) is
    /// part of the hash contract and must not change.
    pub fn serialize(&self) -> String {
        [
            self.amount.to_string(),
            self.lock_time.to_string(),
            self.receiver.clone(),
            self.sender.clone(),
            self.signature.clone(),
            self.fee.to_string(),
        ]
        .join(FIELD_DELIMITER)
    }

    /// Transaction hash (`0x` + hex SHA-256 of the canonical serialization)
    pub fn hash(&self) -> String {
        sha256_hex(self.serialize().as_bytes())
    }

    /// Check whether the transaction may be included at `current_time`
    pub fn is_spendable(&self, current_time: u64) -> bool {
        self.lock_time <= current_time
    }
}

// =============================================================================
// Transaction Builder
// =============================================================================

/// Builder for transactions with optional fields
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    sender: String,
    receiver: String,
    amount: u64,
    fee: u64,
    lock_time: u64,
    signature: String,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sender
    pub fn sender(mut self, sender: &str) -> Self {
        self.sender = sender.to_string();
        self
    }

    /// Set the receiver
    pub fn receiver(mut self, receiver: &str) -> Self {
        self.receiver = receiver.to_string();
        self
    }

    /// Set the amount
    pub fn amount(mut self, amount: u64) -> Self {
        self.amount = amount;
        self
    }

    /// Set the fee
    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    /// Set the lock time
    pub fn lock_time(mut self, lock_time: u64) -> Self {
        self.lock_time = lock_time;
        self
    }

    /// Set the signature
    pub fn signature(mut self, signature: &str) -> Self {
        self.signature = signature.to_string();
        self
    }

    pub fn build(self) -> Transaction {
        Transaction {
            sender: self.sender,
            receiver: self.receiver,
            amount: self.amount,
            fee: self.fee,
            lock_time: self.lock_time,
            signature: self.signature,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
