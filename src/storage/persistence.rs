//! Ledger persistence layer
//!
//! Provides save/load functionality for the blockchain and the mempool.
//! Each is a single pretty-printed JSON document. Merkle trees are not
//! stored; they are recomputed from the transactions on load.

use crate::core::{Blockchain, BlockchainError, Transaction};
use crate::mining::Mempool;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<BlockchainError> for StorageError {
    fn from(err: BlockchainError) -> Self {
        StorageError::InvalidData(err.to_string())
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub blockchain_file: String,
    pub mempool_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".ledger_data"),
            blockchain_file: "blockchain.json".to_string(),
            mempool_file: "mempool.json".to_string(),
        }
    }
}

/// Ledger storage manager
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Create a new storage manager
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    /// Create with default configuration
    pub fn with_defaults() -> Result<Self, StorageError> {
        Self::new(StorageConfig::default())
    }

    /// Get the blockchain file path
    pub fn blockchain_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.blockchain_file)
    }

    /// Get the mempool file path
    pub fn mempool_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.mempool_file)
    }

    /// Check if a saved blockchain exists
    pub fn exists(&self) -> bool {
        self.blockchain_path().exists()
    }

    /// Save the blockchain to disk
    pub fn save(&self, blockchain: &Blockchain) -> Result<(), StorageError> {
        save_to_file(blockchain, &self.blockchain_path())?;
        info!(
            "Saved {} blocks to {:?}",
            blockchain.blocks.len(),
            self.blockchain_path()
        );
        Ok(())
    }

    /// Load the blockchain from disk, rebuilding and checking every block
    pub fn load(&self) -> Result<Blockchain, StorageError> {
        let path = self.blockchain_path();

        if !path.exists() {
            return Err(StorageError::InvalidData(
                "Blockchain file not found".to_string(),
            ));
        }

        let blockchain = load_from_file(&path)?;
        debug!("Loaded {} blocks from {:?}", blockchain.blocks.len(), path);
        Ok(blockchain)
    }

    /// Save the pending transactions
    pub fn save_mempool(&self, mempool: &Mempool) -> Result<(), StorageError> {
        write_json(&self.mempool_path(), &mempool.transactions())
    }

    /// Load the pending transactions; a missing file is an empty pool
    pub fn load_mempool(&self) -> Result<Mempool, StorageError> {
        let path = self.mempool_path();
        if !path.exists() {
            return Ok(Mempool::new());
        }

        let transactions: Vec<Transaction> = read_json(&path)?;
        debug!("Loaded {} pending transactions", transactions.len());
        Ok(Mempool::from_transactions(transactions))
    }
}

/// Save blockchain to a specific file path
pub fn save_to_file(blockchain: &Blockchain, path: &Path) -> Result<(), StorageError> {
    write_json(path, blockchain)
}

/// Load blockchain from a specific file path.
///
/// A block whose transactions disagree with its header is invalid data.
pub fn load_from_file(path: &Path) -> Result<Blockchain, StorageError> {
    let loaded: Blockchain = read_json(path).map_err(|e| match e {
        StorageError::SerializationError(e) if e.is_data() => {
            StorageError::InvalidData(e.to_string())
        }
        other => other,
    })?;
    Ok(Blockchain::from_blocks(loaded.blocks, loaded.difficulty)?)
}

/// Write `value` as pretty JSON through a temporary file and an atomic rename
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    let temp_path = path.with_extension("tmp");
    {
        let file = fs::File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Read a JSON document
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mining::{Miner, DEFAULT_MINER};

    fn storage(dir: &Path) -> Storage {
        let config = StorageConfig {
            data_dir: dir.to_path_buf(),
            ..Default::default()
        };
        Storage::new(config).unwrap()
    }

    #[test]
    fn test_save_load_blockchain() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage(temp_dir.path());

        let miner = Miner::new(DEFAULT_MINER);
        let mut blockchain = Blockchain::new(1, 0, &miner).unwrap();
        miner
            .mine_block(&mut blockchain, vec![Transaction::new("a", "b", 1, 1)])
            .unwrap();

        // Save
        storage.save(&blockchain).unwrap();
        assert!(storage.exists());

        // Load
        let loaded = storage.load().unwrap();
        assert_eq!(loaded.blocks.len(), blockchain.blocks.len());
        assert_eq!(loaded.difficulty, blockchain.difficulty);
        assert!(loaded.blocks[1].tree().is_some());
    }

    #[test]
    fn test_load_missing_blockchain() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage(temp_dir.path());

        assert!(!storage.exists());
        assert!(matches!(storage.load(), Err(StorageError::InvalidData(_))));
    }

    #[test]
    fn test_load_rejects_tampered_transactions() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage(temp_dir.path());

        let miner = Miner::new(DEFAULT_MINER);
        let mut blockchain = Blockchain::new(1, 0, &miner).unwrap();
        miner
            .mine_block(&mut blockchain, vec![Transaction::new("a", "b", 1, 1)])
            .unwrap();
        storage.save(&blockchain).unwrap();

        let mut value: serde_json::Value = read_json(&storage.blockchain_path()).unwrap();
        value["blocks"][1]["transactions"][0]["amount"] = serde_json::json!(1_000);
        write_json(&storage.blockchain_path(), &value).unwrap();

        assert!(matches!(storage.load(), Err(StorageError::InvalidData(_))));
    }

    #[test]
    fn test_mempool_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage(temp_dir.path());

        assert!(storage.load_mempool().unwrap().is_empty());

        let mempool = Mempool::from_transactions(vec![
            Transaction::new("a", "b", 1, 5),
            Transaction::new("c", "d", 2, 6),
        ]);
        storage.save_mempool(&mempool).unwrap();

        let loaded = storage.load_mempool().unwrap();
        assert_eq!(loaded.transactions(), mempool.transactions());
    }
}
