//! CLI commands for the ledger
//!
//! Implements all command handlers for the CLI interface.

use crate::core::{Blockchain, Proof, Transaction};
use crate::mining::{Mempool, Miner, MinerConfig};
use crate::storage::{read_json, write_json, Storage, StorageConfig};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub blockchain: Blockchain,
    pub mempool: Mempool,
    pub storage: Storage,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load the chain and mempool from `data_dir`
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let storage = open_storage(&data_dir)?;

        if !storage.exists() {
            return Err(format!(
                "No blockchain found at {:?}; run `ledger init` first",
                data_dir
            )
            .into());
        }

        let blockchain = storage.load()?;
        let mempool = storage.load_mempool()?;

        Ok(Self {
            blockchain,
            mempool,
            storage,
            data_dir,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.blockchain)?;
        self.storage.save_mempool(&self.mempool)?;
        Ok(())
    }
}

fn open_storage(data_dir: &Path) -> CliResult<Storage> {
    let storage_config = StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    Ok(Storage::new(storage_config)?)
}

/// Initialize a new blockchain with a mined genesis block
pub fn cmd_init(data_dir: &Path, difficulty: u32, miner: &str, timestamp: u64) -> CliResult<()> {
    let storage = open_storage(data_dir)?;

    if storage.exists() {
        println!("⚠️  Blockchain already exists at {:?}", data_dir);
        return Ok(());
    }

    let blockchain = Blockchain::new(difficulty, timestamp, &Miner::new(miner))?;
    storage.save(&blockchain)?;
    storage.save_mempool(&Mempool::new())?;

    println!("✅ Blockchain initialized!");
    println!("   📁 Data directory: {:?}", data_dir);
    println!("   🔧 Difficulty: {}", blockchain.difficulty);
    if let Some(genesis) = blockchain.latest_block() {
        println!("   🧱 Genesis block hash: {}", genesis.hash());
    }

    Ok(())
}

/// Mine `count` blocks from the mempool
pub fn cmd_produce_blocks(
    state: &mut AppState,
    count: u32,
    miner: Option<&str>,
    config: MinerConfig,
) -> CliResult<()> {
    let address = match miner {
        Some(address) => address.to_string(),
        None => state
            .blockchain
            .latest_block()
            .map(|b| b.header().miner.clone())
            .unwrap_or_default(),
    };
    let limit = config.block_txs;
    let miner = Miner::with_config(&address, config);

    println!("⛏️  Producing {} block(s) as {}", count, address);
    println!("   Current difficulty: {}", state.blockchain.difficulty);

    for _ in 0..count {
        let transactions = state
            .mempool
            .select(limit, state.blockchain.next_timestamp()?);

        if transactions.is_empty() {
            warn!(
                "No spendable transactions for block {}; stopping",
                state.blockchain.height().saturating_add(1)
            );
            println!("\n📭 Mempool has no spendable transactions");
            break;
        }

        let tx_hashes: Vec<String> = transactions.iter().map(Transaction::hash).collect();
        let (block, stats) = miner.mine_block(&mut state.blockchain, transactions)?;
        state.mempool.remove_included(&tx_hashes);

        println!("\n   Block {} mined!", block.height());
        println!("   ├─ Hash: {}", block.hash());
        println!("   ├─ Merkle root: {}", block.merkle_root());
        println!("   ├─ Transactions: {}", block.tx_count());
        println!("   ├─ Fees: {}", block.total_fees());
        println!("   ├─ Time: {}ms", stats.time_ms);
        println!("   ├─ Attempts: {}", stats.hash_attempts);
        println!("   └─ Hash rate: {:.2} H/s", stats.hash_rate);

        // Save after each block
        state.save()?;
    }

    println!("\n📬 Pending transactions left: {}", state.mempool.len());

    Ok(())
}

/// Append a transaction to the mempool
pub fn cmd_add_tx(state: &mut AppState, tx: Transaction) -> CliResult<()> {
    let hash = tx.hash();
    state.mempool.add(tx);
    state.storage.save_mempool(&state.mempool)?;

    info!("Queued transaction {}", hash);
    println!("📤 Transaction added to mempool");
    println!("   Hash: {}", hash);
    println!("   Pending: {}", state.mempool.len());

    Ok(())
}

/// Print the most recent block hash
pub fn cmd_latest_hash(state: &AppState) -> CliResult<()> {
    let block = state
        .blockchain
        .latest_block()
        .ok_or("Blockchain has no blocks")?;
    println!("{}", block.hash());
    Ok(())
}

/// Print the hash of transaction `index` in block `height`
pub fn cmd_get_tx_hash(state: &AppState, height: u64, index: usize) -> CliResult<()> {
    let block = state.blockchain.get_block(height)?;
    let hash = block.transaction_hash(index).ok_or_else(|| {
        format!(
            "Block {} has {} transactions, no index {}",
            height,
            block.tx_count(),
            index
        )
    })?;
    println!("{}", hash);
    Ok(())
}

/// Write an inclusion proof for `tx_hash` in block `height` to `output`
pub fn cmd_generate_proof(
    state: &AppState,
    height: u64,
    tx_hash: &str,
    output: &Path,
) -> CliResult<()> {
    let block = state.blockchain.get_block(height)?;
    let proof = Proof::generate(block, tx_hash)?;
    write_json(output, &proof)?;

    println!("🧾 Proof written to {:?}", output);
    println!("   Merkle root: {}", proof.merkle_root);
    println!("   Siblings: {}", proof.proof_hashes.len());

    Ok(())
}

/// Verify a proof file and print `true` or `false`
pub fn cmd_verify_proof(path: &Path) -> CliResult<bool> {
    let proof: Proof = read_json(path)?;

    let valid = match proof.check() {
        Ok(()) => true,
        Err(e) => {
            info!("Proof rejected: {}", e);
            false
        }
    };
    println!("{}", valid);
    Ok(valid)
}
