//! Merkle-ledger CLI Application
//!
//! A command-line interface for mining blocks and checking inclusion proofs.

use clap::{Parser, Subcommand};
use merkle_ledger::cli::{self, AppState};
use merkle_ledger::core::{TransactionBuilder, DEFAULT_DIFFICULTY};
use merkle_ledger::mining::{MinerConfig, DEFAULT_BLOCK_TXS, DEFAULT_MINER};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ledger")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "A proof-of-work ledger with Merkle inclusion proofs", long_about = None)]
struct Cli {
    /// Data directory for ledger storage
    #[arg(short, long, default_value = ".ledger_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new blockchain with a genesis block
    Init {
        /// Mining difficulty (number of leading zero hex digits)
        #[arg(short, long, default_value_t = DEFAULT_DIFFICULTY)]
        difficulty: u32,

        /// Miner identifier written into block headers
        #[arg(short, long, default_value = DEFAULT_MINER)]
        miner: String,

        /// Genesis timestamp (defaults to now)
        #[arg(short, long)]
        timestamp: Option<u64>,
    },

    /// Mine blocks from the mempool
    ProduceBlocks {
        /// Number of blocks to produce
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,

        /// Maximum transactions per block
        #[arg(short, long, default_value_t = DEFAULT_BLOCK_TXS)]
        limit: usize,

        /// Worker threads for the nonce search
        #[arg(short, long, default_value = "1")]
        threads: usize,

        /// Give up after this many nonces per block
        #[arg(long)]
        max_attempts: Option<u64>,

        /// Miner identifier (defaults to the latest block's miner)
        #[arg(short, long)]
        miner: Option<String>,
    },

    /// Add a transaction to the mempool
    AddTx {
        #[arg(short, long)]
        sender: String,

        #[arg(short, long)]
        receiver: String,

        #[arg(short, long)]
        amount: u64,

        #[arg(short, long)]
        fee: u64,

        /// Earliest block timestamp that may include the transaction
        #[arg(short, long, default_value = "0")]
        lock_time: u64,

        #[arg(long, default_value = "")]
        signature: String,
    },

    /// Print the most recent block hash
    LatestHash,

    /// Print the hash of a transaction in a block
    GetTxHash {
        /// Block height
        #[arg(short, long)]
        block: u64,

        /// Transaction index within the block
        #[arg(short, long)]
        tx: usize,
    },

    /// Write an inclusion proof for a transaction
    GenerateProof {
        /// Block height
        #[arg(short, long)]
        block: u64,

        /// Transaction hash to prove
        #[arg(short = 'x', long)]
        tx_hash: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Verify an inclusion proof file
    VerifyProof {
        /// Proof file
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            difficulty,
            miner,
            timestamp,
        } => {
            let timestamp = timestamp
                .unwrap_or_else(|| u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0));
            cli::cmd_init(&cli.data_dir, difficulty, &miner, timestamp)?;
        }

        Commands::ProduceBlocks {
            count,
            limit,
            threads,
            max_attempts,
            miner,
        } => {
            let mut state = AppState::new(cli.data_dir)?;
            let config = MinerConfig {
                threads,
                max_attempts,
                block_txs: limit,
            };
            cli::cmd_produce_blocks(&mut state, count, miner.as_deref(), config)?;
        }

        Commands::AddTx {
            sender,
            receiver,
            amount,
            fee,
            lock_time,
            signature,
        } => {
            let mut state = AppState::new(cli.data_dir)?;
            let tx = TransactionBuilder::new()
                .sender(&sender)
                .receiver(&receiver)
                .amount(amount)
                .fee(fee)
                .lock_time(lock_time)
                .signature(&signature)
                .build();
            cli::cmd_add_tx(&mut state, tx)?;
        }

        Commands::LatestHash => {
            let state = AppState::new(cli.data_dir)?;
            cli::cmd_latest_hash(&state)?;
        }

        Commands::GetTxHash { block, tx } => {
            let state = AppState::new(cli.data_dir)?;
            cli::cmd_get_tx_hash(&state, block, tx)?;
        }

        Commands::GenerateProof {
            block,
            tx_hash,
            output,
        } => {
            let state = AppState::new(cli.data_dir)?;
            cli::cmd_generate_proof(&state, block, &tx_hash, &output)?;
        }

        Commands::VerifyProof { file } => {
            cli::cmd_verify_proof(&file)?;
        }
    }

    Ok(())
}
