//! Storage module for ledger persistence

pub mod persistence;

pub use persistence::{
    load_from_file, read_json, save_to_file, write_json, Storage, StorageConfig, StorageError,
};
