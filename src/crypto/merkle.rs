//! Merkle tree implementation for transaction commitment
//!
//! The tree is stored level by level (leaves first). Every level except the
//! root is padded with [`NULL_HASH`] to an even length, so the sibling of the
//! node at `(level, position)` is always at `(level, position ^ 1)`. Sibling
//! lookups go through positions rather than hash values, which keeps
//! duplicate transactions and recurring hashes apart.

use super::hash::{combine, NULL_HASH};
use crate::core::Transaction;
use thiserror::Error;

/// Merkle commitment errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("Cannot commit an empty transaction list")]
    EmptyTransactions,
}

/// Commits an ordered transaction list into a Merkle tree.
///
/// Leaves are the transaction hashes in input order; they are not re-sorted.
pub fn commit(transactions: &[Transaction]) -> Result<MerkleTree, MerkleError> {
    MerkleTree::from_leaves(transactions.iter().map(Transaction::hash).collect())
}

/// An array-backed Merkle tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    /// All nodes in the tree, level by level (leaves first, root last)
    levels: Vec<Vec<String>>,
    /// Number of real leaves, before padding
    leaf_count: usize,
}

impl MerkleTree {
    /// Build a tree from leaf hashes
    pub fn from_leaves(leaves: Vec<String>) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyTransactions);
        }

        let leaf_count = leaves.len();
        let mut levels = Vec::new();
        let mut current = leaves;

        while current.len() > 1 {
            if current.len() % 2 == 1 {
                current.push(NULL_HASH.to_string());
            }

            let next: Vec<String> = current
                .chunks(2)
                .map(|pair| combine(&pair[0], &pair[1]))
                .collect();

            levels.push(current);
            current = next;
        }
        levels.push(current);

        Ok(Self { levels, leaf_count })
    }

    /// The Merkle root
    pub fn root(&self) -> &str {
        // Construction always leaves exactly one hash on the last level
        &self.levels[self.levels.len() - 1][0]
    }

    /// Number of real leaves (padding excluded)
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Leaf hashes in commitment order (padding excluded)
    pub fn leaves(&self) -> &[String] {
        &self.levels[0][..self.leaf_count]
    }

    /// Number of pairing levels between the leaves and the root
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Hash at `(level, position)`
    pub fn node(&self, level: usize, position: usize) -> Option<&str> {
        self.levels
            .get(level)
            .and_then(|nodes| nodes.get(position))
            .map(String::as_str)
    }

    /// Hash paired with the node at `(level, position)`.
    ///
    /// Returns `None` for the root and for out-of-range positions.
    pub fn sibling(&self, level: usize, position: usize) -> Option<&str> {
        if level >= self.depth() {
            return None;
        }
        self.node(level, position)?;
        self.node(level, position ^ 1)
    }

    /// Find the lowest `(level, position)` holding `hash`.
    ///
    /// Padding is never reported as a node.
    pub fn locate(&self, hash: &str) -> Option<(usize, usize)> {
        if hash == NULL_HASH {
            return None;
        }

        self.levels.iter().enumerate().find_map(|(level, nodes)| {
            nodes
                .iter()
                .position(|node| node == hash)
                .map(|position| (level, position))
        })
    }

    /// Siblings from `(level, position)` up to the root, leaf-adjacent first
    pub fn path(&self, level: usize, position: usize) -> Option<Vec<String>> {
        self.node(level, position)?;

        let mut siblings = Vec::with_capacity(self.depth().saturating_sub(level));
        let mut index = position;

        for lvl in level..self.depth() {
            siblings.push(self.sibling(lvl, index)?.to_string());
            index /= 2;
        }

        Some(siblings)
    }
}
