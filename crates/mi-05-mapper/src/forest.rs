//! # Trie Forest
//!
//! The set of trie versions reachable from the last finalized root. Trees
//! are keyed by their root commitment and carry their parent's commitment
//! by value, never by reference; the node arena underneath deduplicates
//! shared subtrees.
//!
//! Each tree also remembers the paths and payloads of the update that
//! produced it, so committing a height can hand the full delta chain from
//! the finalized root to the index writer without reapplying anything.

use std::collections::HashMap;

use shared_types::{Commitment, Path, Payload, TrieUpdate};
use tracing::debug;

use crate::errors::MapperError;
use crate::trie::TrieStore;

#[derive(Debug)]
struct Tree {
    parent: Option<Commitment>,
    paths: Vec<Path>,
    payloads: Vec<Payload>,
    /// Number of updates between the finalized root and this tree.
    distance: u64,
}

/// The forest of speculative trie versions.
#[derive(Debug)]
pub struct Forest {
    store: TrieStore,
    trees: HashMap<Commitment, Tree>,
    finalized: Commitment,
    branch_limit: u64,
    tree_limit: usize,
}

impl Forest {
    /// Forest seeded with one finalized tree. The arena must already
    /// contain that tree's nodes.
    pub fn new(
        store: TrieStore,
        finalized: Commitment,
        branch_limit: u64,
        tree_limit: usize,
    ) -> Self {
        let mut trees = HashMap::new();
        trees.insert(
            finalized,
            Tree {
                parent: None,
                paths: Vec::new(),
                payloads: Vec::new(),
                distance: 0,
            },
        );
        Self {
            store,
            trees,
            finalized,
            branch_limit,
            tree_limit,
        }
    }

    /// Root commitment of the finalized tree.
    pub fn finalized(&self) -> Commitment {
        self.finalized
    }

    /// Whether a tree with the given root exists in the forest.
    pub fn has(&self, commitment: &Commitment) -> bool {
        self.trees.contains_key(commitment)
    }

    /// Number of trees, the finalized one included.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Whether only the finalized tree remains.
    pub fn is_empty(&self) -> bool {
        self.trees.len() == 1
    }

    /// Apply an update whose prior root is a tree in the forest, inserting
    /// the resulting tree. Returns the new tree's root commitment.
    ///
    /// When the resulting commitment already names a tree, the shorter
    /// delta chain wins; on a tie the incumbent stays.
    pub fn extend(&mut self, update: &TrieUpdate) -> Result<Commitment, MapperError> {
        let parent = update.root;
        let distance = match self.trees.get(&parent) {
            Some(tree) => tree.distance + 1,
            None => unreachable!("extend called without a matching tree"),
        };

        if distance > self.branch_limit {
            return Err(MapperError::BranchOverflow {
                depth: distance,
                limit: self.branch_limit,
            });
        }
        if self.trees.len() >= self.tree_limit {
            return Err(MapperError::ForestOverflow {
                trees: self.trees.len(),
                limit: self.tree_limit,
            });
        }

        let root = self.store.apply_update(update);

        match self.trees.get(&root) {
            Some(existing) if existing.distance <= distance => {
                // Identical resulting root over a chain at least as short:
                // the earlier arrival keeps its place.
                debug!(distance, "dropping duplicate tree with longer chain");
            }
            _ => {
                self.trees.insert(
                    root,
                    Tree {
                        parent: Some(parent),
                        paths: update.paths.clone(),
                        payloads: update.payloads.clone(),
                        distance,
                    },
                );
            }
        }
        Ok(root)
    }

    /// Collect the concatenated deltas from the finalized root to `target`,
    /// in application order.
    pub fn delta_chain(&self, target: &Commitment) -> Option<(Vec<Path>, Vec<Payload>)> {
        let mut chain = Vec::new();
        let mut cursor = *target;

        loop {
            let tree = self.trees.get(&cursor)?;
            match tree.parent {
                Some(parent) => {
                    chain.push(cursor);
                    cursor = parent;
                }
                None => break,
            }
        }

        let mut paths = Vec::new();
        let mut payloads = Vec::new();
        for commitment in chain.into_iter().rev() {
            let tree = &self.trees[&commitment];
            paths.extend_from_slice(&tree.paths);
            payloads.extend_from_slice(&tree.payloads);
        }
        Some((paths, payloads))
    }

    /// Reset the forest to contain only the tree rooted at `keep`, which
    /// becomes the new finalized root. Sibling branches and their nodes
    /// are discarded.
    pub fn prune(&mut self, keep: Commitment) {
        debug_assert!(self.trees.contains_key(&keep), "pruning to unknown tree");

        self.trees.clear();
        self.trees.insert(
            keep,
            Tree {
                parent: None,
                paths: Vec::new(),
                payloads: Vec::new(),
                distance: 0,
            },
        );
        self.finalized = keep;
        self.store.retain_reachable(keep);
    }
}
