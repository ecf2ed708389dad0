//! # Sparse Merkle Trie
//!
//! A compressed binary trie over 32-byte paths. Nodes live in an arena
//! keyed by their hash, so distinct trie versions share every untouched
//! subtree and a tree is identified purely by its root hash. Parent links
//! between versions are kept by value one level up, in the forest.
//!
//! ## Hashing
//!
//! - empty subtree: the all-zero hash, at every depth
//! - leaf: `H(0x00 || path || H(payload))`
//! - branch: `H(0x01 || left || right)`
//!
//! The root of the empty trie is therefore the all-zero commitment.
//! Inserting never deletes: the ledger has no removal path, and stale
//! versions are dropped wholesale when the forest prunes.

use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};
use shared_types::{Commitment, Hash, Path, Payload, TrieUpdate, ZERO_COMMITMENT};

const LEAF_TAG: u8 = 0x00;
const BRANCH_TAG: u8 = 0x01;

/// Total bits in a path; also the maximum trie depth.
const PATH_BITS: usize = 256;

#[derive(Debug, Clone)]
enum Node {
    Leaf { path: Path, payload_hash: Hash },
    Branch { left: Hash, right: Hash },
}

/// Arena of trie nodes shared by all live trie versions.
#[derive(Debug, Default)]
pub struct TrieStore {
    nodes: HashMap<Hash, Node>,
}

impl TrieStore {
    /// An arena holding only the empty trie.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of materialized nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no materialized nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Apply a batch of writes to the tree rooted at `root`, returning the
    /// new root. The old version stays intact.
    pub fn apply(&mut self, root: Commitment, paths: &[Path], payloads: &[Payload]) -> Commitment {
        let mut current = root;
        for (path, payload) in paths.iter().zip(payloads.iter()) {
            current = self.insert(current, 0, path, payload);
        }
        current
    }

    /// Apply a trie update, returning the resulting root.
    pub fn apply_update(&mut self, update: &TrieUpdate) -> Commitment {
        self.apply(update.root, &update.paths, &update.payloads)
    }

    fn insert(&mut self, node: Hash, depth: usize, path: &Path, payload: &Payload) -> Hash {
        if node == ZERO_COMMITMENT {
            return self.put_leaf(path, payload);
        }

        let current = self
            .nodes
            .get(&node)
            .cloned()
            .unwrap_or_else(|| unreachable_node(&node));

        match current {
            Node::Leaf {
                path: leaf_path, ..
            } => {
                if leaf_path == *path {
                    return self.put_leaf(path, payload);
                }
                let new_leaf = self.put_leaf(path, payload);
                self.join_leaves(depth, node, &leaf_path, new_leaf, path)
            }
            Node::Branch { left, right } => {
                let (new_left, new_right) = if bit_at(path, depth) == 0 {
                    (self.insert(left, depth + 1, path, payload), right)
                } else {
                    (left, self.insert(right, depth + 1, path, payload))
                };
                self.put_branch(new_left, new_right)
            }
        }
    }

    /// Build the branch spine joining two distinct leaves whose paths
    /// agree on all bits before `depth`.
    fn join_leaves(
        &mut self,
        depth: usize,
        old_leaf: Hash,
        old_path: &Path,
        new_leaf: Hash,
        new_path: &Path,
    ) -> Hash {
        let mut diverge = depth;
        while diverge < PATH_BITS && bit_at(old_path, diverge) == bit_at(new_path, diverge) {
            diverge += 1;
        }
        debug_assert!(diverge < PATH_BITS, "distinct paths must diverge");

        let mut node = if bit_at(new_path, diverge) == 0 {
            self.put_branch(new_leaf, old_leaf)
        } else {
            self.put_branch(old_leaf, new_leaf)
        };

        for level in (depth..diverge).rev() {
            node = if bit_at(new_path, level) == 0 {
                self.put_branch(node, ZERO_COMMITMENT)
            } else {
                self.put_branch(ZERO_COMMITMENT, node)
            };
        }
        node
    }

    fn put_leaf(&mut self, path: &Path, payload: &Payload) -> Hash {
        let payload_hash = hash_payload(payload);
        let hash = leaf_hash(path, &payload_hash);
        self.nodes.insert(
            hash,
            Node::Leaf {
                path: *path,
                payload_hash,
            },
        );
        hash
    }

    fn put_branch(&mut self, left: Hash, right: Hash) -> Hash {
        let hash = branch_hash(&left, &right);
        self.nodes.insert(hash, Node::Branch { left, right });
        hash
    }

    /// Drop every node not reachable from `root`. Called after pruning so
    /// abandoned branches do not accumulate.
    pub fn retain_reachable(&mut self, root: Commitment) {
        let mut reachable = HashSet::new();
        let mut stack = vec![root];
        while let Some(hash) = stack.pop() {
            if hash == ZERO_COMMITMENT || !reachable.insert(hash) {
                continue;
            }
            if let Some(Node::Branch { left, right }) = self.nodes.get(&hash) {
                stack.push(*left);
                stack.push(*right);
            }
        }
        self.nodes.retain(|hash, _| reachable.contains(hash));
    }

    /// Whether the arena can materialize the tree rooted at `root`.
    pub fn contains(&self, root: &Commitment) -> bool {
        *root == ZERO_COMMITMENT || self.nodes.contains_key(root)
    }
}

fn unreachable_node(hash: &Hash) -> Node {
    // A root handed to `apply` always came out of a previous `apply` or is
    // the zero root, and pruning only drops whole abandoned versions.
    unreachable!("trie arena is missing node {:02x?}", &hash[..4])
}

fn bit_at(path: &Path, index: usize) -> u8 {
    (path[index / 8] >> (7 - (index % 8))) & 1
}

fn hash_payload(payload: &Payload) -> Hash {
    let encoded = bincode::serialize(payload).expect("payload encoding cannot fail");
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    hasher.finalize().into()
}

fn leaf_hash(path: &Path, payload_hash: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_TAG]);
    hasher.update(path);
    hasher.update(payload_hash);
    hasher.finalize().into()
}

fn branch_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([BRANCH_TAG]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}
