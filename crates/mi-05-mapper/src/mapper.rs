//! # Indexing State Machine
//!
//! Drives indexing from bootstrap to shutdown:
//!
//! ```text
//! Bootstrap  →  AwaitBlock  →  PairUpdate  →  ExtendForest
//!     ↑                                            │
//!     └──────── CommitHeight  ←───────────────────┘
//!                     │
//!                     ↓
//!                   Pruned
//! ```
//!
//! The mapper owns the forest and the write path; the chain and the feeder
//! pace themselves. Updates whose prior root matches no tree yet are
//! buffered and replayed the moment their root materializes; a bounded
//! buffer turns a diverging stream pair into a fatal inconsistency instead
//! of unbounded memory growth.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use meridian_telemetry::metrics;
use mi_03_index::{IndexError, IndexReader, IndexWriter};
use mi_04_feeder::{FeedError, UpdateFeeder};
use shared_types::{Commitment, Height, TrieUpdate, ZERO_COMMITMENT};

use crate::chain::{BlockRecord, Chain, ChainError};
use crate::errors::MapperError;
use crate::forest::Forest;
use crate::loader::load_checkpoint;
use crate::trie::TrieStore;

/// Mapper configuration.
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Optional root checkpoint seeding the trie at bootstrap.
    pub checkpoint: Option<PathBuf>,
    /// Maximum updates between the finalized root and any tree.
    pub forest_branch_limit: u64,
    /// Maximum trees held in the forest.
    pub forest_tree_limit: usize,
    /// Maximum updates buffered for roots not yet in the forest.
    pub pending_update_limit: usize,
    /// Poll interval while the chain has no record for the next height.
    pub block_poll_interval: Duration,
    /// The mapper reports ready once `head - last` drops to this distance.
    pub ready_distance: u64,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            checkpoint: None,
            forest_branch_limit: 64,
            forest_tree_limit: 256,
            pending_update_limit: 1024,
            block_poll_interval: Duration::from_millis(500),
            ready_distance: 16,
        }
    }
}

struct State {
    forest: Forest,
    pending: HashMap<Commitment, Vec<TrieUpdate>>,
    pending_count: usize,
    next_height: Height,
}

/// The indexing state machine.
pub struct Mapper<C, F, R, W> {
    chain: C,
    feeder: F,
    reader: R,
    writer: W,
    config: MapperConfig,
    cancel: watch::Receiver<bool>,
    ready: watch::Sender<bool>,
}

impl<C, F, R, W> Mapper<C, F, R, W>
where
    C: Chain,
    F: UpdateFeeder,
    R: IndexReader,
    W: IndexWriter,
{
    /// Assemble a mapper. `cancel` flipping to `true` requests cooperative
    /// shutdown.
    pub fn new(
        chain: C,
        feeder: F,
        reader: R,
        writer: W,
        config: MapperConfig,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            chain,
            feeder,
            reader,
            writer,
            config,
            cancel,
            ready,
        }
    }

    /// Subscribe to the readiness signal: `true` once the mapper has
    /// caught up to within the configured distance of the chain head.
    pub fn ready(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    /// Run until the inputs are exhausted or shutdown is requested. Clean
    /// ends (batch streams finishing, cooperative cancellation) return
    /// `Ok`; everything else is a real failure.
    pub async fn run(mut self) -> Result<(), MapperError> {
        match self.run_inner().await {
            Err(MapperError::Cancelled) => {
                info!("mapper cancelled, shutting down");
                Ok(())
            }
            Err(MapperError::Feed(FeedError::Finished)) => {
                info!("update stream exhausted, shutting down");
                Ok(())
            }
            Err(MapperError::Chain(ChainError::Finished)) => {
                info!("chain source exhausted, shutting down");
                Ok(())
            }
            other => other,
        }
    }

    async fn run_inner(&mut self) -> Result<(), MapperError> {
        let mut state = self.bootstrap().await?;

        loop {
            if *self.cancel.borrow() {
                return Err(MapperError::Cancelled);
            }

            let block = self.await_block(state.next_height).await?;
            debug_assert_eq!(block.height, state.next_height);

            while !state.forest.has(&block.commit) {
                let update = self.next_update().await?;
                self.extend_forest(&mut state, update)?;
            }

            self.commit_height(&mut state, &block)?;
            self.prune(&mut state, block.commit);
            state.next_height = block.height + 1;

            self.update_readiness(block.height).await;
        }
    }

    // =========================================================================
    // BOOTSTRAP
    // =========================================================================

    async fn bootstrap(&mut self) -> Result<State, MapperError> {
        let (store, seed_root) = match &self.config.checkpoint {
            Some(path) => load_checkpoint(path)?,
            None => (TrieStore::new(), ZERO_COMMITMENT),
        };

        let forest = Forest::new(
            store,
            seed_root,
            self.config.forest_branch_limit,
            self.config.forest_tree_limit,
        );
        let mut state = State {
            forest,
            pending: HashMap::new(),
            pending_count: 0,
            next_height: 0,
        };

        match self.reader.last() {
            Ok(last) => {
                let target = self.reader.commit(last)?;
                info!(last, "resuming previously indexed range");
                self.fast_forward(&mut state, target).await?;
                state.next_height = last + 1;
            }
            Err(IndexError::NotFound) => {
                let root_height = self.chain.root().await?;
                info!(root_height, "bootstrapping fresh index");

                self.writer.first(root_height)?;
                self.writer.commit(root_height, seed_root)?;
                self.writer.last(root_height)?;
                state.next_height = root_height + 1;
            }
            Err(err) => return Err(err.into()),
        }

        Ok(state)
    }

    /// Replay updates through the forest, without indexing anything, until
    /// the persisted commitment of the resume height is reached.
    async fn fast_forward(
        &mut self,
        state: &mut State,
        target: Commitment,
    ) -> Result<(), MapperError> {
        while !state.forest.has(&target) {
            let update = match self.next_update().await {
                Ok(update) => update,
                Err(MapperError::Feed(FeedError::Finished)) => {
                    return Err(MapperError::UnreachableCommit { commit: target })
                }
                Err(err) => return Err(err),
            };
            self.extend_forest(state, update)?;
        }
        state.forest.prune(target);
        state.pending.clear();
        state.pending_count = 0;
        Ok(())
    }

    // =========================================================================
    // AWAIT BLOCK
    // =========================================================================

    async fn await_block(&mut self, height: Height) -> Result<BlockRecord, MapperError> {
        loop {
            if *self.cancel.borrow() {
                return Err(MapperError::Cancelled);
            }

            match self.chain.record(height).await {
                Ok(record) => return Ok(record),
                Err(ChainError::Unavailable) => {
                    tokio::select! {
                        _ = wait_cancelled(self.cancel.clone()) => return Err(MapperError::Cancelled),
                        _ = tokio::time::sleep(self.config.block_poll_interval) => {}
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    // =========================================================================
    // PAIR UPDATE / EXTEND FOREST
    // =========================================================================

    async fn next_update(&mut self) -> Result<TrieUpdate, MapperError> {
        tokio::select! {
            biased;
            _ = wait_cancelled(self.cancel.clone()) => Err(MapperError::Cancelled),
            update = self.feeder.next() => match update {
                Ok(update) => Ok(update),
                Err(FeedError::Cancelled) => Err(MapperError::Cancelled),
                Err(err) => Err(err.into()),
            },
        }
    }

    fn extend_forest(&mut self, state: &mut State, update: TrieUpdate) -> Result<(), MapperError> {
        if !state.forest.has(&update.root) {
            // The update belongs to a branch the mapper has not built yet;
            // park it for replay, within bounds.
            if state.pending_count >= self.config.pending_update_limit {
                return Err(MapperError::PendingOverflow {
                    buffered: state.pending_count,
                    limit: self.config.pending_update_limit,
                });
            }
            debug!(root = %hex_prefix(&update.root), "buffering update for unknown root");
            state.pending.entry(update.root).or_default().push(update);
            state.pending_count += 1;
            return Ok(());
        }

        let root = state.forest.extend(&update)?;

        // A new tree may unlock buffered updates, which may unlock more.
        let mut unlocked = vec![root];
        while let Some(root) = unlocked.pop() {
            if let Some(parked) = state.pending.remove(&root) {
                state.pending_count -= parked.len();
                for update in parked {
                    unlocked.push(state.forest.extend(&update)?);
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // COMMIT HEIGHT
    // =========================================================================

    fn commit_height(&mut self, state: &mut State, block: &BlockRecord) -> Result<(), MapperError> {
        let started = Instant::now();

        let (paths, payloads) = state
            .forest
            .delta_chain(&block.commit)
            .ok_or(MapperError::UnreachableCommit {
                commit: block.commit,
            })?;

        self.writer.header(block.height, &block.header)?;
        self.writer.commit(block.height, block.commit)?;
        self.writer.height_for_block(block.header.id(), block.height)?;

        self.writer.payloads(block.height, &paths, &payloads)?;

        self.writer.events(block.height, &block.events)?;
        self.writer.seals(block.height, &block.seals)?;
        self.writer.collections(block.height, &block.collections)?;
        self.writer.guarantees(&block.guarantees)?;
        self.writer.transactions(block.height, &block.transactions)?;
        self.writer.results(&block.results)?;

        self.writer.last(block.height)?;

        metrics::COMMIT_DURATION.observe(started.elapsed().as_secs_f64());
        info!(
            height = block.height,
            commit = %hex_prefix(&block.commit),
            registers = paths.len(),
            transactions = block.transactions.len(),
            events = block.events.len(),
            "committed height"
        );
        Ok(())
    }

    // =========================================================================
    // PRUNE
    // =========================================================================

    fn prune(&mut self, state: &mut State, keep: Commitment) {
        state.forest.prune(keep);
        // Updates still parked at this point extended branches that just
        // lost; the in-order stream cannot have delivered a descendant of
        // the surviving tree before the update that creates it.
        if state.pending_count > 0 {
            debug!(
                discarded = state.pending_count,
                "discarding buffered updates of abandoned branches"
            );
        }
        state.pending.clear();
        state.pending_count = 0;
    }

    async fn update_readiness(&mut self, indexed: Height) {
        let caught_up = match self.chain.head().await {
            Ok(head) => head.saturating_sub(indexed) <= self.config.ready_distance,
            Err(ChainError::Finished) => true,
            Err(_) => return,
        };
        if caught_up && !*self.ready.borrow() {
            info!(height = indexed, "mapper caught up with chain head");
        }
        let _ = self.ready.send(caught_up);
    }
}

/// Resolve only when cancellation is actually requested. A dropped sender
/// means cancellation can never arrive, not that it has.
async fn wait_cancelled(mut cancel: watch::Receiver<bool>) {
    loop {
        if *cancel.borrow() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn hex_prefix(commit: &Commitment) -> String {
    hex::encode(&commit[..4])
}
