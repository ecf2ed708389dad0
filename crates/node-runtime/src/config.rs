//! # Node Configuration
//!
//! Unified configuration for the indexing service. Every option can be set
//! through an `MI_*` environment variable; unset options use defaults.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MI_INDEX_PATH` | `./data/index` | Index database directory |
//! | `MI_CHAIN_RECORDS` | `./data/chain.log` | Chain record log (batch mode) |
//! | `MI_WAL_DIR` | `./data/wal` | Ledger write-ahead log directory |
//! | `MI_SOURCE` | `wal` | Update source: `wal` or `live` |
//! | `MI_CHECKPOINT` | unset | Optional root trie checkpoint file |
//! | `MI_FIRST_HEIGHT` | from chain | Overrides the bootstrap root height |
//! | `MI_BATCH_FLUSH_MS` | `1000` | Payload batch idle flush interval |
//! | `MI_FOREST_BRANCH_LIMIT` | `64` | Max updates per speculative branch |
//! | `MI_FOREST_TREE_LIMIT` | `256` | Max trees in the forest |
//! | `MI_PENDING_LIMIT` | `1024` | Max buffered out-of-forest updates |
//! | `MI_SYNC_WRITES` | `true` | fsync per commit (durability over speed) |
//! | `MI_READY_DISTANCE` | `16` | Head distance that counts as caught up |
//! | `MI_DICT_PAYLOADS` | unset | Payload compression dictionary file |
//! | `MI_DICT_EVENTS` | unset | Event compression dictionary file |
//! | `MI_DICT_TRANSACTIONS` | unset | Transaction compression dictionary file |

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use shared_types::Height;

/// Where trie updates come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// A directory of write-ahead log segments.
    WalDir(PathBuf),
    /// A live record subscription, wired in through the library API.
    Live,
}

/// Compression dictionary file paths by resource kind.
#[derive(Debug, Clone, Default)]
pub struct DictionaryConfig {
    /// Payload dictionary file.
    pub payloads: Option<PathBuf>,
    /// Event dictionary file.
    pub events: Option<PathBuf>,
    /// Transaction dictionary file.
    pub transactions: Option<PathBuf>,
}

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Index database directory.
    pub index_path: PathBuf,
    /// Chain record log for batch mode.
    pub chain_records: PathBuf,
    /// Trie update source.
    pub source: SourceConfig,
    /// Optional root trie checkpoint.
    pub checkpoint: Option<PathBuf>,
    /// Overrides the chain's root height at bootstrap.
    pub first_height: Option<Height>,
    /// Payload batch idle flush interval.
    pub batch_flush_interval: Duration,
    /// Maximum updates per speculative branch.
    pub forest_branch_limit: u64,
    /// Maximum trees in the forest.
    pub forest_tree_limit: usize,
    /// Maximum buffered updates whose root is not in the forest.
    pub pending_update_limit: usize,
    /// fsync on every commit.
    pub sync_writes: bool,
    /// Head distance that counts as caught up.
    pub ready_distance: u64,
    /// Compression dictionaries.
    pub dictionaries: DictionaryConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("./data/index"),
            chain_records: PathBuf::from("./data/chain.log"),
            source: SourceConfig::WalDir(PathBuf::from("./data/wal")),
            checkpoint: None,
            first_height: None,
            batch_flush_interval: Duration::from_millis(1000),
            forest_branch_limit: 64,
            forest_tree_limit: 256,
            pending_update_limit: 1024,
            sync_writes: true,
            ready_distance: 16,
            dictionaries: DictionaryConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Read configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = var("MI_INDEX_PATH") {
            config.index_path = PathBuf::from(path);
        }
        if let Some(path) = var("MI_CHAIN_RECORDS") {
            config.chain_records = PathBuf::from(path);
        }
        match var("MI_SOURCE").as_deref() {
            None | Some("wal") => {
                if let Some(dir) = var("MI_WAL_DIR") {
                    config.source = SourceConfig::WalDir(PathBuf::from(dir));
                }
            }
            Some("live") => config.source = SourceConfig::Live,
            Some(other) => bail!("MI_SOURCE must be `wal` or `live`, got `{other}`"),
        }
        config.checkpoint = var("MI_CHECKPOINT").map(PathBuf::from);
        config.first_height = parse("MI_FIRST_HEIGHT")?;
        if let Some(millis) = parse::<u64>("MI_BATCH_FLUSH_MS")? {
            config.batch_flush_interval = Duration::from_millis(millis);
        }
        if let Some(limit) = parse("MI_FOREST_BRANCH_LIMIT")? {
            config.forest_branch_limit = limit;
        }
        if let Some(limit) = parse("MI_FOREST_TREE_LIMIT")? {
            config.forest_tree_limit = limit;
        }
        if let Some(limit) = parse("MI_PENDING_LIMIT")? {
            config.pending_update_limit = limit;
        }
        if let Some(sync) = parse("MI_SYNC_WRITES")? {
            config.sync_writes = sync;
        }
        if let Some(distance) = parse("MI_READY_DISTANCE")? {
            config.ready_distance = distance;
        }
        config.dictionaries = DictionaryConfig {
            payloads: var("MI_DICT_PAYLOADS").map(PathBuf::from),
            events: var("MI_DICT_EVENTS").map(PathBuf::from),
            transactions: var("MI_DICT_TRANSACTIONS").map(PathBuf::from),
        };

        Ok(config)
    }

    /// Reject configurations that cannot work before any subsystem starts.
    pub fn validate(&self) -> Result<()> {
        if self.forest_tree_limit < 2 {
            bail!("forest tree limit must allow at least the finalized tree and one branch");
        }
        if self.forest_branch_limit == 0 {
            bail!("forest branch limit must be at least 1");
        }
        if let SourceConfig::WalDir(dir) = &self.source {
            if !dir.is_dir() {
                bail!("WAL directory {} does not exist", dir.display());
            }
        }
        if let Some(checkpoint) = &self.checkpoint {
            if !checkpoint.is_file() {
                bail!("checkpoint file {} does not exist", checkpoint.display());
            }
        }
        Ok(())
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(name)
        .map(|value| {
            value
                .parse()
                .with_context(|| format!("invalid value for {name}"))
        })
        .transpose()
}
