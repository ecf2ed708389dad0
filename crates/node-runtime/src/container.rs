//! # Container
//!
//! Assembles the subsystems into a running indexer: store, codec, storage
//! library, index writer (with metrics), index reader, feeder, chain, and
//! the mapper task. Shutdown is cooperative: Ctrl-C flips the cancellation
//! signal and the mapper finishes its in-flight height before exiting.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::watch;
use tracing::{error, info};

use mi_01_codec::{Codec, Dictionaries, ResourceKind};
use mi_02_storage::{Library, Store, StoreConfig};
use mi_03_index::{MetricsWriter, Reader, Writer, WriterConfig};
use mi_04_feeder::WalFeeder;
use mi_05_mapper::{Mapper, MapperConfig};

use crate::chain::RecordLogChain;
use crate::config::{NodeConfig, SourceConfig};

/// Build and run the indexing service until its inputs are exhausted or
/// the process is interrupted.
pub async fn run_node(config: NodeConfig) -> Result<()> {
    // Storage stack.
    let mut store_config = StoreConfig::new(&config.index_path);
    store_config.sync_writes = config.sync_writes;
    let store = Arc::new(Store::open(store_config).context("opening index store")?);

    let codec = Codec::with_dictionaries(load_dictionaries(&config)?);
    let lib = Library::new(codec);

    let writer_config = WriterConfig {
        flush_interval: config.batch_flush_interval,
        ..WriterConfig::default()
    };
    let writer = MetricsWriter::new(Writer::new(
        Arc::clone(&store),
        lib.clone(),
        writer_config,
    ));
    let reader = Reader::new(Arc::clone(&store), lib.clone());

    // Input streams.
    let feeder = match &config.source {
        SourceConfig::WalDir(dir) => WalFeeder::open(dir).context("opening WAL directory")?,
        SourceConfig::Live => {
            bail!("live subscription mode is wired through the library API, not the binary")
        }
    };
    let chain = RecordLogChain::open(&config.chain_records, config.first_height)
        .context("opening chain record log")?;

    // The mapper.
    let mapper_config = MapperConfig {
        checkpoint: config.checkpoint.clone(),
        forest_branch_limit: config.forest_branch_limit,
        forest_tree_limit: config.forest_tree_limit,
        pending_update_limit: config.pending_update_limit,
        ready_distance: config.ready_distance,
        ..MapperConfig::default()
    };
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let mapper = Mapper::new(chain, feeder, reader, writer, mapper_config, cancel_rx);

    let mut ready = mapper.ready();
    tokio::spawn(async move {
        while ready.changed().await.is_ok() {
            if *ready.borrow() {
                info!("indexer is caught up and ready");
            }
        }
    });

    let mut mapper_task = tokio::spawn(mapper.run());

    let outcome = tokio::select! {
        outcome = &mut mapper_task => outcome,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
            let _ = cancel_tx.send(true);
            // The mapper finishes its in-flight height, then exits.
            mapper_task.await
        }
    };

    match outcome.context("mapper task panicked")? {
        Ok(()) => {
            info!("indexing finished");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "indexing failed");
            Err(err.into())
        }
    }
}

fn load_dictionaries(config: &NodeConfig) -> Result<Dictionaries> {
    let mut dictionaries = Dictionaries::none();
    let sets = [
        (ResourceKind::Payload, &config.dictionaries.payloads),
        (ResourceKind::Event, &config.dictionaries.events),
        (ResourceKind::Transaction, &config.dictionaries.transactions),
    ];
    for (kind, path) in sets {
        if let Some(path) = path {
            dictionaries
                .register_file(kind, path)
                .with_context(|| format!("loading dictionary {}", path.display()))?;
        }
    }
    Ok(dictionaries)
}
