//! # Metrics Decorator
//!
//! Wraps any `IndexWriter` and counts what flows through it. Contracts are
//! untouched: every call delegates first and only bumps counters on
//! success.

use meridian_telemetry::metrics;
use shared_types::{
    BlockHeader, Collection, Commitment, Event, Guarantee, Height, Identifier, Path, Payload, Seal,
    Transaction, TransactionResult,
};

use crate::errors::IndexError;
use crate::traits::IndexWriter;

/// Counting decorator around an index writer.
pub struct MetricsWriter<W: IndexWriter> {
    inner: W,
}

impl<W: IndexWriter> MetricsWriter<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Access the inner writer.
    pub fn inner(&self) -> &W {
        &self.inner
    }
}

impl<W: IndexWriter> IndexWriter for MetricsWriter<W> {
    fn first(&self, height: Height) -> Result<(), IndexError> {
        self.inner.first(height)
    }

    fn header(&self, height: Height, header: &BlockHeader) -> Result<(), IndexError> {
        self.inner.header(height, header)
    }

    fn commit(&self, height: Height, commit: Commitment) -> Result<(), IndexError> {
        self.inner.commit(height, commit)
    }

    fn height_for_block(&self, block_id: Identifier, height: Height) -> Result<(), IndexError> {
        self.inner.height_for_block(block_id, height)
    }

    fn payloads(
        &self,
        height: Height,
        paths: &[Path],
        payloads: &[Payload],
    ) -> Result<(), IndexError> {
        self.inner.payloads(height, paths, payloads)?;
        metrics::REGISTERS_INDEXED.inc_by(paths.len() as f64);
        Ok(())
    }

    fn events(&self, height: Height, events: &[Event]) -> Result<(), IndexError> {
        self.inner.events(height, events)?;
        metrics::EVENTS_INDEXED.inc_by(events.len() as f64);
        Ok(())
    }

    fn collections(&self, height: Height, collections: &[Collection]) -> Result<(), IndexError> {
        self.inner.collections(height, collections)?;
        metrics::COLLECTIONS_INDEXED.inc_by(collections.len() as f64);
        Ok(())
    }

    fn guarantees(&self, guarantees: &[Guarantee]) -> Result<(), IndexError> {
        self.inner.guarantees(guarantees)
    }

    fn transactions(&self, height: Height, transactions: &[Transaction]) -> Result<(), IndexError> {
        self.inner.transactions(height, transactions)?;
        metrics::TRANSACTIONS_INDEXED.inc_by(transactions.len() as f64);
        Ok(())
    }

    fn results(&self, results: &[TransactionResult]) -> Result<(), IndexError> {
        self.inner.results(results)
    }

    fn seals(&self, height: Height, seals: &[Seal]) -> Result<(), IndexError> {
        self.inner.seals(height, seals)?;
        metrics::SEALS_INDEXED.inc_by(seals.len() as f64);
        Ok(())
    }

    fn last(&self, height: Height) -> Result<(), IndexError> {
        self.inner.last(height)?;
        metrics::BLOCKS_INDEXED.inc();
        metrics::INDEXED_HEIGHT.set(height as f64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Writer double recording which calls were made.
    #[derive(Default)]
    struct RecordingWriter {
        calls: Mutex<Vec<&'static str>>,
    }

    impl IndexWriter for RecordingWriter {
        fn first(&self, _: Height) -> Result<(), IndexError> {
            self.calls.lock().push("first");
            Ok(())
        }
        fn header(&self, _: Height, _: &BlockHeader) -> Result<(), IndexError> {
            self.calls.lock().push("header");
            Ok(())
        }
        fn commit(&self, _: Height, _: Commitment) -> Result<(), IndexError> {
            self.calls.lock().push("commit");
            Ok(())
        }
        fn height_for_block(&self, _: Identifier, _: Height) -> Result<(), IndexError> {
            self.calls.lock().push("height_for_block");
            Ok(())
        }
        fn payloads(&self, _: Height, _: &[Path], _: &[Payload]) -> Result<(), IndexError> {
            self.calls.lock().push("payloads");
            Ok(())
        }
        fn events(&self, _: Height, _: &[Event]) -> Result<(), IndexError> {
            self.calls.lock().push("events");
            Ok(())
        }
        fn collections(&self, _: Height, _: &[Collection]) -> Result<(), IndexError> {
            self.calls.lock().push("collections");
            Ok(())
        }
        fn guarantees(&self, _: &[Guarantee]) -> Result<(), IndexError> {
            self.calls.lock().push("guarantees");
            Ok(())
        }
        fn transactions(&self, _: Height, _: &[Transaction]) -> Result<(), IndexError> {
            self.calls.lock().push("transactions");
            Ok(())
        }
        fn results(&self, _: &[TransactionResult]) -> Result<(), IndexError> {
            self.calls.lock().push("results");
            Ok(())
        }
        fn seals(&self, _: Height, _: &[Seal]) -> Result<(), IndexError> {
            self.calls.lock().push("seals");
            Ok(())
        }
        fn last(&self, _: Height) -> Result<(), IndexError> {
            self.calls.lock().push("last");
            Ok(())
        }
    }

    #[test]
    fn test_decorator_delegates() {
        let writer = MetricsWriter::new(RecordingWriter::default());

        writer.first(1).unwrap();
        writer.payloads(1, &[], &[]).unwrap();
        writer.seals(1, &[]).unwrap();

        let calls = writer.inner().calls.lock().clone();
        assert_eq!(calls, vec!["first", "payloads", "seals"]);
    }

    #[test]
    fn test_decorator_counts_on_success() {
        let writer = MetricsWriter::new(RecordingWriter::default());

        // Only this test calls `last` in this crate, so the counter delta
        // and the height gauge are exact.
        let before = meridian_telemetry::metrics::BLOCKS_INDEXED.get();
        writer.last(9).unwrap();
        assert_eq!(meridian_telemetry::metrics::BLOCKS_INDEXED.get(), before + 1.0);
        assert_eq!(meridian_telemetry::metrics::INDEXED_HEIGHT.get(), 9.0);
    }
}
