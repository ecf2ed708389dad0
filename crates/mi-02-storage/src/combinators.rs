//! # Operation Combinators
//!
//! Typed save/retrieve calls produce `Operation` closures that run inside a
//! store transaction. `combine` and `fallback` are the only composition
//! primitives: multi-step writes are combined, bootstrap-style "try this,
//! else that" steps fall back.

use crate::errors::StorageError;
use crate::store::StoreTransaction;

/// One storage operation, runnable inside a transaction.
///
/// Operations are `Fn` rather than `FnOnce` so a conflicted transaction can
/// be retried without rebuilding its operations.
pub type Operation<'a> = Box<dyn Fn(&StoreTransaction<'_>) -> Result<(), StorageError> + Send + 'a>;

/// Run every operation in order; the first error aborts the rest.
pub fn combine(ops: Vec<Operation<'_>>) -> Operation<'_> {
    Box::new(move |txn| {
        for op in &ops {
            op(txn)?;
        }
        Ok(())
    })
}

/// Run operations in order until one succeeds. If none does, the aggregate
/// error carries the count and the last failure.
pub fn fallback(ops: Vec<Operation<'_>>) -> Operation<'_> {
    Box::new(move |txn| {
        let mut last = None;
        for op in &ops {
            match op(txn) {
                Ok(()) => return Ok(()),
                Err(err) => last = Some(err),
            }
        }
        match last {
            Some(last) => Err(StorageError::FallbackExhausted {
                count: ops.len(),
                last: Box::new(last),
            }),
            // An empty fallback has nothing to succeed.
            None => Err(StorageError::NotFound),
        }
    })
}
