//! Deterministic partitioning of a folder listing into contiguous batches.
//!
//! Batches are recomputed from the listing on every run; the listing order is
//! preserved, so a stable listing always splits the same way.

use thiserror::Error;

pub const DEFAULT_BATCH_COUNT: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("Batch number must be between 1 and {batch_count} (got {batch_number})")]
    OutOfRange {
        batch_number: usize,
        batch_count: usize,
    },

    #[error("Batch count must be at least 1")]
    ZeroBatches,
}

/// Split `entries` into `batch_count` contiguous batches.
///
/// The first `len % batch_count` batches receive one extra item. An empty
/// listing yields no batches at all.
pub fn split_into_batches<T: Clone>(entries: &[T], batch_count: usize) -> Vec<Vec<T>> {
    if entries.is_empty() || batch_count == 0 {
        return Vec::new();
    }

    let base = entries.len() / batch_count;
    let remainder = entries.len() % batch_count;

    let mut batches = Vec::with_capacity(batch_count);
    let mut start = 0;
    for i in 0..batch_count {
        let size = base + usize::from(i < remainder);
        batches.push(entries[start..start + size].to_vec());
        start += size;
    }
    batches
}

pub fn validate_batch_number(batch_number: usize, batch_count: usize) -> Result<(), BatchError> {
    if batch_count == 0 {
        return Err(BatchError::ZeroBatches);
    }
    if batch_number < 1 || batch_number > batch_count {
        return Err(BatchError::OutOfRange {
            batch_number,
            batch_count,
        });
    }
    Ok(())
}

/// Pick the 1-indexed batch from an already split listing.
///
/// An empty listing produces no batches, so every number is out of range.
pub fn select_batch<T>(
    batches: &[Vec<T>],
    batch_number: usize,
    batch_count: usize,
) -> Result<&[T], BatchError> {
    validate_batch_number(batch_number, batch_count)?;
    batches
        .get(batch_number - 1)
        .map(Vec::as_slice)
        .ok_or(BatchError::OutOfRange {
            batch_number,
            batch_count: batches.len(),
        })
}
