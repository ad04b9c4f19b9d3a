//! Partitioning identifiers into batches.

/// A consecutive run of identifiers and its position among all batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch<'a, I> {
    pub index: usize,
    pub ids: &'a [I],
}

impl<I> Batch<'_, I> {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Split `ids` into runs of at most `batch_size`, in input order.
///
/// A `batch_size` of 0 is treated as 1. Empty input yields no batches.
pub fn partition<I>(ids: &[I], batch_size: usize) -> Vec<Batch<'_, I>> {
    ids.chunks(batch_size.max(1))
        .enumerate()
        .map(|(index, ids)| Batch { index, ids })
        .collect()
}

/// Number of batches `partition` produces for `len` identifiers.
pub fn batch_count(len: usize, batch_size: usize) -> usize {
    len.div_ceil(batch_size.max(1))
}
