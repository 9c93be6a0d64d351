/// Maximum number of ids per batch unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 3;

/// Split `ids` into contiguous runs of at most `batch_size`, keeping input order.
///
/// Returns `(start_index, run)` pairs; the start index feeds the batch's
/// `created_time` offset. A `batch_size` of zero is treated as one.
pub fn split_into_batches(ids: &[u64], batch_size: usize) -> Vec<(usize, Vec<u64>)> {
    let size = batch_size.max(1);
    ids.chunks(size)
        .enumerate()
        .map(|(n, chunk)| (n * size, chunk.to_vec()))
        .collect()
}
