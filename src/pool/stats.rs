//! Pool statistics

/// Statistics snapshot for a chunked pool
#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    /// Total allocations performed
    pub total_allocs: u64,
    /// Total deallocations performed
    pub total_deallocs: u64,
    /// Number of chunks acquired so far
    pub chunks_allocated: usize,
    /// Size of each block in bytes
    pub block_size: usize,
    /// Currently free blocks
    pub free_blocks: usize,
    /// Total blocks across all chunks
    pub capacity_blocks: usize,
}
