//! Chunked pool allocator
//!
//! A pool of equally-sized blocks managed through an intrusive free list,
//! growing one chunk at a time. Provides O(1) allocation/deallocation for
//! same-sized objects.
//!
//! ## Modules
//! - `allocator` - Main [`ChunkedPool`] implementation with chunk list and
//!   free list
//! - `config` - Configuration variants (production, debug)
//! - `pool_box` - RAII smart pointer for pool-allocated objects
//! - `stats` - Statistics tracking types

pub mod allocator;
pub mod config;
pub mod pool_box;
pub mod stats;

pub use allocator::ChunkedPool;
pub use config::PoolConfig;
pub use pool_box::PoolBox;
pub use stats::PoolStats;
