//! Chunked object pool for fixed-size allocations
//!
//! This crate provides a single-threaded pool allocator that hands out and
//! reclaims equally-sized, equally-aligned raw blocks without touching the
//! general-purpose allocator on every request. Freed slots are threaded into
//! an intrusive free list; when the list runs dry the pool grows by exactly
//! one chunk of `objects_per_chunk` slots. Chunks are only returned to the
//! system when the pool is dropped.
//!
//! # Use Cases
//! - Node-based containers with many same-sized nodes
//! - Per-frame small objects in games and simulations
//! - Any workload that repeatedly creates and destroys objects of one size
//!
//! # Example
//!
//! ```
//! use chunked_pool::{ChunkedPool, PoolBox, PoolResult};
//!
//! fn main() -> PoolResult<()> {
//!     // One chunk of 64 u64-sized slots, reserved eagerly.
//!     let pool = ChunkedPool::for_type::<u64>(64, 1)?;
//!
//!     // Raw interface: the caller owns construction and destruction.
//!     let slot = pool.allocate()?;
//!     unsafe {
//!         slot.cast::<u64>().as_ptr().write(7);
//!         pool.deallocate(slot.as_ptr());
//!     }
//!
//!     // RAII interface: PoolBox constructs in place and cleans up on drop.
//!     let value = PoolBox::new_in(7u64, &pool)?;
//!     assert_eq!(*value, 7);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `logging` (default): structured diagnostics via `tracing` on chunk
//!   growth and allocation failure

#![warn(missing_docs)]

pub mod error;
pub mod pool;
pub mod utils;

pub use error::{PoolError, PoolResult};
pub use pool::{ChunkedPool, PoolBox, PoolConfig, PoolStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
