//! Chunked pool implementation
//!
//! # Safety
//!
//! This module implements a single-threaded chunked object pool:
//! - Fixed-size blocks handed out from an intrusive singly-linked free list
//! - Free slots store the next pointer in their first bytes (`FreeSlot`)
//! - Chunks are raw reservations linked newest-first; they are only released
//!   when the pool is dropped
//! - `Cell`/`RefCell` for interior mutability (no synchronization,
//!   single-threaded by design)
//!
//! ## Invariants
//!
//! - Every slot reachable from `free_head` lies inside a chunk reachable from
//!   `chunks`
//! - A slot is never simultaneously on the free list and handed out
//! - `block_size` is at least `size_of::<FreeSlot>()` and a multiple of
//!   `block_align`
//! - The `FreeSlot` overlay is only valid while a slot is free; allocation
//!   hands the caller raw, uninterpreted storage
//!
//! ## Memory Management
//!
//! - Chunks allocated via `std::alloc::alloc` with a `Layout` of
//!   `block_size * objects_per_chunk` bytes
//! - Chunk growth is all-or-nothing: a failed reservation leaves the free
//!   list and chunk list untouched
//! - Chunks deallocated in `Drop` via `std::alloc::dealloc`

use std::alloc::{Layout, alloc, dealloc};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::ptr::{self, NonNull};

use super::{PoolConfig, PoolStats};
use crate::error::{PoolError, PoolResult};
use crate::utils::checked_align_up;

#[cfg(feature = "logging")]
use tracing::{debug, warn};

/// Node in the free list
///
/// While a slot is free, its first bytes hold this header. The overlay is
/// invalidated the moment the slot is handed out.
#[repr(C)]
struct FreeSlot {
    next: *mut FreeSlot,
}

/// One contiguous raw reservation subdivided into fixed-size slots
struct Chunk {
    ptr: NonNull<u8>,
    capacity: usize,
    align: usize,
    next: Option<Box<Chunk>>,
}

impl Chunk {
    /// Reserves a chunk of `size` bytes aligned to `align`
    fn new(size: usize, align: usize) -> PoolResult<Self> {
        let layout = Layout::from_size_align(size, align)
            .map_err(|_| PoolError::invalid_size(size, "chunk layout rejected"))?;

        // SAFETY: Allocating memory via the global allocator.
        // - layout has non-zero size (block_size >= header size and
        //   objects_per_chunk > 0, both validated at construction)
        // - alloc returns null on failure (handled below)
        let ptr = unsafe { alloc(layout) };
        let ptr = NonNull::new(ptr).ok_or_else(|| PoolError::out_of_memory(size))?;

        Ok(Self {
            ptr,
            capacity: size,
            align,
            next: None,
        })
    }

    #[inline]
    fn start(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    fn contains(&self, addr: usize) -> bool {
        let start = self.ptr.as_ptr() as usize;
        addr >= start && addr < start + self.capacity
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        // SAFETY: Returning the reservation to the global allocator.
        // - ptr was allocated via alloc() in new() with the same layout
        // - capacity and align match the original allocation
        // - This runs exactly once (Drop guarantee)
        unsafe {
            dealloc(
                self.ptr.as_ptr(),
                Layout::from_size_align_unchecked(self.capacity, self.align),
            );
        }
    }
}

/// Chunked object pool for fixed-size blocks
///
/// Hands out equally-sized, equally-aligned raw blocks in O(1) by popping an
/// intrusive free list. When the free list is empty the pool grows by exactly
/// one chunk of `objects_per_chunk` slots; chunks are only returned to the
/// system when the pool itself is dropped.
///
/// # Memory Layout
/// ```text
/// chunks:    [Chunk2] -> [Chunk1] -> [Chunk0]        (newest first)
/// free list: [slot] -> [slot] -> [slot] -> null      (threaded through
///                                                     free slots' own bytes)
/// ```
///
/// Within a freshly acquired chunk, slots are threaded so the
/// lowest-addressed slot becomes the free-list head and is handed out first.
/// This ordering is an implementation detail, not a contract.
///
/// The returned blocks are uninitialized; constructing and destroying objects
/// in them is the caller's responsibility (or use [`PoolBox`] which keeps
/// that unsafe surface in one place).
///
/// Not thread-safe: interior state uses `Cell`/`RefCell`. The pool is `Send`
/// (exclusive ownership moves whole) but not `Sync`; concurrent access must
/// be serialized externally.
///
/// [`PoolBox`]: super::PoolBox
pub struct ChunkedPool {
    /// Owned chunk list, newest chunk first
    chunks: RefCell<Option<Box<Chunk>>>,

    /// Head of the intrusive free list (aliases bytes inside chunks)
    free_head: Cell<*mut FreeSlot>,

    /// Size of each slot, rounded up to hold the free-list header
    block_size: usize,

    /// Guaranteed alignment of every returned block
    block_align: usize,

    /// Slots carved out of each chunk
    objects_per_chunk: usize,

    /// Reservation size of one chunk (`block_size * objects_per_chunk`)
    chunk_bytes: usize,

    /// Number of chunks acquired so far
    chunk_count: Cell<usize>,

    /// Number of slots currently on the free list
    free_count: Cell<usize>,

    /// Configuration
    config: PoolConfig,

    /// Statistics (only tracked if enabled)
    total_allocs: Cell<u64>,
    total_deallocs: Cell<u64>,
}

impl ChunkedPool {
    /// Creates a new pool with custom configuration
    ///
    /// # Parameters
    /// - `block_size`: payload size of each slot in bytes; rounded up so a
    ///   slot can also hold the free-list header
    /// - `block_align`: alignment of returned blocks (power of two)
    /// - `objects_per_chunk`: slots carved out of each chunk (non-zero)
    /// - `initial_chunks`: chunks reserved eagerly; `0` defers the first
    ///   reservation to the first [`allocate`](Self::allocate)
    ///
    /// # Errors
    /// Returns an error if:
    /// - `block_align` is not a power of two
    /// - `objects_per_chunk` is zero
    /// - the chunk size calculation overflows
    /// - an initial chunk reservation fails
    pub fn with_config(
        block_size: usize,
        block_align: usize,
        objects_per_chunk: usize,
        initial_chunks: usize,
        config: PoolConfig,
    ) -> PoolResult<Self> {
        if !block_align.is_power_of_two() {
            return Err(PoolError::invalid_alignment(block_align));
        }

        if objects_per_chunk == 0 {
            return Err(PoolError::config_error("objects_per_chunk must be non-zero"));
        }

        // A free slot must be able to hold the intrusive header, so both the
        // slot size and alignment are raised to cover FreeSlot.
        let header = Layout::new::<FreeSlot>();
        let slot_align = block_align.max(header.align());
        let slot_size = checked_align_up(block_size.max(header.size()), slot_align)
            .ok_or(PoolError::SizeOverflow)?;

        let chunk_bytes = slot_size
            .checked_mul(objects_per_chunk)
            .ok_or(PoolError::SizeOverflow)?;

        let pool = Self {
            chunks: RefCell::new(None),
            free_head: Cell::new(ptr::null_mut()),
            block_size: slot_size,
            block_align: slot_align,
            objects_per_chunk,
            chunk_bytes,
            chunk_count: Cell::new(0),
            free_count: Cell::new(0),
            config,
            total_allocs: Cell::new(0),
            total_deallocs: Cell::new(0),
        };

        for _ in 0..initial_chunks {
            pool.grow()?;
        }

        Ok(pool)
    }

    /// Creates a new pool with default configuration
    pub fn new(
        block_size: usize,
        block_align: usize,
        objects_per_chunk: usize,
        initial_chunks: usize,
    ) -> PoolResult<Self> {
        Self::with_config(
            block_size,
            block_align,
            objects_per_chunk,
            initial_chunks,
            PoolConfig::default(),
        )
    }

    /// Creates a pool sized for a specific type
    ///
    /// Block size and alignment are derived from `T`'s layout.
    pub fn for_type<T>(objects_per_chunk: usize, initial_chunks: usize) -> PoolResult<Self> {
        let layout = Layout::new::<T>();
        Self::new(layout.size(), layout.align(), objects_per_chunk, initial_chunks)
    }

    /// Creates a pool with production config - no poisoning, no statistics
    pub fn production(
        block_size: usize,
        block_align: usize,
        objects_per_chunk: usize,
        initial_chunks: usize,
    ) -> PoolResult<Self> {
        Self::with_config(
            block_size,
            block_align,
            objects_per_chunk,
            initial_chunks,
            PoolConfig::production(),
        )
    }

    /// Creates a pool with debug config - poison patterns and statistics
    pub fn debug(
        block_size: usize,
        block_align: usize,
        objects_per_chunk: usize,
        initial_chunks: usize,
    ) -> PoolResult<Self> {
        Self::with_config(
            block_size,
            block_align,
            objects_per_chunk,
            initial_chunks,
            PoolConfig::debug(),
        )
    }

    /// Returns the size of each block in bytes
    ///
    /// This is the requested size rounded up to hold the free-list header and
    /// satisfy `block_align`, so callers can reason about storage overhead
    /// without recomputing the rounding rule.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the guaranteed alignment of every returned block
    pub fn block_align(&self) -> usize {
        self.block_align
    }

    /// Returns the number of slots carved out of each chunk
    pub fn objects_per_chunk(&self) -> usize {
        self.objects_per_chunk
    }

    /// Returns the number of chunks acquired so far
    pub fn chunk_count(&self) -> usize {
        self.chunk_count.get()
    }

    /// Returns the number of slots currently on the free list
    pub fn free_blocks(&self) -> usize {
        self.free_count.get()
    }

    /// Returns the total reserved capacity in bytes
    pub fn capacity(&self) -> usize {
        self.chunk_count.get() * self.chunk_bytes
    }

    /// Checks if all slots are free (no outstanding allocations)
    pub fn is_empty(&self) -> bool {
        self.free_count.get() == self.chunk_count.get() * self.objects_per_chunk
    }

    /// Checks if a pointer lies inside one of this pool's chunks
    ///
    /// Walks the chunk list, O(chunks).
    pub fn contains(&self, ptr: *const u8) -> bool {
        let addr = ptr as usize;
        let chunks = self.chunks.borrow();
        let mut current = chunks.as_deref();
        while let Some(chunk) = current {
            if chunk.contains(addr) {
                return true;
            }
            current = chunk.next.as_deref();
        }
        false
    }

    /// Acquires one chunk and threads all of its slots onto the free list
    ///
    /// All-or-nothing: the reservation is the only fallible step and the
    /// free list is spliced only after it succeeds.
    fn grow(&self) -> PoolResult<()> {
        let mut chunk = match Chunk::new(self.chunk_bytes, self.block_align) {
            Ok(chunk) => chunk,
            Err(err) => {
                #[cfg(feature = "logging")]
                warn!(
                    chunk_bytes = self.chunk_bytes,
                    chunks = self.chunk_count.get(),
                    %err,
                    "chunk reservation failed"
                );
                return Err(err);
            }
        };

        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: Poisoning a freshly reserved chunk.
            // - chunk.start() points to a valid reservation of chunk_bytes
            // - The memory is exclusively ours (not yet linked anywhere)
            unsafe {
                ptr::write_bytes(chunk.start(), pattern, self.chunk_bytes);
            }
        }

        // Thread the new chunk's slots in reverse index order so the
        // lowest-addressed slot ends up at the head of the free list.
        let mut head = self.free_head.get();
        for i in (0..self.objects_per_chunk).rev() {
            // SAFETY: Writing the free-list header into slot i.
            // - i * block_size < chunk_bytes, so the slot lies inside the chunk
            // - The slot is aligned to block_align (chunk start is, and
            //   block_size is a multiple of block_align)
            // - block_size >= size_of::<FreeSlot>() (raised at construction)
            // - head is null or a valid free slot from this pool
            unsafe {
                let slot = chunk.start().add(i * self.block_size).cast::<FreeSlot>();
                (*slot).next = head;
                head = slot;
            }
        }

        // Link the chunk at the head of the chunk list, then publish the new
        // free-list head.
        let mut chunks = self.chunks.borrow_mut();
        chunk.next = chunks.take();
        *chunks = Some(Box::new(chunk));

        self.free_head.set(head);
        self.free_count
            .set(self.free_count.get() + self.objects_per_chunk);
        self.chunk_count.set(self.chunk_count.get() + 1);

        #[cfg(feature = "logging")]
        debug!(
            chunk_bytes = self.chunk_bytes,
            chunks = self.chunk_count.get(),
            free_blocks = self.free_count.get(),
            "pool grew by one chunk"
        );

        Ok(())
    }

    /// Allocates one block in O(1)
    ///
    /// The returned pointer is non-null, aligned to
    /// [`block_align`](Self::block_align), and refers to
    /// [`block_size`](Self::block_size) bytes of uninitialized storage.
    /// Constructing an object in it (placement) and ending that object's
    /// lifetime before [`deallocate`](Self::deallocate) are the caller's
    /// responsibility.
    ///
    /// # Errors
    /// Returns `PoolError::OutOfMemory` if the free list is empty and the
    /// chunk reservation fails; the pool state is then unchanged from before
    /// the call.
    pub fn allocate(&self) -> PoolResult<NonNull<u8>> {
        let mut head = self.free_head.get();
        if head.is_null() {
            self.grow()?;
            head = self.free_head.get();
        }

        let slot =
            NonNull::new(head).ok_or_else(|| PoolError::out_of_memory(self.chunk_bytes))?;

        // SAFETY: Reading the free-list header of the head slot.
        // - slot is non-null and on the free list, so its first bytes hold a
        //   valid FreeSlot header (written by grow() or deallocate())
        // - next is null or another free slot of this pool
        let next = unsafe { (*slot.as_ptr()).next };
        self.free_head.set(next);
        self.free_count.set(self.free_count.get() - 1);

        if self.config.track_stats {
            self.total_allocs.set(self.total_allocs.get() + 1);
        }

        Ok(slot.cast::<u8>())
    }

    /// Returns a block to the free list in O(1)
    ///
    /// A null `ptr` is a no-op. The slot's bytes are overwritten with
    /// free-list bookkeeping, invalidating any residue of a previous object.
    ///
    /// # Safety
    ///
    /// Caller must ensure:
    /// - `ptr` is null or was returned by [`allocate`](Self::allocate) on
    ///   this same pool instance
    /// - `ptr` is not already on the free list (no double free)
    /// - The lifetime of any object constructed in the slot has ended; the
    ///   pool reclaims raw storage only and never runs destructors
    pub unsafe fn deallocate(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }

        debug_assert!(
            self.contains(ptr),
            "pointer does not belong to this pool"
        );

        if let Some(pattern) = self.config.dealloc_pattern {
            // SAFETY: Poisoning a slot being released.
            // - ptr refers to a block_size slot of this pool (caller contract)
            // - The slot holds no live object (caller contract)
            unsafe {
                ptr::write_bytes(ptr, pattern, self.block_size);
            }
        }

        let slot = ptr.cast::<FreeSlot>();
        // SAFETY: Writing the free-list header into the released slot.
        // - The slot is block_size >= size_of::<FreeSlot>() bytes
        // - The slot holds no live object (caller contract), so overwriting
        //   its first bytes is sound
        unsafe {
            (*slot).next = self.free_head.get();
        }
        self.free_head.set(slot);
        self.free_count.set(self.free_count.get() + 1);

        if self.config.track_stats {
            self.total_deallocs.set(self.total_deallocs.get() + 1);
        }
    }

    /// Get statistics (if tracking is enabled)
    pub fn stats(&self) -> Option<PoolStats> {
        if !self.config.track_stats {
            return None;
        }

        Some(PoolStats {
            total_allocs: self.total_allocs.get(),
            total_deallocs: self.total_deallocs.get(),
            chunks_allocated: self.chunk_count.get(),
            block_size: self.block_size,
            free_blocks: self.free_count.get(),
            capacity_blocks: self.chunk_count.get() * self.objects_per_chunk,
        })
    }
}

impl Drop for ChunkedPool {
    fn drop(&mut self) {
        // Pop the chunk list iteratively; letting Box's recursive drop walk
        // it would recurse once per chunk. Outstanding in-use slots dangle
        // from this point on, which is the caller's obligation to avoid.
        let mut current = self.chunks.borrow_mut().take();
        while let Some(mut chunk) = current {
            current = chunk.next.take();
        }
        self.free_head.set(ptr::null_mut());
        self.free_count.set(0);
    }
}

// SAFETY: ChunkedPool is Send because:
// - The pool exclusively owns every chunk and the free list threads only
//   through those chunks; moving the pool moves sole ownership
// - Cell/RefCell state is only touched through the pool itself
// - No chunk or slot is ever shared between two live pool instances
//
// It is deliberately !Sync: interior mutability is unsynchronized.
unsafe impl Send for ChunkedPool {}

impl fmt::Debug for ChunkedPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Raw free-list pointers are not useful output; report the pool
        // shape instead.
        f.debug_struct("ChunkedPool")
            .field("block_size", &self.block_size)
            .field("block_align", &self.block_align)
            .field("objects_per_chunk", &self.objects_per_chunk)
            .field("chunk_count", &self.chunk_count.get())
            .field("free_blocks", &self.free_count.get())
            .finish_non_exhaustive()
    }
}
