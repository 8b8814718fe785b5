//! Smart pointer for pool-allocated objects

use std::alloc::Layout;
use std::ptr::{self, NonNull};

use super::ChunkedPool;
use crate::error::{PoolError, PoolResult};

/// RAII smart pointer for a value constructed in one pool slot
///
/// `PoolBox` is the audited home of the pool's placement-construction
/// surface: it moves a value into a raw slot on creation, runs the destructor
/// and returns the slot when dropped. Similar to `Box` but backed by a
/// [`ChunkedPool`].
///
/// The borrow of the pool keeps it alive for as long as the box exists.
pub struct PoolBox<'pool, T> {
    ptr: NonNull<T>,
    pool: &'pool ChunkedPool,
}

impl<'pool, T> PoolBox<'pool, T> {
    /// Creates a new `PoolBox` by allocating a slot from the given pool
    ///
    /// # Errors
    /// Returns an error if `T` does not fit the pool's block size or
    /// alignment, or if the pool fails to grow.
    #[must_use = "allocated value must be used"]
    pub fn new_in(value: T, pool: &'pool ChunkedPool) -> PoolResult<Self> {
        let layout = Layout::new::<T>();
        if layout.size() > pool.block_size() || layout.align() > pool.block_align() {
            return Err(PoolError::invalid_size(
                layout.size(),
                "value layout exceeds pool block",
            ));
        }

        let raw = pool.allocate()?;

        // SAFETY: Placement-constructing T in the slot.
        // - raw is non-null, block_size >= size_of::<T>() and
        //   block_align >= align_of::<T>() (checked above)
        // - write moves value into the slot without dropping it
        // - The slot is exclusively ours until Drop runs
        let ptr = raw.cast::<T>();
        unsafe {
            ptr.as_ptr().write(value);
        }

        Ok(Self { ptr, pool })
    }

    /// Gets a reference to the contained value
    #[must_use]
    pub fn get(&self) -> &T {
        // SAFETY: Dereferencing the slot as a shared reference.
        // - ptr points to an initialized T (written in new_in)
        // - The PoolBox owns the slot exclusively
        // - Lifetime tied to &self
        unsafe { self.ptr.as_ref() }
    }

    /// Gets a mutable reference to the contained value
    pub fn get_mut(&mut self) -> &mut T {
        // SAFETY: Dereferencing the slot as a mutable reference.
        // - ptr points to an initialized T (written in new_in)
        // - &mut self ensures exclusive access
        unsafe { self.ptr.as_mut() }
    }

    /// Consumes the `PoolBox` and returns the contained value
    ///
    /// The slot is returned to the pool without running `T`'s destructor on
    /// it (the value is moved out first).
    #[must_use]
    pub fn into_inner(self) -> T {
        // SAFETY: Moving T out of the slot.
        // - ptr points to an initialized T
        // - mem::forget below prevents Drop from dropping it again
        let value = unsafe { ptr::read(self.ptr.as_ptr()) };

        // SAFETY: Returning the slot to its pool.
        // - ptr came from this pool's allocate() in new_in
        // - T was moved out above, the slot holds no live object
        unsafe {
            self.pool.deallocate(self.ptr.as_ptr().cast());
        }

        // Prevent double-free
        std::mem::forget(self);

        value
    }
}

impl<T> std::ops::Deref for PoolBox<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.get()
    }
}

impl<T> std::ops::DerefMut for PoolBox<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.get_mut()
    }
}

impl<T> Drop for PoolBox<'_, T> {
    fn drop(&mut self) {
        // SAFETY: Destroying the value, then reclaiming its slot.
        // - ptr points to an initialized T (from new_in), dropped exactly once
        // - After drop_in_place the slot holds no live object, satisfying
        //   deallocate's contract
        // - ptr came from this pool's allocate()
        unsafe {
            ptr::drop_in_place(self.ptr.as_ptr());
            self.pool.deallocate(self.ptr.as_ptr().cast());
        }
    }
}
