//! Integration tests for the chunked pool

use chunked_pool::{ChunkedPool, PoolBox, PoolConfig, PoolError};
use proptest::prelude::*;

#[test]
fn test_pool_basic() {
    let pool = ChunkedPool::new(128, 8, 16, 1).expect("Failed to create pool");

    let ptr = pool.allocate().expect("Allocation failed");
    unsafe {
        // Write to allocated memory
        std::ptr::write_bytes(ptr.as_ptr(), 0x42, 128);
        assert_eq!(*ptr.as_ptr(), 0x42);

        pool.deallocate(ptr.as_ptr());
    }
}

#[test]
fn test_pool_lifo_reuse() {
    let pool = ChunkedPool::new(64, 8, 16, 1).expect("Failed to create pool");

    let ptr1 = pool.allocate().expect("First allocation failed");
    let addr1 = ptr1.as_ptr() as usize;

    unsafe { pool.deallocate(ptr1.as_ptr()) };

    // The most recently freed slot is handed out again.
    let ptr2 = pool.allocate().expect("Second allocation failed");
    assert_eq!(addr1, ptr2.as_ptr() as usize, "pool should reuse freed blocks");

    unsafe { pool.deallocate(ptr2.as_ptr()) };
}

#[test]
fn test_pool_distinct_pointers() {
    let pool = ChunkedPool::new(32, 8, 16, 1).expect("Failed to create pool");

    let mut ptrs = vec![];
    for i in 0..10 {
        let ptr = pool.allocate().expect("Allocation failed");
        unsafe { std::ptr::write_bytes(ptr.as_ptr(), i as u8, 32) };
        ptrs.push(ptr);
    }

    // All blocks are different
    for i in 0..ptrs.len() {
        for j in (i + 1)..ptrs.len() {
            assert_ne!(ptrs[i].as_ptr(), ptrs[j].as_ptr());
        }
    }

    // Writes did not bleed into neighbouring blocks
    for (i, ptr) in ptrs.iter().enumerate() {
        assert_eq!(unsafe { *ptr.as_ptr() }, i as u8);
    }

    for ptr in ptrs {
        unsafe { pool.deallocate(ptr.as_ptr()) };
    }
}

#[test]
fn test_pool_alignment() {
    for align in [8usize, 16, 32, 64] {
        let pool = ChunkedPool::new(64, align, 16, 1).unwrap();
        let ptr = pool.allocate().unwrap();
        assert_eq!(
            ptr.as_ptr() as usize % align,
            0,
            "pointer not aligned to {align}"
        );
        unsafe { pool.deallocate(ptr.as_ptr()) };
    }
}

// The spec'd end-to-end scenario: one eager chunk of four slots, exhaust it,
// grow on the fifth allocation, then observe LIFO reuse.
#[test]
fn test_growth_and_lifo_scenario() {
    let pool = ChunkedPool::new(16, 8, 4, 1).expect("Failed to create pool");
    assert_eq!(pool.chunk_count(), 1);
    assert_eq!(pool.free_blocks(), 4);

    let mut ptrs = vec![];
    for _ in 0..4 {
        ptrs.push(pool.allocate().expect("in-chunk allocation failed"));
    }
    for i in 0..ptrs.len() {
        for j in (i + 1)..ptrs.len() {
            assert_ne!(ptrs[i], ptrs[j]);
        }
    }
    assert_eq!(pool.chunk_count(), 1, "no growth while slots remain");

    // Fifth allocation triggers exactly one new chunk.
    let fifth = pool.allocate().expect("growth allocation failed");
    assert_eq!(pool.chunk_count(), 2);
    assert_eq!(pool.free_blocks(), 3);

    // Free the first pointer; the next allocation returns it (LIFO).
    let first_addr = ptrs[0].as_ptr() as usize;
    unsafe { pool.deallocate(ptrs[0].as_ptr()) };
    let reused = pool.allocate().unwrap();
    assert_eq!(reused.as_ptr() as usize, first_addr);

    unsafe {
        pool.deallocate(reused.as_ptr());
        pool.deallocate(fifth.as_ptr());
        for ptr in &ptrs[1..] {
            pool.deallocate(ptr.as_ptr());
        }
    }
}

#[test]
fn test_growth_threshold() {
    let pool = ChunkedPool::new(16, 8, 8, 0).unwrap();
    assert_eq!(pool.chunk_count(), 0);

    let mut ptrs = vec![];
    for round in 1..=3 {
        for _ in 0..8 {
            ptrs.push(pool.allocate().unwrap());
        }
        assert_eq!(
            pool.chunk_count(),
            round,
            "exactly one chunk per {} allocations",
            pool.objects_per_chunk()
        );
    }

    for ptr in ptrs {
        unsafe { pool.deallocate(ptr.as_ptr()) };
    }
    // Reclaimed slots satisfy further allocations without growth.
    for _ in 0..24 {
        let _ = pool.allocate().unwrap();
    }
    assert_eq!(pool.chunk_count(), 3);
}

#[test]
fn test_atomic_growth_failure() {
    // A chunk this large (2^55 bytes per slot, 8 slots) cannot be reserved;
    // the failed call must leave the pool untouched.
    let pool = ChunkedPool::new(1usize << 55, 8, 8, 0).expect("construction is infallible");
    assert_eq!(pool.chunk_count(), 0);

    let err = pool.allocate().expect_err("reservation should fail");
    assert!(err.is_out_of_memory());
    assert_eq!(pool.chunk_count(), 0);
    assert_eq!(pool.free_blocks(), 0);

    // Eager construction surfaces the same failure.
    let err = ChunkedPool::new(1usize << 55, 8, 8, 1).expect_err("eager reservation should fail");
    assert!(err.is_out_of_memory());
}

#[test]
fn test_configuration_errors() {
    assert!(matches!(
        ChunkedPool::new(64, 12, 16, 0),
        Err(PoolError::InvalidAlignment { align: 12 })
    ));
    assert!(matches!(
        ChunkedPool::new(64, 8, 0, 0),
        Err(PoolError::ConfigError { .. })
    ));
    assert!(matches!(
        ChunkedPool::new(usize::MAX / 4, 8, 8, 0),
        Err(PoolError::SizeOverflow)
    ));
}

#[test]
fn test_move_transfers_ownership() {
    let pool = ChunkedPool::new(64, 8, 8, 1).unwrap();
    let ptr = pool.allocate().unwrap();
    unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0x5A, 64) };

    // Moving the pool moves chunk and free-list ownership wholesale; slots
    // handed out before the move stay valid.
    let moved = pool;
    assert_eq!(unsafe { *ptr.as_ptr() }, 0x5A);
    assert!(moved.contains(ptr.as_ptr()));
    unsafe { moved.deallocate(ptr.as_ptr()) };
    assert_eq!(moved.free_blocks(), 8);

    // Same through a function boundary and a heap relocation.
    fn exercise(pool: ChunkedPool) -> ChunkedPool {
        let ptr = pool.allocate().unwrap();
        unsafe { pool.deallocate(ptr.as_ptr()) };
        pool
    }
    let moved = exercise(moved);
    let boxed = Box::new(moved);
    let ptr = boxed.allocate().unwrap();
    unsafe { boxed.deallocate(ptr.as_ptr()) };
}

#[test]
fn test_pool_is_send() {
    let pool = ChunkedPool::new(64, 8, 8, 1).unwrap();
    std::thread::spawn(move || {
        let ptr = pool.allocate().unwrap();
        unsafe { pool.deallocate(ptr.as_ptr()) };
    })
    .join()
    .unwrap();
}

#[test]
fn test_pool_box_in_pool_slots() {
    #[derive(Debug, PartialEq)]
    struct Particle {
        pos: [f32; 3],
        ttl: u32,
    }

    let pool = ChunkedPool::for_type::<Particle>(32, 1).unwrap();
    let mut live: Vec<PoolBox<'_, Particle>> = (0..32)
        .map(|i| {
            PoolBox::new_in(
                Particle {
                    pos: [i as f32; 3],
                    ttl: i,
                },
                &pool,
            )
            .unwrap()
        })
        .collect();
    assert_eq!(pool.free_blocks(), 0);

    // The 33rd box grows the pool by one chunk.
    live.push(PoolBox::new_in(Particle { pos: [0.0; 3], ttl: 99 }, &pool).unwrap());
    assert_eq!(pool.chunk_count(), 2);

    assert_eq!(live[3].ttl, 3);
    live.clear();
    assert_eq!(pool.free_blocks(), 64);
}

#[test]
fn test_stats_with_explicit_config() {
    let config = PoolConfig {
        track_stats: true,
        alloc_pattern: None,
        dealloc_pattern: None,
    };
    let pool = ChunkedPool::with_config(16, 8, 4, 1, config).unwrap();

    let a = pool.allocate().unwrap();
    let b = pool.allocate().unwrap();
    unsafe { pool.deallocate(a.as_ptr()) };

    let stats = pool.stats().unwrap();
    assert_eq!(stats.total_allocs, 2);
    assert_eq!(stats.total_deallocs, 1);
    assert_eq!(stats.free_blocks, 3);

    unsafe { pool.deallocate(b.as_ptr()) };
}

proptest! {
    // Round trip: any well-formed allocate/deallocate sequence is satisfied
    // without error after the first successful growth, and live pointers are
    // always distinct.
    #[test]
    fn random_alloc_dealloc_round_trip(ops in prop::collection::vec(any::<bool>(), 1..256)) {
        let pool = ChunkedPool::new(24, 8, 8, 1).unwrap();
        let mut live = Vec::new();

        for want_alloc in ops {
            if want_alloc || live.is_empty() {
                let ptr = pool.allocate().unwrap();
                prop_assert!(!live.contains(&ptr), "live pointers must be distinct");
                prop_assert_eq!(ptr.as_ptr() as usize % pool.block_align(), 0);
                live.push(ptr);
            } else {
                let ptr = live.pop().unwrap();
                unsafe { pool.deallocate(ptr.as_ptr()) };
            }
        }

        for ptr in live.drain(..) {
            unsafe { pool.deallocate(ptr.as_ptr()) };
        }
        prop_assert!(pool.is_empty());
    }
}
