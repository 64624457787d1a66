//! Region allocator used for the per-shader scratch memory.
//!
//! Allocations are bumped out of fixed-capacity regions. When the head region
//! is full a new one is pushed, taken from the free list when possible. A
//! reset keeps the newest region and recycles the rest, so a run over many
//! shader files settles on a fixed set of regions instead of reallocating.
//!
//! ```text
//!  active (oldest .. head)              free (.. next reused)
//! +--------+   +--------+   +------+    +--------+   +--------+
//! | origin | - | region | - | head |    | region | - | region |
//! +--------+   +--------+   +------+    +--------+   +--------+
//! ```
//!
//! Requests larger than the region capacity get a dedicated region sized
//! exactly to the request. Those are released at the next reset, never pooled.

use std::alloc::{self, Layout};
use std::cell::{Cell, RefCell};
use std::ptr::NonNull;
use std::slice;

use tracing::{error, trace};

/// Capacity of a standard region in bytes.
pub const REGION_CAPACITY: usize = 1 << 16;

struct Region {
    data: NonNull<u8>,
    capacity: usize,
    used: usize,
}

impl Region {
    /// Backing memory is zeroed on acquisition so every byte handed out is
    /// initialized, but callers get no zeroing guarantee once a region is
    /// recycled.
    fn acquire(capacity: usize) -> Self {
        let layout = Self::layout(capacity);
        // SAFETY: `capacity` is never zero, see `Arena::with_capacity`.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let Some(data) = NonNull::new(ptr) else {
            alloc::handle_alloc_error(layout);
        };

        Self {
            data,
            capacity,
            used: 0,
        }
    }

    fn layout(capacity: usize) -> Layout {
        match Layout::array::<u8>(capacity) {
            Ok(layout) => layout,
            Err(_) => {
                error!(capacity, "region capacity exceeds the address space");
                std::process::abort();
            }
        }
    }

    fn remaining(&self) -> usize {
        self.capacity - self.used
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        // SAFETY: `data` came from `alloc_zeroed` with this exact layout.
        unsafe { alloc::dealloc(self.data.as_ptr(), Self::layout(self.capacity)) }
    }
}

struct Chains {
    /// Oldest first. The first entry is the origin and the last is the head.
    active: Vec<Region>,
    /// The last entry is reused first.
    free: Vec<Region>,
}

impl Chains {
    fn head(&self) -> &Region {
        &self.active[self.active.len() - 1]
    }

    fn head_mut(&mut self) -> &mut Region {
        let last = self.active.len() - 1;
        &mut self.active[last]
    }
}

/// Region counts and usage, mostly useful for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
    pub active_regions: usize,
    pub free_regions: usize,
    /// Number of times backing memory was requested from the system.
    pub acquired_regions: usize,
    pub head_used: usize,
}

/// Bump allocator over a chain of regions.
///
/// `alloc` takes `&self` so several allocations can be alive at once, while
/// `reset` takes `&mut self`: the borrow checker rejects any reset while a
/// slice from a previous allocation is still in use.
pub struct Arena {
    capacity: usize,
    chains: RefCell<Chains>,
    acquired: Cell<usize>,
}

impl Arena {
    pub fn new() -> Self {
        Self::with_capacity(REGION_CAPACITY)
    }

    /// Creates an arena whose standard regions hold `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "arena region capacity must be non-zero");

        Self {
            capacity,
            chains: RefCell::new(Chains {
                active: vec![Region::acquire(capacity)],
                free: Vec::new(),
            }),
            acquired: Cell::new(1),
        }
    }

    /// Returns `size` writable bytes that stay valid until the next reset.
    ///
    /// The contents are whatever the region held before; fresh regions start
    /// zeroed, recycled ones keep old data.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc(&self, size: usize) -> &mut [u8] {
        let mut chains = self.chains.borrow_mut();

        if size > self.capacity {
            let mut region = self.acquire(size);
            region.used = size;
            let data = region.data;
            chains.active.push(region);
            trace!(size, "dedicated region for oversized allocation");

            // SAFETY: the region was just acquired with exactly `size` bytes and
            // is only released by `reset` or drop, both of which need `&mut self`.
            return unsafe { slice::from_raw_parts_mut(data.as_ptr(), size) };
        }

        if chains.head().remaining() < size {
            self.expand(&mut chains);
        }

        let head = chains.head_mut();
        // SAFETY: `used + size <= capacity`, and bytes below `used` are never
        // handed out twice before a reset. Region memory does not move when
        // the `Vec` holding the region reallocates.
        let bytes = unsafe { slice::from_raw_parts_mut(head.data.as_ptr().add(head.used), size) };
        head.used += size;
        bytes
    }

    fn expand(&self, chains: &mut Chains) {
        let region = match chains.free.pop() {
            Some(mut region) => {
                region.used = 0;
                region
            }
            None => self.acquire(self.capacity),
        };
        chains.active.push(region);
        trace!(
            active = chains.active.len(),
            free = chains.free.len(),
            "arena expanded"
        );
    }

    fn acquire(&self, capacity: usize) -> Region {
        self.acquired.set(self.acquired.get() + 1);
        Region::acquire(capacity)
    }

    /// Invalidates every allocation and recycles the regions.
    ///
    /// The newest standard region stays active as the new origin. The other
    /// standard regions go on top of the free list in their existing order,
    /// so the most recently used one is handed out first by the next expand.
    /// Oversized regions are released here.
    pub fn reset(&mut self) {
        let capacity = self.capacity;
        let chains = self.chains.get_mut();

        if chains.active.len() > 1 {
            let before = chains.active.len();
            chains.active.retain(|region| region.capacity <= capacity);
            let released = before - chains.active.len();

            // The origin is always a standard region, so `active` is not empty.
            if let Some(head) = chains.active.pop() {
                chains.free.append(&mut chains.active);
                chains.active.push(head);
            }

            trace!(released, free = chains.free.len(), "arena reset");
        }

        chains.head_mut().used = 0;
    }

    pub fn stats(&self) -> ArenaStats {
        let chains = self.chains.borrow();
        ArenaStats {
            active_regions: chains.active.len(),
            free_regions: chains.free.len(),
            acquired_regions: self.acquired.get(),
            head_used: chains.head().used,
        }
    }

    /// Releases every region, active and free.
    pub fn teardown(self) {
        trace!(stats = ?self.stats(), "arena teardown");
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head_base(arena: &Arena) -> *const u8 {
        arena.chains.borrow().head().data.as_ptr()
    }

    #[test]
    fn test_allocations_within_a_region_are_contiguous() {
        let arena = Arena::with_capacity(64);
        let a = arena.alloc(10);
        a.fill(0xaa);
        let b = arena.alloc(20);
        b.fill(0xbb);
        let c = arena.alloc(34);
        c.fill(0xcc);

        assert_eq!(a.as_ptr() as usize + 10, b.as_ptr() as usize);
        assert_eq!(b.as_ptr() as usize + 20, c.as_ptr() as usize);
        assert!(a.iter().all(|&x| x == 0xaa));
        assert!(b.iter().all(|&x| x == 0xbb));
        assert!(c.iter().all(|&x| x == 0xcc));
        assert_eq!(arena.stats().active_regions, 1);
        assert_eq!(arena.stats().head_used, 64);
    }

    #[test]
    fn test_full_region_expands() {
        let arena = Arena::with_capacity(64);
        let a1 = arena.alloc(40);
        a1.fill(1);
        let a2 = arena.alloc(30);
        a2.fill(2);

        assert_eq!(a2.as_ptr(), head_base(&arena));
        assert!(a1.iter().all(|&x| x == 1));

        let stats = arena.stats();
        assert_eq!(stats.active_regions, 2);
        assert_eq!(stats.acquired_regions, 2);
        assert_eq!(stats.head_used, 30);
    }

    #[test]
    fn test_reset_keeps_newest_region_and_frees_origin() {
        let mut arena = Arena::with_capacity(64);
        let origin = head_base(&arena);
        arena.alloc(40);
        let a2 = arena.alloc(30).as_ptr();

        arena.reset();
        let stats = arena.stats();
        assert_eq!(stats.active_regions, 1);
        assert_eq!(stats.free_regions, 1);
        assert_eq!(stats.head_used, 0);
        assert_eq!(head_base(&arena), a2);

        let a3 = arena.alloc(10).as_ptr();
        assert_eq!(a3, a2);

        // The first region comes back on the next expand.
        arena.alloc(60);
        assert_eq!(head_base(&arena), origin);
        assert_eq!(arena.stats().acquired_regions, 2);
    }

    #[test]
    fn test_first_allocation_after_reset_starts_at_base() {
        let mut arena = Arena::with_capacity(64);
        let base = head_base(&arena);
        arena.alloc(17);
        arena.reset();
        assert_eq!(arena.alloc(5).as_ptr(), base);
    }

    #[test]
    fn test_repeated_reset_is_idempotent() {
        let mut arena = Arena::with_capacity(64);
        arena.alloc(50);
        arena.alloc(50);
        arena.alloc(50);

        arena.reset();
        let first = arena.stats();
        arena.reset();
        arena.reset();
        assert_eq!(arena.stats(), first);
        assert_eq!(first.active_regions, 1);
        assert_eq!(first.free_regions, 2);
        assert_eq!(first.acquired_regions, 3);
    }

    #[test]
    fn test_regions_are_recycled_across_resets() {
        let mut arena = Arena::with_capacity(64);
        for _ in 0..10 {
            arena.alloc(64);
            arena.alloc(1);
            arena.reset();
        }

        let stats = arena.stats();
        assert_eq!(stats.acquired_regions, 2);
        assert_eq!(stats.active_regions + stats.free_regions, 2);
    }

    #[test]
    fn test_free_list_reuses_most_recent_first() {
        let mut arena = Arena::with_capacity(8);
        let r0 = head_base(&arena);
        arena.alloc(8);
        arena.alloc(8);
        let r1 = head_base(&arena);
        arena.alloc(8);
        let r2 = head_base(&arena);

        arena.reset();
        assert_eq!(head_base(&arena), r2);

        arena.alloc(8);
        arena.alloc(1);
        assert_eq!(head_base(&arena), r1);
        arena.alloc(8);
        assert_eq!(head_base(&arena), r0);
        assert_eq!(arena.stats().acquired_regions, 3);
    }

    #[test]
    fn test_oversized_allocation_gets_dedicated_region() {
        let arena = Arena::new();
        let small = arena.alloc(16);
        small.fill(7);

        let big = arena.alloc(100_000);
        assert_eq!(big.len(), 100_000);
        big.fill(0xff);

        assert!(small.iter().all(|&x| x == 7));
        let stats = arena.stats();
        assert_eq!(stats.active_regions, 2);
        assert_eq!(stats.free_regions, 0);
        assert_eq!(stats.head_used, 100_000);
    }

    #[test]
    fn test_oversized_region_is_released_on_reset() {
        let mut arena = Arena::new();
        let origin = head_base(&arena);
        let big = arena.alloc(100_000).as_ptr();

        arena.reset();
        let stats = arena.stats();
        assert_eq!(stats.active_regions, 1);
        assert_eq!(stats.free_regions, 0);

        let next = arena.alloc(50).as_ptr();
        assert_ne!(next, big);
        assert_eq!(next, origin);
    }

    #[test]
    fn test_small_allocation_after_oversized_expands() {
        let mut arena = Arena::with_capacity(64);
        arena.alloc(100);
        let after = arena.alloc(4).as_ptr();
        assert_eq!(after, head_base(&arena));
        assert_eq!(arena.stats().active_regions, 3);

        arena.reset();
        let stats = arena.stats();
        assert_eq!(stats.active_regions, 1);
        assert_eq!(stats.free_regions, 1);
        assert_eq!(head_base(&arena), after);
    }

    #[test]
    fn test_zero_sized_allocation() {
        let arena = Arena::with_capacity(4);
        arena.alloc(4);
        assert!(arena.alloc(0).is_empty());
        assert_eq!(arena.stats().active_regions, 1);
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn test_zero_capacity_panics() {
        Arena::with_capacity(0);
    }
}
