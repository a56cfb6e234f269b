//! Allocator plumbing.
//!
//! Containers are parameterized over the [`Allocator`] trait from `allocator-api2`, which mirrors
//! the unstable `core::alloc::Allocator`. [`Global`] binds to the host heap and is the default.
//!
//! [`FnAllocator`] covers the case where the heap is only reachable through a C-style triple of
//! `alloc`/`realloc`/`free` functions, as is common with vendor SDKs and RTOS kernels.

use core::ptr::{self, NonNull};

pub use allocator_api2::alloc::{AllocError, Allocator, Global, Layout};

/// `alloc(size)`: returns a block of at least `size` bytes, or null.
pub type AllocFn = unsafe fn(usize) -> *mut u8;
/// `realloc(ptr, size)`: resizes a block, or returns null and leaves `ptr` untouched.
pub type ReallocFn = unsafe fn(*mut u8, usize) -> *mut u8;
/// `free(ptr)`: releases a block returned by `alloc` or `realloc`.
pub type FreeFn = unsafe fn(*mut u8);

/// An [`Allocator`] forwarding to a `malloc`/`realloc`/`free` style triple.
///
/// The callbacks must follow the C contract. In particular `realloc` must not release the
/// original block when it fails, otherwise a failed growth would leave containers pointing at
/// freed memory.
///
/// The alignment the heap guarantees is given at construction (8 for 32-bit newlib, 16 for
/// glibc on 64-bit hosts); layouts requiring stricter alignment are refused. Zero-sized requests
/// are served with dangling pointers and never reach the callbacks.
#[derive(Copy, Clone)]
pub struct FnAllocator {
    alloc: AllocFn,
    realloc: ReallocFn,
    free: FreeFn,
    align: usize,
}

impl FnAllocator {
    /// # Safety
    ///
    /// The three functions must implement the C heap contract and operate on the same heap.
    /// Every block returned by `alloc` and `realloc` must be aligned to at least `align` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two.
    pub const unsafe fn new(alloc: AllocFn, realloc: ReallocFn, free: FreeFn, align: usize) -> Self {
        assert!(align.is_power_of_two(), "heap alignment must be a power of two");

        FnAllocator { alloc, realloc, free, align }
    }

    /// Largest alignment this allocator can serve.
    #[inline]
    pub const fn alignment(&self) -> usize {
        self.align
    }

    #[inline]
    fn dangling(layout: Layout) -> NonNull<[u8]> {
        // Layout alignments are non-zero powers of two.
        let ptr = unsafe { NonNull::new_unchecked(layout.align() as *mut u8) };
        NonNull::slice_from_raw_parts(ptr, 0)
    }

    #[inline]
    fn check_align(&self, layout: Layout) -> Result<(), AllocError> {
        if layout.align() > self.align {
            return Err(AllocError);
        }

        Ok(())
    }

    /// Resizes a block in place or by moving it, through the `realloc` callback.
    unsafe fn resize(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        self.check_align(new_layout)?;

        if old_layout.size() == 0 {
            return self.allocate(new_layout);
        }

        if new_layout.size() == 0 {
            self.deallocate(ptr, old_layout);
            return Ok(Self::dangling(new_layout));
        }

        let new_ptr = NonNull::new((self.realloc)(ptr.as_ptr(), new_layout.size())).ok_or(AllocError)?;

        Ok(NonNull::slice_from_raw_parts(new_ptr, new_layout.size()))
    }
}

impl core::fmt::Debug for FnAllocator {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("FnAllocator")
            .field("alloc", &(self.alloc as *const ()))
            .field("realloc", &(self.realloc as *const ()))
            .field("free", &(self.free as *const ()))
            .field("align", &self.align)
            .finish()
    }
}

unsafe impl Allocator for FnAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        self.check_align(layout)?;

        if layout.size() == 0 {
            return Ok(Self::dangling(layout));
        }

        let ptr = NonNull::new(unsafe { (self.alloc)(layout.size()) }).ok_or(AllocError)?;

        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    fn allocate_zeroed(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        let block = self.allocate(layout)?;
        unsafe {
            ptr::write_bytes(block.cast::<u8>().as_ptr(), 0, layout.size());
        }

        Ok(block)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }

        (self.free)(ptr.as_ptr());
    }

    unsafe fn grow(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        debug_assert!(
            new_layout.size() >= old_layout.size(),
            "`new_layout.size()` must be greater than or equal to `old_layout.size()`"
        );

        self.resize(ptr, old_layout, new_layout)
    }

    unsafe fn grow_zeroed(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        let block = self.grow(ptr, old_layout, new_layout)?;
        let start = block.cast::<u8>().as_ptr().add(old_layout.size());
        ptr::write_bytes(start, 0, new_layout.size() - old_layout.size());

        Ok(block)
    }

    unsafe fn shrink(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        debug_assert!(
            new_layout.size() <= old_layout.size(),
            "`new_layout.size()` must be smaller than or equal to `old_layout.size()`"
        );

        self.resize(ptr, old_layout, new_layout)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Allocators used by the unit tests.

    use super::*;
    use core::cell::Cell;
    use std::alloc as sys;

    pub const ALIGN: usize = 16;
    const HEADER: usize = ALIGN;

    fn block_layout(size: usize) -> sys::Layout {
        sys::Layout::from_size_align(size + HEADER, ALIGN).unwrap()
    }

    /// A `malloc` lookalike that stores the block size in front of the returned pointer.
    pub unsafe fn c_alloc(size: usize) -> *mut u8 {
        let base = sys::alloc(block_layout(size));
        if base.is_null() {
            return base;
        }
        (base as *mut usize).write(size);
        base.add(HEADER)
    }

    pub unsafe fn c_realloc(ptr: *mut u8, size: usize) -> *mut u8 {
        let base = ptr.sub(HEADER);
        let old_size = (base as *mut usize).read();
        let new_base = sys::realloc(base, block_layout(old_size), size + HEADER);
        if new_base.is_null() {
            return new_base;
        }
        (new_base as *mut usize).write(size);
        new_base.add(HEADER)
    }

    pub unsafe fn c_free(ptr: *mut u8) {
        let base = ptr.sub(HEADER);
        let size = (base as *mut usize).read();
        sys::dealloc(base, block_layout(size));
    }

    pub unsafe fn null_alloc(_: usize) -> *mut u8 {
        ptr::null_mut()
    }

    pub unsafe fn null_realloc(_: *mut u8, _: usize) -> *mut u8 {
        ptr::null_mut()
    }

    pub fn c_heap() -> FnAllocator {
        unsafe { FnAllocator::new(c_alloc, c_realloc, c_free, ALIGN) }
    }

    /// Same heap, declared with the 8-byte guarantee of 32-bit C runtimes.
    pub fn align8_heap() -> FnAllocator {
        unsafe { FnAllocator::new(c_alloc, c_realloc, c_free, 8) }
    }

    /// Allocates with `c_alloc` but refuses to ever resize a block.
    pub fn no_realloc_heap() -> FnAllocator {
        unsafe { FnAllocator::new(c_alloc, null_realloc, c_free, ALIGN) }
    }

    /// Forwards to `Global`, failing once `budget` allocations or reallocations were made,
    /// and keeps track of live blocks.
    pub struct Budget {
        remaining: Cell<usize>,
        live: Cell<isize>,
    }

    impl Budget {
        pub fn new(budget: usize) -> Self {
            Budget { remaining: Cell::new(budget), live: Cell::new(0) }
        }

        pub fn unlimited() -> Self {
            Self::new(usize::MAX)
        }

        pub fn live_blocks(&self) -> isize {
            self.live.get()
        }

        pub fn set_budget(&self, budget: usize) {
            self.remaining.set(budget);
        }

        fn spend(&self) -> Result<(), AllocError> {
            let remaining = self.remaining.get();
            if remaining == 0 {
                return Err(AllocError);
            }
            self.remaining.set(remaining - 1);

            Ok(())
        }
    }

    unsafe impl Allocator for Budget {
        fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
            self.spend()?;
            let block = Global.allocate(layout)?;
            self.live.set(self.live.get() + 1);

            Ok(block)
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            self.live.set(self.live.get() - 1);
            Global.deallocate(ptr, layout)
        }

        unsafe fn grow(
            &self,
            ptr: NonNull<u8>,
            old_layout: Layout,
            new_layout: Layout,
        ) -> Result<NonNull<[u8]>, AllocError> {
            self.spend()?;
            Global.grow(ptr, old_layout, new_layout)
        }
    }
}

#[test]
fn fn_allocator_round_trip() {
    let heap = testing::c_heap();
    let layout = Layout::array::<u64>(4).unwrap();

    unsafe {
        let block = heap.allocate(layout).unwrap().cast::<u64>();
        for i in 0..4 {
            block.as_ptr().add(i).write(i as u64 * 3);
        }

        let bigger = Layout::array::<u64>(32).unwrap();
        let block = heap.grow(block.cast(), layout, bigger).unwrap().cast::<u64>();
        for i in 0..4 {
            assert_eq!(block.as_ptr().add(i).read(), i as u64 * 3);
        }

        heap.deallocate(block.cast(), bigger);
    }
}

#[test]
fn fn_allocator_null_is_an_error() {
    let heap = unsafe { FnAllocator::new(testing::null_alloc, testing::null_realloc, testing::c_free, 16) };
    assert!(heap.allocate(Layout::new::<u32>()).is_err());
}

#[test]
fn fn_allocator_zero_sized() {
    // The callbacks would fail, zero-sized requests must not reach them.
    let heap = unsafe { FnAllocator::new(testing::null_alloc, testing::null_realloc, testing::c_free, 16) };
    let layout = Layout::new::<()>();
    let block = heap.allocate(layout).unwrap();
    assert_eq!(block.len(), 0);
    unsafe { heap.deallocate(block.cast(), layout) };
}

#[test]
fn fn_allocator_rejects_over_aligned() {
    let heap = testing::c_heap();
    assert_eq!(heap.alignment(), 16);
    assert!(heap.allocate(Layout::from_size_align(64, 64).unwrap()).is_err());

    let heap = testing::align8_heap();
    assert_eq!(heap.alignment(), 8);
    assert!(heap.allocate(Layout::from_size_align(32, 16).unwrap()).is_err());

    let layout = Layout::from_size_align(32, 8).unwrap();
    let block = heap.allocate(layout).unwrap();
    assert_eq!(block.cast::<u8>().as_ptr() as usize % 8, 0);
    unsafe { heap.deallocate(block.cast(), layout) };
}

#[test]
#[should_panic]
fn fn_allocator_alignment_must_be_power_of_two() {
    let _ = unsafe { FnAllocator::new(testing::c_alloc, testing::c_realloc, testing::c_free, 12) };
}

#[test]
fn fn_allocator_failed_grow_keeps_block() {
    let heap = testing::no_realloc_heap();
    let layout = Layout::array::<u32>(2).unwrap();

    unsafe {
        let block = heap.allocate(layout).unwrap().cast::<u32>();
        block.as_ptr().write(7);

        assert!(heap.grow(block.cast(), layout, Layout::array::<u32>(8).unwrap()).is_err());
        assert_eq!(block.as_ptr().read(), 7);

        heap.deallocate(block.cast(), layout);
    }
}
