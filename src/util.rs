use core::alloc::Layout;
use core::mem;

use crate::allocator::AllocError;
use crate::vector::INITIAL_CAPACITY;

pub(crate) const fn is_zst<T>() -> bool {
    mem::size_of::<T>() == 0
}

pub(crate) fn array_layout<T>(n: usize) -> Result<Layout, AllocError> {
    Layout::array::<T>(n).map_err(|_| AllocError)
}

/// Computes the capacity to grow to so that at least `required` items fit.
///
/// The first allocation reserves `INITIAL_CAPACITY` slots (or `required` if larger), subsequent
/// ones add half of the current capacity, so growing past 8 items yields 12.
///
/// Note that this is one slot less than a `required + cap / 2` rule, which yields 13 for the
/// same push: the half is added to the current capacity, not to the requested size.
pub(crate) fn grow_capacity(cap: usize, required: usize) -> Result<usize, AllocError> {
    const MAX: usize = isize::MAX as usize;

    let new_cap = if cap == 0 {
        required.max(INITIAL_CAPACITY)
    } else {
        cap.checked_add(cap / 2).ok_or(AllocError)?.max(required)
    };

    if new_cap > MAX {
        if required <= MAX {
            return Ok(required);
        }

        return Err(AllocError);
    }

    Ok(new_cap)
}

/// Maps a signed hash onto `[0, buckets)`.
#[inline]
pub(crate) fn bucket_index(hash: i32, buckets: usize) -> usize {
    debug_assert!(buckets > 0);
    // Computed in i64 so that neither the i32 hash nor the bucket count is truncated on
    // 16-bit targets.
    (hash as i64).rem_euclid(buckets as i64) as usize
}

// Waiting for `non_null_convenience` to be stabilized.
pub(crate) mod nnptr {
    use core::ptr::{self, NonNull};

    #[inline(always)]
    pub unsafe fn read<T>(src: NonNull<T>) -> T {
        ptr::read(src.as_ptr())
    }

    #[inline(always)]
    pub unsafe fn write<T>(dst: NonNull<T>, val: T) {
        ptr::write(dst.as_ptr(), val)
    }

    #[inline(always)]
    pub unsafe fn add<T>(p: NonNull<T>, count: usize) -> NonNull<T> {
        NonNull::new_unchecked(p.as_ptr().add(count))
    }
}

#[test]
fn first_growth_reserves_initial_capacity() {
    assert_eq!(grow_capacity(0, 1).unwrap(), 8);
    assert_eq!(grow_capacity(0, 20).unwrap(), 20);
}

#[test]
fn growth_adds_half() {
    assert_eq!(grow_capacity(8, 9).unwrap(), 12);
    assert_eq!(grow_capacity(12, 13).unwrap(), 18);
    assert_eq!(grow_capacity(8, 100).unwrap(), 100);
    assert_eq!(grow_capacity(1, 2).unwrap(), 2);
}

#[test]
fn growth_overflow() {
    assert!(grow_capacity(usize::MAX - 1, usize::MAX).is_err());
    assert_eq!(grow_capacity(isize::MAX as usize - 1, isize::MAX as usize).unwrap(), isize::MAX as usize);
}

#[test]
fn negative_hashes_wrap_into_range() {
    assert_eq!(bucket_index(0, 4), 0);
    assert_eq!(bucket_index(5, 4), 1);
    assert_eq!(bucket_index(-1, 4), 3);
    assert_eq!(bucket_index(-4, 4), 0);
    assert_eq!(bucket_index(i32::MIN, 3), ((i32::MIN as i64 % 3 + 3) % 3) as usize);
    assert_eq!(bucket_index(i32::MAX, 1), 0);
    // Hashes that do not fit in 16 bits.
    assert_eq!(bucket_index(65537, 3), 2);
    assert_eq!(bucket_index(-65537, 3), 1);
    assert_eq!(bucket_index(i16::MAX as i32 + 1, 5), 32768 % 5);
    assert_eq!(bucket_index(i32::MAX, 7), (i32::MAX % 7) as usize);
}
