//! A growable contiguous sequence with an injected allocator.

use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};

use crate::allocator::{AllocError, Allocator, Global};
use crate::util::{self, is_zst, nnptr};

/// Number of slots reserved by the first allocation of a [`Vector`].
pub const INITIAL_CAPACITY: usize = 8;

/// A heap allocated, growable contiguous buffer containing elements of type `T`.
///
/// Unlike `alloc::vec::Vec`, all allocating operations are fallible: running out of memory is
/// reported with an [`AllocError`] and leaves the vector untouched.
///
/// The first allocation reserves [`INITIAL_CAPACITY`] slots, and each subsequent one grows the
/// capacity by half. Storage is only released by [`Vector::clear`] and on drop; the vector never
/// shrinks otherwise.
///
/// Borrows of the elements (slices, iterators) cannot outlive a call to `try_push` or `clear`,
/// both of which may move or release the storage.
pub struct Vector<T, A: Allocator = Global> {
    data: NonNull<T>,
    len: usize,
    cap: usize,
    allocator: A,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send, A: Allocator + Send> Send for Vector<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for Vector<T, A> {}

impl<T> Vector<T, Global> {
    /// Creates an empty vector using the global heap, without allocating.
    #[inline]
    pub fn new() -> Self {
        Vector::new_in(Global)
    }
}

impl<T, A: Allocator> Vector<T, A> {
    /// Creates an empty vector that will allocate from `allocator`. Does not allocate.
    #[inline]
    pub fn new_in(allocator: A) -> Self {
        Vector {
            data: NonNull::dangling(),
            len: 0,
            cap: 0,
            allocator,
            _marker: PhantomData,
        }
    }

    /// Creates an empty vector with room for at least `cap` items.
    pub fn try_with_capacity_in(cap: usize, allocator: A) -> Result<Self, AllocError> {
        let mut v = Vector::new_in(allocator);
        v.try_reserve(cap)?;

        Ok(v)
    }

    #[inline]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    #[inline]
    /// Returns `true` if the vector contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    /// Returns the number of elements in the vector, also referred to as its ‘length’.
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    /// Returns the total number of elements the vector can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Returns number of elements that can be added without reallocating.
    #[inline]
    pub fn remaining_capacity(&self) -> usize {
        self.cap - self.len
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { core::slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { core::slice::from_raw_parts_mut(self.data.as_ptr(), self.len) }
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.as_mut_slice().get_mut(index)
    }

    /// Tries to reserve at least enough space for `additional` extra items.
    #[inline]
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        if self.remaining_capacity() < additional {
            let required = self.len.checked_add(additional).ok_or(AllocError)?;
            self.try_grow_to(required)?;
        }

        Ok(())
    }

    #[cold]
    fn try_grow_to(&mut self, required: usize) -> Result<(), AllocError> {
        profiling::scope!("Vector::try_grow_to");

        let old_cap = self.cap;
        let new_cap = util::grow_capacity(old_cap, required)?;

        if !is_zst::<T>() {
            let new_layout = util::array_layout::<T>(new_cap)?;
            let block = if old_cap == 0 {
                self.allocator.allocate(new_layout)?
            } else {
                let old_layout = util::array_layout::<T>(old_cap)?;
                // On failure the old block is left as is.
                unsafe { self.allocator.grow(self.data.cast(), old_layout, new_layout)? }
            };

            self.data = block.cast();
        }

        log::trace!("vector storage grew from {} to {} items", old_cap, new_cap);
        self.cap = new_cap;

        Ok(())
    }

    /// Appends an element to the back of the vector, allocating if needed.
    ///
    /// If the allocation fails, the vector is left unchanged and `value` is dropped.
    #[inline]
    pub fn try_push(&mut self, value: T) -> Result<(), AllocError> {
        // Inform codegen that the length does not change across try_grow_to.
        let len = self.len;

        if len == self.cap {
            self.try_grow_to(len + 1)?;
        }

        unsafe {
            nnptr::write(nnptr::add(self.data, len), value);
        }
        self.len = len + 1;

        Ok(())
    }

    /// Appends an element if there is sufficient spare capacity, otherwise an error is returned
    /// with the element.
    ///
    /// Unlike `try_push` this method will not reallocate when there’s insufficient capacity.
    #[inline]
    pub fn push_within_capacity(&mut self, value: T) -> Result<(), T> {
        if self.len == self.cap {
            return Err(value);
        }

        unsafe {
            nnptr::write(nnptr::add(self.data, self.len), value);
        }
        self.len += 1;

        Ok(())
    }

    /// Removes the last element from the vector and returns it, or `None` if it is empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }

        self.len -= 1;
        unsafe { Some(nnptr::read(nnptr::add(self.data, self.len))) }
    }

    /// Drops all elements and releases the storage.
    ///
    /// The vector goes back to its unallocated state; the next push allocates
    /// [`INITIAL_CAPACITY`] slots again.
    pub fn clear(&mut self) {
        let elems: *mut [T] = self.as_mut_slice();
        self.len = 0;
        unsafe {
            ptr::drop_in_place(elems);
        }

        if self.cap == 0 {
            return;
        }

        if !is_zst::<T>() {
            // The layout was valid when the block was allocated.
            if let Ok(layout) = util::array_layout::<T>(self.cap) {
                unsafe {
                    self.allocator.deallocate(self.data.cast(), layout);
                }
            }
        }

        log::trace!("vector storage released ({} items)", self.cap);
        self.data = NonNull::dangling();
        self.cap = 0;
    }

    /// Clones the vector into a fresh allocation from a clone of the same allocator.
    pub fn try_clone(&self) -> Result<Self, AllocError>
    where
        T: Clone,
        A: Clone,
    {
        let mut v = Vector::try_with_capacity_in(self.len, self.allocator.clone())?;
        for item in self.iter() {
            let _r = v.push_within_capacity(item.clone());
            debug_assert!(_r.is_ok());
        }

        Ok(v)
    }
}

impl<T, A: Allocator> Drop for Vector<T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, A: Allocator + Default> Default for Vector<T, A> {
    fn default() -> Self {
        Vector::new_in(A::default())
    }
}

impl<T, A: Allocator> Deref for Vector<T, A> {
    type Target = [T];
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for Vector<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, A: Allocator> AsRef<[T]> for Vector<T, A> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> AsMut<[T]> for Vector<T, A> {
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a Vector<T, A> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;
    fn into_iter(self) -> core::slice::Iter<'a, T> {
        self.as_slice().iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut Vector<T, A> {
    type Item = &'a mut T;
    type IntoIter = core::slice::IterMut<'a, T>;
    fn into_iter(self) -> core::slice::IterMut<'a, T> {
        self.as_mut_slice().iter_mut()
    }
}

impl<T: PartialEq, A: Allocator, B: Allocator> PartialEq<Vector<T, B>> for Vector<T, A> {
    fn eq(&self, other: &Vector<T, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: PartialEq, A: Allocator> PartialEq<&[T]> for Vector<T, A> {
    fn eq(&self, other: &&[T]) -> bool {
        self.as_slice() == *other
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Vector<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.as_slice().fmt(f)
    }
}

#[cfg(test)]
use crate::allocator::testing;

// In order to give us a chance to catch leaks and double-frees, test with values that implement drop.
#[cfg(test)]
fn num(val: u32) -> std::boxed::Box<u32> {
    std::boxed::Box::new(val)
}

#[test]
fn single_push() {
    let mut v = Vector::new();
    assert_eq!(v.capacity(), 0);

    v.try_push(42i32).unwrap();

    assert_eq!(v.len(), 1);
    assert_eq!(v.capacity(), INITIAL_CAPACITY);
    assert_eq!(v[0], 42);
}

#[test]
fn grows_by_half() {
    let mut v = Vector::new();
    for i in 1..=8i32 {
        v.try_push(i).unwrap();
    }
    assert_eq!(v.capacity(), 8);

    v.try_push(9).unwrap();
    assert_eq!(v.len(), 9);
    assert_eq!(v.capacity(), 12);
    assert_eq!(v.as_slice(), &[1, 2, 3, 4, 5, 6, 7, 8, 9]);

    for i in 10..=13 {
        v.try_push(i).unwrap();
    }
    assert_eq!(v.capacity(), 18);
}

#[test]
fn length_and_capacity_track_pushes() {
    let mut v = Vector::new();
    for n in 1..=500u32 {
        v.try_push(n).unwrap();
        assert_eq!(v.len(), n as usize);
        assert!(v.capacity() >= v.len());
    }

    assert!(v.iter().copied().eq(1..=500));
}

#[test]
fn clear_releases_storage() {
    let heap = testing::Budget::unlimited();
    let mut v = Vector::new_in(&heap);
    for i in 0..20 {
        v.try_push(num(i)).unwrap();
    }
    assert_eq!(heap.live_blocks(), 1);

    v.clear();
    assert_eq!(v.len(), 0);
    assert_eq!(v.capacity(), 0);
    assert!(v.is_empty());
    assert_eq!(heap.live_blocks(), 0);

    v.try_push(num(1)).unwrap();
    assert_eq!(v.capacity(), 8);
    assert_eq!(v.as_slice(), &[num(1)]);
    assert!(core::ptr::eq(*v.allocator(), &heap));

    // Clearing an unallocated vector is a no-op.
    let mut empty: Vector<u8, _> = Vector::new_in(&heap);
    empty.clear();
    empty.clear();

    drop(v);
    assert_eq!(heap.live_blocks(), 0);
}

#[test]
fn failed_first_allocation() {
    let heap = testing::Budget::new(0);
    let mut v = Vector::new_in(&heap);

    assert_eq!(v.try_push(1u64), Err(AllocError));
    assert_eq!(v.len(), 0);
    assert_eq!(v.capacity(), 0);
}

#[test]
fn failed_growth_keeps_contents() {
    let heap = testing::Budget::new(1);
    let mut v = Vector::new_in(&heap);
    for i in 0..8 {
        v.try_push(num(i)).unwrap();
    }

    assert!(v.try_push(num(8)).is_err());
    assert_eq!(v.len(), 8);
    assert_eq!(v.capacity(), 8);
    assert_eq!(v.as_slice(), &[num(0), num(1), num(2), num(3), num(4), num(5), num(6), num(7)]);

    heap.set_budget(1);
    v.try_push(num(8)).unwrap();
    assert_eq!(v.len(), 9);
    assert_eq!(v.capacity(), 12);
    assert_eq!(*v[8], 8);

    drop(v);
    assert_eq!(heap.live_blocks(), 0);
}

#[test]
fn fn_allocator_backed() {
    let mut v = Vector::new_in(testing::c_heap());
    for i in 0..100u16 {
        v.try_push(i).unwrap();
    }

    assert_eq!(v.len(), 100);
    assert!(v.iter().copied().eq(0..100));
}

#[test]
fn over_aligned_items_need_a_matching_heap() {
    #[derive(Copy, Clone, Debug, PartialEq)]
    #[repr(align(16))]
    struct Aligned16(u32);

    let mut v = Vector::new_in(testing::align8_heap());
    assert_eq!(v.try_push(Aligned16(1)), Err(AllocError));
    assert_eq!(v.len(), 0);
    assert_eq!(v.capacity(), 0);
    assert!(v.as_slice().is_empty());

    let mut v = Vector::new_in(testing::c_heap());
    v.try_push(Aligned16(1)).unwrap();
    assert_eq!(v.as_slice(), &[Aligned16(1)]);
    assert_eq!(v.as_slice().as_ptr() as usize % 16, 0);
}

#[test]
fn fn_allocator_realloc_failure() {
    let mut v = Vector::new_in(testing::no_realloc_heap());
    for i in 0..8u32 {
        v.try_push(i).unwrap();
    }

    assert_eq!(v.try_push(8), Err(AllocError));
    assert_eq!(v.as_slice(), &[0, 1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn push_within_capacity() {
    let mut v: Vector<u32> = Vector::new();
    assert_eq!(v.push_within_capacity(1), Err(1));

    v.try_reserve(2).unwrap();
    assert_eq!(v.capacity(), 8);
    for i in 0..8 {
        v.push_within_capacity(i).unwrap();
    }
    assert_eq!(v.push_within_capacity(8), Err(8));
}

#[test]
fn pop_and_mutate() {
    let mut v = Vector::new();
    for i in 0..4u32 {
        v.try_push(i).unwrap();
    }

    for item in &mut v {
        *item *= 10;
    }
    *v.get_mut(0).unwrap() = 5;

    assert_eq!(v.get(4), None);
    assert_eq!(v.pop(), Some(30));
    assert_eq!(v.as_slice(), &[5, 10, 20]);
}

#[test]
fn try_clone() {
    let mut a = Vector::new();
    a.try_push(num(1)).unwrap();
    a.try_push(num(2)).unwrap();

    let b = a.try_clone().unwrap();
    assert_eq!(a, b);
    assert_eq!(b.capacity(), 8);
}

#[test]
fn zero_sized_items() {
    let heap = testing::Budget::new(0);
    let mut v = Vector::new_in(&heap);
    for _ in 0..9 {
        v.try_push(()).unwrap();
    }

    assert_eq!(v.len(), 9);
    assert_eq!(v.capacity(), 12);
    assert_eq!(heap.live_blocks(), 0);
}
