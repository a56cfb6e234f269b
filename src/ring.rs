//! A fixed-capacity FIFO queue stored inline.
//!
//! Writes always succeed: putting into a full ring evicts the oldest element. The `full` flag
//! tells the full and empty states apart since `head == tail` in both.

use core::fmt;
use core::mem::MaybeUninit;

pub struct Ring<T, const N: usize> {
    slots: [MaybeUninit<T>; N],
    /// Next slot to write.
    head: usize,
    /// Next slot to read.
    tail: usize,
    full: bool,
}

impl<T, const N: usize> Ring<T, N> {
    const HAS_SLOTS: () = assert!(N > 0, "Ring needs at least one slot");

    /// Creates an empty ring.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::HAS_SLOTS;

        Ring {
            // An array of `MaybeUninit` does not require initialization.
            slots: unsafe { MaybeUninit::uninit().assume_init() },
            head: 0,
            tail: 0,
            full: false,
        }
    }

    #[inline(always)]
    fn advance(index: usize) -> usize {
        if index + 1 == N {
            0
        } else {
            index + 1
        }
    }

    /// Maximum number of elements the ring holds.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail && !self.full
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Returns the number of elements in the ring.
    #[inline]
    pub fn len(&self) -> usize {
        if self.full {
            return N;
        }

        (self.head + N - self.tail) % N
    }

    /// Appends `value` at the back of the queue.
    ///
    /// If the ring is full, the oldest element is removed to make room and returned.
    pub fn put(&mut self, value: T) -> Option<T> {
        let evicted = if self.full {
            // When full, the oldest element sits in the slot about to be written.
            let oldest = unsafe { self.slots[self.tail].assume_init_read() };
            self.tail = Self::advance(self.tail);
            Some(oldest)
        } else {
            None
        };

        self.slots[self.head].write(value);
        self.head = Self::advance(self.head);
        self.full = self.head == self.tail;

        evicted
    }

    /// Removes the oldest element and returns it, or `None` if the ring is empty.
    pub fn get(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let value = unsafe { self.slots[self.tail].assume_init_read() };
        self.full = false;
        self.tail = Self::advance(self.tail);

        Some(value)
    }

    /// Returns a reference to the oldest element without removing it.
    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }

        unsafe { Some(self.slots[self.tail].assume_init_ref()) }
    }

    pub fn peek_mut(&mut self) -> Option<&mut T> {
        if self.is_empty() {
            return None;
        }

        unsafe { Some(self.slots[self.tail].assume_init_mut()) }
    }

    /// Drops all elements and resets the ring to its initial state.
    pub fn clear(&mut self) {
        while self.get().is_some() {}

        self.head = 0;
        self.tail = 0;
        self.full = false;
    }

    /// Iterates over the elements from oldest to newest.
    pub fn iter(&self) -> Iter<'_, T, N> {
        Iter {
            ring: self,
            index: self.tail,
            remaining: self.len(),
        }
    }
}

impl<T, const N: usize> Drop for Ring<T, N> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, const N: usize> Default for Ring<T, N> {
    fn default() -> Self {
        Ring::new()
    }
}

impl<T: Clone, const N: usize> Clone for Ring<T, N> {
    fn clone(&self) -> Self {
        let mut ring = Ring::new();
        for item in self.iter() {
            ring.put(item.clone());
        }

        ring
    }
}

impl<T: fmt::Debug, const N: usize> fmt::Debug for Ring<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, T, const N: usize> {
    ring: &'a Ring<T, N>,
    index: usize,
    remaining: usize,
}

impl<'a, T, const N: usize> Iterator for Iter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }

        let item = unsafe { self.ring.slots[self.index].assume_init_ref() };
        self.index = Ring::<T, N>::advance(self.index);
        self.remaining -= 1;

        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T, const N: usize> ExactSizeIterator for Iter<'a, T, N> {}

impl<'a, T, const N: usize> IntoIterator for &'a Ring<T, N> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, N>;
    fn into_iter(self) -> Iter<'a, T, N> {
        self.iter()
    }
}

#[cfg(test)]
fn assert_state<T, const N: usize>(ring: &Ring<T, N>) {
    assert!(!(ring.is_empty() && ring.is_full()));
    assert!(ring.head < N && ring.tail < N);
    if ring.len() > 0 && ring.len() < N {
        assert!(!ring.is_empty());
        assert!(!ring.is_full());
    }
    assert_eq!(ring.is_empty(), ring.len() == 0);
    assert_eq!(ring.is_full(), ring.len() == N);
}

#[test]
fn fill_then_drain() {
    let mut ring: Ring<i32, 3> = Ring::new();
    assert!(ring.is_empty());
    assert_eq!(ring.capacity(), 3);

    assert_eq!(ring.put(1), None);
    assert_eq!(ring.put(2), None);
    assert_eq!(ring.put(3), None);
    assert!(ring.is_full());
    assert_eq!(ring.len(), 3);

    assert_eq!(ring.get(), Some(1));
    assert_eq!(ring.get(), Some(2));
    assert_eq!(ring.get(), Some(3));
    assert_eq!(ring.get(), None);
    assert!(ring.is_empty());
}

#[test]
fn overwrite_oldest() {
    let mut ring: Ring<i32, 3> = Ring::new();
    ring.put(1);
    ring.put(2);
    ring.put(3);
    assert_eq!(ring.put(4), Some(1));
    assert!(ring.is_full());

    assert_eq!(ring.get(), Some(2));
    assert_eq!(ring.get(), Some(3));
    assert_eq!(ring.get(), Some(4));
    assert_eq!(ring.get(), None);
}

#[test]
fn single_slot() {
    let mut ring: Ring<u8, 1> = Ring::new();
    assert_eq!(ring.capacity(), 1);
    ring.put(1);
    assert!(ring.is_full());
    assert_eq!(ring.len(), 1);

    assert_eq!(ring.put(2), Some(1));
    assert!(ring.is_full());

    assert_eq!(ring.get(), Some(2));
    assert!(ring.is_empty());
    assert_eq!(ring.get(), None);
}

#[test]
fn fifo_across_wraparound() {
    let mut ring: Ring<u32, 5> = Ring::new();
    let mut next_in = 0;
    let mut next_out = 0;

    for round in 0..50 {
        for _ in 0..(round % 5 + 1) {
            ring.put(next_in);
            next_in += 1;
            assert_state(&ring);
        }
        while let Some(v) = ring.get() {
            assert_eq!(v, next_out);
            next_out += 1;
            assert_state(&ring);
        }
    }
    assert_eq!(next_in, next_out);
}

#[test]
fn slow_consumer_sees_latest() {
    let mut ring: Ring<u32, 4> = Ring::new();
    for i in 0..100 {
        ring.put(i);
        assert_state(&ring);
    }

    assert!(ring.iter().copied().eq(96..100));
    assert_eq!(ring.iter().len(), 4);
}

#[test]
fn peek() {
    let mut ring: Ring<u32, 2> = Ring::new();
    assert_eq!(ring.peek(), None);

    ring.put(5);
    ring.put(6);
    assert_eq!(ring.peek(), Some(&5));
    assert_eq!(ring.len(), 2);

    *ring.peek_mut().unwrap() = 50;
    assert_eq!(ring.get(), Some(50));
    assert_eq!(ring.peek(), Some(&6));
}

#[test]
fn clear() {
    let mut ring: Ring<u32, 3> = Ring::new();
    ring.put(1);
    ring.put(2);
    ring.put(3);
    ring.put(4);

    ring.clear();
    assert!(ring.is_empty());
    assert_eq!(ring.len(), 0);
    assert_eq!(ring.get(), None);

    ring.put(7);
    assert_eq!(ring.get(), Some(7));
}

#[test]
fn drops_live_elements() {
    use std::rc::Rc;

    let token = Rc::new(());
    {
        let mut ring: Ring<Rc<()>, 3> = Ring::new();
        for _ in 0..5 {
            ring.put(token.clone());
        }
        assert_eq!(Rc::strong_count(&token), 4);

        let copy = ring.clone();
        assert_eq!(Rc::strong_count(&token), 7);
        drop(copy);

        ring.get();
        assert_eq!(Rc::strong_count(&token), 3);
    }

    assert_eq!(Rc::strong_count(&token), 1);
}

#[test]
fn debug_lists_oldest_first() {
    let mut ring: Ring<u8, 2> = Ring::new();
    ring.put(1);
    ring.put(2);
    ring.put(3);

    assert_eq!(std::format!("{:?}", ring), "[2, 3]");
}
