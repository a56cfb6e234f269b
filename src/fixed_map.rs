//! A hash map with a fixed number of separately chained buckets.
//!
//! The bucket count is a const generic so that the bucket array lives inline in the map. Each
//! bucket is a [`Vector`] of [`Pair`]s sharing the map's allocator. There is no rehashing: a high
//! load factor only makes lookups scan longer chains.

use core::fmt;

use crate::allocator::{AllocError, Allocator, Global};
use crate::pair::Pair;
use crate::util;
use crate::vector::Vector;

/// User supplied hash function.
///
/// Keys that compare equal must hash to the same value. Negative values are fine, they are
/// mapped to a bucket with a euclidean modulo.
pub type HashFn<K> = fn(&K) -> i32;

type Bucket<K, V, A> = Vector<Pair<K, V>, A>;

/// The reasons an insertion can fail. The map is left unchanged in both cases.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InsertError {
    /// An entry with an equal key is already in the map.
    KeyExists,
    /// The bucket could not grow to hold the new entry.
    OutOfMemory,
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InsertError::KeyExists => f.write_str("key already present"),
            InsertError::OutOfMemory => f.write_str("memory allocation failed"),
        }
    }
}

impl From<AllocError> for InsertError {
    fn from(_: AllocError) -> Self {
        InsertError::OutOfMemory
    }
}

/// A map from `K` to `V` with `N` buckets.
pub struct FixedMap<K, V, const N: usize, A: Allocator = Global> {
    buckets: [Bucket<K, V, A>; N],
    len: usize,
    hash: HashFn<K>,
}

impl<K, V, const N: usize> FixedMap<K, V, N, Global> {
    /// Creates an empty map using the global heap. Does not allocate.
    pub fn new(hash: HashFn<K>) -> Self {
        FixedMap::new_in(hash, Global)
    }
}

impl<K, V, const N: usize, A: Allocator + Clone> FixedMap<K, V, N, A> {
    const HAS_BUCKETS: () = assert!(N > 0, "FixedMap needs at least one bucket");

    /// Creates an empty map whose buckets allocate from clones of `allocator`. Does not allocate.
    pub fn new_in(hash: HashFn<K>, allocator: A) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::HAS_BUCKETS;

        FixedMap {
            buckets: core::array::from_fn(|_| Vector::new_in(allocator.clone())),
            len: 0,
            hash,
        }
    }
}

impl<K, V, const N: usize, A: Allocator> FixedMap<K, V, N, A> {
    /// Returns the number of entries in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn bucket_count(&self) -> usize {
        N
    }

    /// Average number of entries per bucket.
    pub fn load_factor(&self) -> f32 {
        self.len as f32 / N as f32
    }

    /// Index of the bucket that holds (or would hold) `key`.
    #[inline]
    pub fn bucket_index(&self, key: &K) -> usize {
        util::bucket_index((self.hash)(key), N)
    }

    /// Entries of a bucket, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if `index >= N`.
    pub fn bucket(&self, index: usize) -> &[Pair<K, V>] {
        self.buckets[index].as_slice()
    }

    /// Removes all entries and releases the storage of every bucket.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.len = 0;
    }
}

impl<K: PartialEq, V, const N: usize, A: Allocator> FixedMap<K, V, N, A> {
    /// Inserts `pair` unless its key is already present.
    pub fn try_insert(&mut self, pair: Pair<K, V>) -> Result<(), InsertError> {
        let idx = self.bucket_index(&pair.key);
        let bucket = &mut self.buckets[idx];

        if bucket.iter().any(|entry| entry.key == pair.key) {
            return Err(InsertError::KeyExists);
        }

        bucket.try_push(pair)?;
        self.len += 1;

        Ok(())
    }

    /// Inserts `pair` unless its key is already present.
    ///
    /// Returns `false` if the key exists or if memory could not be allocated. Use
    /// [`FixedMap::try_insert`] to tell the two apart.
    #[inline]
    pub fn insert(&mut self, pair: Pair<K, V>) -> bool {
        self.try_insert(pair).is_ok()
    }

    /// Returns a reference to the value associated with `key`.
    pub fn find(&self, key: &K) -> Option<&V> {
        let idx = self.bucket_index(key);
        self.buckets[idx]
            .iter()
            .find(|entry| entry.key == *key)
            .map(|entry| &entry.value)
    }

    /// Returns a mutable reference to the value associated with `key`, to update it in place.
    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        let idx = self.bucket_index(key);
        self.buckets[idx]
            .iter_mut()
            .find(|entry| entry.key == *key)
            .map(|entry| &mut entry.value)
    }

    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, const N: usize, A: Allocator> fmt::Debug for FixedMap<K, V, N, A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map()
            .entries(self.buckets.iter().flat_map(|bucket| bucket.iter().map(|entry| (&entry.key, &entry.value))))
            .finish()
    }
}

#[cfg(test)]
use crate::allocator::testing;

#[cfg(test)]
fn identity(key: &i32) -> i32 {
    *key
}

#[test]
fn insert_and_find() {
    let mut map: FixedMap<i32, i32, 4> = FixedMap::new(identity);
    assert!(map.is_empty());

    assert!(map.insert(Pair::new(0, 10)));
    assert!(map.insert(Pair::new(4, 40)));
    assert!(map.insert(Pair::new(1, 11)));

    assert_eq!(map.len(), 3);
    assert_eq!(map.find(&0), Some(&10));
    assert_eq!(map.find(&4), Some(&40));
    assert_eq!(map.find(&1), Some(&11));
    assert_eq!(map.find(&2), None);
    assert!(map.contains_key(&4));
    assert!(!map.contains_key(&2));
    assert!(!map.contains_key(&8));

    assert!(!map.insert(Pair::new(0, 99)));
    assert_eq!(map.try_insert(Pair::new(0, 99)), Err(InsertError::KeyExists));
    assert_eq!(map.find(&0), Some(&10));
    assert_eq!(map.len(), 3);
}

#[test]
fn update_in_place() {
    let mut map: FixedMap<i32, i32, 4> = FixedMap::new(identity);
    assert!(map.insert(Pair::new(1, 1)));

    *map.find_mut(&1).unwrap() = 7;
    assert_eq!(map.find(&1), Some(&7));
    assert_eq!(map.find_mut(&2), None);
    assert_eq!(map.len(), 1);
}

#[test]
fn chains_keep_insertion_order() {
    let mut map: FixedMap<i32, &str, 4> = FixedMap::new(identity);
    assert!(map.insert(Pair::new(0, "a")));
    assert!(map.insert(Pair::new(4, "b")));
    assert!(map.insert(Pair::new(8, "c")));

    assert_eq!(map.bucket(0), &[Pair::new(0, "a"), Pair::new(4, "b"), Pair::new(8, "c")]);
    for idx in 1..4 {
        assert!(map.bucket(idx).is_empty());
    }
}

#[test]
fn negative_hashes() {
    let mut map: FixedMap<i32, u8, 4> = FixedMap::new(identity);
    for key in -9..9 {
        assert!(map.insert(Pair::new(key, key.unsigned_abs() as u8)));
    }

    for key in -9..9 {
        let idx = map.bucket_index(&key);
        assert_eq!(idx, (((key % 4) + 4) % 4) as usize);
        assert!(map.bucket(idx).iter().any(|entry| entry.key == key));
        assert_eq!(map.find(&key), Some(&(key.unsigned_abs() as u8)));
    }
    assert_eq!(map.len(), 18);
}

#[test]
fn single_bucket() {
    fn constant(_: &u32) -> i32 {
        -3
    }

    let mut map: FixedMap<u32, u32, 1> = FixedMap::new(constant);
    for key in 0..100 {
        assert!(map.insert(Pair::new(key, key * 2)));
    }

    assert_eq!(map.len(), 100);
    assert_eq!(map.bucket(0).len(), 100);
    assert_eq!(map.load_factor(), 100.0);
    for key in 0..100 {
        assert_eq!(map.find(&key), Some(&(key * 2)));
    }
}

#[test]
fn clear_releases_every_bucket() {
    let heap = testing::Budget::unlimited();
    let mut map: FixedMap<i32, i32, 4, _> = FixedMap::new_in(identity, &heap);
    for key in 0..16 {
        assert!(map.insert(Pair::new(key, key)));
    }
    assert_eq!(heap.live_blocks(), 4);

    map.clear();
    assert_eq!(map.len(), 0);
    assert_eq!(heap.live_blocks(), 0);
    assert!(!map.contains_key(&0));
    for key in 0..16 {
        assert_eq!(map.find(&key), None);
    }

    assert!(map.insert(Pair::new(3, 30)));
    assert_eq!(map.find(&3), Some(&30));
    assert_eq!(map.len(), 1);

    drop(map);
    assert_eq!(heap.live_blocks(), 0);
}

#[test]
fn out_of_memory() {
    let heap = testing::Budget::new(1);
    let mut map: FixedMap<i32, i32, 2, _> = FixedMap::new_in(identity, &heap);

    assert!(map.insert(Pair::new(0, 0)));
    assert_eq!(map.try_insert(Pair::new(1, 1)), Err(InsertError::OutOfMemory));
    assert!(!map.insert(Pair::new(1, 1)));
    assert_eq!(map.len(), 1);
    assert_eq!(map.find(&1), None);

    // The first bucket still has room.
    assert!(map.insert(Pair::new(2, 2)));
    assert_eq!(map.len(), 2);
}

#[test]
fn fn_allocator_backed() {
    fn hash(key: &u64) -> i32 {
        (*key as i32).wrapping_mul(31)
    }

    let mut map: FixedMap<u64, u64, 16, _> = FixedMap::new_in(hash, testing::c_heap());
    for key in 0..1000 {
        assert!(map.insert(Pair::new(key, key + 1)));
    }
    for key in 0..1000 {
        assert_eq!(map.find(&key), Some(&(key + 1)));
    }
}
