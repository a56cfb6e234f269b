/// A key and its associated value, as stored in the buckets of a
/// [`FixedMap`](crate::fixed_map::FixedMap).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pair<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> Pair<K, V> {
    #[inline]
    pub const fn new(key: K, value: V) -> Self {
        Pair { key, value }
    }

    #[inline]
    pub fn into_tuple(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> From<(K, V)> for Pair<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Pair { key, value }
    }
}

impl<K, V> From<Pair<K, V>> for (K, V) {
    fn from(pair: Pair<K, V>) -> Self {
        pair.into_tuple()
    }
}

#[test]
fn copy_is_field_wise() {
    let a = Pair::new(3u8, 'x');
    let mut b = Pair::new(0u8, ' ');
    assert_ne!(a, b);

    b = a;
    assert_eq!(b.key, 3);
    assert_eq!(b.value, 'x');
    assert_eq!(a, b);

    let (k, v): (u8, char) = b.into();
    assert_eq!((k, v), (3, 'x'));
    assert_eq!(Pair::from((k, v)), a);
}
