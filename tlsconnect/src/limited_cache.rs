use std::borrow::Borrow;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// A HashMap-alike, which never gets larger than a specified
/// capacity, and evicts the oldest insertion to maintain this.
///
/// The requested capacity may be rounded up by the underlying
/// collections.  This implementation uses all the allocated
/// storage.
///
/// This is inefficient: it stores keys twice.
pub(crate) struct LimitedCache<K: Clone + Hash + Eq, V> {
    map: HashMap<K, V>,

    // first item is the oldest key
    oldest: VecDeque<K>,
    capacity: usize,
}

impl<K, V> LimitedCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a new LimitedCache with the given rough capacity.
    pub(crate) fn new(capacity_order_of_magnitude: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity_order_of_magnitude),
            oldest: VecDeque::with_capacity(capacity_order_of_magnitude),
            capacity: capacity_order_of_magnitude,
        }
    }

    /// Insert `v` under `k`, replacing any existing value.
    ///
    /// Returns `true` if an older entry had to be evicted to make room.
    pub(crate) fn insert(&mut self, k: K, v: V) -> bool {
        if self.capacity == 0 {
            return false;
        }

        if self.map.insert(k.clone(), v).is_some() {
            return false;
        }

        self.oldest.push_back(k);
        let mut evicted = false;
        while self.oldest.len() > self.capacity {
            if let Some(oldest_key) = self.oldest.pop_front() {
                self.map.remove(&oldest_key);
                evicted = true;
            }
        }
        evicted
    }

    pub(crate) fn get<Q>(&self, k: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get(k)
    }

    pub(crate) fn remove<Q>(&mut self, k: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let value = self.map.remove(k)?;

        // O(N) search, followed by O(N) removal
        if let Some(index) = self
            .oldest
            .iter()
            .position(|item| item.borrow() == k)
        {
            self.oldest.remove(index);
        }

        Some(value)
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}
