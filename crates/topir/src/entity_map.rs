//! Entity-keyed storage.
//!
//! Every table in a module or function (types, instructions, blocks,
//! globals) is a vector indexed by its own entity type.

use alloc::vec::Vec;
use core::{
    marker::PhantomData,
    ops::{Index, IndexMut},
};

use crate::entity::EntityRef;

/// Owning table that hands out a fresh key for each pushed value.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryMap<K: EntityRef, V> {
    data: Vec<V>,
    _phantom: PhantomData<K>,
}

impl<K: EntityRef, V> PrimaryMap<K, V> {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            _phantom: PhantomData,
        }
    }

    /// Append `value`; its key is the previous length.
    pub fn push(&mut self, value: V) -> K {
        let index = self.data.len();
        self.data.push(value);
        K::from_index(index)
    }

    /// The key the next `push` will return
    pub fn next_key(&self) -> K {
        K::from_index(self.data.len())
    }

    pub fn get(&self, key: K) -> Option<&V> {
        self.data.get(key.index())
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.data.get_mut(key.index())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if `key` was handed out by this table.
    pub fn is_valid(&self, key: K) -> bool {
        key.index() < self.data.len()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, v)| (K::from_index(i), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = K> {
        (0..self.data.len()).map(K::from_index)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.data.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.data.iter_mut()
    }
}

impl<K: EntityRef, V> Default for PrimaryMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityRef, V> Index<K> for PrimaryMap<K, V> {
    type Output = V;

    fn index(&self, key: K) -> &V {
        &self.data[key.index()]
    }
}

impl<K: EntityRef, V> IndexMut<K> for PrimaryMap<K, V> {
    fn index_mut(&mut self, key: K) -> &mut V {
        &mut self.data[key.index()]
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::entity::{Block, Inst};

    #[test]
    fn test_push_hands_out_sequential_keys() {
        let mut map: PrimaryMap<Block, i32> = PrimaryMap::new();

        let keys: Vec<Block> = [10, 20, 30].into_iter().map(|v| map.push(v)).collect();

        assert_eq!(keys[0], Block::new(0));
        assert_eq!(map[keys[1]], 20);
        assert_eq!(map.get(keys[2]).copied(), Some(30));
        assert_eq!(map.len(), 3);
        assert_eq!(map.next_key(), Block::new(3));
    }

    #[test]
    fn test_iter_pairs_keys_with_values() {
        let mut map: PrimaryMap<Inst, &str> = PrimaryMap::new();
        map.push("a");
        map.push("b");

        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries, vec![(Inst::new(0), &"a"), (Inst::new(1), &"b")]);
        assert_eq!(map.keys().count(), 2);
    }

    #[test]
    fn test_index_mut_and_validity() {
        let mut map: PrimaryMap<Block, i32> = PrimaryMap::new();
        let b = map.push(1);
        map[b] += 41;
        if let Some(v) = map.get_mut(b) {
            *v += 1;
        }
        assert_eq!(map[b], 43);
        assert!(!map.is_valid(Block::new(9)));
    }
}
