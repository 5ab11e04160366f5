use std::{collections::HashMap, hash::Hash};

use super::{Error, SkipNode};

/// The key → node collaborator a [`SkipList`](crate::SkipList) navigates
/// through.
///
/// The skiplist never holds references to its nodes: every hop goes through
/// this trait by key, which lets the nodes live in (and be lazily loaded
/// from) a persistent store.
pub trait NodeMap<K> {
  /// Returns the number of keys in the map, counting those not yet loaded.
  fn len(&self) -> usize;

  /// Returns `true` if the map has no keys.
  #[inline]
  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Returns `true` if the map has a node for `key`.
  fn contains_key(&mut self, key: &K) -> Result<bool, Error<K>>;

  /// Returns the node of `key`, failing with [`Error::KeyNotFound`] if absent.
  fn node(&mut self, key: &K) -> Result<&SkipNode<K>, Error<K>>;

  /// Returns the node of `key` mutably, failing with [`Error::KeyNotFound`]
  /// if absent.
  fn node_mut(&mut self, key: &K) -> Result<&mut SkipNode<K>, Error<K>>;

  /// Adds the node of a new key.
  fn insert_node(&mut self, key: K, node: SkipNode<K>) -> Result<(), Error<K>>;

  /// Removes the node of `key`, returning it if it was present.
  fn remove_node(&mut self, key: &K) -> Result<Option<SkipNode<K>>, Error<K>>;

  /// Called after the node of `key` was mutated in place.
  #[inline]
  fn key_changed(&mut self, key: &K) -> Result<(), Error<K>> {
    let _ = key;
    Ok(())
  }

  /// Removes every node.
  fn clear(&mut self) -> Result<(), Error<K>>;
}

impl<K, S> NodeMap<K> for HashMap<K, SkipNode<K>, S>
where
  K: Clone + Eq + Hash,
  S: std::hash::BuildHasher,
{
  #[inline]
  fn len(&self) -> usize {
    HashMap::len(self)
  }

  #[inline]
  fn contains_key(&mut self, key: &K) -> Result<bool, Error<K>> {
    Ok(HashMap::contains_key(self, key))
  }

  #[inline]
  fn node(&mut self, key: &K) -> Result<&SkipNode<K>, Error<K>> {
    self.get(key).ok_or_else(|| Error::KeyNotFound(key.clone()))
  }

  #[inline]
  fn node_mut(&mut self, key: &K) -> Result<&mut SkipNode<K>, Error<K>> {
    self
      .get_mut(key)
      .ok_or_else(|| Error::KeyNotFound(key.clone()))
  }

  #[inline]
  fn insert_node(&mut self, key: K, node: SkipNode<K>) -> Result<(), Error<K>> {
    self.insert(key, node);
    Ok(())
  }

  #[inline]
  fn remove_node(&mut self, key: &K) -> Result<Option<SkipNode<K>>, Error<K>> {
    Ok(self.remove(key))
  }

  #[inline]
  fn clear(&mut self) -> Result<(), Error<K>> {
    HashMap::clear(self);
    Ok(())
  }
}

impl<K, M: NodeMap<K> + ?Sized> NodeMap<K> for &mut M {
  #[inline]
  fn len(&self) -> usize {
    (**self).len()
  }

  #[inline]
  fn contains_key(&mut self, key: &K) -> Result<bool, Error<K>> {
    (**self).contains_key(key)
  }

  #[inline]
  fn node(&mut self, key: &K) -> Result<&SkipNode<K>, Error<K>> {
    (**self).node(key)
  }

  #[inline]
  fn node_mut(&mut self, key: &K) -> Result<&mut SkipNode<K>, Error<K>> {
    (**self).node_mut(key)
  }

  #[inline]
  fn insert_node(&mut self, key: K, node: SkipNode<K>) -> Result<(), Error<K>> {
    (**self).insert_node(key, node)
  }

  #[inline]
  fn remove_node(&mut self, key: &K) -> Result<Option<SkipNode<K>>, Error<K>> {
    (**self).remove_node(key)
  }

  #[inline]
  fn key_changed(&mut self, key: &K) -> Result<(), Error<K>> {
    (**self).key_changed(key)
  }

  #[inline]
  fn clear(&mut self) -> Result<(), Error<K>> {
    (**self).clear()
  }
}
