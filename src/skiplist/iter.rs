use core::fmt;

use super::{Error, LevelGenerator, NodeMap, SkipList};

/// An iterator over the keys of a [`SkipList`] in positional order.
///
/// Nodes are looked up through the map while iterating, so every item is a
/// `Result`. The iterator stops after the first error.
pub struct Iter<'a, K, M, G> {
  list: &'a mut SkipList<K, M, G>,
  next: Option<K>,
}

impl<'a, K, M, G> Iter<'a, K, M, G>
where
  K: Clone,
{
  #[inline]
  pub(super) fn new(list: &'a mut SkipList<K, M, G>) -> Self {
    let next = list
      .head
      .point(1)
      .ok()
      .and_then(|point| point.next_key().cloned());
    Self { list, next }
  }
}

impl<K, M, G> Iterator for Iter<'_, K, M, G>
where
  K: Clone + PartialEq + fmt::Debug,
  M: NodeMap<K>,
  G: LevelGenerator,
{
  type Item = Result<K, Error<K>>;

  fn next(&mut self) -> Option<Self::Item> {
    let key = self.next.take()?;
    match self.list.next(&key) {
      Ok(next) => {
        self.next = next;
        Some(Ok(key))
      }
      Err(e) => Some(Err(e)),
    }
  }
}
