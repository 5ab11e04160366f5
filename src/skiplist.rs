use core::fmt;

use super::{
  Error, Geometric, LevelGenerator, NodeMap, Options, OrderedMap, SkipNode, SkipPoint,
};

mod iter;
pub use iter::Iter;

mod search;
pub use search::{FindMode, ParseFindModeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
  Insert,
  Move,
  Remove,
}

/// A ranked skiplist over the keys of a [`NodeMap`].
///
/// The list keeps a positional order chosen by the caller (keys are placed
/// *after* another key, not sorted), and every point carries the number of
/// positions it spans, so both [`get`](Self::get) by position and
/// [`position`](Self::position) of a key run in `O(log n)` expected time.
///
/// The list owns only its head and tail sentinels. Every other node lives in
/// the map `M` and is reached by key, which lets the nodes be persisted and
/// lazily loaded by the map.
///
/// A mutation that fails half-way marks the list invalid: every later
/// operation fails with [`Error::IndexInvalid`] until the list is
/// [`rebuild`](Self::rebuild)t or [`clear`](Self::clear)ed.
///
/// ## Example
///
/// ```rust
/// use ordskl::{OrderedMap, SkipList};
///
/// let mut list = SkipList::new(OrderedMap::new());
/// list.insert("a", None).unwrap();
/// list.insert("b", Some(&"a")).unwrap();
/// list.insert("c", Some(&"a")).unwrap();
///
/// assert_eq!(list.keys().unwrap(), ["a", "c", "b"]);
/// assert_eq!(list.position(&"b").unwrap(), 2);
/// assert_eq!(list.get(-2).unwrap(), "c");
/// ```
pub struct SkipList<K, M = OrderedMap<K, SkipNode<K>>, G = Geometric> {
  head: SkipNode<K>,
  tail: SkipNode<K>,
  map: M,
  levels: G,
  valid: bool,
}

impl<K: fmt::Debug, M: fmt::Debug, G> fmt::Debug for SkipList<K, M, G> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SkipList")
      .field("head", &self.head)
      .field("tail", &self.tail)
      .field("map", &self.map)
      .field("valid", &self.valid)
      .finish_non_exhaustive()
  }
}

impl<K> Default for SkipList<K>
where
  K: Clone + Eq + core::hash::Hash,
{
  #[inline]
  fn default() -> Self {
    Self::new(OrderedMap::new())
  }
}

impl<K, M> SkipList<K, M>
where
  M: NodeMap<K>,
{
  /// Creates a list over `map` with the default [`Options`].
  #[inline]
  pub fn new(map: M) -> Self {
    Self::with_options(map, Options::new())
  }

  /// Creates a list over `map`, drawing tower heights as configured by
  /// `opts`.
  #[inline]
  pub fn with_options(map: M, opts: Options) -> Self {
    Self::with_generator(map, Geometric::new(opts))
  }
}

impl<K, M, G> SkipList<K, M, G>
where
  M: NodeMap<K>,
{
  /// Creates a list over `map` with a custom [`LevelGenerator`].
  ///
  /// `map` must not hold nodes yet; use [`from_parts`](Self::from_parts) to
  /// reopen a persisted list.
  #[inline]
  pub fn with_generator(map: M, levels: G) -> Self {
    let mut head = SkipNode::new(0);
    head.grow(1, map.len() as i64);
    Self {
      head,
      tail: SkipNode::new(1),
      map,
      levels,
      valid: true,
    }
  }

  /// Reopens a list from its persisted sentinels and the map holding its
  /// nodes.
  ///
  /// Nothing is verified here, call [`check`](Self::check) to do so.
  #[inline]
  pub const fn from_parts(map: M, head: SkipNode<K>, tail: SkipNode<K>, levels: G) -> Self {
    Self {
      head,
      tail,
      map,
      levels,
      valid: true,
    }
  }

  /// Returns the number of keys in the list.
  #[inline]
  pub fn len(&self) -> usize {
    self.map.len()
  }

  /// Returns `true` if the list is empty.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.map.is_empty()
  }

  /// Returns the current height of the list.
  #[inline]
  pub fn level(&self) -> usize {
    self.head.level()
  }

  /// Returns the head sentinel.
  #[inline]
  pub const fn head(&self) -> &SkipNode<K> {
    &self.head
  }

  /// Returns the tail sentinel.
  #[inline]
  pub const fn tail(&self) -> &SkipNode<K> {
    &self.tail
  }

  /// Returns the map holding the nodes.
  #[inline]
  pub const fn map(&self) -> &M {
    &self.map
  }

  /// Returns the map holding the nodes mutably.
  ///
  /// Mutating nodes through it bypasses the bookkeeping of the list.
  #[inline]
  pub fn map_mut(&mut self) -> &mut M {
    &mut self.map
  }

  /// Consumes the list, returning its map and sentinels.
  #[inline]
  pub fn into_parts(self) -> (M, SkipNode<K>, SkipNode<K>) {
    (self.map, self.head, self.tail)
  }

  /// Sets the state of the list. Marking a broken list valid is the
  /// caller's responsibility.
  #[inline]
  pub fn validate(&mut self, valid: bool) {
    self.valid = valid;
  }

  /// Returns `false` after a mutation failed half-way.
  #[inline]
  pub const fn is_valid(&self) -> bool {
    self.valid
  }
}

impl<K, M, G> SkipList<K, M, G>
where
  K: Clone + PartialEq + fmt::Debug,
  M: NodeMap<K>,
  G: LevelGenerator,
{
  /// Inserts `key` right after `after`, or at the front when `after` is
  /// `None`. An existing `key` is moved instead, see
  /// [`move_after`](Self::move_after).
  pub fn insert(&mut self, key: K, after: Option<&K>) -> Result<(), Error<K>> {
    self.ensure_valid()?;
    if after == Some(&key) {
      return Err(Self::after_itself(&key));
    }
    if self.map.contains_key(&key)? {
      return self.move_after(&key, after);
    }
    self.ensure_after(after)?;

    let height = self.levels.next_level();
    if height > self.level() {
      #[cfg(feature = "tracing")]
      tracing::debug!(from = self.level(), to = height, "skiplist: growing");

      let len = self.map.len() as i64;
      self.head.grow(height, len);
      self.tail.grow(height, 0);
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(key = ?key, height, "skiplist: insert");

    self.map.insert_node(key.clone(), SkipNode::new(height))?;
    self.commit(Op::Insert, &key, after, height)
  }

  /// Moves the existing `key` right after `after`, or to the front when
  /// `after` is `None`. The height of the key is preserved.
  pub fn move_after(&mut self, key: &K, after: Option<&K>) -> Result<(), Error<K>> {
    self.ensure_valid()?;
    if after == Some(key) {
      return Err(Self::after_itself(key));
    }
    if !self.map.contains_key(key)? {
      return Err(Error::KeyNotFound(key.clone()));
    }
    self.ensure_after(after)?;

    let height = self.map.node(key)?.level();

    #[cfg(feature = "tracing")]
    tracing::trace!(key = ?key, height, "skiplist: move");

    self.commit(Op::Move, key, after, height)
  }

  /// Removes `key` from the list and from the map.
  pub fn remove(&mut self, key: &K) -> Result<(), Error<K>> {
    self.ensure_valid()?;
    if !self.map.contains_key(key)? {
      return Err(Error::KeyNotFound(key.clone()));
    }

    let height = self.map.node(key)?.level();

    #[cfg(feature = "tracing")]
    tracing::trace!(key = ?key, height, "skiplist: remove");

    self.commit(Op::Remove, key, None, height)
  }

  /// Returns the zero-based position of `key`.
  pub fn position(&mut self, key: &K) -> Result<usize, Error<K>> {
    self.ensure_valid()?;

    let mut dist = -1i64;
    let mut cursor = key.clone();
    loop {
      let node = self.map.node(&cursor)?;
      let level = node.level();
      match node.point(level)?.previous_key().cloned() {
        Some(prev) => {
          dist += self.map.node(&prev)?.point(level)?.distance();
          cursor = prev;
        }
        None => {
          dist += self.head.point(level)?.distance();
          break;
        }
      }
    }

    usize::try_from(dist)
      .map_err(|_| Error::Assertion(format!("negative position {dist} for {key:?}")))
  }

  /// Returns the key at `index`. A negative index counts from the end, so
  /// `-1` is the last key.
  pub fn get(&mut self, index: isize) -> Result<K, Error<K>> {
    self.ensure_valid()?;

    let len = self.len();
    let target = if index < 0 {
      index + len as isize
    } else {
      index
    };
    if target < 0 || target as usize >= len {
      return Err(Error::IndexOutOfRange { index, len });
    }
    let target = target as i64;

    let mut pos = -1i64;
    let mut cursor: Option<K> = None;
    for level in (1..=self.level()).rev() {
      loop {
        let point = self.point_after(cursor.as_ref(), level)?;
        let Some(next) = point.next_key() else {
          break;
        };
        let next_pos = pos + point.distance();
        if next_pos > target {
          break;
        }
        if next_pos == target {
          return Ok(next.clone());
        }
        pos = next_pos;
        cursor = Some(next.clone());
      }
    }

    Err(Error::Assertion(format!(
      "position {target} not reached, stopped at {pos}"
    )))
  }

  /// Returns the first key of the list.
  #[inline]
  pub fn first(&mut self) -> Result<Option<K>, Error<K>> {
    self.first_at(1)
  }

  /// Returns the first key of the list at `level`.
  pub fn first_at(&mut self, level: usize) -> Result<Option<K>, Error<K>> {
    self.ensure_valid()?;
    Ok(self.head.point(level)?.next_key().cloned())
  }

  /// Returns the last key of the list.
  #[inline]
  pub fn last(&mut self) -> Result<Option<K>, Error<K>> {
    self.last_at(1)
  }

  /// Returns the last key of the list at `level`.
  pub fn last_at(&mut self, level: usize) -> Result<Option<K>, Error<K>> {
    self.ensure_valid()?;
    Ok(self.tail.point(level)?.previous_key().cloned())
  }

  /// Returns the key following `key`.
  #[inline]
  pub fn next(&mut self, key: &K) -> Result<Option<K>, Error<K>> {
    self.next_at(key, 1)
  }

  /// Returns the key following `key` at `level`, which must not exceed the
  /// height of `key`.
  pub fn next_at(&mut self, key: &K, level: usize) -> Result<Option<K>, Error<K>> {
    self.ensure_valid()?;
    Ok(self.map.node(key)?.point(level)?.next_key().cloned())
  }

  /// Returns the key preceding `key`.
  #[inline]
  pub fn previous(&mut self, key: &K) -> Result<Option<K>, Error<K>> {
    self.previous_at(key, 1)
  }

  /// Returns the key preceding `key` at `level`, which must not exceed the
  /// height of `key`.
  pub fn previous_at(&mut self, key: &K, level: usize) -> Result<Option<K>, Error<K>> {
    self.ensure_valid()?;
    Ok(self.map.node(key)?.point(level)?.previous_key().cloned())
  }

  /// Returns an iterator over the keys in positional order.
  #[inline]
  pub fn iter(&mut self) -> Result<Iter<'_, K, M, G>, Error<K>> {
    self.ensure_valid()?;
    Ok(Iter::new(self))
  }

  /// Collects the keys in positional order.
  #[inline]
  pub fn keys(&mut self) -> Result<Vec<K>, Error<K>> {
    self.iter()?.collect()
  }

  /// Removes every node from the map and resets the sentinels. The list is
  /// valid afterwards.
  pub fn clear(&mut self) -> Result<(), Error<K>> {
    self.map.clear()?;
    self.head = SkipNode::new(1);
    self.tail = SkipNode::new(1);
    self.valid = true;
    Ok(())
  }

  /// Clears the list, then appends `keys` in order.
  ///
  /// ## Example
  ///
  /// ```rust
  /// use ordskl::{OrderedMap, SkipList};
  ///
  /// let mut list = SkipList::new(OrderedMap::new());
  /// list.insert(1, None).unwrap();
  /// list.validate(false);
  /// assert!(list.get(0).is_err());
  ///
  /// list.rebuild([3, 1, 2]).unwrap();
  /// assert!(list.is_valid());
  /// assert_eq!(list.keys().unwrap(), [3, 1, 2]);
  /// ```
  pub fn rebuild<I>(&mut self, keys: I) -> Result<(), Error<K>>
  where
    I: IntoIterator<Item = K>,
  {
    self.clear()?;

    let mut last: Option<K> = None;
    for key in keys {
      self.insert(key.clone(), last.as_ref())?;
      last = Some(key);
    }
    Ok(())
  }

  /// Verifies the whole structure: the links of every level, that every
  /// level is an ordered subsequence of level `1` holding exactly the keys
  /// tall enough, and every distance.
  pub fn check(&mut self) -> Result<(), Error<K>> {
    let len = self.map.len();
    if self.tail.level() != self.level() {
      return Err(Error::Assertion(format!(
        "head has {} levels, tail has {}",
        self.level(),
        self.tail.level()
      )));
    }

    let mut keys = Vec::with_capacity(len);
    let mut heights = Vec::with_capacity(len);
    let mut cursor = self.head.point(1)?.next_key().cloned();
    while let Some(key) = cursor {
      if keys.len() == len {
        return Err(Error::Assertion(format!(
          "level 1 holds more than {len} keys"
        )));
      }
      let node = self.map.node(&key)?;
      heights.push(node.level());
      cursor = node.point(1)?.next_key().cloned();
      keys.push(key);
    }
    if keys.len() != len {
      return Err(Error::Assertion(format!(
        "level 1 holds {} keys, the map {len}",
        keys.len()
      )));
    }

    let last_pos = len as i64 - 1;
    for level in 1..=self.level() {
      let mut idx = 0;
      let mut prev: Option<usize> = None;
      let mut prev_point = self.head.point(level)?.clone();

      while let Some(key) = prev_point.next_key().cloned() {
        while idx < len && keys[idx] != key {
          if heights[idx] >= level {
            return Err(Error::Assertion(format!(
              "{:?} is missing at level {level}",
              keys[idx]
            )));
          }
          idx += 1;
        }
        if idx == len {
          return Err(Error::Assertion(format!(
            "{key:?} is out of order at level {level}"
          )));
        }

        let prev_pos = prev.map_or(-1, |p| p as i64);
        Self::check_distance(&prev_point, idx as i64 - prev_pos, level)?;

        let point = self.map.node(&key)?.point(level)?.clone();
        if point.previous_key() != prev.map(|p| &keys[p]) {
          return Err(Error::Assertion(format!(
            "{key:?} has a wrong previous key at level {level}"
          )));
        }

        prev = Some(idx);
        prev_point = point;
        idx += 1;
      }

      if let Some(missing) = (idx..len).find(|&i| heights[i] >= level) {
        return Err(Error::Assertion(format!(
          "{:?} is missing at level {level}",
          keys[missing]
        )));
      }

      let prev_pos = prev.map_or(-1, |p| p as i64);
      Self::check_distance(&prev_point, last_pos - prev_pos, level)?;

      if self.tail.point(level)?.previous_key() != prev.map(|p| &keys[p]) {
        return Err(Error::Assertion(format!(
          "tail has a wrong previous key at level {level}"
        )));
      }
    }

    Ok(())
  }

  fn check_distance(point: &SkipPoint<K>, expected: i64, level: usize) -> Result<(), Error<K>> {
    if point.distance() != expected {
      return Err(Error::Assertion(format!(
        "distance {} before {:?} at level {level}, expected {expected}",
        point.distance(),
        point.next_key()
      )));
    }
    Ok(())
  }

  /// Runs the relinking of `key`, invalidating the list if it fails half-way.
  fn commit(&mut self, op: Op, key: &K, after: Option<&K>, height: usize) -> Result<(), Error<K>> {
    if let Err(e) = self.place(op, key, after, height) {
      #[cfg(feature = "tracing")]
      tracing::warn!(key = ?key, op = ?op, err = %e, "skiplist: mutation failed, index invalidated");

      self.valid = false;
      return Err(e);
    }
    Ok(())
  }

  fn place(&mut self, op: Op, key: &K, after: Option<&K>, height: usize) -> Result<(), Error<K>> {
    let mut dist = 0i64;
    let mut after_key = after.cloned();
    let mut prev_key: Option<K> = None;

    for level in 1..=self.level() {
      if level <= height {
        let point = self.map.node(key)?.point(level)?.clone();
        let curr_dist = point.distance();
        prev_key = point.previous_key().cloned();
        let next_key = point.next_key().cloned();

        if op != Op::Insert {
          self.set_next(prev_key.as_ref(), level, next_key.clone(), curr_dist - 1)?;
          self.set_prev(next_key.as_ref(), level, prev_key.clone())?;
          self.changed(prev_key.as_ref())?;
          self.changed(next_key.as_ref())?;
        }

        if op == Op::Remove {
          self.map.node_mut(key)?.point_mut(level)?.reset();
        } else {
          let point = self.point_after(after_key.as_ref(), level)?;
          let after_next = point.next_key().cloned();
          let after_dist = point.distance();
          self.changed(after_key.as_ref())?;

          if let Some(next) = &after_next {
            self.set_prev(Some(next), level, Some(key.clone()))?;
            self.changed(Some(next))?;
          }
          self.set_next(after_key.as_ref(), level, Some(key.clone()), dist + 1 - after_dist)?;
          self.set_prev(Some(key), level, after_key.clone())?;
          self.set_next(Some(key), level, after_next, after_dist - dist - curr_dist)?;
          self.changed(Some(key))?;
        }
      } else {
        match &prev_key {
          Some(prev) => {
            self.map.node_mut(prev)?.point_mut(level)?.add_distance(-1);
            self.map.key_changed(prev)?;
          }
          None if op != Op::Insert => self.head.point_mut(level)?.add_distance(-1),
          None => {}
        }

        if op != Op::Remove {
          match &after_key {
            Some(after) => {
              self.map.node_mut(after)?.point_mut(level)?.add_distance(1);
              self.map.key_changed(after)?;
            }
            None => self.head.point_mut(level)?.add_distance(1),
          }
        }
      }

      // climb to the nodes spanning the old and the new position one level up
      while let Some(prev) = &prev_key {
        let node = self.map.node(prev)?;
        if node.level() != level {
          break;
        }
        prev_key = node.point(level)?.previous_key().cloned();
      }

      while let Some(after) = &after_key {
        let node = self.map.node(after)?;
        if node.level() != level {
          break;
        }
        after_key = node.point(level)?.previous_key().cloned();
        if level < height {
          dist += self.point_after(after_key.as_ref(), level)?.distance();
        }
      }
    }

    if op == Op::Remove {
      self.map.remove_node(key)?;
    }
    Ok(())
  }

  /// Points `key` (the head when `None`) to `next` at `level`, shifting its
  /// distance by `delta`.
  fn set_next(
    &mut self,
    key: Option<&K>,
    level: usize,
    next: Option<K>,
    delta: i64,
  ) -> Result<(), Error<K>> {
    if next.is_none() {
      self.tail.point_mut(level)?.set_previous(key.cloned());
    }

    let point = match key {
      Some(key) => self.map.node_mut(key)?.point_mut(level)?,
      None => self.head.point_mut(level)?,
    };
    point.set_next(next);
    point.add_distance(delta);
    debug_assert!(
      point.distance() >= 0,
      "negative distance at level {level} after {key:?}"
    );
    Ok(())
  }

  /// Points `key` (the tail when `None`) back to `prev` at `level`.
  fn set_prev(&mut self, key: Option<&K>, level: usize, prev: Option<K>) -> Result<(), Error<K>> {
    if prev.is_none() {
      self.head.point_mut(level)?.set_next(key.cloned());
    }

    match key {
      Some(key) => self.map.node_mut(key)?.point_mut(level)?.set_previous(prev),
      None => self.tail.point_mut(level)?.set_previous(prev),
    }
    Ok(())
  }

  /// Returns the point of `key` at `level`, the head's when `None`.
  #[inline]
  fn point_after(&mut self, key: Option<&K>, level: usize) -> Result<SkipPoint<K>, Error<K>> {
    match key {
      Some(key) => self.map.node(key)?.point(level).cloned(),
      None => self.head.point(level).cloned(),
    }
  }

  #[inline]
  fn changed(&mut self, key: Option<&K>) -> Result<(), Error<K>> {
    match key {
      Some(key) => self.map.key_changed(key),
      None => Ok(()),
    }
  }

  #[inline]
  fn ensure_after(&mut self, after: Option<&K>) -> Result<(), Error<K>> {
    match after {
      Some(after) if !self.map.contains_key(after)? => Err(Error::KeyNotFound(after.clone())),
      _ => Ok(()),
    }
  }

  #[inline]
  fn ensure_valid(&self) -> Result<(), Error<K>> {
    if self.valid {
      Ok(())
    } else {
      Err(Error::IndexInvalid)
    }
  }

  #[inline]
  fn after_itself(key: &K) -> Error<K> {
    Error::Assertion(format!("cannot place {key:?} after itself"))
  }
}
