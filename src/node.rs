use super::Error;

/// One level of a [`SkipNode`]: the neighbours at that level and the number
/// of positions spanned up to the next neighbour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipPoint<K> {
  previous_key: Option<K>,
  next_key: Option<K>,
  distance: i64,
}

impl<K> Default for SkipPoint<K> {
  #[inline]
  fn default() -> Self {
    Self {
      previous_key: None,
      next_key: None,
      distance: 0,
    }
  }
}

impl<K> SkipPoint<K> {
  /// Creates a point from persisted parts.
  #[inline]
  pub const fn new(previous_key: Option<K>, next_key: Option<K>, distance: i64) -> Self {
    Self {
      previous_key,
      next_key,
      distance,
    }
  }

  /// Returns the key of the previous node at this level, `None` at the head.
  #[inline]
  pub const fn previous_key(&self) -> Option<&K> {
    self.previous_key.as_ref()
  }

  /// Returns the key of the next node at this level, `None` at the tail.
  #[inline]
  pub const fn next_key(&self) -> Option<&K> {
    self.next_key.as_ref()
  }

  /// Returns the number of positions from this node to its next neighbour
  /// at this level.
  #[inline]
  pub const fn distance(&self) -> i64 {
    self.distance
  }

  #[inline]
  pub(crate) fn set_previous(&mut self, key: Option<K>) {
    self.previous_key = key;
  }

  #[inline]
  pub(crate) fn set_next(&mut self, key: Option<K>) {
    self.next_key = key;
  }

  #[inline]
  pub(crate) fn add_distance(&mut self, delta: i64) {
    self.distance += delta;
  }

  #[inline]
  pub(crate) fn reset(&mut self) {
    self.previous_key = None;
    self.next_key = None;
    self.distance = 0;
  }
}

/// The tower of a key: one [`SkipPoint`] per level, from level `1` up to the
/// node's height.
///
/// The height of a regular node is fixed when it is created. Only the head
/// and tail sentinels of a [`SkipList`](crate::SkipList) grow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipNode<K> {
  points: Vec<SkipPoint<K>>,
}

impl<K> SkipNode<K> {
  /// Creates a node of the given height with empty points.
  #[inline]
  pub fn new(level: usize) -> Self {
    Self {
      points: (0..level).map(|_| SkipPoint::default()).collect(),
    }
  }

  /// Creates a node from persisted points, the first one being level `1`.
  #[inline]
  pub const fn from_points(points: Vec<SkipPoint<K>>) -> Self {
    Self { points }
  }

  /// Returns the height of the node.
  #[inline]
  pub fn level(&self) -> usize {
    self.points.len()
  }

  /// Returns all points, level `1` first.
  #[inline]
  pub fn points(&self) -> &[SkipPoint<K>] {
    &self.points
  }

  /// Returns the point at `level`, counting from `1`.
  ///
  /// ## Example
  ///
  /// ```rust
  /// use ordskl::SkipNode;
  ///
  /// let node = SkipNode::<u32>::new(2);
  /// assert!(node.point(2).is_ok());
  /// assert!(node.point(0).is_err());
  /// assert!(node.point(3).is_err());
  /// ```
  #[inline]
  pub fn point(&self, level: usize) -> Result<&SkipPoint<K>, Error<K>> {
    let len = self.points.len();
    match level.checked_sub(1) {
      Some(idx) if idx < len => Ok(&self.points[idx]),
      _ => Err(Error::out_of_range(level, len)),
    }
  }

  /// Returns the point at `level` mutably, counting from `1`.
  #[inline]
  pub fn point_mut(&mut self, level: usize) -> Result<&mut SkipPoint<K>, Error<K>> {
    let len = self.points.len();
    match level.checked_sub(1) {
      Some(idx) if idx < len => Ok(&mut self.points[idx]),
      _ => Err(Error::out_of_range(level, len)),
    }
  }

  /// Grows the node to `level`, seeding every new point with `distance`.
  pub(crate) fn grow(&mut self, level: usize, distance: i64) {
    while self.points.len() < level {
      self.points.push(SkipPoint::new(None, None, distance));
    }
  }
}
