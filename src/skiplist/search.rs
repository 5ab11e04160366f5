use core::{cmp::Ordering, fmt, str::FromStr};

use super::{Error, LevelGenerator, NodeMap, SkipList};

/// Which key [`SkipList::find`] returns when several keys match.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindMode {
  /// The first match met by the search, not necessarily an extremal one.
  #[default]
  Exact,
  /// The leftmost match.
  First,
  /// The rightmost match.
  Last,
}

/// Error returned when parsing an unknown [`FindMode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown find mode: {0:?}, expected one of \"exact\", \"first\", \"last\"")]
pub struct ParseFindModeError(String);

impl<K> From<ParseFindModeError> for Error<K> {
  #[inline]
  fn from(e: ParseFindModeError) -> Self {
    Self::InvalidArgument(e.to_string())
  }
}

impl FromStr for FindMode {
  type Err = ParseFindModeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "exact" => Ok(Self::Exact),
      "first" => Ok(Self::First),
      "last" => Ok(Self::Last),
      _ => Err(ParseFindModeError(s.to_string())),
    }
  }
}

impl<K, M, G> SkipList<K, M, G>
where
  K: Clone + PartialEq + fmt::Debug,
  M: NodeMap<K>,
  G: LevelGenerator,
{
  /// Returns the key right before the position where `probe` would be
  /// inserted to keep the list sorted, or `None` if it would go first.
  ///
  /// `cmp(candidate, probe)` must order the keys of the list the way they
  /// are positioned; keys comparing equal to `probe` end up after it.
  ///
  /// ## Example
  ///
  /// ```rust
  /// use ordskl::{OrderedMap, SkipList};
  ///
  /// let mut list = SkipList::new(OrderedMap::new());
  /// list.rebuild([10, 20, 30]).unwrap();
  ///
  /// assert_eq!(list.after(&25, |k, p| k.cmp(p)).unwrap(), Some(20));
  /// assert_eq!(list.after(&20, |k, p| k.cmp(p)).unwrap(), Some(10));
  /// assert_eq!(list.after(&5, |k, p| k.cmp(p)).unwrap(), None);
  /// ```
  pub fn after<Q, F>(&mut self, probe: &Q, mut cmp: F) -> Result<Option<K>, Error<K>>
  where
    Q: ?Sized,
    F: FnMut(&K, &Q) -> Ordering,
  {
    self.ensure_valid()?;

    let mut lo = 0isize;
    let mut hi = self.len() as isize - 1;
    while lo <= hi {
      let mid = (lo + hi) / 2;
      let candidate = self.get(mid)?;
      if cmp(&candidate, probe) == Ordering::Less {
        lo = mid + 1;
      } else {
        hi = mid - 1;
      }
    }

    if lo == 0 {
      Ok(None)
    } else {
      self.get(lo - 1).map(Some)
    }
  }

  /// Binary searches the list for a key for which `predicate` returns
  /// [`Ordering::Equal`].
  ///
  /// `predicate(candidate)` tells where `candidate` stands relative to the
  /// keys searched for, and must be monotonic over the positions of the
  /// list. `mode` decides which match is returned when several keys match.
  ///
  /// ## Example
  ///
  /// ```rust
  /// use ordskl::{FindMode, OrderedMap, SkipList};
  ///
  /// let mut list = SkipList::new(OrderedMap::new());
  /// list.rebuild([(1, 'a'), (2, 'b'), (2, 'c'), (2, 'd'), (3, 'e')]).unwrap();
  ///
  /// let two = |k: &(i32, char)| k.0.cmp(&2);
  /// assert_eq!(list.find(FindMode::First, two).unwrap(), Some((2, 'b')));
  /// assert_eq!(list.find(FindMode::Last, two).unwrap(), Some((2, 'd')));
  /// assert_eq!(list.find("exact".parse().unwrap(), |k| k.0.cmp(&4)).unwrap(), None);
  /// ```
  pub fn find<F>(&mut self, mode: FindMode, mut predicate: F) -> Result<Option<K>, Error<K>>
  where
    F: FnMut(&K) -> Ordering,
  {
    self.ensure_valid()?;

    let mut lo = 0isize;
    let mut hi = self.len() as isize - 1;
    let mut found = None;
    while lo <= hi {
      let mid = (lo + hi) / 2;
      let candidate = self.get(mid)?;
      match predicate(&candidate) {
        Ordering::Less => lo = mid + 1,
        Ordering::Greater => hi = mid - 1,
        Ordering::Equal => match mode {
          FindMode::Exact => return Ok(Some(candidate)),
          FindMode::First => {
            found = Some(candidate);
            hi = mid - 1;
          }
          FindMode::Last => {
            found = Some(candidate);
            lo = mid + 1;
          }
        },
      }
    }

    Ok(found)
  }
}
