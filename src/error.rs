/// Boxed error returned by store collaborators ([`Loader`](crate::Loader) and
/// [`NodeMap`](crate::NodeMap) implementations backed by real storage).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for the ordskl crate.
///
/// Every variant carries enough context (the offending key, the requested
/// index) to be logged or surfaced by the caller.
#[derive(thiserror::Error, Debug)]
pub enum Error<K> {
  /// Indicates that the key is not present in the map, even after asking the
  /// backing store to load it.
  #[error("key not found: {0:?}")]
  KeyNotFound(K),

  /// Indicates that a position (or a level) is outside of the valid range.
  #[error("index {index} out of range for length {len}")]
  IndexOutOfRange {
    /// The requested position or level, as given by the caller.
    index: isize,
    /// The number of entries (or levels) available.
    len: usize,
  },

  /// Indicates that the skiplist has been marked invalid and must be rebuilt
  /// before it can be used again.
  #[error("skiplist is invalid and must be rebuilt")]
  IndexInvalid,

  /// Indicates a violated precondition (e.g. inserting a key after itself) or
  /// a broken structural invariant.
  #[error("assertion failed: {0}")]
  Assertion(String),

  /// Indicates that the map holds a value of an unexpected kind for the key,
  /// which usually means the backing store is corrupted.
  #[error("unexpected value kind for key {0:?}")]
  TypeMismatch(K),

  /// Indicates a mutation of an ordered map flagged read-only.
  #[error("ordered map is read-only")]
  ReadOnly,

  /// Indicates that a value was rejected at assignment time.
  #[error("invalid value: {0}")]
  InvalidValue(String),

  /// Indicates that an argument could not be understood.
  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  /// Indicates that a collaborator (store loader, node map) failed.
  #[error("collaborator failed: {0}")]
  Collaborator(#[source] BoxError),
}

impl<K> Error<K> {
  /// Wraps a collaborator failure.
  #[inline]
  pub fn collaborator<E>(err: E) -> Self
  where
    E: Into<BoxError>,
  {
    Self::Collaborator(err.into())
  }

  #[inline]
  pub(crate) fn out_of_range(index: usize, len: usize) -> Self {
    Self::IndexOutOfRange {
      index: index as isize,
      len,
    }
  }
}
