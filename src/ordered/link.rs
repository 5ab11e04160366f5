use core::fmt;

use either::Either;

/// Where the value of an [`OrderedLink`] comes from.
pub enum LinkValue<V> {
  /// The value is held in the link.
  Direct(V),
  /// The value is produced on every read.
  Lazy(Box<dyn Fn() -> V + Send + Sync>),
}

impl<V: fmt::Debug> fmt::Debug for LinkValue<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Direct(v) => f.debug_tuple("Direct").field(v).finish(),
      Self::Lazy(_) => f.write_str("Lazy(..)"),
    }
  }
}

impl<V> LinkValue<V> {
  /// Reads the value: borrowed when held directly, computed when lazy.
  #[inline]
  pub fn get(&self) -> Either<&V, V> {
    match self {
      Self::Direct(v) => Either::Left(v),
      Self::Lazy(f) => Either::Right(f()),
    }
  }

  /// Returns `true` if the value is produced on every read.
  #[inline]
  pub const fn is_lazy(&self) -> bool {
    matches!(self, Self::Lazy(_))
  }
}

/// A link of the insertion-order chain of an
/// [`OrderedMap`](crate::OrderedMap).
///
/// The link knows its neighbours by key only; the map resolves them.
#[derive(Debug)]
pub struct OrderedLink<K, V> {
  pub(super) previous_key: Option<K>,
  pub(super) next_key: Option<K>,
  pub(super) value: LinkValue<V>,
  pub(super) alias: Option<String>,
  pub(super) other_key: Option<K>,
}

impl<K, V> OrderedLink<K, V> {
  /// Creates a link holding `value`.
  ///
  /// ## Example
  ///
  /// ```rust
  /// use ordskl::OrderedLink;
  ///
  /// let link = OrderedLink::<u32, _>::new("a").with_alias("first");
  /// assert_eq!(link.value().left(), Some(&"a"));
  /// assert_eq!(link.alias(), Some("first"));
  /// ```
  #[inline]
  pub const fn new(value: V) -> Self {
    Self::from_value(LinkValue::Direct(value))
  }

  /// Creates a link whose value is produced by `f` on every read.
  #[inline]
  pub fn lazy<F>(f: F) -> Self
  where
    F: Fn() -> V + Send + Sync + 'static,
  {
    Self::from_value(LinkValue::Lazy(Box::new(f)))
  }

  /// Creates an unlinked link from a [`LinkValue`].
  #[inline]
  pub const fn from_value(value: LinkValue<V>) -> Self {
    Self {
      previous_key: None,
      next_key: None,
      value,
      alias: None,
      other_key: None,
    }
  }

  /// Sets the alias the link can be looked up by.
  #[inline]
  pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
    self.alias = Some(alias.into());
    self
  }

  /// Sets the key of the other end of the reference.
  #[inline]
  pub fn with_other_key(mut self, key: K) -> Self {
    self.other_key = Some(key);
    self
  }

  /// Sets the persisted neighbours of the link. Only meaningful for links
  /// handed to a map by a [`Loader`](crate::Loader) or through
  /// [`OrderedMap::restore`](crate::OrderedMap::restore).
  #[inline]
  pub fn with_neighbors(mut self, previous_key: Option<K>, next_key: Option<K>) -> Self {
    self.previous_key = previous_key;
    self.next_key = next_key;
    self
  }

  /// Returns the key of the previous link in the chain.
  #[inline]
  pub const fn previous_key(&self) -> Option<&K> {
    self.previous_key.as_ref()
  }

  /// Returns the key of the next link in the chain.
  #[inline]
  pub const fn next_key(&self) -> Option<&K> {
    self.next_key.as_ref()
  }

  /// Returns the alias of the link.
  #[inline]
  pub fn alias(&self) -> Option<&str> {
    self.alias.as_deref()
  }

  /// Returns the key of the other end of the reference.
  #[inline]
  pub const fn other_key(&self) -> Option<&K> {
    self.other_key.as_ref()
  }

  /// Reads the value of the link.
  #[inline]
  pub fn value(&self) -> Either<&V, V> {
    self.value.get()
  }

  /// Returns the value mutably, `None` when it is lazy.
  #[inline]
  pub fn value_mut(&mut self) -> Option<&mut V> {
    match &mut self.value {
      LinkValue::Direct(v) => Some(v),
      LinkValue::Lazy(_) => None,
    }
  }

  /// Returns the value source of the link.
  #[inline]
  pub const fn value_source(&self) -> &LinkValue<V> {
    &self.value
  }

  /// Consumes the link, returning its value source.
  #[inline]
  pub fn into_value(self) -> LinkValue<V> {
    self.value
  }
}
