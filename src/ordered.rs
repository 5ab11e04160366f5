use core::fmt;
use std::{collections::HashMap, hash::Hash};

use either::Either;

use super::{BoxError, Error, NodeMap, SkipNode};

mod link;
pub use link::{LinkValue, OrderedLink};

bitflags::bitflags! {
  /// State flags of an [`OrderedMap`].
  #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
  pub struct Flags: u8 {
    /// The map was never persisted, so there is nothing to load.
    const NEW = 0x01;
    /// Absent keys are requested from the [`Loader`].
    const LOAD = 0x02;
    /// The owner is merging changes into the map.
    const MERGING = 0x04;
    /// Changes are recorded, see [`OrderedMap::take_changes`].
    const SETDIRTY = 0x08;
    /// Every chain mutation fails with [`Error::ReadOnly`].
    const READONLY = 0x10;
    /// The owner defers its own bookkeeping.
    const DEFERRED = 0x20;
  }
}

/// A change recorded for a key while [`Flags::SETDIRTY`] is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
  /// The link (or the node it holds) was created or modified.
  Updated,
  /// The link was removed.
  Removed,
}

/// The store behind an [`OrderedMap`], asked for links that are not loaded.
pub trait Loader<K, V> {
  /// Loads the persisted link of `key`, `Ok(None)` when the store has none.
  fn load(&mut self, key: &K) -> Result<Option<OrderedLink<K, V>>, BoxError>;

  /// Resolves an alias the map does not know about.
  #[inline]
  fn resolve_alias(&mut self, alias: &str) -> Result<Option<K>, BoxError> {
    let _ = alias;
    Ok(None)
  }
}

impl<K, V, F> Loader<K, V> for F
where
  F: FnMut(&K) -> Result<Option<OrderedLink<K, V>>, BoxError>,
{
  #[inline]
  fn load(&mut self, key: &K) -> Result<Option<OrderedLink<K, V>>, BoxError> {
    self(key)
  }
}

/// A key → value map keeping its entries on a doubly linked chain.
///
/// New keys are appended at the end of the chain, [`place`](Self::place)
/// moves a key after another one, and every neighbour lookup is O(1). The
/// map can be backed by a [`Loader`]: a key that is not in memory is then
/// loaded on first access, and [`len`](Self::len) reports the logical size
/// of the chain rather than the number of loaded entries.
///
/// ## Example
///
/// ```rust
/// use ordskl::OrderedMap;
///
/// let mut map = OrderedMap::new();
/// map.insert("a", 1).unwrap();
/// map.insert("b", 2).unwrap();
/// map.insert("c", 3).unwrap();
/// map.place(&"c", None).unwrap();
///
/// let keys = map.keys().collect::<Result<Vec<_>, _>>().unwrap();
/// assert_eq!(keys, ["c", "a", "b"]);
/// assert_eq!(map.get(&"b").unwrap().left(), Some(&2));
/// ```
pub struct OrderedMap<K, V> {
  entries: HashMap<K, OrderedLink<K, V>>,
  aliases: HashMap<String, K>,
  first: Option<K>,
  last: Option<K>,
  count: usize,
  flags: Flags,
  loader: Option<Box<dyn Loader<K, V> + Send>>,
  changes: HashMap<K, Change>,
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for OrderedMap<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OrderedMap")
      .field("first", &self.first)
      .field("last", &self.last)
      .field("count", &self.count)
      .field("flags", &self.flags)
      .field("entries", &self.entries)
      .finish_non_exhaustive()
  }
}

impl<K, V> Default for OrderedMap<K, V>
where
  K: Clone + Eq + Hash,
{
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

impl<K, V> OrderedMap<K, V>
where
  K: Clone + Eq + Hash,
{
  /// Creates an empty map with no flags.
  #[inline]
  pub fn new() -> Self {
    Self::with_flags(Flags::empty())
  }

  /// Creates an empty map with the given flags.
  #[inline]
  pub fn with_flags(flags: Flags) -> Self {
    Self {
      entries: HashMap::new(),
      aliases: HashMap::new(),
      first: None,
      last: None,
      count: 0,
      flags,
      loader: None,
      changes: HashMap::new(),
    }
  }

  /// Installs the store absent keys are loaded from and sets
  /// [`Flags::LOAD`].
  ///
  /// ## Example
  ///
  /// ```rust
  /// use ordskl::{BoxError, OrderedLink, OrderedMap};
  ///
  /// let mut map: OrderedMap<u32, u32> = OrderedMap::new().with_loader(|key: &u32| -> Result<_, BoxError> {
  ///   Ok((*key < 10).then(|| OrderedLink::new(key * 100)))
  /// });
  /// map.restore_head(Some(0), Some(9), 10);
  ///
  /// assert_eq!(map.len(), 10);
  /// assert_eq!(map.get(&3).unwrap().left(), Some(&300));
  /// assert!(map.get(&11).is_err());
  /// ```
  #[inline]
  pub fn with_loader<L>(mut self, loader: L) -> Self
  where
    L: Loader<K, V> + Send + 'static,
  {
    self.loader = Some(Box::new(loader));
    self.flags |= Flags::LOAD;
    self
  }

  /// Installs the persisted state of the head sentinel.
  #[inline]
  pub fn restore_head(&mut self, first: Option<K>, last: Option<K>, count: usize) {
    self.first = first;
    self.last = last;
    self.count = count;
  }

  /// Installs a persisted link as-is, without relinking its neighbours.
  ///
  /// The link is assumed to be already counted by
  /// [`restore_head`](Self::restore_head).
  pub fn restore(&mut self, key: K, link: OrderedLink<K, V>) -> Result<(), Error<K>> {
    self.check_alias(&key, link.alias())?;
    self.bind_alias(&key, link.alias.clone());
    self.entries.insert(key, link);
    Ok(())
  }

  /// Returns the number of keys in the chain, loaded or not.
  #[inline]
  pub fn len(&self) -> usize {
    self.count
  }

  /// Returns `true` if the chain is empty.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.count == 0
  }

  /// Returns the number of links held in memory.
  #[inline]
  pub fn loaded_len(&self) -> usize {
    self.entries.len()
  }

  /// Returns the flags of the map.
  #[inline]
  pub const fn flags(&self) -> Flags {
    self.flags
  }

  /// Turns `flag` on or off, returning whether it was on.
  #[inline]
  pub fn set_flag(&mut self, flag: Flags, on: bool) -> bool {
    let old = self.flags.contains(flag);
    self.flags.set(flag, on);
    old
  }

  /// Returns `true` if [`Flags::DEFERRED`] is set.
  #[inline]
  pub fn is_deferred(&self) -> bool {
    self.flags.contains(Flags::DEFERRED)
  }

  /// Returns `true` if the map has `key`, loading it when configured to.
  #[inline]
  pub fn contains_key(&mut self, key: &K) -> Result<bool, Error<K>> {
    self.load(key)
  }

  /// Returns the link of `key`. When `load` is `true` an absent key is
  /// requested from the store first.
  #[inline]
  pub fn link(&mut self, key: &K, load: bool) -> Result<Option<&OrderedLink<K, V>>, Error<K>> {
    if load {
      self.load(key)?;
    }
    Ok(self.entries.get(key))
  }

  /// Returns the link of `key` mutably, see [`link`](Self::link).
  #[inline]
  pub fn link_mut(
    &mut self,
    key: &K,
    load: bool,
  ) -> Result<Option<&mut OrderedLink<K, V>>, Error<K>> {
    if load {
      self.load(key)?;
    }
    Ok(self.entries.get_mut(key))
  }

  /// Returns the value of `key`, failing with [`Error::KeyNotFound`] when
  /// the key is neither in memory nor in the store.
  #[inline]
  pub fn get(&mut self, key: &K) -> Result<Either<&V, V>, Error<K>> {
    match self.get_opt(key, true)? {
      Some(v) => Ok(v),
      None => Err(Error::KeyNotFound(key.clone())),
    }
  }

  /// Returns the value of `key`, `None` when absent.
  #[inline]
  pub fn get_opt(&mut self, key: &K, load: bool) -> Result<Option<Either<&V, V>>, Error<K>> {
    if load {
      self.load(key)?;
    }
    Ok(self.entries.get(key).map(OrderedLink::value))
  }

  /// Adds `key` at the end of the chain or, if it is already present,
  /// replaces its value and alias in place.
  ///
  /// Fails with [`Error::InvalidValue`] if the alias of `link` is bound to
  /// another key.
  pub fn set(&mut self, key: K, link: OrderedLink<K, V>) -> Result<(), Error<K>> {
    self.check_writable()?;
    let exists = self.load(&key)?;
    self.check_alias(&key, link.alias())?;

    let OrderedLink {
      value,
      alias,
      other_key,
      ..
    } = link;

    if exists {
      let old_alias = match self.entries.get_mut(&key) {
        Some(entry) => {
          entry.value = value;
          entry.other_key = other_key;
          core::mem::replace(&mut entry.alias, alias.clone())
        }
        None => return Err(Error::KeyNotFound(key)),
      };
      if let Some(old) = old_alias {
        if self.aliases.get(&old) == Some(&key) {
          self.aliases.remove(&old);
        }
      }
      self.bind_alias(&key, alias);
      self.mark(&key, Change::Updated);
      return Ok(());
    }

    let last = self.last.clone();
    if let Some(last) = &last {
      self.require(last)?;
    }

    self.bind_alias(&key, alias.clone());
    self.entries.insert(
      key.clone(),
      OrderedLink {
        previous_key: None,
        next_key: None,
        value,
        alias,
        other_key,
      },
    );
    self.count += 1;
    self.link_after(&key, last.as_ref())
  }

  /// Adds `value` under `key`, see [`set`](Self::set).
  #[inline]
  pub fn insert(&mut self, key: K, value: V) -> Result<(), Error<K>> {
    self.set(key, OrderedLink::new(value))
  }

  /// Moves `key` right after `after`, or to the front of the chain when
  /// `after` is `None`. Placing a key after itself does nothing.
  pub fn place(&mut self, key: &K, after: Option<&K>) -> Result<(), Error<K>> {
    self.check_writable()?;
    if after == Some(key) {
      return Ok(());
    }

    let (previous, next) = match self.link(key, true)? {
      Some(link) => (link.previous_key.clone(), link.next_key.clone()),
      None => return Err(Error::KeyNotFound(key.clone())),
    };
    if previous.as_ref() == after {
      return Ok(());
    }

    let after_next = match after {
      Some(after) => match self.link(after, true)? {
        Some(link) => link.next_key.clone(),
        None => return Err(Error::KeyNotFound(after.clone())),
      },
      None => self.first.clone(),
    };
    for k in [&previous, &next, &after_next].into_iter().flatten() {
      self.require(k)?;
    }

    self.unlink(key)?;
    self.link_after(key, after)
  }

  /// Removes `key` from the chain, returning its detached link.
  pub fn remove(&mut self, key: &K) -> Result<OrderedLink<K, V>, Error<K>> {
    self.check_writable()?;

    let (previous, next) = match self.link(key, true)? {
      Some(link) => (link.previous_key.clone(), link.next_key.clone()),
      None => return Err(Error::KeyNotFound(key.clone())),
    };
    for k in [&previous, &next].into_iter().flatten() {
      self.require(k)?;
    }

    self.unlink(key)?;
    let mut link = self
      .entries
      .remove(key)
      .ok_or_else(|| Error::KeyNotFound(key.clone()))?;
    link.previous_key = None;
    link.next_key = None;
    if let Some(alias) = &link.alias {
      if self.aliases.get(alias) == Some(key) {
        self.aliases.remove(alias);
      }
    }
    self.count = self.count.saturating_sub(1);
    self.mark(key, Change::Removed);
    Ok(link)
  }

  /// Removes every entry and resets the head sentinel.
  pub fn clear(&mut self) -> Result<(), Error<K>> {
    self.check_writable()?;

    if self.flags.contains(Flags::SETDIRTY) {
      for key in self.entries.keys() {
        self.changes.insert(key.clone(), Change::Removed);
      }
    }
    self.entries.clear();
    self.aliases.clear();
    self.first = None;
    self.last = None;
    self.count = 0;
    Ok(())
  }

  /// Returns the first key of the chain.
  #[inline]
  pub const fn first_key(&self) -> Option<&K> {
    self.first.as_ref()
  }

  /// Returns the last key of the chain.
  #[inline]
  pub const fn last_key(&self) -> Option<&K> {
    self.last.as_ref()
  }

  /// Returns the key before `key` in the chain.
  #[inline]
  pub fn previous_key(&mut self, key: &K) -> Result<Option<K>, Error<K>> {
    match self.link(key, true)? {
      Some(link) => Ok(link.previous_key.clone()),
      None => Err(Error::KeyNotFound(key.clone())),
    }
  }

  /// Returns the key after `key` in the chain.
  #[inline]
  pub fn next_key(&mut self, key: &K) -> Result<Option<K>, Error<K>> {
    match self.link(key, true)? {
      Some(link) => Ok(link.next_key.clone()),
      None => Err(Error::KeyNotFound(key.clone())),
    }
  }

  /// Resolves `alias` to its key, asking the store when the alias is not
  /// known locally and loading is enabled.
  pub fn alias_key(&mut self, alias: &str) -> Result<Option<K>, Error<K>> {
    if let Some(key) = self.aliases.get(alias) {
      return Ok(Some(key.clone()));
    }

    match self.loader.as_mut() {
      Some(loader) if self.flags.contains(Flags::LOAD) && !self.flags.contains(Flags::NEW) => {
        loader.resolve_alias(alias).map_err(Error::collaborator)
      }
      _ => Ok(None),
    }
  }

  /// Returns the value bound to `alias`, `None` when the alias is unknown.
  pub fn get_by_alias(&mut self, alias: &str) -> Result<Option<Either<&V, V>>, Error<K>> {
    match self.alias_key(alias)? {
      Some(key) => self.get_opt(&key, true),
      None => Ok(None),
    }
  }

  /// Returns an iterator over the keys in chain order.
  ///
  /// Keys may be loaded while iterating, so every item is a `Result`.
  #[inline]
  pub fn keys(&mut self) -> Keys<'_, K, V> {
    Keys {
      next: self.first.clone(),
      map: self,
    }
  }

  /// Drains the changes recorded while [`Flags::SETDIRTY`] was set.
  #[inline]
  pub fn take_changes(&mut self) -> HashMap<K, Change> {
    core::mem::take(&mut self.changes)
  }

  fn load(&mut self, key: &K) -> Result<bool, Error<K>> {
    if self.entries.contains_key(key) {
      return Ok(true);
    }
    if !self.flags.contains(Flags::LOAD) || self.flags.contains(Flags::NEW) {
      return Ok(false);
    }
    let Some(loader) = self.loader.as_mut() else {
      return Ok(false);
    };

    match loader.load(key).map_err(Error::collaborator)? {
      Some(link) => {
        if let Err(e) = self.check_alias(key, link.alias()) {
          #[cfg(feature = "tracing")]
          tracing::warn!(alias = link.alias(), "ordered map: loaded link claims a bound alias");

          return Err(e);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(loaded = self.entries.len() + 1, "ordered map: loaded link from store");

        self.bind_alias(key, link.alias.clone());
        self.entries.insert(key.clone(), link);
        Ok(true)
      }
      None => Ok(false),
    }
  }

  /// Loads a neighbour that a mutation is about to touch.
  #[inline]
  fn require(&mut self, key: &K) -> Result<(), Error<K>> {
    if self.load(key)? {
      Ok(())
    } else {
      Err(Error::KeyNotFound(key.clone()))
    }
  }

  fn entry_mut(&mut self, key: &K) -> Result<&mut OrderedLink<K, V>, Error<K>> {
    self.load(key)?;
    self
      .entries
      .get_mut(key)
      .ok_or_else(|| Error::KeyNotFound(key.clone()))
  }

  /// Splices `key` out of the chain, keeping its entry.
  fn unlink(&mut self, key: &K) -> Result<(), Error<K>> {
    let link = self.entry_mut(key)?;
    let previous = link.previous_key.take();
    let next = link.next_key.take();

    match &previous {
      Some(p) => {
        self.entry_mut(p)?.next_key = next.clone();
        self.mark(p, Change::Updated);
      }
      None => self.first = next.clone(),
    }
    match &next {
      Some(n) => {
        self.entry_mut(n)?.previous_key = previous;
        self.mark(n, Change::Updated);
      }
      None => self.last = previous,
    }
    Ok(())
  }

  /// Links the unlinked `key` right after `after`, or at the front.
  fn link_after(&mut self, key: &K, after: Option<&K>) -> Result<(), Error<K>> {
    let next = match after {
      Some(a) => {
        let link = self.entry_mut(a)?;
        link.next_key.replace(key.clone())
      }
      None => self.first.replace(key.clone()),
    };
    if let Some(a) = after {
      self.mark(a, Change::Updated);
    }

    match &next {
      Some(n) => {
        self.entry_mut(n)?.previous_key = Some(key.clone());
        self.mark(n, Change::Updated);
      }
      None => self.last = Some(key.clone()),
    }

    let link = self.entry_mut(key)?;
    link.previous_key = after.cloned();
    link.next_key = next;
    self.mark(key, Change::Updated);
    Ok(())
  }

  #[inline]
  fn check_writable(&self) -> Result<(), Error<K>> {
    if self.flags.contains(Flags::READONLY) {
      return Err(Error::ReadOnly);
    }
    Ok(())
  }

  fn check_alias(&self, key: &K, alias: Option<&str>) -> Result<(), Error<K>> {
    match alias.and_then(|alias| self.aliases.get(alias).map(|owner| (alias, owner))) {
      Some((alias, owner)) if owner != key => Err(Error::InvalidValue(format!(
        "alias {alias:?} is already bound to another key"
      ))),
      _ => Ok(()),
    }
  }

  #[inline]
  fn bind_alias(&mut self, key: &K, alias: Option<String>) {
    if let Some(alias) = alias {
      self.aliases.insert(alias, key.clone());
    }
  }

  #[inline]
  fn mark(&mut self, key: &K, change: Change) {
    if self.flags.contains(Flags::SETDIRTY) {
      self.changes.insert(key.clone(), change);
    }
  }
}

/// An iterator over the keys of an [`OrderedMap`] in chain order.
pub struct Keys<'a, K, V> {
  map: &'a mut OrderedMap<K, V>,
  next: Option<K>,
}

impl<K, V> Iterator for Keys<'_, K, V>
where
  K: Clone + Eq + Hash,
{
  type Item = Result<K, Error<K>>;

  fn next(&mut self) -> Option<Self::Item> {
    let key = self.next.take()?;
    match self.map.next_key(&key) {
      Ok(next) => {
        self.next = next;
        Some(Ok(key))
      }
      Err(e) => Some(Err(e)),
    }
  }
}

impl<K> NodeMap<K> for OrderedMap<K, SkipNode<K>>
where
  K: Clone + Eq + Hash,
{
  #[inline]
  fn len(&self) -> usize {
    self.count
  }

  #[inline]
  fn contains_key(&mut self, key: &K) -> Result<bool, Error<K>> {
    self.load(key)
  }

  fn node(&mut self, key: &K) -> Result<&SkipNode<K>, Error<K>> {
    self.load(key)?;
    match self.entries.get(key).map(OrderedLink::value_source) {
      Some(LinkValue::Direct(node)) => Ok(node),
      Some(LinkValue::Lazy(_)) => Err(Error::TypeMismatch(key.clone())),
      None => Err(Error::KeyNotFound(key.clone())),
    }
  }

  fn node_mut(&mut self, key: &K) -> Result<&mut SkipNode<K>, Error<K>> {
    self.load(key)?;
    match self.entries.get_mut(key).map(|link| &mut link.value) {
      Some(LinkValue::Direct(node)) => Ok(node),
      Some(LinkValue::Lazy(_)) => Err(Error::TypeMismatch(key.clone())),
      None => Err(Error::KeyNotFound(key.clone())),
    }
  }

  #[inline]
  fn insert_node(&mut self, key: K, node: SkipNode<K>) -> Result<(), Error<K>> {
    OrderedMap::insert(self, key, node)
  }

  fn remove_node(&mut self, key: &K) -> Result<Option<SkipNode<K>>, Error<K>> {
    if !self.load(key)? {
      return Ok(None);
    }
    match OrderedMap::remove(self, key)?.into_value() {
      LinkValue::Direct(node) => Ok(Some(node)),
      LinkValue::Lazy(_) => Err(Error::TypeMismatch(key.clone())),
    }
  }

  #[inline]
  fn key_changed(&mut self, key: &K) -> Result<(), Error<K>> {
    self.check_writable()?;
    self.mark(key, Change::Updated);
    Ok(())
  }

  #[inline]
  fn clear(&mut self) -> Result<(), Error<K>> {
    OrderedMap::clear(self)
  }
}
