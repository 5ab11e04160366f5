use super::{DEFAULT_MAX_LEVEL, MAX_LEVEL};

/// Options for [`SkipList`](crate::SkipList).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Options {
  max_level: usize,
  seed: Option<u64>,
}

impl Default for Options {
  #[inline]
  fn default() -> Options {
    Options::new()
  }
}

impl Options {
  /// Creates a new set of options with the default values.
  #[inline]
  pub const fn new() -> Self {
    Self {
      max_level: DEFAULT_MAX_LEVEL,
      seed: None,
    }
  }

  /// Set the maximum height of a tower in the [`SkipList`](crate::SkipList).
  ///
  /// The value is clamped to `1..=32`. The default is `16`, which keeps the
  /// expected search cost logarithmic well beyond four billion keys with the
  /// `1/4` promotion probability.
  ///
  /// ## Example
  ///
  /// ```rust
  /// use ordskl::Options;
  ///
  /// let opts = Options::new().with_max_level(8);
  /// assert_eq!(opts.max_level(), 8);
  ///
  /// let opts = Options::new().with_max_level(0);
  /// assert_eq!(opts.max_level(), 1);
  /// ```
  #[inline]
  pub const fn with_max_level(mut self, max_level: usize) -> Self {
    self.max_level = if max_level == 0 {
      1
    } else if max_level > MAX_LEVEL {
      MAX_LEVEL
    } else {
      max_level
    };
    self
  }

  /// Set the seed of the level generator.
  ///
  /// With a seed, the sequence of tower heights is reproducible, which is
  /// mostly useful in tests. Without one (the default), the generator is
  /// seeded from the operating system.
  ///
  /// ## Example
  ///
  /// ```rust
  /// use ordskl::Options;
  ///
  /// let opts = Options::new().with_seed(42);
  /// assert_eq!(opts.seed(), Some(42));
  /// ```
  #[inline]
  pub const fn with_seed(mut self, seed: u64) -> Self {
    self.seed = Some(seed);
    self
  }

  /// Returns the maximum height of a tower.
  ///
  /// ## Example
  ///
  /// ```rust
  /// use ordskl::Options;
  ///
  /// assert_eq!(Options::new().max_level(), 16);
  /// ```
  #[inline]
  pub const fn max_level(&self) -> usize {
    self.max_level
  }

  /// Returns the seed of the level generator, if any.
  #[inline]
  pub const fn seed(&self) -> Option<u64> {
    self.seed
  }
}
