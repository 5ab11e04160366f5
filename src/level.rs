use rand::{rngs::SmallRng, Rng, SeedableRng};

use super::{Options, MAX_LEVEL};

/// Chooses the height of the tower of a newly inserted key.
///
/// The skiplist stays balanced only in expectation, so the distribution
/// matters: level `k` must be geometrically less likely than level `k - 1`.
pub trait LevelGenerator {
  /// The highest level this generator will ever return.
  fn max_level(&self) -> usize;

  /// Returns a level in `1..=self.max_level()`.
  fn next_level(&mut self) -> usize;
}

/// Precompute the promotion thresholds so that only a single random number
/// needs to be generated per tower. `PROBABILITIES[k]` is `u32::MAX * (1/4)^k`.
const PROBABILITIES: [u32; MAX_LEVEL] = {
  let mut probabilities = [0; MAX_LEVEL];

  let mut i = 0;
  while i < MAX_LEVEL {
    probabilities[i] = ((u32::MAX as u64) >> (2 * i)) as u32;
    i += 1;
  }

  probabilities
};

/// The default [`LevelGenerator`]: each additional level is reached with
/// probability `1/4`, up to a hard cap.
#[derive(Debug, Clone)]
pub struct Geometric {
  max_level: usize,
  rng: SmallRng,
}

impl Default for Geometric {
  #[inline]
  fn default() -> Self {
    Self::new(Options::new())
  }
}

impl Geometric {
  /// Creates a generator capped at `opts.max_level()`, seeded from
  /// `opts.seed()` or from the operating system.
  pub fn new(opts: Options) -> Self {
    let rng = match opts.seed() {
      Some(seed) => SmallRng::seed_from_u64(seed),
      None => SmallRng::from_os_rng(),
    };

    Self {
      max_level: opts.max_level(),
      rng,
    }
  }
}

impl LevelGenerator for Geometric {
  #[inline]
  fn max_level(&self) -> usize {
    self.max_level
  }

  #[inline]
  fn next_level(&mut self) -> usize {
    let rnd: u32 = self.rng.random();
    let mut h = 1;

    while h < self.max_level && rnd <= PROBABILITIES[h] {
      h += 1;
    }
    h
  }
}

impl<G: LevelGenerator + ?Sized> LevelGenerator for Box<G> {
  #[inline]
  fn max_level(&self) -> usize {
    (**self).max_level()
  }

  #[inline]
  fn next_level(&mut self) -> usize {
    (**self).next_level()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_levels_within_bounds() {
    let mut levels = Geometric::new(Options::new().with_max_level(4).with_seed(7));
    for _ in 0..10_000 {
      let l = levels.next_level();
      assert!((1..=4).contains(&l));
    }
  }

  #[test]
  fn test_single_level() {
    let mut levels = Geometric::new(Options::new().with_max_level(1).with_seed(7));
    for _ in 0..1_000 {
      assert_eq!(levels.next_level(), 1);
    }
  }

  #[test]
  fn test_geometric_distribution() {
    const N: usize = 100_000;

    let mut levels = Geometric::new(Options::new().with_seed(0xdead_beef));
    let mut counts = [0usize; MAX_LEVEL + 1];
    for _ in 0..N {
      counts[levels.next_level()] += 1;
    }

    // level 1 takes ~3/4 of the draws, level 2 ~3/16
    let l1 = counts[1] as f64 / N as f64;
    let l2 = counts[2] as f64 / N as f64;
    assert!((l1 - 0.75).abs() < 0.01, "level 1 ratio {l1}");
    assert!((l2 - 0.1875).abs() < 0.01, "level 2 ratio {l2}");
    assert!(counts[17..].iter().all(|c| *c == 0));
  }

  #[test]
  fn test_seeded_is_reproducible() {
    let opts = Options::new().with_seed(99);
    let mut a = Geometric::new(opts);
    let mut b = Geometric::new(opts);
    for _ in 0..100 {
      assert_eq!(a.next_level(), b.next_level());
    }
  }
}
