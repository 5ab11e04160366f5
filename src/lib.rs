#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, allow(unused_attributes))]
#![deny(missing_docs)]
#![allow(clippy::type_complexity, rustdoc::bare_urls)]

mod error;
pub use error::{BoxError, Error};

mod options;
pub use options::Options;

mod level;
pub use level::{Geometric, LevelGenerator};

mod node;
pub use node::{SkipNode, SkipPoint};

mod map;
pub use map::NodeMap;

/// An insertion-ordered, alias-addressable linked map.
pub mod ordered;
pub use ordered::{Change, Flags, LinkValue, Loader, OrderedLink, OrderedMap};

mod skiplist;
pub use skiplist::{FindMode, Iter, ParseFindModeError, SkipList};

/// The hard upper bound of [`Options::with_max_level`].
pub const MAX_LEVEL: usize = 32;

/// The default height cap of a tower.
pub const DEFAULT_MAX_LEVEL: usize = 16;
