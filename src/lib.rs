//! Two associative containers with a shared error type and cursor model.
//!
//! - [`ChainedHashMap`]: hash map with separate chaining and a bucket count
//!   fixed at construction.
//! - [`AvlTreeMap`]: ordered map backed by an AVL tree.
//!
//! Nodes of both maps live in an index arena. Allocation is fallible:
//! operations that create nodes return [`MapError::AllocationFailure`]
//! instead of aborting. Cursors move in both directions and report
//! [`MapError::IteratorOutOfRange`] when stepped past either end.
//!
//! ```
//! use assoc_maps::{AvlTreeMap, ChainedHashMap, MapError};
//!
//! let mut tree = AvlTreeMap::new();
//! for key in [5, 3, 8, 1, 4, 7, 9] {
//!     tree.insert(key, key * 10).unwrap();
//! }
//! let keys: Vec<i32> = tree.iter().map(|(key, _)| *key).collect();
//! assert_eq!(keys, [1, 3, 4, 5, 7, 8, 9]);
//!
//! let mut hash = ChainedHashMap::with_bucket_count(4);
//! hash.insert(10, "x").unwrap();
//! assert_eq!(hash.value_of(&10), Ok(&"x"));
//! assert_eq!(hash.remove(&11), Err(MapError::NotFound));
//! ```

mod arena;
mod cursor;
pub mod error;
pub mod hash_map;
pub mod tree_map;

pub use error::{MapError, Result};
pub use hash_map::{ChainedHashMap, DEFAULT_BUCKET_COUNT};
pub use tree_map::AvlTreeMap;
