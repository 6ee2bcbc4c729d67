//! Array, Relation and Supplier classes for the ORX runtime.
//!
//! This crate holds the collection classes of the runtime object model and
//! the object space they live in.
//!
//! # Overview
//!
//! - [`ArrayClass`] - dynamically sized, optionally multidimensional array of
//!   object references with holes, in-place growth and two sort algorithms
//! - [`Relation`] - multi-valued map keyed by value
//! - [`Supplier`] - snapshot iterator over (item, index) pairs
//! - [`ObjectSpace`] - the managed heap plus every operation a program can
//!   apply to these objects
//! - [`Runtime`] - the execution lock around an object space
//!
//! # Example
//!
//! ```
//! use orx_collections::{ArrayError, ObjectSpace};
//!
//! let mut space = ObjectSpace::default();
//! let array = space.new_array(3).unwrap();
//! let a = space.new_string("a").unwrap();
//! let c = space.new_string("c").unwrap();
//! space.array_put(array, a, 1_usize).unwrap();
//! space.array_put(array, c, 3_usize).unwrap();
//!
//! assert_eq!(space.array_items(array).unwrap(), 2);
//! assert_eq!(
//!     space.array_sort(array),
//!     Err(ArrayError::SparseArray { index: 2 })
//! );
//! ```

#![warn(missing_docs)]

pub mod array;
pub mod config;
pub mod error;
pub mod object;
pub mod relation;
pub mod runtime;
pub mod space;
pub mod supplier;

pub use array::{ArrayClass, Dimensions, IndexAccess, InsertAt, Slot, Subscript};
pub use config::{ArrayConfig, ConfigError, SpaceConfig};
pub use error::{ArrayError, ArrayResult};
pub use object::{parse_whole_number, Object};
pub use orx_rts_gc::{GcConfig, GcError, Generation, ObjRef};
pub use relation::{Relation, RelationKey};
pub use runtime::Runtime;
pub use space::{ArrayIndex, Comparator, JoinPolicy, ObjectSpace};
pub use supplier::Supplier;
