//! Error conditions raised by collection operations.

use orx_rts_gc::GcError;
use thiserror::Error;

/// Result type for collection operations.
pub type ArrayResult<T> = Result<T, ArrayError>;

/// Errors raised by Array, Relation and Supplier operations.
///
/// Every variant corresponds to a named language-level condition. None of
/// them are retried or coerced; they propagate to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArrayError {
    /// A required argument was omitted.
    #[error("missing argument in position {position}")]
    MissingArgument {
        /// 1-based argument position.
        position: usize,
    },

    /// A subscript is not a positive whole number.
    #[error("subscript {position} must be a positive whole number; found \"{value}\"")]
    InvalidSubscript {
        /// 1-based subscript position.
        position: usize,
        /// The offending value as text.
        value: String,
    },

    /// More subscripts than the array has dimensions.
    #[error("too many subscripts for array; {max} expected")]
    TooManySubscripts {
        /// Number of dimensions of the array.
        max: usize,
    },

    /// Fewer subscripts than the array has dimensions.
    #[error("not enough subscripts for array; {min} expected")]
    TooFewSubscripts {
        /// Number of dimensions of the array.
        min: usize,
    },

    /// A subscript lies outside the current bounds.
    #[error("subscript {position} value {value} exceeds the array bound of {limit}")]
    SubscriptOutOfRange {
        /// 1-based subscript position.
        position: usize,
        /// The subscript value.
        value: usize,
        /// The bound of that dimension.
        limit: usize,
    },

    /// A size or dimension product exceeds the configured maximum.
    #[error("array size {requested} exceeds the maximum of {max} elements")]
    CapacityExceeded {
        /// Requested element count (saturated on overflow).
        requested: usize,
        /// Configured maximum.
        max: usize,
    },

    /// An operation requiring a dense array found a hole.
    #[error("array is sparse; no item at index {index}")]
    SparseArray {
        /// 1-based position of the first hole.
        index: usize,
    },

    /// A sort comparator returned nothing.
    #[error("sort comparator did not return a result")]
    ComparatorNoResult,

    /// A sort comparator returned something other than a whole number.
    #[error("sort comparator result \"{result}\" is not a whole number")]
    ComparatorNotNumeric {
        /// The returned value as text.
        result: String,
    },

    /// Natural ordering was requested for an object without one.
    #[error("{class} object does not support comparison")]
    NotComparable {
        /// Class of the offending object.
        class: &'static str,
    },

    /// The operation only applies to single-dimension arrays.
    #[error("{operation} is not supported for a multidimensional array")]
    MultiDimensional {
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// An option argument is not one of the accepted values.
    #[error("invalid option \"{option}\"; expected one of {expected}")]
    InvalidOption {
        /// The option given.
        option: String,
        /// The accepted values.
        expected: &'static str,
    },

    /// An object of the wrong class was passed.
    #[error("{found} object found where {expected} was required")]
    WrongClass {
        /// Class the operation requires.
        expected: &'static str,
        /// Class actually found.
        found: &'static str,
    },

    /// A supplier was read past its last item.
    #[error("no more items available from supplier")]
    SupplierExhausted,

    /// The managed heap rejected an allocation or reference.
    #[error(transparent)]
    Heap(#[from] GcError),
}
