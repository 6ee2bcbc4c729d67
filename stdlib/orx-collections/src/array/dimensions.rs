//! Dimension descriptors for multidimensional arrays.
//!
//! Storage is a flat row-major buffer. A subscript list `(i_1, ..., i_n)`
//! (1-based) addresses the flat offset
//! `Σ (i_k - 1) * Π(d_j for j > k)`.

use std::fmt;

/// The shape of a multidimensional array.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Dimensions {
    dims: Vec<usize>,
}

impl Dimensions {
    /// Create a descriptor from dimension sizes.
    pub fn new(dims: &[usize]) -> Self {
        Dimensions {
            dims: dims.to_vec(),
        }
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Size of dimension `i` (0-based).
    pub fn dim(&self, i: usize) -> usize {
        self.dims[i]
    }

    /// All dimension sizes.
    pub fn as_slice(&self) -> &[usize] {
        &self.dims
    }

    /// Total number of elements, or `None` on overflow.
    pub fn num_elements(&self) -> Option<usize> {
        element_count(&self.dims)
    }

    /// Row-major strides.
    pub fn strides(&self) -> Vec<usize> {
        row_major_strides(&self.dims)
    }

    /// Flat 0-based offset of an in-bounds 1-based subscript list.
    pub fn flat_offset(&self, subscripts: &[usize]) -> usize {
        debug_assert_eq!(subscripts.len(), self.rank());
        self.strides()
            .iter()
            .zip(subscripts)
            .map(|(stride, &sub)| (sub - 1) * stride)
            .sum()
    }

    /// 1-based subscripts of a flat 0-based offset.
    pub fn subscripts_of(&self, offset: usize) -> Vec<usize> {
        let mut remaining = offset;
        self.strides()
            .iter()
            .map(|&stride| {
                let coord = remaining / stride;
                remaining %= stride;
                coord + 1
            })
            .collect()
    }

    /// Index of the first subscript exceeding its dimension.
    pub fn first_out_of_bounds(&self, subscripts: &[usize]) -> Option<usize> {
        subscripts
            .iter()
            .zip(&self.dims)
            .position(|(&sub, &dim)| sub > dim)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

/// Product of dimension sizes, or `None` on overflow.
pub fn element_count(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Compute row-major strides for a list of dimension sizes.
pub fn row_major_strides(dims: &[usize]) -> Vec<usize> {
    if dims.is_empty() {
        return vec![];
    }

    let mut strides = vec![1; dims.len()];
    for i in (0..dims.len() - 1).rev() {
        strides[i] = strides[i + 1] * dims[i + 1];
    }
    strides
}
