//! Subscript validation and addressing.

use super::ArrayClass;
use crate::config::ArrayConfig;
use crate::error::{ArrayError, ArrayResult};
use bitflags::bitflags;

/// A subscript as handed over by the caller: a whole number, or `None`
/// when the argument was omitted.
pub type Subscript = Option<i64>;

bitflags! {
    /// How an access treats subscripts outside the current bounds.
    ///
    /// The empty set is a plain lookup: out-of-range and surplus subscripts
    /// resolve to "no position".
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IndexAccess: u8 {
        /// Grow the array so the subscripts fit.
        const EXTEND = 0b0000_0001;
        /// Report subscripts beyond the bounds instead of "no position".
        const RAISE_OUT_OF_RANGE = 0b0000_0010;
        /// Report surplus subscripts instead of "no position".
        const RAISE_TOO_MANY = 0b0000_0100;

        /// Access mode of `at` and `remove`.
        const READ = Self::RAISE_TOO_MANY.bits();
        /// Access mode of `put`.
        const WRITE = Self::EXTEND.bits() | Self::RAISE_TOO_MANY.bits();
        /// Access mode of operations that need an existing position.
        const EXISTING = Self::RAISE_OUT_OF_RANGE.bits() | Self::RAISE_TOO_MANY.bits();
    }
}

impl IndexAccess {
    /// Out-of-range and surplus subscripts resolve to "no position".
    pub const LOOKUP: Self = Self::empty();
}

/// Where a subscript list lands.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Located {
    /// 1-based flat position inside the current bounds.
    Position(usize),
    /// Single-dimension position beyond the current size.
    Beyond(usize),
    /// Multidimensional subscripts that need the dimensions grown.
    BeyondMulti(Vec<usize>),
    /// No position and no error for this access mode.
    Nowhere,
}

/// Convert caller subscripts into positive whole numbers.
fn whole_subscripts(subscripts: &[Subscript]) -> ArrayResult<Vec<usize>> {
    if subscripts.is_empty() {
        return Err(ArrayError::MissingArgument { position: 1 });
    }
    subscripts
        .iter()
        .enumerate()
        .map(|(i, sub)| match *sub {
            None => Err(ArrayError::MissingArgument { position: i + 1 }),
            Some(value) if value <= 0 => Err(ArrayError::InvalidSubscript {
                position: i + 1,
                value: value.to_string(),
            }),
            Some(value) => usize::try_from(value).map_err(|_| ArrayError::InvalidSubscript {
                position: i + 1,
                value: value.to_string(),
            }),
        })
        .collect()
}

impl ArrayClass {
    fn locate(&self, subscripts: &[Subscript], access: IndexAccess) -> ArrayResult<Located> {
        let whole = whole_subscripts(subscripts)?;
        let rank = self.dimension_count();

        if whole.len() == 1 {
            if rank > 1 {
                return Err(ArrayError::TooFewSubscripts { min: rank });
            }
            let position = whole[0];
            return if position <= self.size() {
                Ok(Located::Position(position))
            } else if access.contains(IndexAccess::EXTEND) {
                Ok(Located::Beyond(position))
            } else if access.contains(IndexAccess::RAISE_OUT_OF_RANGE) {
                Err(ArrayError::SubscriptOutOfRange {
                    position: 1,
                    value: position,
                    limit: self.size(),
                })
            } else {
                Ok(Located::Nowhere)
            };
        }

        // Surplus subscripts on a store add leading dimensions.
        let Some(dims) = self.dimensions() else {
            return if access.contains(IndexAccess::EXTEND) {
                Ok(Located::BeyondMulti(whole))
            } else if access.contains(IndexAccess::RAISE_TOO_MANY) {
                Err(ArrayError::TooManySubscripts { max: 1 })
            } else {
                Ok(Located::Nowhere)
            };
        };

        if whole.len() > rank {
            return if access.contains(IndexAccess::EXTEND) {
                Ok(Located::BeyondMulti(whole))
            } else if access.contains(IndexAccess::RAISE_TOO_MANY) {
                Err(ArrayError::TooManySubscripts { max: rank })
            } else {
                Ok(Located::Nowhere)
            };
        }
        if whole.len() < rank {
            return Err(ArrayError::TooFewSubscripts { min: rank });
        }

        match dims.first_out_of_bounds(&whole) {
            None => Ok(Located::Position(dims.flat_offset(&whole) + 1)),
            Some(_) if access.contains(IndexAccess::EXTEND) => Ok(Located::BeyondMulti(whole)),
            Some(i) if access.contains(IndexAccess::RAISE_OUT_OF_RANGE) => {
                Err(ArrayError::SubscriptOutOfRange {
                    position: i + 1,
                    value: whole[i],
                    limit: dims.dim(i),
                })
            }
            Some(_) => Ok(Located::Nowhere),
        }
    }

    /// Resolve subscripts to a 1-based flat position without growing.
    ///
    /// Returns `Ok(None)` when the subscripts lie outside the array and the
    /// access mode does not ask for an error. `EXTEND` is ignored here.
    pub fn position_of(
        &self,
        subscripts: &[Subscript],
        access: IndexAccess,
    ) -> ArrayResult<Option<usize>> {
        match self.locate(subscripts, access)? {
            Located::Position(position) => Ok(Some(position)),
            Located::Beyond(_) | Located::BeyondMulti(_) | Located::Nowhere => Ok(None),
        }
    }

    /// Resolve subscripts to a 1-based flat position, growing the array
    /// first when the access mode includes `EXTEND`.
    pub fn validate_index(
        &mut self,
        subscripts: &[Subscript],
        access: IndexAccess,
        config: &ArrayConfig,
    ) -> ArrayResult<Option<usize>> {
        match self.locate(subscripts, access)? {
            Located::Position(position) => Ok(Some(position)),
            Located::Beyond(position) => {
                self.extend(position - self.size(), config)?;
                Ok(Some(position))
            }
            Located::BeyondMulti(whole) => {
                self.extend_multi(&whole, config)?;
                self.position_of(subscripts, access)
            }
            Located::Nowhere => Ok(None),
        }
    }
}
