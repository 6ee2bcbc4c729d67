//! The Array class storage engine.
//!
//! An array is a logical size, an optional dimension descriptor and a
//! backing block of slots. The block is usually larger than the logical
//! size so that appends do not reallocate every time:
//!
//! ```text
//!   size = 5, capacity = 8
//!   +-----+-----+-----+-----+-----+-----+-----+-----+
//!   |  a  |  -  |  c  |  d  |  -  |  .  |  .  |  .  |
//!   +-----+-----+-----+-----+-----+-----+-----+-----+
//!     1     2     3     4     5    spare capacity
//!   items = 3 (holes marked '-'), last item = 4
//! ```
//!
//! Positions are 1-based throughout. A hole is an empty slot and is not an
//! item; `items` counts occupied slots only.
//!
//! Slots beyond the logical size are always empty, so growing inside the
//! capacity only has to move the size.

pub mod dimensions;
pub mod index;
pub mod sort;

pub use dimensions::Dimensions;
pub use index::{IndexAccess, Subscript};
pub use sort::{merge_sort, quick_sort};

use crate::config::ArrayConfig;
use crate::error::{ArrayError, ArrayResult};
use dimensions::{element_count, row_major_strides};
use orx_rts_gc::{ObjRef, Trace, Tracer};
use std::cmp::Ordering;
use tracing::{debug, trace};

/// A storage slot; `None` is a hole.
pub type Slot = Option<ObjRef>;

/// Where [`ArrayClass::insert`] places the new item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAt {
    /// Before the first slot.
    First,
    /// Directly after the given 1-based position.
    After(usize),
    /// After the last item.
    Last,
}

/// A dynamically sized, optionally multidimensional array of object
/// references.
#[derive(Debug, Clone)]
pub struct ArrayClass {
    /// Logical size (product of the dimensions when multidimensional).
    size: usize,
    /// Number of occupied slots.
    items: usize,
    /// Highest occupied position, 0 when empty.
    last_item: usize,
    /// Present only for arrays of two or more dimensions.
    dimensions: Option<Dimensions>,
    /// Backing block; its length is the pre-allocated capacity.
    storage: Box<[Slot]>,
}

fn check_capacity(requested: usize, config: &ArrayConfig) -> ArrayResult<()> {
    if requested > config.max_elements {
        return Err(ArrayError::CapacityExceeded {
            requested,
            max: config.max_elements,
        });
    }
    Ok(())
}

fn empty_block(len: usize) -> Box<[Slot]> {
    vec![None; len].into_boxed_slice()
}

impl ArrayClass {
    /// An empty single-dimension array with no storage.
    pub fn empty_array() -> Self {
        ArrayClass {
            size: 0,
            items: 0,
            last_item: 0,
            dimensions: None,
            storage: empty_block(0),
        }
    }

    /// A single-dimension array of `size` holes.
    pub fn new(size: usize, config: &ArrayConfig) -> ArrayResult<Self> {
        check_capacity(size, config)?;
        Ok(ArrayClass {
            size,
            storage: empty_block(size),
            ..Self::empty_array()
        })
    }

    /// An array with the given dimension sizes.
    ///
    /// A single dimension gives an ordinary single-dimension array.
    pub fn with_dimensions(dims: &[usize], config: &ArrayConfig) -> ArrayResult<Self> {
        match dims {
            [] => Ok(Self::empty_array()),
            [size] => Self::new(*size, config),
            _ => {
                let total = element_count(dims).unwrap_or(usize::MAX);
                check_capacity(total, config)?;
                Ok(ArrayClass {
                    size: total,
                    dimensions: Some(Dimensions::new(dims)),
                    storage: empty_block(total),
                    ..Self::empty_array()
                })
            }
        }
    }

    /// A single-dimension array holding exactly the given slots.
    pub fn from_slots(slots: Vec<Slot>, config: &ArrayConfig) -> ArrayResult<Self> {
        check_capacity(slots.len(), config)?;
        let mut array = ArrayClass {
            size: slots.len(),
            storage: slots.into_boxed_slice(),
            ..Self::empty_array()
        };
        array.recount();
        Ok(array)
    }

    /// Logical size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of items (occupied slots).
    pub fn items(&self) -> usize {
        self.items
    }

    /// Whether the array holds no items.
    pub fn is_empty(&self) -> bool {
        self.items == 0
    }

    /// Pre-allocated capacity of the backing block.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Highest occupied position, 0 when there are no items.
    pub fn last_item_position(&self) -> usize {
        self.last_item
    }

    /// The dimension descriptor of a multidimensional array.
    pub fn dimensions(&self) -> Option<&Dimensions> {
        self.dimensions.as_ref()
    }

    /// Number of dimensions; 1 for single-dimension arrays.
    pub fn dimension_count(&self) -> usize {
        self.dimensions.as_ref().map_or(1, Dimensions::rank)
    }

    /// Size of dimension `n` (1-based); 0 when the array has fewer dimensions.
    pub fn dimension(&self, n: usize) -> usize {
        match &self.dimensions {
            Some(dims) if n >= 1 && n <= dims.rank() => dims.dim(n - 1),
            Some(_) => 0,
            None if n == 1 => self.size,
            None => 0,
        }
    }

    /// Dimension sizes; a single-dimension array reports `[size]`.
    pub fn dimension_sizes(&self) -> Vec<usize> {
        match &self.dimensions {
            Some(dims) => dims.as_slice().to_vec(),
            None => vec![self.size],
        }
    }

    /// Subscripts of a 1-based flat position.
    pub fn subscripts_of(&self, position: usize) -> Vec<usize> {
        match &self.dimensions {
            Some(dims) => dims.subscripts_of(position - 1),
            None => vec![position],
        }
    }

    /// The slot at a 1-based position; holes and out-of-range positions
    /// give `None`.
    pub fn get(&self, position: usize) -> Slot {
        if position == 0 || position > self.size {
            return None;
        }
        self.storage[position - 1]
    }

    /// Store into a 1-based position inside the current size.
    ///
    /// Storing `None` clears the slot. Callers holding the array in the
    /// managed heap must pass a stored reference through the write barrier.
    pub fn put(&mut self, position: usize, value: Slot) {
        debug_assert!(position >= 1 && position <= self.size);
        let slot = &mut self.storage[position - 1];
        match (slot.is_some(), value.is_some()) {
            (false, true) => self.items += 1,
            (true, false) => self.items -= 1,
            _ => {}
        }
        *slot = value;

        if value.is_some() {
            self.last_item = self.last_item.max(position);
        } else if position == self.last_item {
            self.last_item = self.previous(position).unwrap_or(0);
        }
    }

    /// Clear a slot, returning what it held.
    pub fn clear(&mut self, position: usize) -> Slot {
        let old = self.get(position);
        if old.is_some() {
            self.put(position, None);
        }
        old
    }

    /// Iterate over `(position, item)` pairs, skipping holes.
    pub fn iter_items(&self) -> impl Iterator<Item = (usize, ObjRef)> + '_ {
        self.storage[..self.size]
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|r| (i + 1, r)))
    }

    /// All slots inside the logical size.
    pub fn slots(&self) -> &[Slot] {
        &self.storage[..self.size]
    }

    /// All items in position order.
    pub fn all_items(&self) -> Vec<ObjRef> {
        self.iter_items().map(|(_, r)| r).collect()
    }

    /// Positions of all items.
    pub fn all_indexes(&self) -> Vec<usize> {
        self.iter_items().map(|(pos, _)| pos).collect()
    }

    /// Position of the first item.
    pub fn first(&self) -> Option<usize> {
        self.next_from(1)
    }

    /// Position of the last item.
    pub fn last(&self) -> Option<usize> {
        (self.last_item > 0).then_some(self.last_item)
    }

    /// Position of the first item after `position`.
    pub fn next(&self, position: usize) -> Option<usize> {
        self.next_from(position.checked_add(1)?)
    }

    fn next_from(&self, start: usize) -> Option<usize> {
        let start = start.max(1);
        if start > self.last_item {
            return None;
        }
        (start..=self.last_item).find(|&p| self.storage[p - 1].is_some())
    }

    /// Position of the last item before `position`.
    pub fn previous(&self, position: usize) -> Option<usize> {
        let end = position.min(self.size + 1);
        (1..end).rev().find(|&p| self.storage[p - 1].is_some())
    }

    /// Position of the first item matching the predicate.
    pub fn position_where<F>(&self, mut pred: F) -> Option<usize>
    where
        F: FnMut(ObjRef) -> bool,
    {
        self.iter_items().find(|&(_, r)| pred(r)).map(|(pos, _)| pos)
    }

    /// Store `value` in every slot.
    pub fn fill(&mut self, value: ObjRef) {
        self.storage[..self.size].fill(Some(value));
        self.items = self.size;
        self.last_item = self.size;
    }

    /// Clear every slot, keeping the size.
    pub fn empty(&mut self) {
        self.storage[..self.size].fill(None);
        self.items = 0;
        self.last_item = 0;
    }

    fn recount(&mut self) {
        let live = &self.storage[..self.size];
        self.items = live.iter().filter(|s| s.is_some()).count();
        self.last_item = live.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
    }

    // ------------------------------------------------------------------
    // Growth and shrinkage
    // ------------------------------------------------------------------

    /// Make room for at least `min_size` slots without changing the size.
    pub fn ensure_space(&mut self, min_size: usize, config: &ArrayConfig) -> ArrayResult<()> {
        if min_size <= self.capacity() {
            return Ok(());
        }
        check_capacity(min_size, config)?;
        self.reallocate(config.grown_capacity(min_size));
        Ok(())
    }

    fn reallocate(&mut self, capacity: usize) {
        let mut block = empty_block(capacity);
        block[..self.size].copy_from_slice(&self.storage[..self.size]);
        debug!(
            size = self.size,
            old_capacity = self.storage.len(),
            new_capacity = capacity,
            "reallocated array storage"
        );
        // the old block is dropped here
        self.storage = block;
    }

    /// Grow the logical size of a single-dimension array by `extension`.
    ///
    /// Growth inside the pre-allocated capacity only moves the size;
    /// otherwise a larger block is allocated and the slots copied over.
    pub fn extend(&mut self, extension: usize, config: &ArrayConfig) -> ArrayResult<()> {
        if self.dimensions.is_some() {
            return Err(ArrayError::MultiDimensional { operation: "extend" });
        }
        let new_size = self.size.saturating_add(extension);
        check_capacity(new_size, config)?;
        if new_size <= self.capacity() {
            trace!(from = self.size, to = new_size, "array size bumped in place");
            self.size = new_size;
            return Ok(());
        }
        self.reallocate(config.grown_capacity(new_size));
        self.size = new_size;
        Ok(())
    }

    /// Grow the dimensions so that `subscripts` fit.
    ///
    /// The new dimensions are the element-wise maximum of the old ones and
    /// the subscripts. Extra subscripts add leading dimensions; existing
    /// items keep their subscripts with a 1 prepended for each new
    /// dimension. Every item keeps its subscripts.
    pub fn extend_multi(&mut self, subscripts: &[usize], config: &ArrayConfig) -> ArrayResult<()> {
        let old_dims: Vec<usize> = match &self.dimensions {
            Some(dims) => dims.as_slice().to_vec(),
            None if self.size == 0 => Vec::new(),
            None => vec![self.size],
        };
        if subscripts.len() < old_dims.len() {
            return Err(ArrayError::TooFewSubscripts {
                min: old_dims.len(),
            });
        }

        let added = subscripts.len() - old_dims.len();
        let padded: Vec<usize> = std::iter::repeat(1)
            .take(added)
            .chain(old_dims.iter().copied())
            .collect();
        let new_dims: Vec<usize> = padded
            .iter()
            .zip(subscripts)
            .map(|(&old, &sub)| old.max(sub))
            .collect();
        if new_dims == padded && added == 0 {
            return Ok(());
        }

        let total = element_count(&new_dims).unwrap_or(usize::MAX);
        check_capacity(total, config)?;

        let mut block = empty_block(total);
        if self.size > 0 {
            copy_dimensioned(&self.storage[..self.size], &padded, &mut block, &new_dims);
        }
        debug!(
            old = ?old_dims,
            new = ?new_dims,
            "array dimensions extended"
        );

        self.storage = block;
        self.size = total;
        self.dimensions = (new_dims.len() > 1).then(|| Dimensions::new(&new_dims));
        self.recount();
        Ok(())
    }

    /// Drop `amount` trailing slots without reallocating.
    pub fn shrink(&mut self, amount: usize) -> ArrayResult<()> {
        if self.dimensions.is_some() {
            return Err(ArrayError::MultiDimensional { operation: "shrink" });
        }
        let new_size = self.size.saturating_sub(amount);
        for position in new_size + 1..=self.size {
            self.clear(position);
        }
        self.size = new_size;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sequence operations (single dimension only)
    // ------------------------------------------------------------------

    fn require_single(&self, operation: &'static str) -> ArrayResult<()> {
        if self.dimensions.is_some() {
            return Err(ArrayError::MultiDimensional { operation });
        }
        Ok(())
    }

    /// Store after the last item, growing as needed. Returns the position.
    pub fn append(&mut self, value: ObjRef, config: &ArrayConfig) -> ArrayResult<usize> {
        self.require_single("append")?;
        let position = self.last_item + 1;
        if position > self.size {
            self.extend(position - self.size, config)?;
        }
        self.put(position, Some(value));
        Ok(position)
    }

    /// Insert a slot, shifting the following slots up by one.
    ///
    /// Returns the position of the inserted value.
    pub fn insert(&mut self, value: Slot, at: InsertAt, config: &ArrayConfig) -> ArrayResult<usize> {
        self.require_single("insert")?;
        let position = match at {
            InsertAt::First => 1,
            InsertAt::Last => self.last_item + 1,
            InsertAt::After(after) => {
                if after == 0 {
                    return Err(ArrayError::InvalidSubscript {
                        position: 1,
                        value: after.to_string(),
                    });
                }
                if after > self.size {
                    return Err(ArrayError::SubscriptOutOfRange {
                        position: 1,
                        value: after,
                        limit: self.size,
                    });
                }
                after + 1
            }
        };

        self.open_gap(position, config)?;
        self.put(position, value);
        Ok(position)
    }

    /// Grow by one and move slots `position..` up by one, leaving a hole.
    fn open_gap(&mut self, position: usize, config: &ArrayConfig) -> ArrayResult<()> {
        let old_size = self.size;
        self.extend(1.max(position.saturating_sub(old_size)), config)?;
        if position <= old_size {
            self.storage.copy_within(position - 1..old_size, position);
            self.storage[position - 1] = None;
            if self.last_item >= position {
                self.last_item += 1;
            }
        }
        Ok(())
    }

    /// Remove a slot, shifting the following slots down and shrinking by
    /// one. Returns what the slot held.
    pub fn delete(&mut self, position: usize) -> ArrayResult<Slot> {
        self.require_single("delete")?;
        if position == 0 {
            return Err(ArrayError::InvalidSubscript {
                position: 1,
                value: position.to_string(),
            });
        }
        if position > self.size {
            return Err(ArrayError::SubscriptOutOfRange {
                position: 1,
                value: position,
                limit: self.size,
            });
        }

        let removed = self.clear(position);
        self.storage.copy_within(position..self.size, position - 1);
        self.storage[self.size - 1] = None;
        self.size -= 1;
        if self.last_item > position {
            self.last_item -= 1;
        }
        Ok(removed)
    }

    /// A new array holding `count` slots starting at `start`.
    ///
    /// The range is clamped to the slots available; a start beyond the size
    /// gives an empty array.
    pub fn section(&self, start: usize, count: Option<usize>, config: &ArrayConfig) -> ArrayResult<Self> {
        self.require_single("section")?;
        if start == 0 {
            return Err(ArrayError::InvalidSubscript {
                position: 1,
                value: start.to_string(),
            });
        }
        if start > self.size {
            return Ok(Self::empty_array());
        }
        let available = self.size - start + 1;
        let count = count.map_or(available, |c| c.min(available));
        Self::from_slots(self.storage[start - 1..start - 1 + count].to_vec(), config)
    }

    /// A new array of both arrays' slots, this one first.
    pub fn join(&self, other: &ArrayClass, config: &ArrayConfig) -> ArrayResult<Self> {
        let total = self.size.saturating_add(other.size);
        check_capacity(total, config)?;
        let mut slots = Vec::with_capacity(total);
        slots.extend_from_slice(self.slots());
        slots.extend_from_slice(other.slots());
        Self::from_slots(slots, config)
    }

    // ------------------------------------------------------------------
    // Sorting
    // ------------------------------------------------------------------

    /// Number of leading positions a sort covers, after checking that none
    /// of them is a hole.
    pub fn dense_prefix(&self) -> ArrayResult<usize> {
        let count = self.items;
        match self.storage[..count].iter().position(Option::is_none) {
            Some(hole) => Err(ArrayError::SparseArray { index: hole + 1 }),
            None => Ok(count),
        }
    }

    /// Check density and take the contents out for sorting.
    ///
    /// While detached the array reads as empty, so a comparator that looks
    /// at the array being sorted sees no items rather than a half-sorted
    /// block. Must be followed by [`ArrayClass::attach_storage`].
    pub fn detach_for_sort(&mut self) -> ArrayResult<DetachedStorage> {
        let dense = self.dense_prefix()?;
        let detached = DetachedStorage {
            slots: std::mem::take(&mut self.storage),
            size: self.size,
            items: self.items,
            last_item: self.last_item,
            dense,
        };
        self.size = 0;
        self.items = 0;
        self.last_item = 0;
        Ok(detached)
    }

    /// Put back contents taken with [`ArrayClass::detach_for_sort`].
    pub fn attach_storage(&mut self, detached: DetachedStorage) {
        self.storage = detached.slots;
        self.size = detached.size;
        self.items = detached.items;
        self.last_item = detached.last_item;
    }
}

/// Array contents detached for sorting.
#[derive(Debug)]
pub struct DetachedStorage {
    slots: Box<[Slot]>,
    size: usize,
    items: usize,
    last_item: usize,
    dense: usize,
}

impl DetachedStorage {
    /// Sort the dense leading run, stable or not.
    ///
    /// # Errors
    ///
    /// Returns the first comparator error; the run is then left in some
    /// permutation of its original order.
    pub fn sort<F>(&mut self, stable: bool, cmp: F) -> ArrayResult<()>
    where
        F: FnMut(ObjRef, ObjRef) -> ArrayResult<Ordering>,
    {
        sort_slots(&mut self.slots[..self.dense], stable, cmp)
    }
}

/// Sort a dense run of slots.
fn sort_slots<F>(slots: &mut [Slot], stable: bool, mut cmp: F) -> ArrayResult<()>
where
    F: FnMut(ObjRef, ObjRef) -> ArrayResult<Ordering>,
{
    // The run was checked dense; a hole here would be a bookkeeping bug.
    let mut compare = |a: &Slot, b: &Slot| match (a, b) {
        (Some(a), Some(b)) => cmp(*a, *b),
        _ => Ok(Ordering::Equal),
    };
    if stable {
        merge_sort(slots, &mut compare)
    } else {
        quick_sort(slots, &mut compare)
    }
}

/// Copy a row-major block into a larger one, preserving subscripts.
///
/// Both shapes have the same rank and `new_dims[i] >= old_dims[i]`. The
/// copy recurses from the outermost dimension to the innermost dimension
/// that changed; below that the old and new layouts agree, so each row of
/// that dimension is one contiguous run.
fn copy_dimensioned(old: &[Slot], old_dims: &[usize], new: &mut [Slot], new_dims: &[usize]) {
    let Some(changed) = (0..old_dims.len()).rev().find(|&i| old_dims[i] != new_dims[i]) else {
        new[..old.len()].copy_from_slice(old);
        return;
    };
    let old_strides = row_major_strides(old_dims);
    let new_strides = row_major_strides(new_dims);

    fn copy_level(
        level: usize,
        changed: usize,
        (old, old_base, old_dims, old_strides): (&[Slot], usize, &[usize], &[usize]),
        (new, new_base, new_strides): (&mut [Slot], usize, &[usize]),
    ) {
        if level == changed {
            let run = old_dims[level] * old_strides[level];
            new[new_base..new_base + run].copy_from_slice(&old[old_base..old_base + run]);
            return;
        }
        for i in 0..old_dims[level] {
            copy_level(
                level + 1,
                changed,
                (old, old_base + i * old_strides[level], old_dims, old_strides),
                (&mut *new, new_base + i * new_strides[level], new_strides),
            );
        }
    }

    copy_level(
        0,
        changed,
        (old, 0, old_dims, &old_strides),
        (new, 0, &new_strides),
    );
}

impl Trace for ArrayClass {
    fn trace(&self, tracer: &mut Tracer) {
        for slot in &self.storage[..self.size] {
            tracer.mark_slot(*slot);
        }
    }
}
