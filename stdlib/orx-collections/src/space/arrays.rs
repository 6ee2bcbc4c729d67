//! Array operations on managed array objects.

use super::{comparator_ordering, Comparator, ObjectSpace};
use crate::array::{ArrayClass, IndexAccess, InsertAt, Slot, Subscript};
use crate::error::{ArrayError, ArrayResult};
use crate::object::{parse_whole_number, Object};
use crate::supplier::Supplier;
use orx_rts_gc::ObjRef;
use std::cmp::Ordering;

/// Subscripts of an array access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayIndex {
    /// Whole-number subscripts; `None` is an omitted argument.
    Numbers(Vec<Subscript>),
    /// Subscript objects as a program passes them. A single array object
    /// stands for its items.
    Objects(Vec<Option<ObjRef>>),
}

impl From<usize> for ArrayIndex {
    fn from(position: usize) -> Self {
        ArrayIndex::Numbers(vec![Some(to_subscript(position))])
    }
}

impl From<&[usize]> for ArrayIndex {
    fn from(subscripts: &[usize]) -> Self {
        ArrayIndex::Numbers(subscripts.iter().map(|&s| Some(to_subscript(s))).collect())
    }
}

impl<const N: usize> From<[usize; N]> for ArrayIndex {
    fn from(subscripts: [usize; N]) -> Self {
        ArrayIndex::from(&subscripts[..])
    }
}

impl From<ObjRef> for ArrayIndex {
    fn from(subscript: ObjRef) -> Self {
        ArrayIndex::Objects(vec![Some(subscript)])
    }
}

fn to_subscript(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// How `to_string` separates item values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinPolicy {
    /// One item per line.
    #[default]
    Line,
    /// Items run together.
    Char,
}

impl JoinPolicy {
    /// Parse an option string; only the first character counts and case is
    /// ignored.
    ///
    /// # Errors
    ///
    /// `InvalidOption` for anything other than `L...` or `C...`.
    pub fn parse(option: &str) -> ArrayResult<Self> {
        match option.chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('L') => Ok(JoinPolicy::Line),
            Some('C') => Ok(JoinPolicy::Char),
            _ => Err(ArrayError::InvalidOption {
                option: option.to_string(),
                expected: "\"C\" or \"L\"",
            }),
        }
    }

    /// Separator used when none is given.
    #[must_use]
    pub const fn default_separator(self) -> &'static str {
        match self {
            JoinPolicy::Line => "\n",
            JoinPolicy::Char => "",
        }
    }
}

impl ObjectSpace {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Allocate a single-dimension array of `size` holes.
    pub fn new_array(&mut self, size: usize) -> ArrayResult<ObjRef> {
        let array = ArrayClass::new(size, &self.array_config())?;
        self.alloc(Object::Array(array))
    }

    /// Allocate an array with the given dimensions.
    pub fn new_array_dims(&mut self, dims: &[usize]) -> ArrayResult<ObjRef> {
        let array = ArrayClass::with_dimensions(dims, &self.array_config())?;
        self.alloc(Object::Array(array))
    }

    /// Allocate an array holding exactly the given slots.
    pub fn array_of(&mut self, slots: &[Slot]) -> ArrayResult<ObjRef> {
        let array = ArrayClass::from_slots(slots.to_vec(), &self.array_config())?;
        self.alloc(Object::Array(array))
    }

    /// Allocate an array of string objects.
    pub fn array_of_strings<I, S>(&mut self, values: I) -> ArrayResult<ObjRef>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let refs = values
            .into_iter()
            .map(|v| self.new_string(v).map(Some))
            .collect::<ArrayResult<Vec<_>>>()?;
        self.array_of(&refs)
    }

    pub(super) fn array_of_refs(&mut self, refs: Vec<ObjRef>) -> ArrayResult<ObjRef> {
        let slots: Vec<Slot> = refs.into_iter().map(Some).collect();
        self.array_of(&slots)
    }

    // ------------------------------------------------------------------
    // Subscripts
    // ------------------------------------------------------------------

    fn resolve_index(&self, index: ArrayIndex) -> ArrayResult<Vec<Subscript>> {
        let objects = match index {
            ArrayIndex::Numbers(numbers) => return Ok(numbers),
            ArrayIndex::Objects(objects) => objects,
        };

        // a lone array argument supplies the subscripts
        if let [Some(only)] = objects[..] {
            if let Object::Array(array) = self.get(only)? {
                return array
                    .slots()
                    .iter()
                    .enumerate()
                    .map(|(i, slot)| self.subscript_value(i + 1, *slot))
                    .collect();
            }
        }

        objects
            .iter()
            .enumerate()
            .map(|(i, arg)| self.subscript_value(i + 1, *arg))
            .collect()
    }

    fn subscript_value(&self, position: usize, arg: Option<ObjRef>) -> ArrayResult<Subscript> {
        let Some(arg) = arg else {
            return Ok(None);
        };
        let text = self.string_value(arg)?;
        parse_whole_number(&text)
            .map(Some)
            .ok_or(ArrayError::InvalidSubscript {
                position,
                value: text,
            })
    }

    /// Index object for a flat position: a string for single-dimension
    /// arrays, an array of subscript strings otherwise.
    fn index_object(&mut self, subscripts: &[usize]) -> ArrayResult<ObjRef> {
        match subscripts {
            [position] => self.new_string(position.to_string()),
            _ => self.array_of_strings(subscripts.iter().map(ToString::to_string)),
        }
    }

    // ------------------------------------------------------------------
    // Element access
    // ------------------------------------------------------------------

    /// The item at an index; holes and positions outside the array give
    /// `None`.
    pub fn array_at(&self, array: ObjRef, index: impl Into<ArrayIndex>) -> ArrayResult<Option<ObjRef>> {
        let subscripts = self.resolve_index(index.into())?;
        let array = self.array(array)?;
        Ok(array
            .position_of(&subscripts, IndexAccess::READ)?
            .and_then(|position| array.get(position)))
    }

    /// Store an item, growing the array when the index lies beyond it.
    pub fn array_put(
        &mut self,
        array: ObjRef,
        value: ObjRef,
        index: impl Into<ArrayIndex>,
    ) -> ArrayResult<()> {
        let subscripts = self.resolve_index(index.into())?;
        let config = self.array_config();
        let target = self.array_mut(array)?;
        let position = target
            .validate_index(&subscripts, IndexAccess::WRITE, &config)?
            .ok_or(ArrayError::TooManySubscripts {
                max: target.dimension_count(),
            })?;
        target.put(position, Some(value));
        self.barrier(array, value);
        Ok(())
    }

    /// Whether an item is stored at an index.
    pub fn array_has_index(&self, array: ObjRef, index: impl Into<ArrayIndex>) -> ArrayResult<bool> {
        let subscripts = self.resolve_index(index.into())?;
        let array = self.array(array)?;
        Ok(array
            .position_of(&subscripts, IndexAccess::LOOKUP)?
            .is_some_and(|position| array.get(position).is_some()))
    }

    /// Clear an index, returning the item it held.
    pub fn array_remove(
        &mut self,
        array: ObjRef,
        index: impl Into<ArrayIndex>,
    ) -> ArrayResult<Option<ObjRef>> {
        let subscripts = self.resolve_index(index.into())?;
        let array = self.array_mut(array)?;
        Ok(array
            .position_of(&subscripts, IndexAccess::READ)?
            .and_then(|position| array.clear(position)))
    }

    /// Store an item after the last item. Returns its position.
    pub fn array_append(&mut self, array: ObjRef, value: ObjRef) -> ArrayResult<usize> {
        let config = self.array_config();
        let position = self.array_mut(array)?.append(value, &config)?;
        self.barrier(array, value);
        Ok(position)
    }

    /// Append every item of `other`, skipping its holes.
    pub fn array_append_all(&mut self, array: ObjRef, other: ObjRef) -> ArrayResult<()> {
        let items = self.array(other)?.all_items();
        let config = self.array_config();
        let target = self.array_mut(array)?;
        let needed = target.last_item_position().saturating_add(items.len());
        target.ensure_space(needed, &config)?;
        for &item in &items {
            target.append(item, &config)?;
        }
        for item in items {
            self.barrier(array, item);
        }
        Ok(())
    }

    /// Insert a slot, shifting later slots up. `after = None` inserts at
    /// the front. Returns the new item's position.
    pub fn array_insert(
        &mut self,
        array: ObjRef,
        value: Option<ObjRef>,
        after: Option<usize>,
    ) -> ArrayResult<usize> {
        let at = after.map_or(InsertAt::First, InsertAt::After);
        self.array_insert_at(array, value, at)
    }

    /// Insert a slot at an explicit place.
    pub fn array_insert_at(
        &mut self,
        array: ObjRef,
        value: Option<ObjRef>,
        at: InsertAt,
    ) -> ArrayResult<usize> {
        let config = self.array_config();
        let position = self.array_mut(array)?.insert(value, at, &config)?;
        if let Some(value) = value {
            self.barrier(array, value);
        }
        Ok(position)
    }

    /// Delete a position, shifting later slots down. Returns what it held.
    pub fn array_delete(&mut self, array: ObjRef, position: usize) -> ArrayResult<Option<ObjRef>> {
        self.array_mut(array)?.delete(position)
    }

    // ------------------------------------------------------------------
    // Searching
    // ------------------------------------------------------------------

    /// Position of the first item equal to `value`.
    pub fn array_index_of(&self, array: ObjRef, value: ObjRef) -> ArrayResult<Option<usize>> {
        let target = self.array(array)?;
        for (position, item) in target.iter_items() {
            if self.equal_value(item, value)? {
                return Ok(Some(position));
            }
        }
        Ok(None)
    }

    /// Whether any item equals `value`.
    pub fn array_has_item(&self, array: ObjRef, value: ObjRef) -> ArrayResult<bool> {
        Ok(self.array_index_of(array, value)?.is_some())
    }

    /// Clear the first item equal to `value`, returning it.
    pub fn array_remove_item(&mut self, array: ObjRef, value: ObjRef) -> ArrayResult<Option<ObjRef>> {
        match self.array_index_of(array, value)? {
            Some(position) => Ok(self.array_mut(array)?.clear(position)),
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Number of items.
    pub fn array_items(&self, array: ObjRef) -> ArrayResult<usize> {
        Ok(self.array(array)?.items())
    }

    /// Logical size.
    pub fn array_size(&self, array: ObjRef) -> ArrayResult<usize> {
        Ok(self.array(array)?.size())
    }

    /// Whether the array holds no items.
    pub fn array_is_empty(&self, array: ObjRef) -> ArrayResult<bool> {
        Ok(self.array(array)?.is_empty())
    }

    /// Size of dimension `n` (1-based).
    ///
    /// # Errors
    ///
    /// `InvalidSubscript` when `n` is 0.
    pub fn array_dimension(&self, array: ObjRef, n: usize) -> ArrayResult<usize> {
        if n == 0 {
            return Err(ArrayError::InvalidSubscript {
                position: 1,
                value: n.to_string(),
            });
        }
        Ok(self.array(array)?.dimension(n))
    }

    /// Number of dimensions.
    pub fn array_dimension_count(&self, array: ObjRef) -> ArrayResult<usize> {
        Ok(self.array(array)?.dimension_count())
    }

    /// All dimension sizes.
    pub fn array_dimensions(&self, array: ObjRef) -> ArrayResult<Vec<usize>> {
        Ok(self.array(array)?.dimension_sizes())
    }

    /// Position of the first item.
    pub fn array_first(&self, array: ObjRef) -> ArrayResult<Option<usize>> {
        Ok(self.array(array)?.first())
    }

    /// Position of the last item.
    pub fn array_last(&self, array: ObjRef) -> ArrayResult<Option<usize>> {
        Ok(self.array(array)?.last())
    }

    /// The first item.
    pub fn array_first_item(&self, array: ObjRef) -> ArrayResult<Option<ObjRef>> {
        let array = self.array(array)?;
        Ok(array.first().and_then(|p| array.get(p)))
    }

    /// The last item.
    pub fn array_last_item(&self, array: ObjRef) -> ArrayResult<Option<ObjRef>> {
        let array = self.array(array)?;
        Ok(array.last().and_then(|p| array.get(p)))
    }

    /// Position of the next item after `position`.
    pub fn array_next(&self, array: ObjRef, position: usize) -> ArrayResult<Option<usize>> {
        Ok(self.array(array)?.next(position))
    }

    /// Position of the previous item before `position`.
    pub fn array_previous(&self, array: ObjRef, position: usize) -> ArrayResult<Option<usize>> {
        Ok(self.array(array)?.previous(position))
    }

    // ------------------------------------------------------------------
    // Bulk operations
    // ------------------------------------------------------------------

    /// A new array of the items, holes removed.
    pub fn array_all_items(&mut self, array: ObjRef) -> ArrayResult<ObjRef> {
        let items = self.array(array)?.all_items();
        self.array_of_refs(items)
    }

    /// A new array of the index objects of every item.
    pub fn array_all_indexes(&mut self, array: ObjRef) -> ArrayResult<ObjRef> {
        let indexes = self.index_objects(array)?;
        self.array_of_refs(indexes)
    }

    fn index_objects(&mut self, array: ObjRef) -> ArrayResult<Vec<ObjRef>> {
        let target = self.array(array)?;
        let subscripts: Vec<Vec<usize>> = target
            .all_indexes()
            .into_iter()
            .map(|p| target.subscripts_of(p))
            .collect();
        subscripts
            .iter()
            .map(|subs| self.index_object(subs))
            .collect()
    }

    /// A supplier over the items and their indexes.
    pub fn array_supplier(&mut self, array: ObjRef) -> ArrayResult<ObjRef> {
        let items = self.array(array)?.all_items();
        let indexes = self.index_objects(array)?;
        self.alloc(Object::Supplier(Supplier::new(items, indexes)))
    }

    /// Store `value` in every slot.
    pub fn array_fill(&mut self, array: ObjRef, value: ObjRef) -> ArrayResult<()> {
        self.array_mut(array)?.fill(value);
        self.barrier(array, value);
        Ok(())
    }

    /// Clear every slot.
    pub fn array_empty(&mut self, array: ObjRef) -> ArrayResult<()> {
        self.array_mut(array)?.empty();
        Ok(())
    }

    /// A shallow copy with the same shape.
    pub fn array_copy(&mut self, array: ObjRef) -> ArrayResult<ObjRef> {
        let copy = self.array(array)?.clone();
        self.alloc(Object::Array(copy))
    }

    /// A new array of `size(a) + size(b)` slots, `a` first.
    pub fn array_join(&mut self, a: ObjRef, b: ObjRef) -> ArrayResult<ObjRef> {
        let config = self.array_config();
        let joined = self.array(a)?.join(self.array(b)?, &config)?;
        self.alloc(Object::Array(joined))
    }

    /// A new array of up to `count` slots starting at `start`.
    pub fn array_section(
        &mut self,
        array: ObjRef,
        start: usize,
        count: Option<usize>,
    ) -> ArrayResult<ObjRef> {
        let config = self.array_config();
        let section = self.array(array)?.section(start, count, &config)?;
        self.alloc(Object::Array(section))
    }

    /// String values of the items joined into one string.
    ///
    /// `policy` is `"L"` (lines, the default) or `"C"` (characters). The
    /// separator defaults to a newline for lines and nothing for characters.
    pub fn array_to_string(
        &self,
        array: ObjRef,
        policy: Option<&str>,
        separator: Option<&str>,
    ) -> ArrayResult<String> {
        let policy = policy.map_or(Ok(JoinPolicy::default()), JoinPolicy::parse)?;
        let separator = separator.unwrap_or(policy.default_separator());
        let values = self
            .array(array)?
            .iter_items()
            .map(|(_, item)| self.string_value(item))
            .collect::<ArrayResult<Vec<_>>>()?;
        Ok(values.join(separator))
    }

    // ------------------------------------------------------------------
    // Sorting
    // ------------------------------------------------------------------

    /// Sort the items by their natural order (unstable).
    pub fn array_sort(&mut self, array: ObjRef) -> ArrayResult<()> {
        self.sort_array(array, false, |space, a, b| space.compare_natural(a, b))
    }

    /// Sort the items with a comparator (unstable).
    pub fn array_sort_with(&mut self, array: ObjRef, comparator: &mut dyn Comparator) -> ArrayResult<()> {
        self.sort_array(array, false, |space, a, b| {
            comparator_ordering(comparator.compare(space, a, b))
        })
    }

    /// Sort the items by their natural order, keeping equal items in order.
    pub fn array_stable_sort(&mut self, array: ObjRef) -> ArrayResult<()> {
        self.sort_array(array, true, |space, a, b| space.compare_natural(a, b))
    }

    /// Sort the items with a comparator, keeping equal items in order.
    pub fn array_stable_sort_with(
        &mut self,
        array: ObjRef,
        comparator: &mut dyn Comparator,
    ) -> ArrayResult<()> {
        self.sort_array(array, true, |space, a, b| {
            comparator_ordering(comparator.compare(space, a, b))
        })
    }

    fn sort_array<F>(&mut self, array: ObjRef, stable: bool, mut cmp: F) -> ArrayResult<()>
    where
        F: FnMut(&ObjectSpace, ObjRef, ObjRef) -> ArrayResult<Ordering>,
    {
        let mut detached = self.array_mut(array)?.detach_for_sort()?;
        let space: &ObjectSpace = self;
        let result = detached.sort(stable, |a, b| cmp(space, a, b));
        self.array_mut(array)?.attach_storage(detached);
        // a sort only permutes the slots, no new references are stored
        result
    }
}
