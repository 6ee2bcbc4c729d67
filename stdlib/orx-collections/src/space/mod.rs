//! The object space: the managed heap plus the operations programs use.
//!
//! Collections hold [`ObjRef`]s, so anything that needs to look at an
//! element's value (equality, ordering, string conversion) goes through the
//! space. Every store of a reference into a heap object is followed by a
//! write-barrier call on the heap.

mod arrays;
mod relations;

pub use arrays::{ArrayIndex, JoinPolicy};

use crate::array::ArrayClass;
use crate::config::{ArrayConfig, SpaceConfig};
use crate::error::{ArrayError, ArrayResult};
use crate::object::{parse_whole_number, Object};
use crate::relation::{Relation, RelationKey};
use crate::supplier::Supplier;
use orx_rts_gc::{CollectionReport, GcStats, Generation, Heap, ObjRef, RootSet};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// A user-supplied three-way comparison for sorting.
///
/// The result follows the Rexx convention: a whole number that is negative,
/// zero or positive. `None` means the comparator returned nothing.
pub trait Comparator {
    /// Compare two items.
    fn compare(&mut self, space: &ObjectSpace, a: ObjRef, b: ObjRef) -> Option<Object>;
}

impl<F> Comparator for F
where
    F: FnMut(&ObjectSpace, ObjRef, ObjRef) -> Option<Object>,
{
    fn compare(&mut self, space: &ObjectSpace, a: ObjRef, b: ObjRef) -> Option<Object> {
        self(space, a, b)
    }
}

/// Interpret a comparator result as an ordering.
pub(crate) fn comparator_ordering(result: Option<Object>) -> ArrayResult<Ordering> {
    let Some(result) = result else {
        warn!("sort comparator returned no result");
        return Err(ArrayError::ComparatorNoResult);
    };
    let text = result.string_value();
    match parse_whole_number(&text) {
        Some(n) => Ok(n.cmp(&0)),
        None => {
            warn!(result = %text, "sort comparator returned a non-numeric result");
            Err(ArrayError::ComparatorNotNumeric { result: text })
        }
    }
}

/// Heap, roots and limits of one interpreter instance.
#[derive(Debug)]
pub struct ObjectSpace {
    heap: Heap<Object>,
    roots: RootSet,
    config: SpaceConfig,
}

impl Default for ObjectSpace {
    fn default() -> Self {
        Self::new(SpaceConfig::default())
    }
}

impl ObjectSpace {
    /// Create an empty space.
    pub fn new(config: SpaceConfig) -> Self {
        ObjectSpace {
            heap: Heap::new(config.gc.clone()),
            roots: RootSet::new(),
            config,
        }
    }

    /// The space configuration.
    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    pub(crate) fn array_config(&self) -> ArrayConfig {
        self.config.arrays
    }

    /// The underlying heap.
    pub fn heap(&self) -> &Heap<Object> {
        &self.heap
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the space holds no objects.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Allocate an object.
    ///
    /// # Errors
    ///
    /// `Heap` when the heap is full.
    pub fn alloc(&mut self, object: Object) -> ArrayResult<ObjRef> {
        let r = self.heap.alloc(object)?;
        // a container may arrive already holding references
        self.barrier_children(r);
        Ok(r)
    }

    /// Allocate a string object.
    pub fn new_string(&mut self, text: impl Into<String>) -> ArrayResult<ObjRef> {
        self.alloc(Object::String(text.into()))
    }

    /// Resolve a reference.
    pub fn get(&self, r: ObjRef) -> ArrayResult<&Object> {
        Ok(self.heap.get(r)?)
    }

    /// Resolve a reference for mutation.
    ///
    /// Stores made through the returned object bypass the write barrier;
    /// use the typed operations for anything that stores references.
    pub fn get_mut(&mut self, r: ObjRef) -> ArrayResult<&mut Object> {
        Ok(self.heap.get_mut(r)?)
    }

    /// Whether a reference still resolves.
    pub fn contains(&self, r: ObjRef) -> bool {
        self.heap.contains(r)
    }

    /// Class name of a referenced object.
    pub fn class_name(&self, r: ObjRef) -> ArrayResult<&'static str> {
        Ok(self.get(r)?.class_name())
    }

    /// String value of a referenced object.
    pub fn string_value(&self, r: ObjRef) -> ArrayResult<String> {
        Ok(self.get(r)?.string_value())
    }

    /// Resolve an array reference.
    ///
    /// # Errors
    ///
    /// `WrongClass` if the object is not an array.
    pub fn array(&self, r: ObjRef) -> ArrayResult<&ArrayClass> {
        match self.get(r)? {
            Object::Array(array) => Ok(array),
            other => Err(wrong_class("Array", other)),
        }
    }

    pub(crate) fn array_mut(&mut self, r: ObjRef) -> ArrayResult<&mut ArrayClass> {
        match self.get_mut(r)? {
            Object::Array(array) => Ok(array),
            other => Err(wrong_class("Array", other)),
        }
    }

    /// Resolve a relation reference.
    ///
    /// # Errors
    ///
    /// `WrongClass` if the object is not a relation.
    pub fn relation(&self, r: ObjRef) -> ArrayResult<&Relation> {
        match self.get(r)? {
            Object::Relation(relation) => Ok(relation),
            other => Err(wrong_class("Relation", other)),
        }
    }

    pub(crate) fn relation_mut(&mut self, r: ObjRef) -> ArrayResult<&mut Relation> {
        match self.get_mut(r)? {
            Object::Relation(relation) => Ok(relation),
            other => Err(wrong_class("Relation", other)),
        }
    }

    /// Resolve a supplier reference.
    ///
    /// # Errors
    ///
    /// `WrongClass` if the object is not a supplier.
    pub fn supplier(&self, r: ObjRef) -> ArrayResult<&Supplier> {
        match self.get(r)? {
            Object::Supplier(supplier) => Ok(supplier),
            other => Err(wrong_class("Supplier", other)),
        }
    }

    pub(crate) fn supplier_mut(&mut self, r: ObjRef) -> ArrayResult<&mut Supplier> {
        match self.get_mut(r)? {
            Object::Supplier(supplier) => Ok(supplier),
            other => Err(wrong_class("Supplier", other)),
        }
    }

    /// Value equality: strings compare by text, everything else by identity.
    pub fn equal_value(&self, a: ObjRef, b: ObjRef) -> ArrayResult<bool> {
        if a == b {
            return Ok(true);
        }
        match (self.get(a)?, self.get(b)?) {
            (Object::String(x), Object::String(y)) => Ok(x == y),
            _ => Ok(false),
        }
    }

    /// Natural ordering used by `sort` and `stable_sort`.
    ///
    /// Strings compare by their characters; other objects have no natural
    /// order.
    pub fn compare_natural(&self, a: ObjRef, b: ObjRef) -> ArrayResult<Ordering> {
        match (self.get(a)?, self.get(b)?) {
            (Object::String(x), Object::String(y)) => Ok(x.as_bytes().cmp(y.as_bytes())),
            (Object::String(_), other) | (other, _) => Err(ArrayError::NotComparable {
                class: other.class_name(),
            }),
        }
    }

    /// Key under which a value is stored in a relation.
    pub fn value_key(&self, r: ObjRef) -> ArrayResult<RelationKey> {
        Ok(match self.get(r)? {
            Object::String(text) => RelationKey::Text(text.clone()),
            _ => RelationKey::Identity(r),
        })
    }

    // ------------------------------------------------------------------
    // Roots and collection
    // ------------------------------------------------------------------

    /// Keep an object (and everything it references) alive.
    pub fn root(&mut self, r: ObjRef) {
        self.roots.add_global_root(r);
    }

    /// Drop a root added with [`ObjectSpace::root`].
    pub fn unroot(&mut self, r: ObjRef) -> bool {
        self.roots.remove_global_root(r)
    }

    /// Run a minor collection.
    pub fn collect_minor(&mut self) -> CollectionReport {
        let report = self.heap.minor_collect(&self.roots);
        debug!(freed = report.freed, promoted = report.promoted, "minor collection");
        report
    }

    /// Run a major collection.
    pub fn collect_major(&mut self) -> CollectionReport {
        let report = self.heap.major_collect(&self.roots);
        debug!(freed = report.freed, promoted = report.promoted, "major collection");
        report
    }

    /// Whether enough was allocated to warrant a minor collection.
    pub fn should_collect(&self) -> bool {
        self.heap.should_collect()
    }

    /// Move an object straight to the old generation.
    pub fn tenure(&mut self, r: ObjRef) -> ArrayResult<()> {
        Ok(self.heap.tenure(r)?)
    }

    /// Generation of an object.
    pub fn generation(&self, r: ObjRef) -> ArrayResult<Generation> {
        Ok(self.heap.generation(r)?)
    }

    /// Collection statistics.
    pub fn stats(&self) -> GcStats {
        self.heap.stats()
    }

    // ------------------------------------------------------------------
    // Write barrier
    // ------------------------------------------------------------------

    /// Record that `owner` now references `value`.
    pub(crate) fn barrier(&self, owner: ObjRef, value: ObjRef) {
        self.heap.write_barrier(owner, value);
    }

    /// Barrier for a bulk store of slots.
    pub(crate) fn barrier_slots(&self, owner: ObjRef, slots: &[Option<ObjRef>]) {
        if !self.heap.store_needs_barrier(owner) {
            return;
        }
        for value in slots.iter().flatten() {
            self.heap.write_barrier(owner, *value);
        }
    }

    fn barrier_children(&self, owner: ObjRef) {
        let Ok(object) = self.get(owner) else {
            return;
        };
        match object {
            Object::Array(array) => self.barrier_slots(owner, array.slots()),
            Object::Relation(relation) => {
                for (index, item) in relation.pairs() {
                    self.barrier(owner, index);
                    self.barrier(owner, item);
                }
            }
            Object::Supplier(supplier) => {
                for &r in supplier.all_items().iter().chain(supplier.all_indexes()) {
                    self.barrier(owner, r);
                }
            }
            Object::String(_) => {}
        }
    }
}

fn wrong_class(expected: &'static str, found: &Object) -> ArrayError {
    ArrayError::WrongClass {
        expected,
        found: found.class_name(),
    }
}
