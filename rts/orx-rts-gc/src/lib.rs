//! Generational managed heap for the ORX runtime.
//!
//! Every object the interpreter hands to a Rexx program lives in a [`Heap`]
//! and is addressed through an [`ObjRef`]. The heap is a tracing collector
//! with three generations:
//!
//! - **Generational collection** - Young objects are swept by cheap minor
//!   collections, old objects only by major collections
//! - **Write barriers** - Stores of a young reference into an old object are
//!   recorded so a minor collection does not free the young object
//! - **Explicit tracing** - Containers report their children through
//!   [`Trace`], there is no conservative scanning
//!
//! # Architecture
//!
//! ```text
//! +------------------+------------------+------------------+
//! |   Nursery (G0)   |   Survivor (G1)  |   Old Gen (G2)   |
//! +------------------+------------------+------------------+
//! |                  |                  |                  |
//! |  New objects     |  Survived one    |  Long-lived      |
//! |  Swept by every  |  minor           |  objects, never  |
//! |  minor GC        |  collection      |  traversed by    |
//! |                  |                  |  minor GC        |
//! +------------------+------------------+------------------+
//!                                                ^
//!               remembered set  -----------------+
//!               (old objects holding young refs)
//! ```
//!
//! The heap itself is not synchronised. The runtime serialises all access
//! through its global execution lock, so mutation only ever happens from the
//! thread holding that lock.

#![warn(missing_docs)]

mod heap;

pub use heap::{CollectionReport, Heap, Tracer};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use thiserror::Error;

/// Result type for heap operations.
pub type GcResult<T> = Result<T, GcError>;

/// Errors reported by the managed heap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GcError {
    /// The configured live-object limit was reached.
    #[error("heap exhausted: limit of {limit} live objects reached")]
    HeapExhausted {
        /// Maximum number of live objects.
        limit: usize,
    },

    /// The reference names a slot that was freed (and possibly reused).
    #[error("stale object reference {0}")]
    StaleReference(ObjRef),
}

/// Handle to a heap-managed object.
///
/// A handle is a slot index plus the serial the slot had when the object was
/// allocated. Once the object is collected the slot serial moves on and the
/// handle no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef {
    index: u32,
    serial: u32,
}

impl ObjRef {
    pub(crate) const fn new(index: u32, serial: u32) -> Self {
        Self { index, serial }
    }

    /// Slot index inside the heap.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Allocation serial of the slot.
    #[inline]
    #[must_use]
    pub const fn serial(self) -> u32 {
        self.serial
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.serial)
    }
}

/// Generation identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Generation {
    /// Nursery - newly allocated objects.
    Nursery = 0,
    /// Survivor - survived at least one minor collection.
    Survivor = 1,
    /// Old - long-lived objects.
    Old = 2,
}

impl Generation {
    /// Get the next older generation.
    #[must_use]
    pub const fn promote(self) -> Option<Self> {
        match self {
            Self::Nursery => Some(Self::Survivor),
            Self::Survivor => Some(Self::Old),
            Self::Old => None,
        }
    }

    /// Whether objects of this generation are swept by minor collections.
    #[must_use]
    pub const fn is_young(self) -> bool {
        !matches!(self, Self::Old)
    }
}

/// Flags stored in the object header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderFlags(u64);

impl HeaderFlags {
    /// Object is marked (reachable) during the current collection.
    pub const MARKED: u64 = 1 << 0;
    /// Object is in the remembered set.
    pub const REMEMBERED: u64 = 1 << 1;

    /// Generation bits (2 bits, positions 4-5).
    const GENERATION_SHIFT: u64 = 4;
    const GENERATION_MASK: u64 = 0b11 << Self::GENERATION_SHIFT;

    /// Create new flags with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Check if the object is marked.
    #[must_use]
    pub const fn is_marked(self) -> bool {
        self.0 & Self::MARKED != 0
    }

    /// Check if the object is in the remembered set.
    #[must_use]
    pub const fn is_remembered(self) -> bool {
        self.0 & Self::REMEMBERED != 0
    }

    /// Get the generation of this object.
    #[must_use]
    pub const fn generation(self) -> Generation {
        let gen = (self.0 & Self::GENERATION_MASK) >> Self::GENERATION_SHIFT;
        match gen {
            0 => Generation::Nursery,
            1 => Generation::Survivor,
            _ => Generation::Old,
        }
    }

    /// Set the generation.
    #[must_use]
    pub const fn with_generation(self, gen: Generation) -> Self {
        let cleared = self.0 & !Self::GENERATION_MASK;
        Self(cleared | ((gen as u64) << Self::GENERATION_SHIFT))
    }
}

impl Default for HeaderFlags {
    fn default() -> Self {
        Self::new()
    }
}

/// Object header kept next to every heap value.
///
/// Flags are atomic so marking and barrier bookkeeping work through a shared
/// borrow of the heap while a container is being traced.
#[derive(Debug)]
pub struct ObjectHeader {
    /// Mark bits, remembered bit and generation.
    flags: AtomicU64,
    /// Number of minor collections survived in the current generation.
    age: u32,
}

impl ObjectHeader {
    /// Create a new object header.
    #[must_use]
    pub const fn new(flags: HeaderFlags) -> Self {
        Self {
            flags: AtomicU64::new(flags.0),
            age: 0,
        }
    }

    /// Get the current flags.
    #[must_use]
    pub fn flags(&self) -> HeaderFlags {
        HeaderFlags(self.flags.load(Ordering::Acquire))
    }

    /// Generation the object currently lives in.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.flags().generation()
    }

    /// Move the object to another generation and reset its age.
    pub fn set_generation(&mut self, gen: Generation) {
        let flags = self.flags().with_generation(gen);
        self.flags.store(flags.0, Ordering::Release);
        self.age = 0;
    }

    /// Minor collections survived in the current generation.
    #[must_use]
    pub const fn age(&self) -> u32 {
        self.age
    }

    pub(crate) fn bump_age(&mut self) -> u32 {
        self.age += 1;
        self.age
    }

    /// Set the mark bit, returning whether it was already set.
    pub fn mark(&self) -> bool {
        self.flags.fetch_or(HeaderFlags::MARKED, Ordering::AcqRel) & HeaderFlags::MARKED != 0
    }

    /// Clear the mark bit.
    pub fn unmark(&self) {
        self.flags.fetch_and(!HeaderFlags::MARKED, Ordering::Release);
    }

    /// Check if marked.
    #[must_use]
    pub fn is_marked(&self) -> bool {
        self.flags().is_marked()
    }

    /// Set the remembered bit, returning whether it was already set.
    pub fn remember(&self) -> bool {
        self.flags.fetch_or(HeaderFlags::REMEMBERED, Ordering::AcqRel) & HeaderFlags::REMEMBERED
            != 0
    }

    /// Clear the remembered bit.
    pub fn forget(&self) {
        self.flags
            .fetch_and(!HeaderFlags::REMEMBERED, Ordering::Release);
    }
}

/// Configuration for the managed heap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcConfig {
    /// Number of minor collections an object survives before promotion to
    /// the next generation.
    pub nursery_threshold: u32,
    /// Maximum number of live objects.
    pub max_objects: usize,
    /// Allocations after which [`Heap::should_collect`] reports true.
    pub nursery_budget: usize,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            nursery_threshold: 2,
            max_objects: 16 * 1024 * 1024,
            nursery_budget: 64 * 1024,
        }
    }
}

/// Statistics from garbage collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Number of minor (young generation) collections.
    pub minor_collections: u64,
    /// Number of major (full) collections.
    pub major_collections: u64,
    /// Total objects freed.
    pub objects_freed: u64,
    /// Total objects promoted to the old generation.
    pub objects_promoted: u64,
    /// Total time spent in GC (microseconds).
    pub total_gc_time_us: u64,
    /// Maximum pause time (microseconds).
    pub max_pause_us: u64,
}

/// Kind of collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    /// Minor (young generation) collection.
    Minor,
    /// Major (full) collection.
    Major,
}

/// Root set for garbage collection.
///
/// The root set contains all objects that are directly reachable
/// and should not be collected.
#[derive(Debug, Default, Clone)]
pub struct RootSet {
    /// Stack roots (activation locals, arguments).
    stack_roots: Vec<ObjRef>,
    /// Global roots (environment objects, pinned runtime objects).
    global_roots: Vec<ObjRef>,
}

impl RootSet {
    /// Create a new empty root set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stack root.
    pub fn add_stack_root(&mut self, r: ObjRef) {
        self.stack_roots.push(r);
    }

    /// Add a global root.
    pub fn add_global_root(&mut self, r: ObjRef) {
        self.global_roots.push(r);
    }

    /// Remove one occurrence of a global root, returning whether it was present.
    pub fn remove_global_root(&mut self, r: ObjRef) -> bool {
        match self.global_roots.iter().position(|&g| g == r) {
            Some(pos) => {
                self.global_roots.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    /// Clear stack roots (between activations).
    pub fn clear_stack_roots(&mut self) {
        self.stack_roots.clear();
    }

    /// Iterate over all roots.
    pub fn iter(&self) -> impl Iterator<Item = ObjRef> + '_ {
        self.stack_roots
            .iter()
            .chain(self.global_roots.iter())
            .copied()
    }
}

/// Write barrier for tracking old-to-young references.
///
/// When an old object is mutated to point to a young object,
/// the write barrier records this so the young object is not
/// incorrectly collected by a minor collection.
#[derive(Debug)]
pub struct WriteBarrier {
    /// Remembered set of old objects holding young references.
    remembered_set: Mutex<Vec<ObjRef>>,
    /// Number of barrier records.
    invocations: AtomicUsize,
}

impl WriteBarrier {
    /// Create a new write barrier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            remembered_set: Mutex::new(Vec::new()),
            invocations: AtomicUsize::new(0),
        }
    }

    /// Record an old object that now holds a young reference.
    pub fn record(&self, old_object: ObjRef) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        self.remembered_set.lock().push(old_object);
    }

    /// Get and clear the remembered set.
    #[must_use]
    pub fn take_remembered_set(&self) -> Vec<ObjRef> {
        std::mem::take(&mut *self.remembered_set.lock())
    }

    /// Number of objects currently remembered.
    #[must_use]
    pub fn remembered_len(&self) -> usize {
        self.remembered_set.lock().len()
    }

    /// Get the number of barrier records.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::Relaxed)
    }
}

impl Default for WriteBarrier {
    fn default() -> Self {
        Self::new()
    }
}

/// A value that can live in the managed heap.
///
/// Implementations report every object reference they hold. A reference
/// that is not reported is invisible to the collector and its target may be
/// freed while still in use.
pub trait Trace {
    /// Report held references to the tracer.
    fn trace(&self, tracer: &mut Tracer);
}

impl Trace for ObjRef {
    fn trace(&self, tracer: &mut Tracer) {
        tracer.mark(*self);
    }
}

impl<T: Trace> Trace for Option<T> {
    fn trace(&self, tracer: &mut Tracer) {
        if let Some(value) = self {
            value.trace(tracer);
        }
    }
}

impl<T: Trace> Trace for Vec<T> {
    fn trace(&self, tracer: &mut Tracer) {
        for value in self {
            value.trace(tracer);
        }
    }
}

impl<T: Trace> Trace for Box<[T]> {
    fn trace(&self, tracer: &mut Tracer) {
        for value in self.iter() {
            value.trace(tracer);
        }
    }
}
