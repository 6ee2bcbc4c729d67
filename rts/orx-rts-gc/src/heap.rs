//! Object storage and the minor/major collection cycles.
//!
//! Objects live in a slot table. Freed slots go on a free list and are
//! reused; each slot carries a serial so handles to a freed object stop
//! resolving instead of silently aliasing the new occupant.

use crate::{
    CollectionKind, GcConfig, GcError, GcResult, GcStats, Generation, HeaderFlags, ObjRef,
    ObjectHeader, RootSet, Trace, WriteBarrier,
};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Collects the references reported by [`Trace::trace`].
#[derive(Debug, Default)]
pub struct Tracer {
    children: Vec<ObjRef>,
}

impl Tracer {
    fn new() -> Self {
        Self::default()
    }

    /// Report a held reference.
    #[inline]
    pub fn mark(&mut self, r: ObjRef) {
        self.children.push(r);
    }

    /// Report a slot that may be empty.
    #[inline]
    pub fn mark_slot(&mut self, slot: Option<ObjRef>) {
        if let Some(r) = slot {
            self.children.push(r);
        }
    }

    fn take(&mut self) -> Vec<ObjRef> {
        std::mem::take(&mut self.children)
    }
}

/// Outcome of a single collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionReport {
    /// Kind of collection.
    pub kind: CollectionKind,
    /// Objects found reachable.
    pub marked: usize,
    /// Objects freed.
    pub freed: usize,
    /// Objects promoted to the old generation.
    pub promoted: usize,
    /// Pause duration.
    pub duration: Duration,
}

#[derive(Debug)]
struct Entry<T> {
    header: ObjectHeader,
    serial: u32,
    value: T,
}

/// The managed heap.
#[derive(Debug)]
pub struct Heap<T> {
    slots: Vec<Option<Entry<T>>>,
    /// Next serial for each slot; bumped when the slot is freed.
    serials: Vec<u32>,
    free: Vec<u32>,
    live: usize,
    allocated_since_gc: usize,
    config: GcConfig,
    stats: GcStats,
    write_barrier: WriteBarrier,
}

impl<T: Trace> Heap<T> {
    /// Create a new heap with the given configuration.
    #[must_use]
    pub fn new(config: GcConfig) -> Self {
        Self {
            slots: Vec::new(),
            serials: Vec::new(),
            free: Vec::new(),
            live: 0,
            allocated_since_gc: 0,
            config,
            stats: GcStats::default(),
            write_barrier: WriteBarrier::new(),
        }
    }

    /// Create a new heap with default configuration.
    #[must_use]
    pub fn with_default_config() -> Self {
        Self::new(GcConfig::default())
    }

    /// Allocate a new object in the nursery.
    pub fn alloc(&mut self, value: T) -> GcResult<ObjRef> {
        if self.live >= self.config.max_objects {
            return Err(GcError::HeapExhausted {
                limit: self.config.max_objects,
            });
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| GcError::HeapExhausted {
                    limit: self.config.max_objects,
                })?;
                self.slots.push(None);
                self.serials.push(0);
                index
            }
        };

        let serial = self.serials[index as usize];
        let header = ObjectHeader::new(HeaderFlags::new().with_generation(Generation::Nursery));
        self.slots[index as usize] = Some(Entry {
            header,
            serial,
            value,
        });
        self.live += 1;
        self.allocated_since_gc += 1;
        Ok(ObjRef::new(index, serial))
    }

    fn entry(&self, r: ObjRef) -> Option<&Entry<T>> {
        match self.slots.get(r.index()) {
            Some(Some(entry)) if entry.serial == r.serial() => Some(entry),
            _ => None,
        }
    }

    fn entry_mut(&mut self, r: ObjRef) -> Option<&mut Entry<T>> {
        match self.slots.get_mut(r.index()) {
            Some(Some(entry)) if entry.serial == r.serial() => Some(entry),
            _ => None,
        }
    }

    /// Resolve a reference.
    pub fn get(&self, r: ObjRef) -> GcResult<&T> {
        self.entry(r)
            .map(|e| &e.value)
            .ok_or(GcError::StaleReference(r))
    }

    /// Resolve a reference for mutation.
    ///
    /// Storing a reference into the returned value must be followed by
    /// [`Heap::write_barrier`].
    pub fn get_mut(&mut self, r: ObjRef) -> GcResult<&mut T> {
        self.entry_mut(r)
            .map(|e| &mut e.value)
            .ok_or(GcError::StaleReference(r))
    }

    /// Whether the reference still names a live object.
    #[must_use]
    pub fn contains(&self, r: ObjRef) -> bool {
        self.entry(r).is_some()
    }

    /// Generation of a live object.
    pub fn generation(&self, r: ObjRef) -> GcResult<Generation> {
        self.entry(r)
            .map(|e| e.header.generation())
            .ok_or(GcError::StaleReference(r))
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether the heap holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Whether stores into `owner` must go through the write barrier.
    ///
    /// A plain copy of references into an object is only safe while the
    /// object is young.
    #[must_use]
    pub fn store_needs_barrier(&self, owner: ObjRef) -> bool {
        self.entry(owner)
            .map_or(false, |e| e.header.generation() == Generation::Old)
    }

    /// Record that `owner` now holds a reference to `value`.
    ///
    /// Called after every store of a reference into a heap object. Only an
    /// old owner gaining a young reference is remembered, and each owner is
    /// remembered at most once per collection cycle.
    pub fn write_barrier(&self, owner: ObjRef, value: ObjRef) {
        let Some(owner_entry) = self.entry(owner) else {
            return;
        };
        if owner_entry.header.generation() != Generation::Old {
            return;
        }
        let value_is_young = self
            .entry(value)
            .map_or(false, |e| e.header.generation().is_young());
        if value_is_young && !owner_entry.header.remember() {
            trace!(%owner, %value, "remembered old-to-young store");
            self.write_barrier.record(owner);
        }
    }

    /// Promote an object straight to the old generation.
    ///
    /// Long-lived runtime objects are tenured on creation. If the object
    /// already holds young references it enters the remembered set.
    pub fn tenure(&mut self, r: ObjRef) -> GcResult<()> {
        let entry = self.entry_mut(r).ok_or(GcError::StaleReference(r))?;
        if entry.header.generation() == Generation::Old {
            return Ok(());
        }
        entry.header.set_generation(Generation::Old);
        self.stats.objects_promoted += 1;
        self.remember_if_young_children(r);
        Ok(())
    }

    /// Whether enough allocation happened since the last collection to
    /// warrant a minor collection.
    #[must_use]
    pub fn should_collect(&self) -> bool {
        self.allocated_since_gc >= self.config.nursery_budget
    }

    /// Collect the young generations.
    ///
    /// Marking starts from the roots and from the children of remembered old
    /// objects and never traverses into other old objects.
    pub fn minor_collect(&mut self, roots: &RootSet) -> CollectionReport {
        let start = Instant::now();
        let remembered = self.write_barrier.take_remembered_set();

        let mut worklist: Vec<ObjRef> = Vec::new();
        let mut marked = 0;
        for root in roots.iter() {
            marked += self.mark_into(root, false, &mut worklist);
        }
        for &owner in &remembered {
            if let Some(entry) = self.entry(owner) {
                entry.header.forget();
                for child in self.children_of(entry) {
                    marked += self.mark_into(child, false, &mut worklist);
                }
            }
        }
        marked += self.drain(&mut worklist, false);

        let (freed, promoted) = self.sweep(false);

        // Owners stay remembered while they still hold young references;
        // objects that just reached the old generation may need to join them.
        for owner in remembered.into_iter().chain(promoted.iter().copied()) {
            self.remember_if_young_children(owner);
        }

        self.finish(CollectionKind::Minor, start, marked, freed, promoted.len())
    }

    /// Collect every generation.
    pub fn major_collect(&mut self, roots: &RootSet) -> CollectionReport {
        let start = Instant::now();
        for owner in self.write_barrier.take_remembered_set() {
            if let Some(entry) = self.entry(owner) {
                entry.header.forget();
            }
        }

        let mut worklist: Vec<ObjRef> = Vec::new();
        let mut marked = 0;
        for root in roots.iter() {
            marked += self.mark_into(root, true, &mut worklist);
        }
        marked += self.drain(&mut worklist, true);

        let (freed, promoted) = self.sweep(true);

        let old_objects: Vec<ObjRef> = self
            .live_refs()
            .filter(|&r| self.generation(r) == Ok(Generation::Old))
            .collect();
        for owner in old_objects {
            self.remember_if_young_children(owner);
        }

        self.finish(CollectionKind::Major, start, marked, freed, promoted.len())
    }

    /// Get heap statistics.
    #[must_use]
    pub fn stats(&self) -> GcStats {
        self.stats.clone()
    }

    /// Get the write barrier.
    #[must_use]
    pub fn write_barrier_state(&self) -> &WriteBarrier {
        &self.write_barrier
    }

    /// Get the current configuration.
    #[must_use]
    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    fn live_refs(&self) -> impl Iterator<Item = ObjRef> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|entry| ObjRef::new(index as u32, entry.serial))
        })
    }

    fn children_of(&self, entry: &Entry<T>) -> Vec<ObjRef> {
        let mut tracer = Tracer::new();
        entry.value.trace(&mut tracer);
        tracer.take()
    }

    /// Mark `r` and queue it for traversal. Returns 1 when newly marked.
    fn mark_into(&self, r: ObjRef, full: bool, worklist: &mut Vec<ObjRef>) -> usize {
        let Some(entry) = self.entry(r) else {
            return 0;
        };
        if !full && !entry.header.generation().is_young() {
            return 0;
        }
        if entry.header.mark() {
            return 0;
        }
        worklist.push(r);
        1
    }

    fn drain(&self, worklist: &mut Vec<ObjRef>, full: bool) -> usize {
        let mut marked = 0;
        while let Some(r) = worklist.pop() {
            let Some(entry) = self.entry(r) else {
                continue;
            };
            for child in self.children_of(entry) {
                marked += self.mark_into(child, full, worklist);
            }
        }
        marked
    }

    /// Free unmarked objects in the collected generations, age survivors.
    /// Returns the freed count and the objects promoted to old.
    fn sweep(&mut self, full: bool) -> (usize, Vec<ObjRef>) {
        let threshold = self.config.nursery_threshold;
        let mut freed = 0;
        let mut promoted = Vec::new();

        for index in 0..self.slots.len() {
            let Some(entry) = self.slots[index].as_mut() else {
                continue;
            };
            let generation = entry.header.generation();
            let collected = full || generation.is_young();
            if !collected {
                continue;
            }
            if entry.header.is_marked() {
                entry.header.unmark();
                if generation.is_young() && entry.header.bump_age() >= threshold {
                    if let Some(next) = generation.promote() {
                        entry.header.set_generation(next);
                        if next == Generation::Old {
                            promoted.push(ObjRef::new(index as u32, entry.serial));
                        }
                    }
                }
            } else {
                self.slots[index] = None;
                self.serials[index] = self.serials[index].wrapping_add(1);
                self.free.push(index as u32);
                self.live -= 1;
                freed += 1;
            }
        }
        (freed, promoted)
    }

    fn remember_if_young_children(&self, owner: ObjRef) {
        let Some(entry) = self.entry(owner) else {
            return;
        };
        if entry.header.generation() != Generation::Old {
            return;
        }
        let holds_young = self.children_of(entry).into_iter().any(|child| {
            self.entry(child)
                .map_or(false, |c| c.header.generation().is_young())
        });
        if holds_young && !entry.header.remember() {
            self.write_barrier.record(owner);
        }
    }

    fn finish(
        &mut self,
        kind: CollectionKind,
        start: Instant,
        marked: usize,
        freed: usize,
        promoted: usize,
    ) -> CollectionReport {
        let duration = start.elapsed();
        let duration_us = duration.as_micros() as u64;

        match kind {
            CollectionKind::Minor => self.stats.minor_collections += 1,
            CollectionKind::Major => self.stats.major_collections += 1,
        }
        self.stats.objects_freed += freed as u64;
        self.stats.objects_promoted += promoted as u64;
        self.stats.total_gc_time_us += duration_us;
        if duration_us > self.stats.max_pause_us {
            self.stats.max_pause_us = duration_us;
        }
        self.allocated_since_gc = 0;

        debug!(
            ?kind,
            marked,
            freed,
            promoted,
            live = self.live,
            "collection finished"
        );

        CollectionReport {
            kind,
            marked,
            freed,
            promoted,
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A test object holding a list of references.
    #[derive(Debug, Default)]
    struct Node(Vec<ObjRef>);

    impl Trace for Node {
        fn trace(&self, tracer: &mut Tracer) {
            self.0.trace(tracer);
        }
    }

    fn heap() -> Heap<Node> {
        Heap::new(GcConfig {
            nursery_threshold: 1,
            ..GcConfig::default()
        })
    }

    #[test]
    fn test_alloc_and_get() {
        let mut heap = heap();
        let a = heap.alloc(Node::default()).unwrap();
        assert!(heap.contains(a));
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.generation(a), Ok(Generation::Nursery));
        assert!(heap.get(a).unwrap().0.is_empty());
    }

    #[test]
    fn test_unreachable_young_object_is_freed() {
        let mut heap = heap();
        let kept = heap.alloc(Node::default()).unwrap();
        let dropped = heap.alloc(Node::default()).unwrap();

        let mut roots = RootSet::new();
        roots.add_stack_root(kept);
        let report = heap.minor_collect(&roots);

        assert_eq!(report.freed, 1);
        assert!(heap.contains(kept));
        assert!(!heap.contains(dropped));
        assert_eq!(heap.get(dropped).unwrap_err(), GcError::StaleReference(dropped));
    }

    #[test]
    fn test_freed_slot_reuse_does_not_alias() {
        let mut heap = heap();
        let dropped = heap.alloc(Node::default()).unwrap();
        heap.minor_collect(&RootSet::new());

        let fresh = heap.alloc(Node::default()).unwrap();
        assert_eq!(fresh.index(), dropped.index());
        assert_ne!(fresh, dropped);
        assert!(!heap.contains(dropped));
    }

    #[test]
    fn test_children_are_traced() {
        let mut heap = heap();
        let leaf = heap.alloc(Node::default()).unwrap();
        let parent = heap.alloc(Node(vec![leaf])).unwrap();

        let mut roots = RootSet::new();
        roots.add_global_root(parent);
        heap.minor_collect(&roots);

        assert!(heap.contains(leaf));
        assert!(heap.contains(parent));
    }

    #[test]
    fn test_promotion_after_threshold() {
        let mut heap = heap();
        let a = heap.alloc(Node::default()).unwrap();
        let mut roots = RootSet::new();
        roots.add_global_root(a);

        heap.minor_collect(&roots);
        assert_eq!(heap.generation(a), Ok(Generation::Survivor));
        let report = heap.minor_collect(&roots);
        assert_eq!(heap.generation(a), Ok(Generation::Old));
        assert_eq!(report.promoted, 1);
    }

    #[test]
    fn test_barriered_store_keeps_young_object_alive() {
        let mut heap = heap();
        let owner = heap.alloc(Node::default()).unwrap();
        heap.tenure(owner).unwrap();
        let young = heap.alloc(Node::default()).unwrap();

        heap.get_mut(owner).unwrap().0.push(young);
        heap.write_barrier(owner, young);
        assert_eq!(heap.write_barrier_state().invocations(), 1);

        // The old owner is not a root; it is only reached through the
        // remembered set, which is what a minor collection consults.
        heap.minor_collect(&RootSet::new());
        assert!(heap.contains(young));
    }

    #[test]
    fn test_unbarriered_store_is_invisible_to_minor_collection() {
        let mut heap = heap();
        let owner = heap.alloc(Node::default()).unwrap();
        heap.tenure(owner).unwrap();
        let young = heap.alloc(Node::default()).unwrap();

        heap.get_mut(owner).unwrap().0.push(young);

        let mut roots = RootSet::new();
        roots.add_global_root(owner);
        heap.minor_collect(&roots);
        assert!(!heap.contains(young));
    }

    #[test]
    fn test_barrier_records_owner_once() {
        let mut heap = heap();
        let owner = heap.alloc(Node::default()).unwrap();
        heap.tenure(owner).unwrap();
        let a = heap.alloc(Node::default()).unwrap();
        let b = heap.alloc(Node::default()).unwrap();

        heap.get_mut(owner).unwrap().0.extend([a, b]);
        heap.write_barrier(owner, a);
        heap.write_barrier(owner, b);
        assert_eq!(heap.write_barrier_state().remembered_len(), 1);
        assert!(heap.store_needs_barrier(owner));
        assert!(!heap.store_needs_barrier(a));
    }

    #[test]
    fn test_barrier_ignores_young_owner() {
        let mut heap = heap();
        let owner = heap.alloc(Node::default()).unwrap();
        let value = heap.alloc(Node::default()).unwrap();
        heap.write_barrier(owner, value);
        assert_eq!(heap.write_barrier_state().invocations(), 0);
    }

    #[test]
    fn test_major_collect_frees_old_garbage() {
        let mut heap = heap();
        let old = heap.alloc(Node::default()).unwrap();
        heap.tenure(old).unwrap();

        heap.minor_collect(&RootSet::new());
        assert!(heap.contains(old));

        let report = heap.major_collect(&RootSet::new());
        assert_eq!(report.freed, 1);
        assert!(heap.is_empty());
        assert_eq!(heap.stats().major_collections, 1);
    }

    #[test]
    fn test_heap_limit() {
        let mut heap: Heap<Node> = Heap::new(GcConfig {
            max_objects: 2,
            ..GcConfig::default()
        });
        heap.alloc(Node::default()).unwrap();
        heap.alloc(Node::default()).unwrap();
        assert_eq!(
            heap.alloc(Node::default()).unwrap_err(),
            GcError::HeapExhausted { limit: 2 }
        );
    }

    #[test]
    fn test_should_collect_resets() {
        let mut heap: Heap<Node> = Heap::new(GcConfig {
            nursery_budget: 2,
            ..GcConfig::default()
        });
        heap.alloc(Node::default()).unwrap();
        assert!(!heap.should_collect());
        heap.alloc(Node::default()).unwrap();
        assert!(heap.should_collect());
        heap.minor_collect(&RootSet::new());
        assert!(!heap.should_collect());
    }
}
