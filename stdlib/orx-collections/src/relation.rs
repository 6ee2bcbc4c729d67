//! Relation: a multi-valued map with value-equality keys.
//!
//! A relation maps an index to any number of items. Both sides compare by
//! value: two different string objects with the same text are the same
//! index. Values are compared through a [`RelationKey`] computed by the
//! object space, so this module never touches the heap.

use indexmap::IndexMap;
use orx_rts_gc::{ObjRef, Trace, Tracer};
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

/// Value-equality key of an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelationKey {
    /// Strings compare by their text.
    Text(String),
    /// Other objects compare by identity.
    Identity(ObjRef),
}

#[derive(Debug, Clone)]
struct Entry {
    index: ObjRef,
    item: ObjRef,
    item_key: RelationKey,
}

type Buckets = IndexMap<RelationKey, Vec<Entry>, BuildHasherDefault<FxHasher>>;

/// A multi-valued map from index objects to item objects.
///
/// Entries are kept in first-insertion order of their index; the items of
/// one index keep their insertion order too.
#[derive(Debug, Clone, Default)]
pub struct Relation {
    buckets: Buckets,
    len: usize,
}

impl Relation {
    /// Create an empty relation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of (index, item) pairs.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the relation holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Add an item under an index.
    ///
    /// Storing a pair that is already present (equal index, equal item)
    /// replaces the stored objects instead of adding a duplicate. Returns
    /// whether a new pair was added.
    pub fn put(
        &mut self,
        item: ObjRef,
        item_key: RelationKey,
        index: ObjRef,
        index_key: RelationKey,
    ) -> bool {
        let bucket = self.buckets.entry(index_key).or_default();
        if let Some(entry) = bucket.iter_mut().find(|e| e.item_key == item_key) {
            entry.item = item;
            entry.index = index;
            return false;
        }
        bucket.push(Entry {
            index,
            item,
            item_key,
        });
        self.len += 1;
        true
    }

    /// First item stored under an index.
    pub fn at(&self, index_key: &RelationKey) -> Option<ObjRef> {
        self.buckets
            .get(index_key)
            .and_then(|bucket| bucket.first())
            .map(|e| e.item)
    }

    /// All items stored under an index.
    pub fn all_at(&self, index_key: &RelationKey) -> Vec<ObjRef> {
        self.buckets
            .get(index_key)
            .map(|bucket| bucket.iter().map(|e| e.item).collect())
            .unwrap_or_default()
    }

    /// Number of items stored under an index.
    pub fn count_at(&self, index_key: &RelationKey) -> usize {
        self.buckets.get(index_key).map_or(0, Vec::len)
    }

    /// Whether any item is stored under an index.
    pub fn has_index(&self, index_key: &RelationKey) -> bool {
        self.buckets.contains_key(index_key)
    }

    /// Whether the given pair is present.
    pub fn has_item(&self, item_key: &RelationKey, index_key: &RelationKey) -> bool {
        self.buckets
            .get(index_key)
            .is_some_and(|bucket| bucket.iter().any(|e| &e.item_key == item_key))
    }

    /// Remove and return the first item under an index.
    pub fn remove(&mut self, index_key: &RelationKey) -> Option<ObjRef> {
        self.remove_where(index_key, |_| true)
    }

    /// Remove a specific pair, returning the stored item.
    pub fn remove_item(&mut self, item_key: &RelationKey, index_key: &RelationKey) -> Option<ObjRef> {
        self.remove_where(index_key, |e| &e.item_key == item_key)
    }

    fn remove_where<P>(&mut self, index_key: &RelationKey, pred: P) -> Option<ObjRef>
    where
        P: Fn(&Entry) -> bool,
    {
        let bucket = self.buckets.get_mut(index_key)?;
        let at = bucket.iter().position(pred)?;
        let entry = bucket.remove(at);
        if bucket.is_empty() {
            self.buckets.shift_remove(index_key);
        }
        self.len -= 1;
        Some(entry.item)
    }

    /// Remove every item under an index.
    pub fn remove_all(&mut self, index_key: &RelationKey) -> Vec<ObjRef> {
        let Some(bucket) = self.buckets.shift_remove(index_key) else {
            return Vec::new();
        };
        self.len -= bucket.len();
        bucket.into_iter().map(|e| e.item).collect()
    }

    /// First index under which an item is stored.
    pub fn index_of(&self, item_key: &RelationKey) -> Option<ObjRef> {
        self.pairs_matching(item_key).next().map(|(index, _)| index)
    }

    /// Every index under which an item is stored.
    pub fn all_index(&self, item_key: &RelationKey) -> Vec<ObjRef> {
        self.pairs_matching(item_key).map(|(index, _)| index).collect()
    }

    fn pairs_matching<'a>(
        &'a self,
        item_key: &'a RelationKey,
    ) -> impl Iterator<Item = (ObjRef, ObjRef)> + 'a {
        self.entries()
            .filter(move |e| &e.item_key == item_key)
            .map(|e| (e.index, e.item))
    }

    fn entries(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.buckets.values().flatten()
    }

    /// Every (index, item) pair in order.
    pub fn pairs(&self) -> Vec<(ObjRef, ObjRef)> {
        self.entries().map(|e| (e.index, e.item)).collect()
    }

    /// (index, item) pairs of one index.
    pub fn pairs_at(&self, index_key: &RelationKey) -> Vec<(ObjRef, ObjRef)> {
        self.buckets
            .get(index_key)
            .map(|bucket| bucket.iter().map(|e| (e.index, e.item)).collect())
            .unwrap_or_default()
    }

    /// Every item, one per pair.
    pub fn all_items(&self) -> Vec<ObjRef> {
        self.entries().map(|e| e.item).collect()
    }

    /// Every index, one per pair.
    pub fn all_indexes(&self) -> Vec<ObjRef> {
        self.entries().map(|e| e.index).collect()
    }

    /// Remove every pair.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }
}

impl Trace for Relation {
    fn trace(&self, tracer: &mut Tracer) {
        for entry in self.buckets.values().flatten() {
            tracer.mark(entry.index);
            tracer.mark(entry.item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orx_rts_gc::Heap;

    fn refs(n: usize) -> Vec<ObjRef> {
        let mut heap: Heap<Relation> = Heap::with_default_config();
        (0..n).map(|_| heap.alloc(Relation::new()).unwrap()).collect()
    }

    fn text(s: &str) -> RelationKey {
        RelationKey::Text(s.to_string())
    }

    #[test]
    fn test_multiple_items_per_index() {
        let r = refs(4);
        let mut rel = Relation::new();
        assert!(rel.put(r[0], text("x"), r[2], text("k")));
        assert!(rel.put(r[1], text("y"), r[3], text("k")));

        assert_eq!(rel.len(), 2);
        assert_eq!(rel.at(&text("k")), Some(r[0]));
        assert_eq!(rel.all_at(&text("k")), vec![r[0], r[1]]);
        assert_eq!(rel.count_at(&text("k")), 2);
        assert!(rel.has_item(&text("y"), &text("k")));
        assert!(!rel.has_item(&text("z"), &text("k")));
    }

    #[test]
    fn test_equal_pair_replaces() {
        let r = refs(3);
        let mut rel = Relation::new();
        rel.put(r[0], text("x"), r[2], text("k"));
        assert!(!rel.put(r[1], text("x"), r[2], text("k")));
        assert_eq!(rel.len(), 1);
        assert_eq!(rel.at(&text("k")), Some(r[1]));
    }

    #[test]
    fn test_identity_keys_are_distinct_from_text() {
        let r = refs(2);
        let mut rel = Relation::new();
        rel.put(r[0], text("x"), r[1], RelationKey::Identity(r[1]));
        assert!(rel.has_index(&RelationKey::Identity(r[1])));
        assert!(!rel.has_index(&text("x")));
    }

    #[test]
    fn test_remove_variants() {
        let r = refs(4);
        let mut rel = Relation::new();
        rel.put(r[0], text("a"), r[3], text("k"));
        rel.put(r[1], text("b"), r[3], text("k"));
        rel.put(r[2], text("c"), r[3], text("j"));

        assert_eq!(rel.remove_item(&text("b"), &text("k")), Some(r[1]));
        assert_eq!(rel.remove_item(&text("b"), &text("k")), None);
        assert_eq!(rel.remove(&text("k")), Some(r[0]));
        assert!(!rel.has_index(&text("k")));
        assert_eq!(rel.len(), 1);

        assert_eq!(rel.remove_all(&text("j")), vec![r[2]]);
        assert!(rel.is_empty());
    }

    #[test]
    fn test_reverse_lookup_and_order() {
        let r = refs(4);
        let mut rel = Relation::new();
        rel.put(r[0], text("v"), r[2], text("second"));
        rel.put(r[1], text("w"), r[3], text("first"));
        rel.put(r[0], text("v"), r[3], text("first"));

        assert_eq!(rel.index_of(&text("v")), Some(r[2]));
        assert_eq!(rel.all_index(&text("v")), vec![r[2], r[3]]);
        assert_eq!(rel.all_items(), vec![r[0], r[1], r[0]]);
        assert_eq!(rel.all_indexes(), vec![r[2], r[3], r[3]]);
        assert_eq!(rel.pairs_at(&text("first")), vec![(r[3], r[1]), (r[3], r[0])]);
    }

    #[test]
    fn test_emptied_index_moves_to_the_end() {
        let r = refs(4);
        let mut rel = Relation::new();
        rel.put(r[0], text("a"), r[2], text("k1"));
        rel.put(r[1], text("b"), r[3], text("k2"));
        rel.put(r[1], text("c"), r[3], text("k3"));

        assert_eq!(rel.remove(&text("k1")), Some(r[0]));
        assert_eq!(rel.all_items(), vec![r[1], r[1]]);
        assert_eq!(rel.all_indexes(), vec![r[3], r[3]]);

        rel.put(r[0], text("a"), r[2], text("k1"));
        assert_eq!(rel.all_items(), vec![r[1], r[1], r[0]]);
        assert_eq!(rel.all_indexes(), vec![r[3], r[3], r[2]]);

        // removing a middle index keeps the others in order
        rel.remove_all(&text("k2"));
        assert_eq!(rel.pairs(), vec![(r[3], r[1]), (r[2], r[0])]);
    }
}
