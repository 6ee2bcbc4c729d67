//! Relation and supplier operations on managed objects.

use super::ObjectSpace;
use crate::error::ArrayResult;
use crate::object::Object;
use crate::relation::Relation;
use crate::supplier::Supplier;
use orx_rts_gc::ObjRef;

impl ObjectSpace {
    /// Allocate an empty relation.
    pub fn new_relation(&mut self) -> ArrayResult<ObjRef> {
        self.alloc(Object::Relation(Relation::new()))
    }

    /// Store `item` under `index`.
    pub fn relation_put(&mut self, relation: ObjRef, item: ObjRef, index: ObjRef) -> ArrayResult<()> {
        let item_key = self.value_key(item)?;
        let index_key = self.value_key(index)?;
        self.relation_mut(relation)?
            .put(item, item_key, index, index_key);
        self.barrier(relation, item);
        self.barrier(relation, index);
        Ok(())
    }

    /// First item stored under `index`.
    pub fn relation_at(&self, relation: ObjRef, index: ObjRef) -> ArrayResult<Option<ObjRef>> {
        let key = self.value_key(index)?;
        Ok(self.relation(relation)?.at(&key))
    }

    /// A new array of every item stored under `index`.
    pub fn relation_all_at(&mut self, relation: ObjRef, index: ObjRef) -> ArrayResult<ObjRef> {
        let key = self.value_key(index)?;
        let items = self.relation(relation)?.all_at(&key);
        self.array_of_refs(items)
    }

    /// Whether anything is stored under `index`.
    pub fn relation_has_index(&self, relation: ObjRef, index: ObjRef) -> ArrayResult<bool> {
        let key = self.value_key(index)?;
        Ok(self.relation(relation)?.has_index(&key))
    }

    /// Whether `item` is stored under `index`.
    pub fn relation_has_item(&self, relation: ObjRef, item: ObjRef, index: ObjRef) -> ArrayResult<bool> {
        let item_key = self.value_key(item)?;
        let index_key = self.value_key(index)?;
        Ok(self.relation(relation)?.has_item(&item_key, &index_key))
    }

    /// Remove and return the first item under `index`.
    pub fn relation_remove(&mut self, relation: ObjRef, index: ObjRef) -> ArrayResult<Option<ObjRef>> {
        let key = self.value_key(index)?;
        Ok(self.relation_mut(relation)?.remove(&key))
    }

    /// Remove the pair (`item`, `index`), returning the stored item.
    pub fn relation_remove_item(
        &mut self,
        relation: ObjRef,
        item: ObjRef,
        index: ObjRef,
    ) -> ArrayResult<Option<ObjRef>> {
        let item_key = self.value_key(item)?;
        let index_key = self.value_key(index)?;
        Ok(self.relation_mut(relation)?.remove_item(&item_key, &index_key))
    }

    /// First index holding `item`.
    pub fn relation_index(&self, relation: ObjRef, item: ObjRef) -> ArrayResult<Option<ObjRef>> {
        let key = self.value_key(item)?;
        Ok(self.relation(relation)?.index_of(&key))
    }

    /// A new array of every index holding `item`.
    pub fn relation_all_index(&mut self, relation: ObjRef, item: ObjRef) -> ArrayResult<ObjRef> {
        let key = self.value_key(item)?;
        let indexes = self.relation(relation)?.all_index(&key);
        self.array_of_refs(indexes)
    }

    /// Number of items, in total or under one index.
    pub fn relation_items(&self, relation: ObjRef, index: Option<ObjRef>) -> ArrayResult<usize> {
        let relation = self.relation(relation)?;
        match index {
            Some(index) => Ok(relation.count_at(&self.value_key(index)?)),
            None => Ok(relation.len()),
        }
    }

    /// A new array of every item.
    pub fn relation_all_items(&mut self, relation: ObjRef) -> ArrayResult<ObjRef> {
        let items = self.relation(relation)?.all_items();
        self.array_of_refs(items)
    }

    /// A new array of every index, one per item.
    pub fn relation_all_indexes(&mut self, relation: ObjRef) -> ArrayResult<ObjRef> {
        let indexes = self.relation(relation)?.all_indexes();
        self.array_of_refs(indexes)
    }

    /// A supplier over every pair, or the pairs of one index.
    pub fn relation_supplier(&mut self, relation: ObjRef, index: Option<ObjRef>) -> ArrayResult<ObjRef> {
        let pairs = match index {
            Some(index) => {
                let key = self.value_key(index)?;
                self.relation(relation)?.pairs_at(&key)
            }
            None => self.relation(relation)?.pairs(),
        };
        let (indexes, items): (Vec<ObjRef>, Vec<ObjRef>) = pairs.into_iter().unzip();
        self.alloc(Object::Supplier(Supplier::new(items, indexes)))
    }

    // ------------------------------------------------------------------
    // Suppliers
    // ------------------------------------------------------------------

    /// Whether the supplier has a current pair.
    pub fn supplier_available(&self, supplier: ObjRef) -> ArrayResult<bool> {
        Ok(self.supplier(supplier)?.available())
    }

    /// The supplier's current item.
    pub fn supplier_item(&self, supplier: ObjRef) -> ArrayResult<ObjRef> {
        self.supplier(supplier)?.item()
    }

    /// The supplier's current index.
    pub fn supplier_index(&self, supplier: ObjRef) -> ArrayResult<ObjRef> {
        self.supplier(supplier)?.index()
    }

    /// Advance the supplier.
    pub fn supplier_next(&mut self, supplier: ObjRef) -> ArrayResult<()> {
        self.supplier_mut(supplier)?.next()
    }

    /// A new array of the items not yet consumed.
    pub fn supplier_all_items(&mut self, supplier: ObjRef) -> ArrayResult<ObjRef> {
        let items = self.supplier(supplier)?.all_items().to_vec();
        self.array_of_refs(items)
    }

    /// A new array of the indexes not yet consumed.
    pub fn supplier_all_indexes(&mut self, supplier: ObjRef) -> ArrayResult<ObjRef> {
        let indexes = self.supplier(supplier)?.all_indexes().to_vec();
        self.array_of_refs(indexes)
    }
}
