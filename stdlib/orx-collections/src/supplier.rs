//! Supplier: a snapshot iterator over (item, index) pairs.

use crate::error::{ArrayError, ArrayResult};
use orx_rts_gc::{ObjRef, Trace, Tracer};

/// Iterates over a fixed snapshot of items and their indexes.
///
/// The snapshot is taken when the supplier is created; later changes to the
/// source collection are not seen.
#[derive(Debug, Clone)]
pub struct Supplier {
    items: Vec<ObjRef>,
    indexes: Vec<ObjRef>,
    position: usize,
}

impl Supplier {
    /// Create a supplier over parallel item and index lists.
    pub fn new(items: Vec<ObjRef>, indexes: Vec<ObjRef>) -> Self {
        debug_assert_eq!(items.len(), indexes.len());
        Supplier {
            items,
            indexes,
            position: 0,
        }
    }

    /// Whether a current pair is available.
    pub fn available(&self) -> bool {
        self.position < self.items.len()
    }

    /// The current item.
    ///
    /// # Errors
    ///
    /// `SupplierExhausted` once every pair has been consumed.
    pub fn item(&self) -> ArrayResult<ObjRef> {
        self.items
            .get(self.position)
            .copied()
            .ok_or(ArrayError::SupplierExhausted)
    }

    /// The current index.
    ///
    /// # Errors
    ///
    /// `SupplierExhausted` once every pair has been consumed.
    pub fn index(&self) -> ArrayResult<ObjRef> {
        self.indexes
            .get(self.position)
            .copied()
            .ok_or(ArrayError::SupplierExhausted)
    }

    /// Step to the next pair.
    ///
    /// # Errors
    ///
    /// `SupplierExhausted` when there is no current pair to step past.
    pub fn next(&mut self) -> ArrayResult<()> {
        if !self.available() {
            return Err(ArrayError::SupplierExhausted);
        }
        self.position += 1;
        Ok(())
    }

    /// Items not yet consumed.
    pub fn all_items(&self) -> &[ObjRef] {
        &self.items[self.position.min(self.items.len())..]
    }

    /// Indexes not yet consumed.
    pub fn all_indexes(&self) -> &[ObjRef] {
        &self.indexes[self.position.min(self.indexes.len())..]
    }
}

impl Trace for Supplier {
    fn trace(&self, tracer: &mut Tracer) {
        // consumed pairs are unreachable through the supplier
        for &r in self.all_items().iter().chain(self.all_indexes()) {
            tracer.mark(r);
        }
    }
}
