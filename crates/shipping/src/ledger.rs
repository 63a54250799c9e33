//! Allocation ledger: allocated and remaining quantity per order item.
//!
//! The ledger is a borrowed view over `(items, drafts)` and is never stored,
//! so it cannot drift from the drafts it summarizes.

use serde::Serialize;

use shipalloc_core::{DomainError, DomainResult, OrderItemId};

use crate::draft::ShipmentDraft;
use crate::order::OrderItem;

/// Per-item allocation summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub item_id: OrderItemId,
    pub sku: String,
    pub ordered: i64,
    pub allocated: i64,
    pub remaining: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct AllocationLedger<'a> {
    items: &'a [OrderItem],
    drafts: &'a [ShipmentDraft],
}

impl<'a> AllocationLedger<'a> {
    pub fn new(items: &'a [OrderItem], drafts: &'a [ShipmentDraft]) -> Self {
        Self { items, drafts }
    }

    fn item(&self, item_id: &OrderItemId) -> DomainResult<&'a OrderItem> {
        self.items
            .iter()
            .find(|i| &i.id == item_id)
            .ok_or_else(|| DomainError::not_found(format!("order item {item_id}")))
    }

    /// Sum of the quantities assigned to `item_id` across all drafts.
    pub fn allocated(&self, item_id: &OrderItemId) -> i64 {
        self.drafts.iter().map(|d| d.quantity_of(item_id)).sum()
    }

    /// Ordered quantity minus allocated quantity.
    pub fn remaining(&self, item_id: &OrderItemId) -> DomainResult<i64> {
        let item = self.item(item_id)?;
        Ok(item.quantity_ordered - self.allocated(item_id))
    }

    /// Quantity an `allocate(requested)` call may actually add.
    ///
    /// `min(requested, remaining)`; a result `<= 0` means the call is a no-op.
    pub fn clamp_allocation(&self, item_id: &OrderItemId, requested: i64) -> DomainResult<i64> {
        Ok(requested.min(self.remaining(item_id)?))
    }

    /// Quantity a `set_quantity(new_qty)` call on `draft` resolves to.
    ///
    /// Clamped to `[0, remaining + current quantity in this draft]`.
    pub fn clamp_set_quantity(
        &self,
        draft: &ShipmentDraft,
        item_id: &OrderItemId,
        new_qty: i64,
    ) -> DomainResult<i64> {
        let ceiling = self.remaining(item_id)? + draft.quantity_of(item_id);
        Ok(new_qty.clamp(0, ceiling.max(0)))
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.items
            .iter()
            .map(|item| {
                let allocated = self.allocated(&item.id);
                LedgerEntry {
                    item_id: item.id.clone(),
                    sku: item.sku.clone(),
                    ordered: item.quantity_ordered,
                    allocated,
                    remaining: item.quantity_ordered - allocated,
                }
            })
            .collect()
    }

    /// Items with units not yet assigned to any draft, in order.
    pub fn outstanding(&self) -> Vec<LedgerEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.remaining != 0)
            .collect()
    }

    pub fn is_fully_allocated(&self) -> bool {
        self.outstanding().is_empty()
    }

    /// `0 <= allocated <= ordered` for every item, and no draft holds a
    /// non-positive line.
    pub fn check_invariant(&self) -> DomainResult<()> {
        for draft in self.drafts {
            if let Some(line) = draft.lines().iter().find(|l| l.quantity <= 0) {
                return Err(DomainError::invariant(format!(
                    "{} holds a non-positive line for {}",
                    draft.display_name(),
                    line.item_id
                )));
            }
        }
        for entry in self.entries() {
            if entry.allocated < 0 || entry.allocated > entry.ordered {
                return Err(DomainError::invariant(format!(
                    "item {} allocated {} of {}",
                    entry.sku, entry.allocated, entry.ordered
                )));
            }
        }
        Ok(())
    }
}
