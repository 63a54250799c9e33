//! The draft collection for one order.
//!
//! `DraftSet` owns the order items and every draft. Each operation returns a
//! new `DraftSet` (version + 1) and leaves the receiver untouched, so a caller
//! can never observe a half-applied change. `allocate` and `set_quantity` are
//! the only ways quantities change; everything else composes from them.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use shipalloc_core::{
    AggregateRoot, CarrierId, DomainError, DomainResult, DraftId, ExpectedVersion, OrderId,
    OrderItemId, PackageId,
};

use crate::distributor::PackageWeightDistributor;
use crate::draft::{DraftOutcome, DraftStatus, PackageDefaults, PackageUpdate, ShipmentDraft};
use crate::ledger::AllocationLedger;
use crate::order::{Order, OrderItem};
use crate::validator::{ShipmentMode, ShipmentValidator, ValidationIssue, validate_draft};

/// Package count and weight of one draft.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSummary {
    pub package_count: usize,
    /// Sum of package weights, in pounds.
    pub package_weight: f64,
    /// Item weight of the draft's lines, in pounds.
    pub item_weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftSet {
    order_id: OrderId,
    customer_name: String,
    mode: ShipmentMode,
    items: Arc<[OrderItem]>,
    drafts: Vec<ShipmentDraft>,
    defaults: PackageDefaults,
    next_sequence: u32,
    version: u64,
}

impl AggregateRoot for DraftSet {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.order_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl DraftSet {
    /// Start a session for `order`.
    ///
    /// Single mode seeds one draft with every ordered unit; split mode starts
    /// with one empty draft.
    pub fn new(order: &Order, mode: ShipmentMode, defaults: PackageDefaults) -> DomainResult<Self> {
        order.ensure_well_formed()?;

        let mut set = Self {
            order_id: order.id.clone(),
            customer_name: order.customer_name.clone(),
            mode,
            items: order.items.clone().into(),
            drafts: Vec::new(),
            defaults,
            next_sequence: 1,
            version: 0,
        };
        set.push_draft();

        if mode == ShipmentMode::Single {
            let draft = &mut set.drafts[0];
            for item in set.items.iter() {
                draft.put_line(&item.id, item.quantity_ordered);
            }
        }

        Ok(set)
    }

    pub fn single(order: &Order, defaults: PackageDefaults) -> DomainResult<Self> {
        Self::new(order, ShipmentMode::Single, defaults)
    }

    pub fn split(order: &Order, defaults: PackageDefaults) -> DomainResult<Self> {
        Self::new(order, ShipmentMode::Split, defaults)
    }

    /// Recipient name used when the shipping address has none.
    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn mode(&self) -> ShipmentMode {
        self.mode
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn drafts(&self) -> &[ShipmentDraft] {
        &self.drafts
    }

    pub fn defaults(&self) -> &PackageDefaults {
        &self.defaults
    }

    pub fn draft(&self, draft_id: DraftId) -> DomainResult<&ShipmentDraft> {
        self.drafts
            .iter()
            .find(|d| d.id == draft_id)
            .ok_or_else(|| DomainError::not_found(format!("draft {draft_id}")))
    }

    pub fn ledger(&self) -> AllocationLedger<'_> {
        AllocationLedger::new(&self.items, &self.drafts)
    }

    pub fn distributor(&self) -> PackageWeightDistributor<'_> {
        PackageWeightDistributor::new(&self.items, &self.defaults)
    }

    pub fn validator(&self) -> ShipmentValidator<'_> {
        ShipmentValidator::new(&self.items, self.mode)
    }

    /// Issues blocking submission; empty means the set may be submitted.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        self.validator().validate(&self.drafts)
    }

    pub fn check_version(&self, expected: ExpectedVersion) -> DomainResult<()> {
        expected.check(self.version)
    }

    pub fn status(&self, draft_id: DraftId) -> DomainResult<DraftStatus> {
        let draft = self.draft(draft_id)?;
        let status = draft.local_status();
        if status != DraftStatus::Configured || !validate_draft(draft).is_empty() {
            return Ok(status);
        }
        if self.mode == ShipmentMode::Split && !self.ledger().is_fully_allocated() {
            return Ok(DraftStatus::Configured);
        }
        Ok(DraftStatus::Valid)
    }

    pub fn has_customized_packages(&self, draft_id: DraftId) -> DomainResult<bool> {
        Ok(self.distributor().has_customized_packages(self.draft(draft_id)?))
    }

    pub fn package_summary(&self, draft_id: DraftId) -> DomainResult<PackageSummary> {
        let draft = self.draft(draft_id)?;
        Ok(PackageSummary {
            package_count: draft.packages().len(),
            package_weight: draft.package_weight(),
            item_weight: self.distributor().total_weight(draft),
        })
    }

    // ---- draft lifecycle ----

    /// Append a new empty draft named after the next sequence number.
    pub fn add_draft(&self) -> (Self, DraftId) {
        let mut next = self.clone();
        let id = next.push_draft();
        next.version += 1;
        (next, id)
    }

    /// Remove a draft and release its allocations. At least one draft always
    /// remains, and terminal drafts stay on record.
    pub fn remove_draft(&self, draft_id: DraftId) -> DomainResult<Self> {
        if self.drafts.len() < 2 {
            return Err(DomainError::invariant("cannot remove the only shipment"));
        }
        if self.draft(draft_id)?.is_terminal() {
            return Err(DomainError::invariant(
                "cannot remove a shipment that was already submitted",
            ));
        }

        let mut next = self.clone();
        next.drafts.retain(|d| d.id != draft_id);
        next.version += 1;
        Ok(next)
    }

    // ---- allocation entry points ----

    /// Add up to `requested` units of `item_id` to the draft.
    ///
    /// Clamped to the item's remaining quantity; adds to an existing line
    /// instead of duplicating it. A clamped quantity `<= 0` is a no-op.
    pub fn allocate(&self, draft_id: DraftId, item_id: &OrderItemId, requested: i64) -> DomainResult<Self> {
        self.ensure_mutable(draft_id)?;
        let ledger = self.ledger();
        let granted = ledger.clamp_allocation(item_id, requested)?;

        if granted != requested {
            debug!(
                draft_id = %draft_id,
                item_id = %item_id,
                requested,
                granted,
                "allocation clamped to remaining quantity"
            );
        }
        if granted <= 0 {
            return Ok(self.clone());
        }

        let current = self.draft(draft_id)?.quantity_of(item_id);
        self.with_draft(draft_id, |draft| {
            draft.put_line(item_id, current + granted);
            Ok(())
        })
    }

    /// Set the draft's quantity of `item_id`.
    ///
    /// Clamped to `[0, remaining + current]`; 0 removes the line.
    pub fn set_quantity(&self, draft_id: DraftId, item_id: &OrderItemId, new_qty: i64) -> DomainResult<Self> {
        self.ensure_mutable(draft_id)?;
        let draft = self.draft(draft_id)?;
        let resolved = self.ledger().clamp_set_quantity(draft, item_id, new_qty)?;

        if resolved != new_qty {
            debug!(
                draft_id = %draft_id,
                item_id = %item_id,
                requested = new_qty,
                resolved,
                "quantity clamped"
            );
        }
        if resolved == draft.quantity_of(item_id) {
            return Ok(self.clone());
        }

        self.with_draft(draft_id, |draft| {
            draft.put_line(item_id, resolved);
            Ok(())
        })
    }

    pub fn increment(&self, draft_id: DraftId, item_id: &OrderItemId) -> DomainResult<Self> {
        self.allocate(draft_id, item_id, 1)
    }

    pub fn decrement(&self, draft_id: DraftId, item_id: &OrderItemId) -> DomainResult<Self> {
        let current = self.draft(draft_id)?.quantity_of(item_id);
        self.set_quantity(draft_id, item_id, current - 1)
    }

    pub fn remove_line(&self, draft_id: DraftId, item_id: &OrderItemId) -> DomainResult<Self> {
        self.set_quantity(draft_id, item_id, 0)
    }

    /// Move every unallocated unit of every item into the draft.
    pub fn allocate_remaining(&self, draft_id: DraftId) -> DomainResult<Self> {
        self.items.iter().try_fold(self.clone(), |set, item| {
            let remaining = set.ledger().remaining(&item.id)?;
            set.allocate(draft_id, &item.id, remaining)
        })
    }

    // ---- carrier and notes ----

    /// Select the carrier; switching carriers clears the service selection.
    pub fn select_carrier(&self, draft_id: DraftId, carrier_id: CarrierId) -> DomainResult<Self> {
        self.with_draft(draft_id, |draft| {
            if draft.carrier_id.as_ref() != Some(&carrier_id) {
                draft.service_code = None;
            }
            draft.carrier_id = Some(carrier_id);
            Ok(())
        })
    }

    pub fn select_service(&self, draft_id: DraftId, service_code: impl Into<String>) -> DomainResult<Self> {
        let service_code = service_code.into();
        if service_code.trim().is_empty() {
            return Err(DomainError::validation("service code cannot be empty"));
        }
        self.with_draft(draft_id, |draft| {
            draft.service_code = Some(service_code);
            Ok(())
        })
    }

    pub fn set_notes(&self, draft_id: DraftId, notes: impl Into<String>) -> DomainResult<Self> {
        let notes = notes.into();
        self.with_draft(draft_id, |draft| {
            draft.notes = notes;
            Ok(())
        })
    }

    // ---- packages ----

    /// Append one default package; other packages are left as they are.
    pub fn add_package(&self, draft_id: DraftId) -> DomainResult<(Self, PackageId)> {
        let package = self.distributor().blank_package();
        let package_id = package.id;
        let next = self.with_draft(draft_id, |draft| {
            draft.packages.push(package);
            draft.packages_distributed = false;
            Ok(())
        })?;
        Ok((next, package_id))
    }

    pub fn update_package(
        &self,
        draft_id: DraftId,
        package_id: PackageId,
        update: PackageUpdate,
    ) -> DomainResult<Self> {
        if let Some(weight) = update.weight {
            if !(weight.is_finite() && weight >= 0.0) {
                return Err(DomainError::validation("package weight must be a non-negative number"));
            }
        }
        if let Some(dimensions) = update.dimensions {
            if !dimensions.is_valid() {
                return Err(DomainError::validation("package dimensions must be non-negative numbers"));
            }
        }

        self.with_draft(draft_id, |draft| {
            let package = draft
                .packages
                .iter_mut()
                .find(|p| p.id == package_id)
                .ok_or_else(|| DomainError::not_found(format!("package {package_id}")))?;
            if let Some(code) = update.package_type_code {
                package.package_type_code = Some(code).filter(|c| !c.trim().is_empty());
            }
            if let Some(weight) = update.weight {
                package.weight = weight;
            }
            if let Some(dimensions) = update.dimensions {
                package.dimensions = dimensions;
            }
            draft.packages_distributed = false;
            Ok(())
        })
    }

    pub fn remove_package(&self, draft_id: DraftId, package_id: PackageId) -> DomainResult<Self> {
        self.with_draft(draft_id, |draft| {
            let before = draft.packages.len();
            draft.packages.retain(|p| p.id != package_id);
            if draft.packages.len() == before {
                return Err(DomainError::not_found(format!("package {package_id}")));
            }
            draft.packages_distributed = false;
            Ok(())
        })
    }

    /// Replace the draft's packages with `count` evenly weighted packages.
    ///
    /// Discards per-package edits; check [`Self::has_customized_packages`]
    /// and warn before calling.
    pub fn distribute(&self, draft_id: DraftId, count: usize) -> DomainResult<Self> {
        let packages = self.distributor().distribute(self.draft(draft_id)?, count)?;
        self.with_draft(draft_id, |draft| {
            draft.packages = packages;
            draft.packages_distributed = true;
            Ok(())
        })
    }

    // ---- terminal outcomes ----

    pub fn mark_submitted(&self, draft_id: DraftId, tracking_number: impl Into<String>) -> DomainResult<Self> {
        let outcome = DraftOutcome::Submitted {
            tracking_number: tracking_number.into(),
        };
        self.with_draft(draft_id, |draft| {
            draft.outcome = Some(outcome);
            Ok(())
        })
    }

    pub fn mark_failed(&self, draft_id: DraftId, reason: impl Into<String>) -> DomainResult<Self> {
        let outcome = DraftOutcome::Failed {
            reason: reason.into(),
        };
        self.with_draft(draft_id, |draft| {
            draft.outcome = Some(outcome);
            Ok(())
        })
    }

    // ---- internals ----

    fn push_draft(&mut self) -> DraftId {
        let draft = ShipmentDraft::new(format!("Shipment {}", self.next_sequence));
        let id = draft.id;
        self.next_sequence += 1;
        self.drafts.push(draft);
        id
    }

    fn ensure_mutable(&self, draft_id: DraftId) -> DomainResult<()> {
        let draft = self.draft(draft_id)?;
        if draft.is_terminal() {
            return Err(DomainError::invariant(format!(
                "{} is {:?} and can no longer change",
                draft.display_name(),
                draft.local_status()
            )));
        }
        Ok(())
    }

    /// Clone, apply `f` to one non-terminal draft, bump the version.
    fn with_draft<F>(&self, draft_id: DraftId, f: F) -> DomainResult<Self>
    where
        F: FnOnce(&mut ShipmentDraft) -> DomainResult<()>,
    {
        self.ensure_mutable(draft_id)?;
        let mut next = self.clone();
        let draft = next
            .drafts
            .iter_mut()
            .find(|d| d.id == draft_id)
            .ok_or_else(|| DomainError::not_found(format!("draft {draft_id}")))?;
        f(draft)?;
        next.version += 1;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{Dimensions, Weight};
    use crate::order::ShippingAddress;
    use proptest::prelude::*;

    fn test_item(id: &str, qty: i64, weight: Option<Weight>) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(id),
            sku: format!("SKU-{}", id.to_uppercase()),
            product_name: id.to_string(),
            quantity_ordered: qty,
            unit_price: 1000,
            weight_per_unit: weight,
        }
    }

    fn test_order(items: Vec<OrderItem>) -> Order {
        Order {
            id: OrderId::new("ord-1"),
            order_number: "#1001".to_string(),
            customer_name: "Jane Doe".to_string(),
            customer_email: None,
            shipping_address: ShippingAddress::default(),
            items,
        }
    }

    fn x() -> OrderItemId {
        OrderItemId::new("x")
    }

    fn scenario_order() -> Order {
        test_order(vec![test_item("x", 10, Some(Weight::ounces(2.0)))])
    }

    fn defaults() -> PackageDefaults {
        PackageDefaults::default().with_package_type("package")
    }

    fn configure(set: &DraftSet, draft_id: DraftId) -> DraftSet {
        let set = set
            .select_carrier(draft_id, CarrierId::new("se-1"))
            .unwrap()
            .select_service(draft_id, "usps_priority")
            .unwrap();
        set.distribute(draft_id, 1).unwrap()
    }

    #[test]
    fn single_mode_seeds_one_draft_with_everything() {
        let order = test_order(vec![
            test_item("x", 3, None),
            test_item("y", 0, None),
            test_item("z", 2, None),
        ]);
        let set = DraftSet::single(&order, defaults()).unwrap();

        assert_eq!(set.drafts().len(), 1);
        let draft = &set.drafts()[0];
        assert_eq!(draft.display_name(), "Shipment 1");
        assert_eq!(draft.lines().len(), 2);
        assert!(set.ledger().is_fully_allocated());
    }

    #[test]
    fn split_scenario_allocates_and_distributes() {
        let set = DraftSet::split(&scenario_order(), defaults()).unwrap();
        let first = set.drafts()[0].id_typed();
        let (set, second) = set.add_draft();

        let set = set.allocate(first, &x(), 6).unwrap();
        let set = set.allocate(second, &x(), 4).unwrap();
        assert_eq!(set.ledger().remaining(&x()).unwrap(), 0);

        let set = configure(&set, first);
        let set = configure(&set, second);
        assert!(set.validate().is_empty());

        let set = set.distribute(first, 2).unwrap();
        let packages = set.draft(first).unwrap().packages();
        assert_eq!(packages.len(), 2);
        assert!(packages.iter().all(|p| p.weight == 0.38));
        assert_eq!(set.package_summary(first).unwrap().item_weight, 0.75);
        assert_eq!(set.status(first).unwrap(), DraftStatus::Valid);
    }

    #[test]
    fn allocate_clamps_to_remaining_and_merges_lines() {
        let set = DraftSet::split(&scenario_order(), defaults()).unwrap();
        let first = set.drafts()[0].id_typed();
        let (set, second) = set.add_draft();

        let set = set.allocate(first, &x(), 7).unwrap();
        let set = set.allocate(second, &x(), 50).unwrap();
        assert_eq!(set.draft(second).unwrap().quantity_of(&x()), 3);

        let set = set.set_quantity(second, &x(), 1).unwrap();
        let set = set.allocate(first, &x(), 1).unwrap();
        let draft = set.draft(first).unwrap();
        assert_eq!(draft.lines().len(), 1);
        assert_eq!(draft.quantity_of(&x()), 8);
    }

    #[test]
    fn allocation_beyond_remaining_is_a_no_op() {
        let set = DraftSet::single(&scenario_order(), defaults()).unwrap();
        let (set, second) = set.add_draft();
        let version = set.version();

        let after = set.allocate(second, &x(), 3).unwrap();
        assert_eq!(after.version(), version);
        assert!(!after.draft(second).unwrap().has_lines());
    }

    #[test]
    fn set_quantity_to_zero_removes_the_line() {
        let set = DraftSet::single(&scenario_order(), defaults()).unwrap();
        let draft = set.drafts()[0].id_typed();

        let set = set.set_quantity(draft, &x(), -3).unwrap();
        assert!(set.draft(draft).unwrap().lines().is_empty());
        assert_eq!(set.status(draft).unwrap(), DraftStatus::Empty);
    }

    #[test]
    fn increment_and_decrement_compose_from_entry_points() {
        let set = DraftSet::split(&scenario_order(), defaults()).unwrap();
        let draft = set.drafts()[0].id_typed();

        let set = set.increment(draft, &x()).unwrap().increment(draft, &x()).unwrap();
        assert_eq!(set.draft(draft).unwrap().quantity_of(&x()), 2);
        let set = set.decrement(draft, &x()).unwrap().decrement(draft, &x()).unwrap();
        assert!(!set.draft(draft).unwrap().has_lines());
        let set = set.decrement(draft, &x()).unwrap();
        assert!(!set.draft(draft).unwrap().has_lines());
    }

    #[test]
    fn allocate_remaining_moves_everything_left() {
        let order = test_order(vec![test_item("x", 5, None), test_item("y", 2, None)]);
        let set = DraftSet::split(&order, defaults()).unwrap();
        let first = set.drafts()[0].id_typed();
        let (set, second) = set.add_draft();

        let set = set.allocate(first, &x(), 4).unwrap();
        let set = set.allocate_remaining(second).unwrap();
        let draft = set.draft(second).unwrap();
        assert_eq!(draft.quantity_of(&x()), 1);
        assert_eq!(draft.quantity_of(&OrderItemId::new("y")), 2);
        assert!(set.ledger().is_fully_allocated());
    }

    #[test]
    fn operations_leave_the_previous_value_untouched() {
        let set = DraftSet::split(&scenario_order(), defaults()).unwrap();
        let draft = set.drafts()[0].id_typed();

        let next = set.allocate(draft, &x(), 4).unwrap();
        assert_eq!(set.ledger().allocated(&x()), 0);
        assert_eq!(next.ledger().allocated(&x()), 4);
        assert_eq!(next.version(), set.version() + 1);
        assert!(next.check_version(ExpectedVersion::Exact(set.version())).is_err());
    }

    #[test]
    fn only_draft_cannot_be_removed() {
        let set = DraftSet::split(&scenario_order(), defaults()).unwrap();
        let draft = set.drafts()[0].id_typed();
        assert!(matches!(
            set.remove_draft(draft),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn removing_a_draft_releases_its_allocation() {
        let set = DraftSet::split(&scenario_order(), defaults()).unwrap();
        let (set, second) = set.add_draft();
        let set = set.allocate(second, &x(), 4).unwrap();

        let set = set.remove_draft(second).unwrap();
        assert_eq!(set.ledger().remaining(&x()).unwrap(), 10);

        let (set, third) = set.add_draft();
        assert_eq!(set.draft(third).unwrap().display_name(), "Shipment 3");
    }

    #[test]
    fn terminal_drafts_reject_mutation() {
        let set = DraftSet::single(&scenario_order(), defaults()).unwrap();
        let draft = set.drafts()[0].id_typed();
        let set = configure(&set, draft).mark_submitted(draft, "1Z999").unwrap();

        assert_eq!(set.status(draft).unwrap(), DraftStatus::Submitted);
        assert!(set.set_quantity(draft, &x(), 1).is_err());
        assert!(set.distribute(draft, 2).is_err());
        assert!(set.mark_failed(draft, "late").is_err());
    }

    #[test]
    fn switching_carrier_clears_service() {
        let set = DraftSet::single(&scenario_order(), defaults()).unwrap();
        let draft = set.drafts()[0].id_typed();
        let set = configure(&set, draft);

        let same = set.select_carrier(draft, CarrierId::new("se-1")).unwrap();
        assert_eq!(same.draft(draft).unwrap().service_code(), Some("usps_priority"));

        let other = set.select_carrier(draft, CarrierId::new("se-2")).unwrap();
        assert_eq!(other.draft(draft).unwrap().service_code(), None);
        assert_eq!(other.status(draft).unwrap(), DraftStatus::Partial);
    }

    #[test]
    fn add_package_keeps_existing_weights() {
        let set = DraftSet::single(&scenario_order(), defaults()).unwrap();
        let draft = set.drafts()[0].id_typed();
        let set = set.distribute(draft, 2).unwrap();

        let (set, package_id) = set.add_package(draft).unwrap();
        let packages = set.draft(draft).unwrap().packages();
        assert_eq!(packages.len(), 3);
        assert_eq!(packages[0].weight, 0.63);
        assert_eq!(packages[1].weight, 0.63);
        assert_eq!(packages[2].id, package_id);
        assert_eq!(packages[2].weight, 0.0);
    }

    #[test]
    fn update_package_validates_and_applies() {
        let set = DraftSet::single(&scenario_order(), PackageDefaults::default()).unwrap();
        let draft = set.drafts()[0].id_typed();
        let (set, package_id) = set.add_package(draft).unwrap();

        let bad = set.update_package(
            draft,
            package_id,
            PackageUpdate {
                weight: Some(-1.0),
                ..PackageUpdate::default()
            },
        );
        assert!(matches!(bad, Err(DomainError::Validation(_))));

        let set = set
            .update_package(
                draft,
                package_id,
                PackageUpdate {
                    package_type_code: Some("flat_rate_envelope".to_string()),
                    weight: Some(1.2),
                    dimensions: Some(Dimensions::new(12.5, 9.5, 0.5)),
                },
            )
            .unwrap();
        assert!(set.has_customized_packages(draft).unwrap());

        let set = set.remove_package(draft, package_id).unwrap();
        assert!(set.draft(draft).unwrap().packages().is_empty());
        assert!(set.remove_package(draft, package_id).is_err());
    }

    #[test]
    fn distributed_packages_stay_uncustomized_after_allocation_changes() {
        let set = DraftSet::split(&scenario_order(), defaults()).unwrap();
        let draft = set.drafts()[0].id_typed();
        let set = set.allocate(draft, &x(), 4).unwrap().distribute(draft, 2).unwrap();
        assert!(!set.has_customized_packages(draft).unwrap());

        let set = set.allocate(draft, &x(), 3).unwrap();
        assert_eq!(set.package_summary(draft).unwrap().item_weight, 0.875);
        assert!(!set.has_customized_packages(draft).unwrap());

        let package_id = set.draft(draft).unwrap().packages()[1].id;
        let set = set
            .update_package(
                draft,
                package_id,
                PackageUpdate {
                    weight: Some(0.5),
                    ..PackageUpdate::default()
                },
            )
            .unwrap();
        assert!(set.has_customized_packages(draft).unwrap());

        let set = set.distribute(draft, 2).unwrap();
        assert!(!set.has_customized_packages(draft).unwrap());
        let (set, _) = set.add_package(draft).unwrap();
        assert!(set.has_customized_packages(draft).unwrap());
    }

    #[test]
    fn set_keeps_the_customer_name_for_address_fallback() {
        let set = DraftSet::single(&scenario_order(), defaults()).unwrap();
        assert_eq!(set.customer_name(), "Jane Doe");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Allocate(usize, usize, i64),
        SetQuantity(usize, usize, i64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..3, 0usize..3, -5i64..25).prop_map(|(d, i, q)| Op::Allocate(d, i, q)),
            (0usize..3, 0usize..3, -5i64..25).prop_map(|(d, i, q)| Op::SetQuantity(d, i, q)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: after any sequence of allocate/set_quantity calls,
        /// `allocated + remaining == ordered` and `0 <= allocated <= ordered`,
        /// and no draft holds a non-positive line.
        #[test]
        fn quantities_are_conserved(
            ordered in prop::collection::vec(0i64..20, 3),
            ops in prop::collection::vec(op_strategy(), 1..40),
        ) {
            let items: Vec<OrderItem> = ordered
                .iter()
                .enumerate()
                .map(|(i, q)| test_item(&format!("i{i}"), *q, None))
                .collect();
            let mut set = DraftSet::split(&test_order(items.clone()), defaults()).unwrap();
            set = set.add_draft().0.add_draft().0;

            for op in ops {
                let (d, i, q, is_allocate) = match op {
                    Op::Allocate(d, i, q) => (d, i, q, true),
                    Op::SetQuantity(d, i, q) => (d, i, q, false),
                };
                let draft = set.drafts()[d].id_typed();
                let item = items[i].id.clone();
                let before = set.ledger().remaining(&item).unwrap();
                let current = set.draft(draft).unwrap().quantity_of(&item);

                set = if is_allocate {
                    let next = set.allocate(draft, &item, q).unwrap();
                    let gained = next.draft(draft).unwrap().quantity_of(&item) - current;
                    prop_assert_eq!(gained, q.min(before).max(0));
                    next
                } else {
                    let next = set.set_quantity(draft, &item, q).unwrap();
                    let now = next.draft(draft).unwrap().quantity_of(&item);
                    prop_assert_eq!(now, q.clamp(0, before + current));
                    next
                };

                prop_assert!(set.ledger().check_invariant().is_ok());
                for it in &items {
                    let ledger = set.ledger();
                    prop_assert_eq!(
                        ledger.allocated(&it.id) + ledger.remaining(&it.id).unwrap(),
                        it.quantity_ordered
                    );
                }
            }
        }
    }
}
