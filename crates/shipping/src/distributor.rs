//! Package weight distribution.
//!
//! Even split of a draft's item weight across a number of packages. This is
//! not bin packing: every package gets `total / count`.

use shipalloc_core::{DomainError, DomainResult, PackageId};

use crate::draft::{PackageDefaults, PackageSpec, ShipmentDraft};
use crate::measure::round2;
use crate::order::OrderItem;

#[derive(Debug, Clone, Copy)]
pub struct PackageWeightDistributor<'a> {
    items: &'a [OrderItem],
    defaults: &'a PackageDefaults,
}

impl<'a> PackageWeightDistributor<'a> {
    pub fn new(items: &'a [OrderItem], defaults: &'a PackageDefaults) -> Self {
        Self { items, defaults }
    }

    /// `Σ weight_per_unit × quantity` over the draft's lines, in pounds.
    ///
    /// Items without a unit weight contribute nothing.
    pub fn total_weight(&self, draft: &ShipmentDraft) -> f64 {
        draft
            .lines()
            .iter()
            .filter_map(|line| {
                let item = self.items.iter().find(|i| i.id == line.item_id)?;
                let unit = item.weight_per_unit?;
                Some(unit.in_pounds() * line.quantity as f64)
            })
            .sum()
    }

    /// Replacement package list for `draft`: `count` packages, each with the
    /// first existing package's type and dimensions (or the defaults) and
    /// weight `total / count` rounded to 2 decimals.
    pub fn distribute(&self, draft: &ShipmentDraft, count: usize) -> DomainResult<Vec<PackageSpec>> {
        if count == 0 {
            return Err(DomainError::validation("package count must be at least 1"));
        }

        let template = draft
            .packages()
            .first()
            .cloned()
            .unwrap_or_else(|| PackageSpec::blank(self.defaults));
        let weight = round2(self.total_weight(draft) / count as f64);

        Ok((0..count)
            .map(|_| PackageSpec {
                id: PackageId::new(),
                package_type_code: template.package_type_code.clone(),
                weight,
                dimensions: template.dimensions,
            })
            .collect())
    }

    /// One default package, for appending.
    pub fn blank_package(&self) -> PackageSpec {
        PackageSpec::blank(self.defaults)
    }

    /// Whether replacing the packages with an even split would discard
    /// edits made by hand.
    ///
    /// Blank packages carry no edits, and neither does a list left untouched
    /// since the last even split (even if the lines changed afterwards).
    /// Any package added, edited or removed by hand counts as customized.
    pub fn has_customized_packages(&self, draft: &ShipmentDraft) -> bool {
        if draft.packages_distributed {
            return false;
        }
        !draft.packages().iter().all(|p| self.is_blank(p))
    }

    fn is_blank(&self, package: &PackageSpec) -> bool {
        package.weight == 0.0
            && package.package_type_code == self.defaults.package_type_code
            && package.dimensions == self.defaults.dimensions
    }
}
