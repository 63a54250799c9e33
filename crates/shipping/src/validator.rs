//! Submission-readiness checks for a set of drafts.
//!
//! Drafts without lines are pruned rather than reported, and so are drafts
//! that already reached a terminal state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::draft::ShipmentDraft;
use crate::ledger::AllocationLedger;
use crate::order::OrderItem;

/// How the order is being shipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentMode {
    /// One shipment carrying every item.
    #[default]
    Single,
    /// Items spread over several shipments; every unit must be allocated.
    Split,
}

/// One reason a draft set cannot be submitted yet.
///
/// `package` numbers are 1-based, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    #[error("{draft}: select a carrier")]
    MissingCarrier { draft: String },

    #[error("{draft}: select a service")]
    MissingService { draft: String },

    #[error("{draft}: add at least one package")]
    NoPackages { draft: String },

    #[error("{draft}: package {package} needs a package type")]
    MissingPackageType { draft: String, package: usize },

    #[error("{draft}: package {package} needs a weight greater than 0")]
    NonPositiveWeight { draft: String, package: usize },

    #[error("SKU {sku}: {remaining} unit(s) not allocated to a shipment")]
    UnallocatedItem { sku: String, remaining: i64 },
}

/// Drafts that take part in validation and submission: non-empty and not
/// yet terminal, in input order.
pub fn eligible_drafts(drafts: &[ShipmentDraft]) -> impl Iterator<Item = &ShipmentDraft> {
    drafts.iter().filter(|d| d.has_lines() && !d.is_terminal())
}

#[derive(Debug, Clone, Copy)]
pub struct ShipmentValidator<'a> {
    items: &'a [OrderItem],
    mode: ShipmentMode,
}

impl<'a> ShipmentValidator<'a> {
    pub fn new(items: &'a [OrderItem], mode: ShipmentMode) -> Self {
        Self { items, mode }
    }

    /// Every issue blocking submission of `drafts`; empty means valid.
    pub fn validate(&self, drafts: &[ShipmentDraft]) -> Vec<ValidationIssue> {
        let mut issues: Vec<ValidationIssue> =
            eligible_drafts(drafts).flat_map(validate_draft).collect();

        if self.mode == ShipmentMode::Split {
            let ledger = AllocationLedger::new(self.items, drafts);
            issues.extend(ledger.outstanding().into_iter().map(|entry| {
                ValidationIssue::UnallocatedItem {
                    sku: entry.sku,
                    remaining: entry.remaining,
                }
            }));
        }

        issues
    }
}

/// Carrier, service and package checks for a single draft.
pub fn validate_draft(draft: &ShipmentDraft) -> Vec<ValidationIssue> {
    let name = draft.display_name();
    let mut issues = Vec::new();

    if draft.carrier_id().is_none() {
        issues.push(ValidationIssue::MissingCarrier {
            draft: name.to_string(),
        });
    }
    if draft.service_code().is_none_or(|s| s.trim().is_empty()) {
        issues.push(ValidationIssue::MissingService {
            draft: name.to_string(),
        });
    }

    if draft.packages().is_empty() {
        issues.push(ValidationIssue::NoPackages {
            draft: name.to_string(),
        });
    }
    for (idx, package) in draft.packages().iter().enumerate() {
        if !package.has_package_type() {
            issues.push(ValidationIssue::MissingPackageType {
                draft: name.to_string(),
                package: idx + 1,
            });
        }
        if !(package.weight > 0.0) {
            issues.push(ValidationIssue::NonPositiveWeight {
                draft: name.to_string(),
                package: idx + 1,
            });
        }
    }

    issues
}
