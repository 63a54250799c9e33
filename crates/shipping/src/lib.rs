//! Shipment allocation domain.
//!
//! Splits an order's line items across shipment drafts and packages,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). Label purchase lives in `shipalloc-issuance`.

pub mod distributor;
pub mod draft;
pub mod drafts;
pub mod ledger;
pub mod measure;
pub mod order;
pub mod validator;

pub use distributor::PackageWeightDistributor;
pub use draft::{
    DraftOutcome, DraftStatus, LineAllocation, PackageDefaults, PackageSpec, PackageUpdate,
    ShipmentDraft,
};
pub use drafts::{DraftSet, PackageSummary};
pub use ledger::{AllocationLedger, LedgerEntry};
pub use measure::{Dimensions, Weight, WeightUnit, round2};
pub use order::{Order, OrderItem, ShippingAddress};
pub use validator::{ShipmentMode, ShipmentValidator, ValidationIssue, eligible_drafts, validate_draft};
