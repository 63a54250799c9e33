//! Shipment drafts and their packages.
//!
//! A draft groups order-item quantities destined for one physical shipment.
//! Drafts are only mutated through [`crate::DraftSet`], which keeps the
//! allocation ledger consistent.

use serde::{Deserialize, Serialize};

use shipalloc_core::{CarrierId, DraftId, Entity, OrderItemId, PackageId};

use crate::measure::Dimensions;

/// Quantity of one order item assigned to a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineAllocation {
    pub item_id: OrderItemId,
    /// Always strictly positive while the line exists.
    pub quantity: i64,
}

/// Defaults applied to packages created without a template.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDefaults {
    #[serde(default)]
    pub package_type_code: Option<String>,
    #[serde(default)]
    pub dimensions: Dimensions,
}

impl PackageDefaults {
    pub fn with_package_type(mut self, code: impl Into<String>) -> Self {
        self.package_type_code = Some(code.into());
        self
    }

    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = dimensions;
        self
    }
}

/// One physical package of a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSpec {
    pub id: PackageId,
    pub package_type_code: Option<String>,
    /// Weight in pounds.
    pub weight: f64,
    pub dimensions: Dimensions,
}

impl PackageSpec {
    /// A new package carrying the configured defaults and no weight.
    pub fn blank(defaults: &PackageDefaults) -> Self {
        Self {
            id: PackageId::new(),
            package_type_code: defaults.package_type_code.clone(),
            weight: 0.0,
            dimensions: defaults.dimensions,
        }
    }

    pub fn has_package_type(&self) -> bool {
        self.package_type_code
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }

    /// Package type set and weight strictly positive.
    pub fn is_fully_specified(&self) -> bool {
        self.has_package_type() && self.weight > 0.0
    }
}

/// Partial update of a package; `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PackageUpdate {
    pub package_type_code: Option<String>,
    pub weight: Option<f64>,
    pub dimensions: Option<Dimensions>,
}

/// Terminal result recorded on a draft after a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DraftOutcome {
    Submitted { tracking_number: String },
    Failed { reason: String },
}

/// Draft lifecycle.
///
/// Derived from data completeness; only `Submitted` and `Failed` are stored,
/// and neither is ever left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Empty,
    Partial,
    Configured,
    Valid,
    Submitted,
    Failed,
}

impl DraftStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DraftStatus::Submitted | DraftStatus::Failed)
    }
}

/// An in-progress shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentDraft {
    pub(crate) id: DraftId,
    pub(crate) display_name: String,
    pub(crate) lines: Vec<LineAllocation>,
    pub(crate) carrier_id: Option<CarrierId>,
    pub(crate) service_code: Option<String>,
    pub(crate) packages: Vec<PackageSpec>,
    /// Packages are exactly what the last even split produced.
    #[serde(default)]
    pub(crate) packages_distributed: bool,
    pub(crate) notes: String,
    pub(crate) outcome: Option<DraftOutcome>,
}

impl Entity for ShipmentDraft {
    type Id = DraftId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl ShipmentDraft {
    pub(crate) fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: DraftId::new(),
            display_name: display_name.into(),
            lines: Vec::new(),
            carrier_id: None,
            service_code: None,
            packages: Vec::new(),
            packages_distributed: false,
            notes: String::new(),
            outcome: None,
        }
    }

    pub fn id_typed(&self) -> DraftId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn lines(&self) -> &[LineAllocation] {
        &self.lines
    }

    pub fn carrier_id(&self) -> Option<&CarrierId> {
        self.carrier_id.as_ref()
    }

    pub fn service_code(&self) -> Option<&str> {
        self.service_code.as_deref()
    }

    pub fn packages(&self) -> &[PackageSpec] {
        &self.packages
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn outcome(&self) -> Option<&DraftOutcome> {
        self.outcome.as_ref()
    }

    pub fn has_lines(&self) -> bool {
        !self.lines.is_empty()
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    /// Quantity of `item_id` allocated to this draft (0 when there is no line).
    pub fn quantity_of(&self, item_id: &OrderItemId) -> i64 {
        self.lines
            .iter()
            .find(|l| &l.item_id == item_id)
            .map_or(0, |l| l.quantity)
    }

    /// Carrier and service selected, and at least one package with a type
    /// and a weight.
    pub fn is_configured(&self) -> bool {
        self.carrier_id.is_some()
            && self.service_code.as_deref().is_some_and(|s| !s.trim().is_empty())
            && self.packages.iter().any(PackageSpec::is_fully_specified)
    }

    /// Status from this draft's own data; `Valid` needs the whole set and is
    /// decided by [`crate::DraftSet::status`].
    pub fn local_status(&self) -> DraftStatus {
        match &self.outcome {
            Some(DraftOutcome::Submitted { .. }) => DraftStatus::Submitted,
            Some(DraftOutcome::Failed { .. }) => DraftStatus::Failed,
            None if self.lines.is_empty() => DraftStatus::Empty,
            None if !self.is_configured() => DraftStatus::Partial,
            None => DraftStatus::Configured,
        }
    }

    /// Total weight (pounds) of the packages currently on this draft.
    pub fn package_weight(&self) -> f64 {
        self.packages.iter().map(|p| p.weight).sum()
    }

    /// Set the line quantity; 0 removes the line. Callers clamp first.
    pub(crate) fn put_line(&mut self, item_id: &OrderItemId, quantity: i64) {
        match self.lines.iter().position(|l| &l.item_id == item_id) {
            Some(idx) if quantity <= 0 => {
                self.lines.remove(idx);
            }
            Some(idx) => self.lines[idx].quantity = quantity,
            None if quantity > 0 => self.lines.push(LineAllocation {
                item_id: item_id.clone(),
                quantity,
            }),
            None => {}
        }
    }
}
