//! Shipment plan files: an order, its carriers, and how to ship it.

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use shipalloc_core::{CarrierId, OrderItemId};
use shipalloc_issuance::{Carrier, CarrierDirectory};
use shipalloc_shipping::{
    Dimensions, DraftSet, Order, PackageDefaults, PackageUpdate, ShipmentMode,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub order: Order,
    pub carriers: Vec<Carrier>,
    #[serde(default)]
    pub mode: ShipmentMode,
    #[serde(default)]
    pub package_defaults: PackageDefaults,
    #[serde(default)]
    pub shipments: Vec<ShipmentPlan>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinePlan {
    pub item_id: OrderItemId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInput {
    #[serde(default)]
    pub package_type_code: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
}

/// Either an even split over N packages or an explicit package list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PackagePlan {
    Count(usize),
    Explicit(Vec<PackageInput>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentPlan {
    #[serde(default)]
    pub carrier_id: Option<CarrierId>,
    #[serde(default)]
    pub service_code: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Target quantity per item for this shipment.
    #[serde(default)]
    pub lines: Vec<LinePlan>,
    /// Put every still-unallocated unit into this shipment.
    #[serde(default)]
    pub allocate_remaining: bool,
    #[serde(default)]
    pub packages: Option<PackagePlan>,
}

impl Plan {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("invalid plan file")
    }

    pub fn directory(&self) -> CarrierDirectory {
        CarrierDirectory::new(self.carriers.clone())
    }

    /// Apply every shipment instruction, in order, through draft set
    /// operations. Shipment `i` maps to draft `i`; missing drafts are added.
    pub fn build(&self) -> Result<DraftSet> {
        if self.mode == ShipmentMode::Single && self.shipments.len() > 1 {
            bail!("single mode takes at most one shipment, got {}", self.shipments.len());
        }

        let mut set = DraftSet::new(&self.order, self.mode, self.package_defaults.clone())
            .context("cannot start a shipment session for this order")?;

        for (idx, shipment) in self.shipments.iter().enumerate() {
            let draft_id = match set.drafts().get(idx) {
                Some(draft) => draft.id_typed(),
                None => {
                    let (next, id) = set.add_draft();
                    set = next;
                    id
                }
            };
            let label = format!("shipment #{}", idx + 1);

            for line in &shipment.lines {
                set = set
                    .set_quantity(draft_id, &line.item_id, line.quantity)
                    .with_context(|| format!("{label}: line {}", line.item_id))?;
            }
            if shipment.allocate_remaining {
                set = set.allocate_remaining(draft_id).with_context(|| label.clone())?;
            }
            if let Some(carrier_id) = &shipment.carrier_id {
                set = set
                    .select_carrier(draft_id, carrier_id.clone())
                    .with_context(|| label.clone())?;
            }
            if let Some(service_code) = &shipment.service_code {
                set = set
                    .select_service(draft_id, service_code.as_str())
                    .with_context(|| label.clone())?;
            }
            if let Some(notes) = &shipment.notes {
                set = set.set_notes(draft_id, notes.as_str()).with_context(|| label.clone())?;
            }

            match &shipment.packages {
                Some(PackagePlan::Count(count)) => {
                    set = set.distribute(draft_id, *count).with_context(|| label.clone())?;
                }
                Some(PackagePlan::Explicit(inputs)) => {
                    for input in inputs {
                        let (next, package_id) = set.add_package(draft_id).with_context(|| label.clone())?;
                        set = next
                            .update_package(
                                draft_id,
                                package_id,
                                PackageUpdate {
                                    package_type_code: input.package_type_code.clone(),
                                    weight: input.weight,
                                    dimensions: input.dimensions,
                                },
                            )
                            .with_context(|| format!("{label}: package"))?;
                    }
                }
                None => {}
            }
        }

        Ok(set)
    }
}
