//! Carrier directory: carrier accounts with their services and package types.

use serde::{Deserialize, Serialize};

use shipalloc_core::{CarrierId, Entity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarrierService {
    pub service_code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageType {
    pub package_code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Carrier {
    pub carrier_id: CarrierId,
    pub carrier_code: String,
    pub friendly_name: String,
    #[serde(default)]
    pub services: Vec<CarrierService>,
    #[serde(default)]
    pub package_types: Vec<PackageType>,
}

impl Entity for Carrier {
    type Id = CarrierId;

    fn id(&self) -> &Self::Id {
        &self.carrier_id
    }
}

impl Carrier {
    pub fn service(&self, service_code: &str) -> Option<&CarrierService> {
        self.services.iter().find(|s| s.service_code == service_code)
    }
}

/// Carriers fetched once per session; used for selectable options and to
/// resolve `carrier_id -> carrier_code` at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CarrierDirectory {
    carriers: Vec<Carrier>,
}

impl CarrierDirectory {
    pub fn new(carriers: Vec<Carrier>) -> Self {
        Self { carriers }
    }

    pub fn carriers(&self) -> &[Carrier] {
        &self.carriers
    }

    pub fn find(&self, carrier_id: &CarrierId) -> Option<&Carrier> {
        self.carriers.iter().find(|c| &c.carrier_id == carrier_id)
    }

    pub fn services_for(&self, carrier_id: &CarrierId) -> &[CarrierService] {
        self.find(carrier_id)
            .map(|c| c.services.as_slice())
            .unwrap_or_default()
    }

    pub fn package_types_for(&self, carrier_id: &CarrierId) -> &[PackageType] {
        self.find(carrier_id)
            .map(|c| c.package_types.as_slice())
            .unwrap_or_default()
    }
}
