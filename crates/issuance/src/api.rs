//! Label Issuance API contract (carrier-agnostic).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shipalloc_core::OrderId;
use shipalloc_shipping::{PackageSpec, ShippingAddress};

/// One package as the label API expects it. Weight in pounds, dimensions
/// in inches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelPackage {
    pub package_code: String,
    pub weight: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl From<&PackageSpec> for LabelPackage {
    fn from(package: &PackageSpec) -> Self {
        Self {
            package_code: package.package_type_code.clone().unwrap_or_default(),
            weight: package.weight,
            length: package.dimensions.length,
            width: package.dimensions.width,
            height: package.dimensions.height,
        }
    }
}

/// Destination in the shape the label API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelAddress {
    pub name: String,
    pub address1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    pub zip: String,
    pub province: String,
    pub province_code: String,
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl LabelAddress {
    /// Normalize `address`, falling back to `fallback_name` for the recipient.
    pub fn from_address(address: &ShippingAddress, fallback_name: &str) -> Self {
        let normalized = address.normalized(fallback_name);
        Self {
            name: normalized.name.unwrap_or_default(),
            address1: normalized.address1,
            address2: normalized.address2,
            city: normalized.city,
            zip: normalized.zip,
            province: normalized.province,
            province_code: normalized.province_code,
            country_code: normalized.country_code,
            phone: normalized.phone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelRequest {
    pub order_id: OrderId,
    pub carrier_code: String,
    pub service_code: String,
    pub packages: Vec<LabelPackage>,
    pub shipping_address: LabelAddress,
    #[serde(default)]
    pub notes: String,
}

/// Successful label purchase. `cost` is in major currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelResponse {
    pub tracking_number: String,
    pub label_url: String,
    pub cost: f64,
}

impl LabelResponse {
    /// Cost in cents, never negative.
    pub fn cost_cents(&self) -> u64 {
        if self.cost.is_finite() && self.cost > 0.0 {
            (self.cost * 100.0).round() as u64
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelApiError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("label rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// External label issuance. One call per eligible draft; calls are never
/// retried and never cancelled once started.
#[async_trait]
pub trait LabelIssuanceApi: Send + Sync {
    async fn create_label(&self, request: &LabelRequest) -> Result<LabelResponse, LabelApiError>;
}
