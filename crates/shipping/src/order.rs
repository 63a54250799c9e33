//! Order snapshot as returned by the order source.
//!
//! The order is the immutable source of truth for a session: quantities
//! ordered never change while drafts are being built.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use shipalloc_core::{DomainError, DomainResult, Entity, OrderId, OrderItemId, ValueObject};

use crate::measure::Weight;

/// One line item of the source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub sku: String,
    pub product_name: String,
    #[serde(rename = "quantity")]
    pub quantity_ordered: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    #[serde(default)]
    pub weight_per_unit: Option<Weight>,
}

impl Entity for OrderItem {
    type Id = OrderItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Destination address as stored on the order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub name: Option<String>,
    pub address1: String,
    #[serde(default)]
    pub address2: Option<String>,
    pub city: String,
    pub zip: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub province_code: String,
    pub country_code: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ValueObject for ShippingAddress {}

impl ShippingAddress {
    /// Carrier-ready copy: fields trimmed, codes upper-cased, blank optionals
    /// dropped, and the recipient name falling back to `fallback_name`.
    pub fn normalized(&self, fallback_name: &str) -> ShippingAddress {
        let name = non_blank(self.name.as_deref()).unwrap_or_else(|| fallback_name.trim().to_string());

        ShippingAddress {
            name: Some(name),
            address1: self.address1.trim().to_string(),
            address2: non_blank(self.address2.as_deref()),
            city: self.city.trim().to_string(),
            zip: self.zip.trim().to_string(),
            province: self.province.trim().to_string(),
            province_code: self.province_code.trim().to_ascii_uppercase(),
            country_code: self.country_code.trim().to_ascii_uppercase(),
            phone: non_blank(self.phone.as_deref()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Order as fetched (once per session) from the order source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderItem>,
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Order {
    pub fn item(&self, item_id: &OrderItemId) -> Option<&OrderItem> {
        self.items.iter().find(|i| &i.id == item_id)
    }

    /// Reject snapshots the allocation engine cannot work with.
    pub fn ensure_well_formed(&self) -> DomainResult<()> {
        let mut seen = HashSet::new();
        for item in &self.items {
            if !seen.insert(&item.id) {
                return Err(DomainError::validation(format!(
                    "duplicate order item id {}",
                    item.id
                )));
            }
            if item.quantity_ordered < 0 {
                return Err(DomainError::validation(format!(
                    "order item {} has negative quantity",
                    item.id
                )));
            }
            if let Some(w) = item.weight_per_unit {
                if !(w.value.is_finite() && w.value >= 0.0) {
                    return Err(DomainError::validation(format!(
                        "order item {} has an invalid weight",
                        item.id
                    )));
                }
            }
        }
        Ok(())
    }
}
