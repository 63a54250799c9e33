//! Weights, units and package dimensions.
//!
//! The canonical mass unit is the pound: package weights are stored in pounds
//! and every item weight is converted before it is summed.

use serde::{Deserialize, Serialize};

use shipalloc_core::ValueObject;

const OUNCES_PER_POUND: f64 = 16.0;
const GRAMS_PER_POUND: f64 = 453.592_37;

/// Unit an item weight is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[serde(alias = "oz", alias = "ounces")]
    Ounce,
    #[serde(alias = "lb", alias = "lbs", alias = "pounds")]
    Pound,
    #[serde(alias = "g", alias = "grams")]
    Gram,
    #[serde(alias = "kg", alias = "kilograms")]
    Kilogram,
}

impl WeightUnit {
    fn pounds_per_unit(self) -> f64 {
        match self {
            WeightUnit::Ounce => 1.0 / OUNCES_PER_POUND,
            WeightUnit::Pound => 1.0,
            WeightUnit::Gram => 1.0 / GRAMS_PER_POUND,
            WeightUnit::Kilogram => 1000.0 / GRAMS_PER_POUND,
        }
    }
}

/// A mass with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weight {
    pub value: f64,
    pub unit: WeightUnit,
}

impl ValueObject for Weight {}

impl Weight {
    pub fn new(value: f64, unit: WeightUnit) -> Self {
        Self { value, unit }
    }

    pub fn ounces(value: f64) -> Self {
        Self::new(value, WeightUnit::Ounce)
    }

    pub fn pounds(value: f64) -> Self {
        Self::new(value, WeightUnit::Pound)
    }

    /// Value converted to the canonical unit (pounds), unrounded.
    pub fn in_pounds(&self) -> f64 {
        self.value * self.unit.pounds_per_unit()
    }
}

/// Package dimensions in inches.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl ValueObject for Dimensions {}

impl Dimensions {
    pub fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.length, self.width, self.height]
            .iter()
            .all(|d| d.is_finite() && *d >= 0.0)
    }
}

/// Round to 2 decimal places (half away from zero).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
