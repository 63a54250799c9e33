//! Value object trait: equality by value, not identity.
//!
//! Weights, dimensions and addresses are value objects: two package
//! dimensions with the same measurements are the same dimensions.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one with the new values.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct Dimensions { length: f64, width: f64, height: f64 }
///
/// impl ValueObject for Dimensions {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
