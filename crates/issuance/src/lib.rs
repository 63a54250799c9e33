//! `shipalloc-issuance`
//!
//! **Responsibility:** turning validated shipment drafts into purchased
//! labels through an external Label Issuance API, plus the read-only order
//! and carrier sources the session is built from.

pub mod api;
pub mod carrier;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod in_memory;
pub mod source;

pub use api::{LabelAddress, LabelApiError, LabelIssuanceApi, LabelPackage, LabelRequest, LabelResponse};
pub use carrier::{Carrier, CarrierDirectory, CarrierService, PackageType};
pub use config::{ConfigError, LabelApiConfig};
pub use coordinator::{
    AllocatedItem, BatchFailure, BatchOutcome, DraftAttempt, LabelIssuanceCoordinator, LabelResult,
    build_request,
};
pub use error::IssuanceError;
pub use http::HttpLabelApi;
pub use in_memory::InMemoryLabelApi;
pub use source::{CarrierSource, OrderSource, SourceError, StaticSource};
