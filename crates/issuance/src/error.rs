//! Submission error taxonomy.

use thiserror::Error;

use shipalloc_core::CarrierId;
use shipalloc_shipping::ValidationIssue;

use crate::api::LabelApiError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IssuanceError {
    /// Drafts are not ready; nothing was sent to the label API.
    #[error("shipments are not ready: {}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),

    /// The draft's carrier is no longer in the directory. Fatal for the
    /// rest of the batch.
    #[error("Carrier not found for {draft}")]
    CarrierNotFound {
        draft: String,
        carrier_id: Option<CarrierId>,
    },

    /// Another batch on the same coordinator has not finished yet. Nothing
    /// was sent to the label API.
    #[error("a label batch is already in progress")]
    BatchInProgress,

    /// The label API call failed. Fatal for the rest of the batch; labels
    /// already issued stay issued.
    #[error("Label creation failed for {draft}: {source}")]
    LabelApi {
        draft: String,
        #[source]
        source: LabelApiError,
    },
}

impl IssuanceError {
    /// Display name of the draft the error is about, if any.
    pub fn draft_name(&self) -> Option<&str> {
        match self {
            IssuanceError::Validation(_) | IssuanceError::BatchInProgress => None,
            IssuanceError::CarrierNotFound { draft, .. } | IssuanceError::LabelApi { draft, .. } => {
                Some(draft.as_str())
            }
        }
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
