//! In-memory Label Issuance API (dry runs and tests).

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{LabelApiError, LabelIssuanceApi, LabelRequest, LabelResponse};

/// Issues fake labels and records every request it receives.
///
/// Tracking numbers are `DRY` followed by a zero-padded call number. Calls
/// listed with [`InMemoryLabelApi::fail_on_call`] are rejected instead.
#[derive(Debug, Default)]
pub struct InMemoryLabelApi {
    requests: Mutex<Vec<LabelRequest>>,
    failing_calls: HashSet<usize>,
    cost: f64,
}

impl InMemoryLabelApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the `call`-th request (1-based).
    pub fn fail_on_call(mut self, call: usize) -> Self {
        self.failing_calls.insert(call);
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<LabelRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl LabelIssuanceApi for InMemoryLabelApi {
    async fn create_label(&self, request: &LabelRequest) -> Result<LabelResponse, LabelApiError> {
        let call = {
            let mut requests = self
                .requests
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            requests.push(request.clone());
            requests.len()
        };

        if self.failing_calls.contains(&call) {
            return Err(LabelApiError::Rejected {
                status: 422,
                message: format!("label request {call} rejected"),
            });
        }

        let tracking_number = format!("DRY{call:08}");
        Ok(LabelResponse {
            label_url: format!("memory://labels/{tracking_number}.pdf"),
            tracking_number,
            cost: self.cost,
        })
    }
}
