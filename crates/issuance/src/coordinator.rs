//! Label issuance for a draft set.
//!
//! Eligible drafts are submitted strictly one after another. The first
//! failure stops the batch: labels issued before it stay issued (they were
//! paid for) and the remaining drafts are never attempted. Partial success
//! is a value ([`BatchOutcome`]), not an exception path. A coordinator runs
//! at most one batch at a time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use shipalloc_core::{AggregateRoot, DomainResult, DraftId, ExpectedVersion, OrderItemId};
use shipalloc_shipping::{DraftSet, ShipmentDraft, ShippingAddress, eligible_drafts};

use crate::api::{LabelAddress, LabelIssuanceApi, LabelPackage, LabelRequest};
use crate::carrier::{Carrier, CarrierDirectory};
use crate::error::IssuanceError;

/// Item quantities a label was bought for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatedItem {
    pub item_id: OrderItemId,
    pub sku: String,
    pub product_name: String,
    pub quantity: i64,
}

/// A purchased label.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelResult {
    pub draft_id: DraftId,
    pub draft_name: String,
    pub tracking_number: String,
    pub label_url: String,
    /// Cost in smallest currency unit (e.g., cents).
    pub cost: u64,
    pub carrier_name: String,
    pub items: Vec<AllocatedItem>,
    pub issued_at: DateTime<Utc>,
}

/// One submitted draft and what happened to it.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftAttempt {
    pub draft_id: DraftId,
    pub result: Result<LabelResult, IssuanceError>,
}

/// Result of a batch: attempts up to and including the first failure, plus
/// the drafts that were never tried.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchOutcome {
    /// Version of the draft set the batch was built from.
    pub set_version: u64,
    pub attempts: Vec<DraftAttempt>,
    pub untried: Vec<DraftId>,
}

/// A batch that stopped early.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    /// Labels issued before the failure; not rolled back.
    pub labels: Vec<LabelResult>,
    pub failed_draft: DraftId,
    pub error: IssuanceError,
    pub untried: Vec<DraftId>,
}

impl BatchOutcome {
    pub fn labels(&self) -> impl Iterator<Item = &LabelResult> {
        self.attempts.iter().filter_map(|a| a.result.as_ref().ok())
    }

    /// The failing draft and its error, if the batch stopped early.
    pub fn failure(&self) -> Option<(DraftId, &IssuanceError)> {
        self.attempts
            .iter()
            .find_map(|a| a.result.as_ref().err().map(|e| (a.draft_id, e)))
    }

    pub fn is_complete(&self) -> bool {
        self.failure().is_none()
    }

    pub fn into_result(self) -> Result<Vec<LabelResult>, BatchFailure> {
        let mut labels = Vec::with_capacity(self.attempts.len());
        for attempt in self.attempts {
            match attempt.result {
                Ok(label) => labels.push(label),
                Err(error) => {
                    return Err(BatchFailure {
                        labels,
                        failed_draft: attempt.draft_id,
                        error,
                        untried: self.untried,
                    });
                }
            }
        }
        Ok(labels)
    }

    /// Record the outcome on the draft set: issued drafts become submitted,
    /// the failing draft becomes failed, untried drafts stay editable.
    ///
    /// `set` must be the version that was submitted; a set edited since then
    /// is a conflict.
    pub fn apply_to(&self, set: &DraftSet) -> DomainResult<DraftSet> {
        set.check_version(ExpectedVersion::Exact(self.set_version))?;
        self.attempts
            .iter()
            .try_fold(set.clone(), |set, attempt| match &attempt.result {
                Ok(label) => set.mark_submitted(attempt.draft_id, label.tracking_number.clone()),
                Err(error) => set.mark_failed(attempt.draft_id, error.to_string()),
            })
    }
}

pub struct LabelIssuanceCoordinator<A: LabelIssuanceApi> {
    api: A,
    carriers: CarrierDirectory,
    /// Held for the whole batch.
    in_flight: Mutex<()>,
}

impl<A: LabelIssuanceApi> LabelIssuanceCoordinator<A> {
    pub fn new(api: A, carriers: CarrierDirectory) -> Self {
        Self {
            api,
            carriers,
            in_flight: Mutex::new(()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn carriers(&self) -> &CarrierDirectory {
        &self.carriers
    }

    /// Validate, then submit every eligible draft of `set` in order.
    ///
    /// Validation problems return `Err` before any label is bought, and so
    /// does a call made while another batch is still running
    /// ([`IssuanceError::BatchInProgress`]). Once submission starts the
    /// result is always `Ok(BatchOutcome)`; inspect [`BatchOutcome::failure`]
    /// for a partial batch. `on_label` runs right after each purchase, before
    /// the next draft is tried.
    ///
    /// A recipient name missing from `shipping_address` falls back to the
    /// order's customer name.
    pub async fn submit<F>(
        &self,
        set: &DraftSet,
        shipping_address: &ShippingAddress,
        mut on_label: F,
    ) -> Result<BatchOutcome, IssuanceError>
    where
        F: FnMut(&LabelResult),
    {
        let Ok(_batch) = self.in_flight.try_lock() else {
            warn!(order_id = %set.id(), "submission rejected: a batch is already running");
            return Err(IssuanceError::BatchInProgress);
        };

        let issues = set.validate();
        if !issues.is_empty() {
            warn!(order_id = %set.id(), issues = issues.len(), "submission blocked by validation");
            return Err(IssuanceError::Validation(issues));
        }

        let address = LabelAddress::from_address(shipping_address, set.customer_name());
        let queue: Vec<&ShipmentDraft> = eligible_drafts(set.drafts()).collect();
        info!(order_id = %set.id(), drafts = queue.len(), "submitting label batch");

        let mut outcome = BatchOutcome {
            set_version: set.version(),
            ..BatchOutcome::default()
        };
        for (idx, draft) in queue.iter().enumerate() {
            let result = self.issue(set, draft, &address).await;
            let failed = result.is_err();

            match &result {
                Ok(label) => {
                    info!(
                        draft_id = %draft.id_typed(),
                        draft = draft.display_name(),
                        tracking_number = %label.tracking_number,
                        "label issued"
                    );
                    on_label(label);
                }
                Err(err) => {
                    error!(
                        draft_id = %draft.id_typed(),
                        draft = draft.display_name(),
                        error = %err,
                        "label batch stopped"
                    );
                }
            }

            outcome.attempts.push(DraftAttempt {
                draft_id: draft.id_typed(),
                result,
            });

            if failed {
                outcome.untried = queue[idx + 1..].iter().map(|d| d.id_typed()).collect();
                break;
            }
        }

        Ok(outcome)
    }

    async fn issue(
        &self,
        set: &DraftSet,
        draft: &ShipmentDraft,
        address: &LabelAddress,
    ) -> Result<LabelResult, IssuanceError> {
        let carrier = draft
            .carrier_id()
            .and_then(|id| self.carriers.find(id))
            .ok_or_else(|| IssuanceError::CarrierNotFound {
                draft: draft.display_name().to_string(),
                carrier_id: draft.carrier_id().cloned(),
            })?;

        let request = build_request(set, draft, carrier, address);
        let response = self
            .api
            .create_label(&request)
            .await
            .map_err(|source| IssuanceError::LabelApi {
                draft: draft.display_name().to_string(),
                source,
            })?;

        Ok(LabelResult {
            draft_id: draft.id_typed(),
            draft_name: draft.display_name().to_string(),
            cost: response.cost_cents(),
            tracking_number: response.tracking_number,
            label_url: response.label_url,
            carrier_name: carrier.friendly_name.clone(),
            items: snapshot_items(set, draft),
            issued_at: Utc::now(),
        })
    }
}

/// Carrier-agnostic label request for one draft.
pub fn build_request(
    set: &DraftSet,
    draft: &ShipmentDraft,
    carrier: &Carrier,
    address: &LabelAddress,
) -> LabelRequest {
    LabelRequest {
        order_id: set.id().clone(),
        carrier_code: carrier.carrier_code.clone(),
        service_code: draft.service_code().unwrap_or_default().to_string(),
        packages: draft.packages().iter().map(LabelPackage::from).collect(),
        shipping_address: address.clone(),
        notes: draft.notes().to_string(),
    }
}

fn snapshot_items(set: &DraftSet, draft: &ShipmentDraft) -> Vec<AllocatedItem> {
    draft
        .lines()
        .iter()
        .filter_map(|line| {
            let item = set.items().iter().find(|i| i.id == line.item_id)?;
            Some(AllocatedItem {
                item_id: item.id.clone(),
                sku: item.sku.clone(),
                product_name: item.product_name.clone(),
                quantity: line.quantity,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use shipalloc_core::{CarrierId, OrderId};
    use shipalloc_shipping::{Order, OrderItem, PackageDefaults, ShipmentMode, Weight};

    use crate::api::{LabelApiError, LabelResponse};
    use crate::carrier::CarrierService;
    use crate::in_memory::InMemoryLabelApi;

    fn test_order() -> Order {
        Order {
            id: OrderId::new("ord-1"),
            order_number: "#1001".to_string(),
            customer_name: "Jane Doe".to_string(),
            customer_email: None,
            shipping_address: ShippingAddress {
                address1: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                zip: "12345".to_string(),
                province: "Illinois".to_string(),
                province_code: "il".to_string(),
                country_code: "us".to_string(),
                ..ShippingAddress::default()
            },
            items: vec![OrderItem {
                id: OrderItemId::new("x"),
                sku: "SKU-X".to_string(),
                product_name: "Widget".to_string(),
                quantity_ordered: 12,
                unit_price: 1500,
                weight_per_unit: Some(Weight::ounces(2.0)),
            }],
        }
    }

    fn directory() -> CarrierDirectory {
        CarrierDirectory::new(vec![Carrier {
            carrier_id: CarrierId::new("se-1"),
            carrier_code: "stamps_com".to_string(),
            friendly_name: "USPS".to_string(),
            services: vec![CarrierService {
                service_code: "usps_priority_mail".to_string(),
                name: "Priority Mail".to_string(),
            }],
            package_types: vec![],
        }])
    }

    /// Split set with `carriers.len()` drafts of 3 units each; the last
    /// draft takes whatever remains.
    fn split_set(carriers: &[&str]) -> DraftSet {
        let order = test_order();
        let mut set = DraftSet::new(
            &order,
            ShipmentMode::Split,
            PackageDefaults::default().with_package_type("package"),
        )
        .unwrap();
        for _ in 1..carriers.len() {
            set = set.add_draft().0;
        }
        let ids: Vec<DraftId> = set.drafts().iter().map(|d| d.id_typed()).collect();
        let x = OrderItemId::new("x");
        for (idx, (id, carrier)) in ids.iter().zip(carriers).enumerate() {
            set = if idx + 1 == ids.len() {
                set.allocate_remaining(*id).unwrap()
            } else {
                set.allocate(*id, &x, 3).unwrap()
            };
            set = set
                .select_carrier(*id, CarrierId::new(*carrier))
                .unwrap()
                .select_service(*id, "usps_priority_mail")
                .unwrap()
                .set_notes(*id, format!("note {idx}"))
                .unwrap()
                .distribute(*id, 1)
                .unwrap();
        }
        set
    }

    fn address() -> ShippingAddress {
        let order = test_order();
        order.shipping_address.normalized(&order.customer_name)
    }

    #[tokio::test]
    async fn submits_every_draft_in_order() {
        let set = split_set(&["se-1", "se-1", "se-1"]);
        let coordinator = LabelIssuanceCoordinator::new(InMemoryLabelApi::new().with_cost(7.5), directory());

        let mut opened = Vec::new();
        let outcome = coordinator
            .submit(&set, &address(), |label| opened.push(label.tracking_number.clone()))
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(opened, vec!["DRY00000001", "DRY00000002", "DRY00000003"]);

        let labels = outcome.into_result().unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[0].draft_name, "Shipment 1");
        assert_eq!(labels[0].cost, 750);
        assert_eq!(labels[0].carrier_name, "USPS");
        assert_eq!(labels[2].items[0].quantity, 6);

        let requests = coordinator.api().requests();
        assert_eq!(requests[0].carrier_code, "stamps_com");
        assert_eq!(requests[0].shipping_address.name, "Jane Doe");
        assert_eq!(requests[0].shipping_address.province_code, "IL");
        assert_eq!(requests[1].notes, "note 1");
        assert_eq!(requests[0].packages[0].weight, 0.38);
    }

    #[tokio::test]
    async fn stops_at_first_missing_carrier() {
        let set = split_set(&["se-1", "se-1", "gone", "se-1"]);
        let coordinator = LabelIssuanceCoordinator::new(InMemoryLabelApi::new(), directory());

        let outcome = coordinator.submit(&set, &address(), |_| {}).await.unwrap();

        assert_eq!(outcome.labels().count(), 2);
        let (failed, err) = outcome.failure().unwrap();
        assert_eq!(failed, set.drafts()[2].id_typed());
        assert_eq!(err.to_string(), "Carrier not found for Shipment 3");
        assert_eq!(outcome.untried, vec![set.drafts()[3].id_typed()]);
        assert_eq!(coordinator.api().requests().len(), 2);
    }

    #[tokio::test]
    async fn api_failure_keeps_earlier_labels() {
        let set = split_set(&["se-1", "se-1", "se-1"]);
        let coordinator = LabelIssuanceCoordinator::new(InMemoryLabelApi::new().fail_on_call(2), directory());

        let failure = coordinator
            .submit(&set, &address(), |_| {})
            .await
            .unwrap()
            .into_result()
            .unwrap_err();

        assert_eq!(failure.labels.len(), 1);
        assert_eq!(failure.failed_draft, set.drafts()[1].id_typed());
        assert!(matches!(
            &failure.error,
            IssuanceError::LabelApi { draft, source: LabelApiError::Rejected { status: 422, .. } }
                if draft == "Shipment 2"
        ));
        assert_eq!(failure.untried, vec![set.drafts()[2].id_typed()]);
    }

    #[tokio::test]
    async fn validation_failure_makes_no_calls() {
        let set = split_set(&["se-1", "se-1"]);
        let first = set.drafts()[0].id_typed();
        let set = set.set_quantity(first, &OrderItemId::new("x"), 1).unwrap();
        let coordinator = LabelIssuanceCoordinator::new(InMemoryLabelApi::new(), directory());

        let mut opened = 0;
        let err = coordinator
            .submit(&set, &address(), |_| opened += 1)
            .await
            .unwrap_err();

        assert!(matches!(err, IssuanceError::Validation(ref issues) if issues.len() == 1));
        assert_eq!(opened, 0);
        assert!(coordinator.api().requests().is_empty());
    }

    #[tokio::test]
    async fn empty_drafts_are_skipped() {
        let set = split_set(&["se-1"]);
        let (set, _) = set.add_draft();
        let coordinator = LabelIssuanceCoordinator::new(InMemoryLabelApi::new(), directory());

        let outcome = coordinator.submit(&set, &address(), |_| {}).await.unwrap();
        assert_eq!(outcome.attempts.len(), 1);
        assert!(outcome.untried.is_empty());
    }

    #[tokio::test]
    async fn applied_outcome_freezes_drafts_and_resubmission_skips_them() {
        let set = split_set(&["se-1", "se-1", "se-1"]);
        let coordinator = LabelIssuanceCoordinator::new(InMemoryLabelApi::new().fail_on_call(2), directory());

        let outcome = coordinator.submit(&set, &address(), |_| {}).await.unwrap();
        let set = outcome.apply_to(&set).unwrap();

        let statuses: Vec<_> = set
            .drafts()
            .iter()
            .map(|d| set.status(d.id_typed()).unwrap())
            .collect();
        use shipalloc_shipping::DraftStatus::*;
        assert_eq!(statuses, vec![Submitted, Failed, Valid]);

        let retry = LabelIssuanceCoordinator::new(InMemoryLabelApi::new(), directory());
        let outcome = retry.submit(&set, &address(), |_| {}).await.unwrap();
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(outcome.attempts[0].draft_id, set.drafts()[2].id_typed());
    }

    #[tokio::test]
    async fn missing_recipient_name_falls_back_to_customer() {
        let set = split_set(&["se-1"]);
        let raw = test_order().shipping_address;
        assert!(raw.name.is_none());
        let coordinator = LabelIssuanceCoordinator::new(InMemoryLabelApi::new(), directory());

        coordinator.submit(&set, &raw, |_| {}).await.unwrap();

        let requests = coordinator.api().requests();
        assert_eq!(requests[0].shipping_address.name, "Jane Doe");
        assert_eq!(requests[0].shipping_address.country_code, "US");
    }

    #[tokio::test]
    async fn outcome_cannot_be_applied_to_an_edited_set() {
        let set = split_set(&["se-1", "se-1"]);
        let coordinator = LabelIssuanceCoordinator::new(InMemoryLabelApi::new().fail_on_call(1), directory());

        let outcome = coordinator.submit(&set, &address(), |_| {}).await.unwrap();
        assert_eq!(outcome.set_version, set.version());

        let untried = outcome.untried[0];
        let edited = set.set_notes(untried, "fragile").unwrap();
        assert!(matches!(
            outcome.apply_to(&edited),
            Err(shipalloc_core::DomainError::Conflict(_))
        ));
        assert!(outcome.apply_to(&set).is_ok());
    }

    /// Records call start and end around a short delay.
    struct SlowApi {
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl LabelIssuanceApi for SlowApi {
        async fn create_label(&self, request: &LabelRequest) -> Result<LabelResponse, LabelApiError> {
            self.log.lock().unwrap().push(format!("start {}", request.notes));
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.log.lock().unwrap().push(format!("end {}", request.notes));
            Ok(LabelResponse {
                tracking_number: request.notes.clone(),
                label_url: String::new(),
                cost: 1.0,
            })
        }
    }

    #[tokio::test]
    async fn overlapping_submission_is_rejected() {
        let set = split_set(&["se-1"]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let coordinator = LabelIssuanceCoordinator::new(SlowApi { log: log.clone() }, directory());
        let address = address();

        let (first, second) = tokio::join!(
            coordinator.submit(&set, &address, |_| {}),
            coordinator.submit(&set, &address, |_| {}),
        );

        assert_eq!(first.unwrap().labels().count(), 1);
        assert_eq!(second.unwrap_err(), IssuanceError::BatchInProgress);
        assert_eq!(*log.lock().unwrap(), vec!["start note 0", "end note 0"]);

        let again = coordinator.submit(&set, &address, |_| {}).await.unwrap();
        assert_eq!(again.labels().count(), 1);
    }

    /// Logs API calls and callbacks into one shared timeline.
    struct TimelineApi {
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl LabelIssuanceApi for TimelineApi {
        async fn create_label(&self, request: &LabelRequest) -> Result<LabelResponse, LabelApiError> {
            let mut log = self.log.lock().unwrap();
            log.push(format!("call {}", request.notes));
            Ok(LabelResponse {
                tracking_number: request.notes.clone(),
                label_url: String::new(),
                cost: 0.0,
            })
        }
    }

    #[tokio::test]
    async fn label_callback_runs_before_next_draft() {
        let set = split_set(&["se-1", "se-1"]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let coordinator = LabelIssuanceCoordinator::new(TimelineApi { log: log.clone() }, directory());

        coordinator
            .submit(&set, &address(), |label| {
                log.lock().unwrap().push(format!("open {}", label.tracking_number));
            })
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["call note 0", "open note 0", "call note 1", "open note 1"]
        );
    }
}
