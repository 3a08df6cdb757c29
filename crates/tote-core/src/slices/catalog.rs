//! # Catalog Slice
//!
//! Product list and detail. Both requests share one status flag and one
//! `last_error`, so "list loading" and "detail loading" look the same while
//! both are in flight.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::request::{Operation, Outcome, RequestError, RequestSeq, RequestStatus, StaleResponsePolicy};
use crate::types::Product;

/// Mutations accepted by the catalog slice.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogAction {
    FetchAllPending,
    FetchAllFulfilled { seq: RequestSeq, products: Vec<Product> },
    FetchAllRejected { seq: RequestSeq, error: RequestError },
    FetchByIdPending,
    FetchByIdFulfilled { seq: RequestSeq, product: Product },
    FetchByIdRejected { seq: RequestSeq, error: RequestError },
    ClearSelectedProduct,
}

/// Product catalog state. Never persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogState {
    /// Products in server order.
    pub items: Vec<Product>,
    pub selected_product: Option<Product>,
    pub request_status: RequestStatus,
    pub last_error: Option<RequestError>,

    #[serde(skip)]
    #[ts(skip)]
    latest_list: RequestSeq,

    #[serde(skip)]
    #[ts(skip)]
    latest_detail: RequestSeq,
}

impl CatalogState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest_list(&self) -> RequestSeq {
        self.latest_list
    }

    pub fn latest_detail(&self) -> RequestSeq {
        self.latest_detail
    }

    pub fn reduce(&mut self, action: CatalogAction, policy: StaleResponsePolicy) -> Outcome {
        match action {
            CatalogAction::FetchAllPending => {
                self.latest_list = self.latest_list.next();
                self.begin();
                Outcome::Applied
            }
            CatalogAction::FetchByIdPending => {
                self.latest_detail = self.latest_detail.next();
                self.begin();
                Outcome::Applied
            }
            CatalogAction::FetchAllFulfilled { seq, products } => {
                if let Some(stale) = stale(Operation::FetchAllProducts, self.latest_list, seq, policy) {
                    return stale;
                }
                self.items = products;
                self.request_status = RequestStatus::Idle;
                Outcome::Applied
            }
            CatalogAction::FetchByIdFulfilled { seq, product } => {
                if let Some(stale) = stale(Operation::FetchProductById, self.latest_detail, seq, policy) {
                    return stale;
                }
                self.selected_product = Some(product);
                self.request_status = RequestStatus::Idle;
                Outcome::Applied
            }
            CatalogAction::FetchAllRejected { seq, error } => {
                if let Some(stale) = stale(Operation::FetchAllProducts, self.latest_list, seq, policy) {
                    return stale;
                }
                self.fail(error);
                Outcome::Applied
            }
            CatalogAction::FetchByIdRejected { seq, error } => {
                if let Some(stale) = stale(Operation::FetchProductById, self.latest_detail, seq, policy) {
                    return stale;
                }
                self.fail(error);
                Outcome::Applied
            }
            CatalogAction::ClearSelectedProduct => {
                let had_selection = self.selected_product.take().is_some();
                Outcome::changed(had_selection)
            }
        }
    }

    fn begin(&mut self) {
        self.request_status = RequestStatus::Pending;
        self.last_error = None;
    }

    fn fail(&mut self, error: RequestError) {
        self.request_status = RequestStatus::Rejected;
        self.last_error = Some(error);
    }
}

fn stale(
    operation: Operation,
    latest: RequestSeq,
    response: RequestSeq,
    policy: StaleResponsePolicy,
) -> Option<Outcome> {
    if policy.accepts(latest, response) {
        None
    } else {
        Some(Outcome::Stale {
            operation,
            response,
            latest,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
