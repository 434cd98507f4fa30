//! Withdrawal requests and their review lifecycle

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::{PersistedState, new_id};
use crate::persistence::{Namespace, NamespaceState, StorageManager};
use crate::types::{PaymentDetails, PaymentMethod, ProcessedBy, WithdrawalRequest, WithdrawalStatus};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WithdrawalState {
    pub requests: Vec<WithdrawalRequest>,
}

impl NamespaceState for WithdrawalState {
    const NAMESPACE: Namespace = Namespace::Withdrawals;
}

/// Request fields supplied by the worker
#[derive(Debug, Clone, PartialEq)]
pub struct NewWithdrawal {
    pub worker_id: String,
    pub worker_name: String,
    pub amount: i64,
    pub payment_method: PaymentMethod,
    pub payment_details: PaymentDetails,
}

pub struct WithdrawalStore {
    inner: PersistedState<WithdrawalState>,
}

impl WithdrawalStore {
    pub fn new(storage: Rc<StorageManager>) -> Self {
        Self {
            inner: PersistedState::new(storage, WithdrawalState::default()),
        }
    }

    /// File a new pending request (newest first)
    pub fn add_request(&self, new: NewWithdrawal) -> WithdrawalRequest {
        let request = WithdrawalRequest {
            id: new_id(),
            worker_id: new.worker_id,
            worker_name: new.worker_name,
            amount: new.amount,
            payment_method: new.payment_method,
            status: WithdrawalStatus::Pending,
            timestamp: self.inner.timestamp(),
            payment_details: new.payment_details,
            admin_comment: None,
            processed_at: None,
            processed_by: None,
        };
        let entry = request.clone();
        self.inner.update(move |s| s.requests.insert(0, entry));
        request
    }

    /// Record an admin decision. Returns false if no request has `id`
    /// or the change was not persisted.
    pub fn update_status(
        &self,
        id: &str,
        status: WithdrawalStatus,
        admin_id: &str,
        admin_name: &str,
        comment: Option<&str>,
    ) -> bool {
        let processed_at = self.inner.timestamp();
        self.inner.update_if(|s| {
            let Some(request) = s.requests.iter_mut().find(|r| r.id == id) else {
                log::warn!("No withdrawal request {id}");
                return false;
            };
            request.status = status;
            request.admin_comment = comment.map(str::to_string);
            request.processed_at = Some(processed_at);
            request.processed_by = Some(ProcessedBy {
                id: admin_id.to_string(),
                name: admin_name.to_string(),
            });
            true
        })
    }

    pub fn requests(&self) -> Vec<WithdrawalRequest> {
        self.inner.read(|s| s.requests.clone())
    }

    pub fn requests_by_worker(&self, worker_id: &str) -> Vec<WithdrawalRequest> {
        self.inner.read(|s| {
            s.requests
                .iter()
                .filter(|r| r.worker_id == worker_id)
                .cloned()
                .collect()
        })
    }

    pub fn pending_requests(&self) -> Vec<WithdrawalRequest> {
        self.inner.read(|s| {
            s.requests
                .iter()
                .filter(|r| r.status == WithdrawalStatus::Pending)
                .cloned()
                .collect()
        })
    }

    pub fn clear_requests(&self) -> bool {
        self.inner.replace(WithdrawalState::default())
    }
}
