//! Point transaction ledger (newest first)

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::{PersistedState, new_id};
use crate::persistence::{Namespace, NamespaceState, StorageManager};
use crate::types::{PointTransaction, TransactionType};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointState {
    pub transactions: Vec<PointTransaction>,
}

impl NamespaceState for PointState {
    const NAMESPACE: Namespace = Namespace::Points;
}

/// Transaction fields supplied by the caller; ID and timestamp are assigned
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub worker_id: String,
    pub worker_name: String,
    pub admin_id: String,
    pub admin_name: String,
    pub amount: i64,
    pub kind: TransactionType,
    pub reason: String,
}

pub struct PointStore {
    inner: PersistedState<PointState>,
}

impl PointStore {
    pub fn new(storage: Rc<StorageManager>) -> Self {
        Self {
            inner: PersistedState::new(storage, PointState::default()),
        }
    }

    /// Record a transaction at the head of the ledger
    pub fn add_transaction(&self, new: NewTransaction) -> PointTransaction {
        let transaction = PointTransaction {
            id: new_id(),
            worker_id: new.worker_id,
            worker_name: new.worker_name,
            admin_id: new.admin_id,
            admin_name: new.admin_name,
            amount: new.amount,
            kind: new.kind,
            timestamp: self.inner.timestamp(),
            reason: new.reason,
        };
        let entry = transaction.clone();
        self.inner.update(move |s| s.transactions.insert(0, entry));
        transaction
    }

    pub fn clear_transactions(&self) -> bool {
        self.inner.replace(PointState::default())
    }

    pub fn transactions(&self) -> Vec<PointTransaction> {
        self.inner.read(|s| s.transactions.clone())
    }

    pub fn transactions_for_worker(&self, worker_id: &str) -> Vec<PointTransaction> {
        self.inner.read(|s| {
            s.transactions
                .iter()
                .filter(|t| t.worker_id == worker_id)
                .cloned()
                .collect()
        })
    }
}
