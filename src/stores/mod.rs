//! Domain stores
//!
//! Each store owns one namespace: it hydrates from the `StorageManager`
//! once, writes its whole state back on every mutation, and replaces its
//! in-memory state with whatever a sync event for its namespace carries
//! (last write wins, no merge).

pub mod auth;
pub mod credentials;
pub mod points;
pub mod withdrawals;

pub use auth::{AuthState, AuthStore, ProfileUpdate, Registration};
pub use credentials::{CredentialState, CredentialStore};
pub use points::{NewTransaction, PointState, PointStore};
pub use withdrawals::{NewWithdrawal, WithdrawalState, WithdrawalStore};

use std::cell::RefCell;
use std::rc::Rc;

use uuid::Uuid;

use crate::persistence::{NamespaceState, StorageManager, StorageOptions};
use crate::platform::iso_timestamp;
use crate::sync::Subscription;

/// In-memory state of one namespace, kept in step with storage
pub struct PersistedState<S: NamespaceState> {
    storage: Rc<StorageManager>,
    state: Rc<RefCell<S>>,
    subscription: Subscription,
}

impl<S: NamespaceState> PersistedState<S> {
    /// Hydrate from storage (falling back to `initial`) and follow sync events
    pub fn new(storage: Rc<StorageManager>, initial: S) -> Self {
        let state = Rc::new(RefCell::new(storage.load(initial)));
        let target = Rc::downgrade(&state);
        let subscription = storage.bus().subscribe(S::NAMESPACE, move |event| {
            let Some(state) = target.upgrade() else {
                return;
            };
            match serde_json::from_value::<S>(event.value.clone()) {
                Ok(next) => *state.borrow_mut() = next,
                Err(e) => log::debug!("Ignoring {} sync payload: {e}", S::NAMESPACE),
            }
        });
        Self {
            storage,
            state,
            subscription,
        }
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub fn snapshot(&self) -> S {
        self.state.borrow().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Mutate, then persist the whole state. Returns whether it persisted.
    pub fn update(&self, f: impl FnOnce(&mut S)) -> bool {
        self.update_if(|state| {
            f(state);
            true
        })
    }

    /// Like `update`, but `f` reports whether it changed anything;
    /// unchanged state is not written
    pub fn update_if(&self, f: impl FnOnce(&mut S) -> bool) -> bool {
        let next = {
            let mut state = self.state.borrow_mut();
            if !f(&mut state) {
                return false;
            }
            state.clone()
        };
        self.persist(&next)
    }

    pub fn replace(&self, next: S) -> bool {
        *self.state.borrow_mut() = next.clone();
        self.persist(&next)
    }

    /// Current time as an ISO-8601 string
    pub fn timestamp(&self) -> String {
        iso_timestamp(self.storage.now())
    }

    fn persist(&self, state: &S) -> bool {
        // The bus delivers our own write back to us; no borrow may be held here
        let saved = self.storage.save(state, StorageOptions::default());
        if !saved {
            log::warn!("{} changed in memory but was not persisted", S::NAMESPACE);
        }
        saved
    }
}

impl<S: NamespaceState> Drop for PersistedState<S> {
    fn drop(&mut self) {
        self.storage.bus().unsubscribe(self.subscription);
    }
}

/// Random v4 UUID for new records
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_is_v4_uuid() {
        let id = new_id();
        let parsed = Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
        assert_eq!(parsed.to_string(), id);
        assert_ne!(new_id(), id);
    }
}
