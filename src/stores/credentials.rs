//! Login credentials
//!
//! Stored in their own namespace so verifying a password never loads user
//! profiles. Passwords are kept as given (no hashing).

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::PersistedState;
use crate::persistence::{Namespace, NamespaceState, StorageManager};

pub const ADMIN_LOGIN_ID: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";

/// Login ID -> password
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialState {
    pub credentials: BTreeMap<String, String>,
    #[serde(default)]
    pub initialized: bool,
}

impl Default for CredentialState {
    fn default() -> Self {
        Self {
            credentials: BTreeMap::from([(ADMIN_LOGIN_ID.to_string(), ADMIN_PASSWORD.to_string())]),
            initialized: false,
        }
    }
}

impl NamespaceState for CredentialState {
    const NAMESPACE: Namespace = Namespace::Credentials;
}

pub struct CredentialStore {
    inner: PersistedState<CredentialState>,
}

impl CredentialStore {
    pub fn new(storage: Rc<StorageManager>) -> Self {
        Self {
            inner: PersistedState::new(storage, CredentialState::default()),
        }
    }

    pub fn verify(&self, login_id: &str, password: &str) -> bool {
        self.inner
            .read(|s| s.credentials.get(login_id).is_some_and(|p| p == password))
    }

    pub fn contains(&self, login_id: &str) -> bool {
        self.inner.read(|s| s.credentials.contains_key(login_id))
    }

    pub fn add(&self, login_id: &str, password: &str) -> bool {
        self.inner.update(|s| {
            s.credentials
                .insert(login_id.to_string(), password.to_string());
        })
    }

    pub fn remove(&self, login_id: &str) -> bool {
        self.inner
            .update_if(|s| s.credentials.remove(login_id).is_some())
    }

    pub fn credentials(&self) -> BTreeMap<String, String> {
        self.inner.read(|s| s.credentials.clone())
    }

    /// Back to the built-in admin account only
    pub fn reset(&self) -> bool {
        self.inner.replace(CredentialState::default())
    }
}
