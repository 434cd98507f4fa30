//! Composition root
//!
//! One `StorageManager` per tab, shared by reference with every store.

use std::rc::Rc;

use crate::config::StorageConfig;
use crate::persistence::StorageManager;
use crate::platform::{Clock, StorageMedium};
use crate::stores::{AuthStore, CredentialStore, PointStore, WithdrawalStore};

pub struct App {
    pub storage: Rc<StorageManager>,
    pub credentials: Rc<CredentialStore>,
    pub auth: AuthStore,
    pub points: PointStore,
    pub withdrawals: WithdrawalStore,
}

impl App {
    /// Initialize storage, then hydrate every store from it
    pub fn new(medium: Rc<dyn StorageMedium>, clock: Rc<dyn Clock>, config: StorageConfig) -> Self {
        let storage = Rc::new(StorageManager::new(medium, clock, config));
        if !storage.initialize() {
            log::warn!("Storage unavailable, running with in-memory defaults");
        }
        Self::with_storage(storage)
    }

    pub fn with_storage(storage: Rc<StorageManager>) -> Self {
        let credentials = Rc::new(CredentialStore::new(Rc::clone(&storage)));
        Self {
            auth: AuthStore::new(Rc::clone(&storage), Rc::clone(&credentials)),
            points: PointStore::new(Rc::clone(&storage)),
            withdrawals: WithdrawalStore::new(Rc::clone(&storage)),
            credentials,
            storage,
        }
    }

    /// App over `window.localStorage` on the real clock
    #[cfg(target_arch = "wasm32")]
    pub fn in_browser(config: StorageConfig) -> Result<Self, crate::error::StorageError> {
        let medium = crate::platform::LocalStorageMedium::open()?;
        Ok(Self::new(
            Rc::new(medium),
            Rc::new(crate::platform::SystemClock),
            config,
        ))
    }
}
