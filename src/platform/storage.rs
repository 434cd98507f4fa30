//! Physical key-value media
//!
//! The storage manager only needs a synchronous string-to-string store.
//! On the web that is `window.localStorage`; everywhere else (native runs,
//! tests) it is an in-memory map with an optional quota.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use crate::error::StorageError;

/// Synchronous, size-bounded text key-value store
pub trait StorageMedium {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory medium.
///
/// Share one instance (behind `Rc`) between several managers to model
/// several tabs of the same origin.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    items: RefCell<BTreeMap<String, String>>,
    /// Total bytes (keys + values) allowed, like the ~5MB LocalStorage limit
    quota: Option<usize>,
    unavailable: Cell<bool>,
    reads: Cell<u64>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Medium that rejects writes once `bytes` would be exceeded
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    /// Simulate storage being disabled (private mode, blocked cookies)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    /// Number of `get_item` calls served so far
    pub fn read_count(&self) -> u64 {
        self.reads.get()
    }

    /// Read a key without counting it as a medium read
    pub fn raw_get(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    /// Write a key directly, bypassing quota and availability
    pub fn raw_set(&self, key: &str, value: &str) {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    pub fn keys(&self) -> Vec<String> {
        self.items.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    fn used_bytes_excluding(&self, key: &str) -> usize {
        self.items
            .borrow()
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.get() {
            return Err(StorageError::Unavailable {
                reason: "storage disabled".to_string(),
            });
        }
        Ok(())
    }
}

impl StorageMedium for MemoryMedium {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_available()?;
        self.reads.set(self.reads.get() + 1);
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_available()?;
        if let Some(quota) = self.quota {
            let used = self.used_bytes_excluding(key);
            let needed = key.len() + value.len();
            let available = quota.saturating_sub(used);
            if needed > available {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available,
                });
            }
        }
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.check_available()?;
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// `window.localStorage`
#[cfg(target_arch = "wasm32")]
pub struct LocalStorageMedium {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorageMedium {
    /// Open the window's LocalStorage, if the browser exposes one
    pub fn open() -> Result<Self, StorageError> {
        let storage = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable {
                reason: "no window".to_string(),
            })?
            .local_storage()
            .map_err(|e| StorageError::Unavailable {
                reason: format!("{e:?}"),
            })?
            .ok_or_else(|| StorageError::Unavailable {
                reason: "localStorage is null".to_string(),
            })?;
        Ok(Self { storage })
    }

    fn medium_error(key: &str, err: wasm_bindgen::JsValue) -> StorageError {
        StorageError::Medium {
            key: key.to_string(),
            reason: format!("{err:?}"),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl StorageMedium for LocalStorageMedium {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|e| Self::medium_error(key, e))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| Self::medium_error(key, e))
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.storage
            .remove_item(key)
            .map_err(|e| Self::medium_error(key, e))
    }
}
