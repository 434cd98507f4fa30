//! StorageManager: namespaced envelopes over a physical medium
//!
//! One manager per tab. It owns the medium handle, a read cache of parsed
//! envelopes and the `SyncBus` that announces every successful write. The
//! public API never fails loudly: reads fall back to the caller's default,
//! writes report `false`, and the reason goes to the log.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use super::envelope::{Envelope, StorageOptions};
use super::namespace::{Namespace, NamespaceState};
use super::validation::matches_schema;
use crate::config::{NamespaceSpec, StorageConfig};
use crate::error::StorageError;
use crate::platform::{Clock, StorageMedium, SystemClock};
use crate::sync::{SyncBus, SyncEvent, translate_medium_event};

/// Cache usage counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads served from the cache
    pub hits: u64,
    /// Reads that went to the medium
    pub misses: u64,
    /// Namespaces currently cached
    pub entries: usize,
}

impl CacheStats {
    /// Hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub struct StorageManager {
    medium: Rc<dyn StorageMedium>,
    clock: Rc<dyn Clock>,
    config: StorageConfig,
    cache: RefCell<HashMap<Namespace, Envelope>>,
    initialized: Cell<bool>,
    bus: SyncBus,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl StorageManager {
    pub fn new(medium: Rc<dyn StorageMedium>, clock: Rc<dyn Clock>, config: StorageConfig) -> Self {
        Self {
            medium,
            clock,
            config,
            cache: RefCell::new(HashMap::new()),
            initialized: Cell::new(false),
            bus: SyncBus::new(),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    /// Manager on the system clock with the default configuration
    pub fn with_medium(medium: Rc<dyn StorageMedium>) -> Self {
        Self::new(medium, Rc::new(SystemClock), StorageConfig::default())
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn bus(&self) -> &SyncBus {
        &self.bus
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    /// Current time from the manager's clock (epoch ms)
    pub fn now(&self) -> f64 {
        self.clock.now_millis()
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            entries: self.cache.borrow().len(),
        }
    }

    /// Probe the medium and seed the configured namespaces
    pub fn initialize(&self) -> bool {
        self.initialize_with(&self.config.namespaces)
    }

    /// Probe the medium and seed `namespaces` that have no entry yet.
    ///
    /// Idempotent. If the probe fails the manager stays uninitialized and
    /// the next operation tries again.
    pub fn initialize_with(&self, namespaces: &[NamespaceSpec]) -> bool {
        if self.initialized.get() {
            return true;
        }

        if let Err(e) = self.probe() {
            log::error!("Storage initialization failed: {e}");
            return false;
        }

        for spec in namespaces {
            match self.seed(spec) {
                Ok(true) => log::info!("Seeded {}", spec.namespace),
                Ok(false) => {}
                Err(e) => log::warn!("Failed to seed {}: {e}", spec.namespace),
            }
        }

        self.initialized.set(true);
        log::info!("Storage initialized ({} namespaces)", namespaces.len());
        true
    }

    /// Read a namespace's state, or `default` if it is unknown, absent,
    /// corrupt or expired
    pub fn get(&self, key: &str, default: Value) -> Value {
        let Some(namespace) = self.namespace_for(key) else {
            return default;
        };
        self.fetch(namespace).unwrap_or(default)
    }

    /// Replace a namespace's state. Returns false, leaving storage
    /// untouched, if the namespace is unknown, the value does not match
    /// its schema, or the medium rejects the write.
    pub fn set(&self, key: &str, value: Value, options: StorageOptions) -> bool {
        let Some(namespace) = self.namespace_for(key) else {
            return false;
        };
        if !self.ensure_ready() {
            return false;
        }
        match self.write(namespace, value, options) {
            Ok(()) => true,
            Err(e @ StorageError::SchemaMismatch { .. }) => {
                log::warn!("Storage set rejected: {e}");
                false
            }
            Err(e) => {
                log::error!("Storage set error: {e}");
                false
            }
        }
    }

    /// Delete a namespace's entry. Removing an absent entry succeeds.
    pub fn remove(&self, key: &str) -> bool {
        let Some(namespace) = self.namespace_for(key) else {
            return false;
        };
        if !self.ensure_ready() {
            return false;
        }
        match self.delete(namespace) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Storage remove error: {e}");
                false
            }
        }
    }

    /// Remove every known namespace. Keys outside the prefix are untouched.
    pub fn clear(&self) {
        if !self.ensure_ready() {
            return;
        }
        for namespace in Namespace::ALL {
            if let Err(e) = self.delete(namespace) {
                log::error!("Storage clear error on {namespace}: {e}");
            }
        }
        self.cache.borrow_mut().clear();
    }

    /// Re-read every namespace from the medium and re-announce the valid ones
    pub fn sync(&self) {
        if !self.ensure_ready() {
            return;
        }
        let now = self.now();
        for namespace in Namespace::ALL {
            match self.read_medium(namespace) {
                Ok(Some(envelope)) if !envelope.is_expired(now) => {
                    let event = SyncEvent::new(namespace, envelope.data.clone());
                    self.cache.borrow_mut().insert(namespace, envelope);
                    self.bus.publish(&event);
                }
                Ok(_) => {}
                Err(e) => log::warn!("Storage sync skipped {namespace}: {e}"),
            }
        }
    }

    /// Handle a change another tab made to the medium.
    ///
    /// `key`/`new_value` are the physical key and raw text of the change
    /// (a `None` key means the whole medium was cleared). The cache entry
    /// is dropped and, for a valid write, the new state is republished.
    pub fn apply_external_change(&self, key: Option<&str>, new_value: Option<&str>) {
        let Some(raw_key) = key else {
            log::debug!("Medium cleared externally, dropping cache");
            self.cache.borrow_mut().clear();
            return;
        };
        let Some(namespace) = raw_key
            .strip_prefix(self.config.prefix.as_str())
            .and_then(Namespace::from_key)
        else {
            return;
        };

        self.cache.borrow_mut().remove(&namespace);
        if let Some(event) =
            translate_medium_event(&self.config.prefix, key, new_value, self.now())
        {
            log::debug!("External change to {namespace}");
            self.bus.publish(&event);
        }
    }

    /// Typed read: the namespace's state, or `default` if it is missing or
    /// does not deserialize into `S`
    pub fn load<S: NamespaceState>(&self, default: S) -> S {
        let Some(value) = self.fetch(S::NAMESPACE) else {
            return default;
        };
        match serde_json::from_value(value) {
            Ok(state) => state,
            Err(e) => {
                log::debug!("Stored {} state not usable ({e}), using default", S::NAMESPACE);
                default
            }
        }
    }

    /// Typed write of a namespace's whole state
    pub fn save<S: NamespaceState>(&self, state: &S, options: StorageOptions) -> bool {
        match serde_json::to_value(state) {
            Ok(value) => self.set(S::NAMESPACE.as_str(), value, options),
            Err(e) => {
                log::error!("Failed to serialize {} state: {e}", S::NAMESPACE);
                false
            }
        }
    }

    fn namespace_for(&self, key: &str) -> Option<Namespace> {
        let namespace = Namespace::from_key(key);
        if namespace.is_none() {
            log::warn!("{}", StorageError::UnknownNamespace { key: key.to_string() });
        }
        namespace
    }

    fn ensure_ready(&self) -> bool {
        self.initialized.get() || self.initialize()
    }

    fn probe(&self) -> Result<(), StorageError> {
        self.medium.set_item(&self.config.probe_key, "test")?;
        self.medium.remove_item(&self.config.probe_key)
    }

    /// Write the seed envelope if the namespace has no entry.
    /// Seeds skip schema checks and are not announced.
    fn seed(&self, spec: &NamespaceSpec) -> Result<bool, StorageError> {
        let key = self.config.physical_key(spec.namespace);
        if self.medium.get_item(&key)?.is_some() {
            return Ok(false);
        }
        let options = StorageOptions {
            version: Some(self.config.default_version),
            ..StorageOptions::default()
        };
        let envelope = Envelope::wrap(spec.seed.clone(), &options, self.now());
        self.medium.set_item(&key, &envelope.serialize()?)?;
        Ok(true)
    }

    fn fetch(&self, namespace: Namespace) -> Option<Value> {
        if !self.ensure_ready() {
            return None;
        }
        match self.read(namespace) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Ignoring stored {namespace}: {e}");
                None
            }
        }
    }

    fn read(&self, namespace: Namespace) -> Result<Option<Value>, StorageError> {
        let now = self.now();
        {
            let mut cache = self.cache.borrow_mut();
            if let Some(envelope) = cache.get(&namespace) {
                if !envelope.is_expired(now) {
                    self.hits.set(self.hits.get() + 1);
                    log::debug!("Cache hit for {namespace}");
                    return Ok(Some(envelope.data.clone()));
                }
                cache.remove(&namespace);
            }
        }

        self.misses.set(self.misses.get() + 1);
        let Some(envelope) = self.read_medium(namespace)? else {
            return Ok(None);
        };
        if envelope.is_expired(now) {
            log::debug!("Stored {namespace} expired");
            return Ok(None);
        }
        let data = envelope.data.clone();
        self.cache.borrow_mut().insert(namespace, envelope);
        Ok(Some(data))
    }

    fn read_medium(&self, namespace: Namespace) -> Result<Option<Envelope>, StorageError> {
        let key = self.config.physical_key(namespace);
        match self.medium.get_item(&key)? {
            Some(text) => Envelope::deserialize(&text).map(Some),
            None => Ok(None),
        }
    }

    fn write(
        &self,
        namespace: Namespace,
        value: Value,
        mut options: StorageOptions,
    ) -> Result<(), StorageError> {
        if !matches_schema(namespace, &value) {
            return Err(StorageError::SchemaMismatch {
                namespace: namespace.to_string(),
            });
        }
        options.version = options
            .version
            .filter(|&v| v != 0)
            .or(Some(self.config.default_version));

        let event = SyncEvent::new(namespace, value.clone());
        let envelope = Envelope::wrap(value, &options, self.now());
        self.medium
            .set_item(&self.config.physical_key(namespace), &envelope.serialize()?)?;
        self.cache.borrow_mut().insert(namespace, envelope);

        self.bus.publish(&event);
        Ok(())
    }

    fn delete(&self, namespace: Namespace) -> Result<(), StorageError> {
        self.medium
            .remove_item(&self.config.physical_key(namespace))?;
        self.cache.borrow_mut().remove(&namespace);
        Ok(())
    }
}
