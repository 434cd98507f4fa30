//! PointMoney - client-side persistent state for a points/withdrawal tracker
//!
//! Core modules:
//! - `persistence`: Namespaced, versioned envelopes in a key-value medium (StorageManager)
//! - `sync`: Change notifications between store instances and browser tabs
//! - `platform`: Browser/native abstraction (clock, LocalStorage, window events)
//! - `stores`: Domain stores (credentials, auth, points, withdrawals)
//! - `config`: Storage configuration

pub mod app;
pub mod config;
pub mod error;
pub mod persistence;
pub mod platform;
pub mod stores;
pub mod sync;
pub mod types;

pub use app::App;
pub use config::{NamespaceSpec, StorageConfig};
pub use error::{StorageError, StoreError};
pub use persistence::{
    CacheStats, Envelope, Namespace, NamespaceState, StorageManager, StorageOptions,
};
pub use sync::{Subscription, SyncBus, SyncEvent};

/// Store-wide constants
pub mod consts {
    /// Prefix applied to every namespace key in the physical medium
    pub const KEY_PREFIX: &str = "pointmoney_";
    /// Envelope schema version when the caller does not pick one
    pub const DEFAULT_VERSION: u32 = 1;
    /// Name of the in-process synchronization event
    pub const SYNC_EVENT: &str = "storageSync";
    /// Prefix of the per-namespace event re-dispatched for store bindings
    pub const STORE_EVENT_PREFIX: &str = "zustand-";
}
