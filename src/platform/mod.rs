//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Time (`Date.now()` on web, `SystemTime` natively)
//! - Storage (LocalStorage on web, in-memory elsewhere)
//! - Window events (cross-tab `storage` notifications, `CustomEvent` dispatch)

pub mod storage;
pub mod time;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use storage::{MemoryMedium, StorageMedium};
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorageMedium;
pub use time::{Clock, ManualClock, SystemClock, iso_timestamp};
