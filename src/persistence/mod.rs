//! Persistence with integrity checks
//!
//! Features:
//! - Versioned JSON envelope with optional expiry
//! - Namespace schema and envelope shape validation
//! - Write-through read cache
//! - Corrupt data reads as absent, never as an error

pub mod envelope;
pub mod manager;
pub mod namespace;
pub mod validation;

pub use envelope::{Envelope, StorageOptions};
pub use manager::{CacheStats, StorageManager};
pub use namespace::{Namespace, NamespaceState};
pub use validation::{is_known_namespace, is_well_formed_envelope, matches_schema};
