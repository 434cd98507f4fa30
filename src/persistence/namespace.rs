//! Storage namespaces and their typed state

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Logical document stored under one physical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Namespace {
    /// Signed-in user and user directory
    #[serde(rename = "auth-storage")]
    Auth,
    /// Login ID -> password map, kept apart from user profiles
    #[serde(rename = "auth-credentials")]
    Credentials,
    /// Point transaction ledger
    #[serde(rename = "point-storage")]
    Points,
    /// Withdrawal requests
    #[serde(rename = "withdrawal-storage")]
    Withdrawals,
}

impl Namespace {
    pub const ALL: [Namespace; 4] = [
        Namespace::Auth,
        Namespace::Credentials,
        Namespace::Points,
        Namespace::Withdrawals,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Auth => "auth-storage",
            Namespace::Credentials => "auth-credentials",
            Namespace::Points => "point-storage",
            Namespace::Withdrawals => "withdrawal-storage",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.as_str() == key)
    }

    /// Top-level fields a state value must carry
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Namespace::Auth => &["user", "users", "isAuthenticated"],
            Namespace::Credentials => &["credentials"],
            Namespace::Points => &["transactions"],
            Namespace::Withdrawals => &["requests"],
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State type persisted under a fixed namespace.
///
/// Gives `StorageManager::load`/`save` a typed view over the JSON document.
pub trait NamespaceState: Serialize + DeserializeOwned + Clone + 'static {
    const NAMESPACE: Namespace;
}
