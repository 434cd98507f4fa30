//! Storage configuration
//!
//! Everything has a default; `from_json` applies overrides such as a
//! different key prefix for a staging build.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::{DEFAULT_VERSION, KEY_PREFIX};
use crate::error::StorageError;
use crate::persistence::Namespace;

/// A namespace registered at initialization, with the state it is seeded
/// with when the medium has no entry for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceSpec {
    pub namespace: Namespace,
    #[serde(default = "empty_object")]
    pub seed: Value,
}

impl NamespaceSpec {
    /// Seeded with an empty object
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            seed: empty_object(),
        }
    }

    pub fn with_seed(namespace: Namespace, seed: Value) -> Self {
        Self { namespace, seed }
    }
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

/// Storage manager configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// Prepended to every namespace to form the physical key
    pub prefix: String,
    /// Throwaway key written and removed to probe the medium
    pub probe_key: String,
    /// Envelope version when a write does not specify one
    pub default_version: u32,
    /// Namespaces seeded by `initialize`
    pub namespaces: Vec<NamespaceSpec>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            prefix: KEY_PREFIX.to_string(),
            probe_key: format!("{KEY_PREFIX}__probe"),
            default_version: DEFAULT_VERSION,
            namespaces: Namespace::ALL.into_iter().map(NamespaceSpec::new).collect(),
        }
    }
}

impl StorageConfig {
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Physical key for a namespace
    pub fn physical_key(&self, namespace: Namespace) -> String {
        format!("{}{}", self.prefix, namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.prefix, "pointmoney_");
        assert_eq!(config.default_version, 1);
        assert_eq!(config.namespaces.len(), Namespace::ALL.len());
        assert!(config.namespaces.iter().all(|spec| spec.seed == json!({})));
        assert_eq!(
            config.physical_key(Namespace::Auth),
            "pointmoney_auth-storage"
        );
    }

    #[test]
    fn test_from_json_partial_override() {
        let config = StorageConfig::from_json(
            r#"{"prefix": "staging_", "namespaces": [{"namespace": "point-storage", "seed": {"transactions": []}}]}"#,
        )
        .unwrap();
        assert_eq!(config.prefix, "staging_");
        assert_eq!(config.default_version, 1);
        assert_eq!(
            config.namespaces,
            vec![NamespaceSpec::with_seed(
                Namespace::Points,
                json!({"transactions": []})
            )]
        );
        assert_eq!(config.physical_key(Namespace::Points), "staging_point-storage");
    }

    #[test]
    fn test_from_json_rejects_unknown_namespace() {
        let err = StorageConfig::from_json(r#"{"namespaces": [{"namespace": "bogus"}]}"#);
        assert!(matches!(err, Err(StorageError::Parse { .. })));
    }

    #[test]
    fn test_seed_defaults_to_empty_object() {
        let config =
            StorageConfig::from_json(r#"{"namespaces": [{"namespace": "auth-storage"}]}"#).unwrap();
        assert_eq!(config.namespaces[0], NamespaceSpec::new(Namespace::Auth));
    }
}
