//! Versioned JSON envelope
//!
//! Every namespace is persisted as
//! `{"data": <state>, "timestamp": <ms>, "version": <n>, "expires"?: <ms>}`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validation::is_well_formed_envelope;
use crate::consts::DEFAULT_VERSION;
use crate::error::StorageError;

/// Per-write options
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StorageOptions {
    /// Time after which the envelope reads as absent
    pub expires: Option<Duration>,
    /// Schema version recorded in the envelope (`None` or 0 means the default)
    pub version: Option<u32>,
}

impl StorageOptions {
    pub fn expires_in(duration: Duration) -> Self {
        Self {
            expires: Some(duration),
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }
}

/// Persisted wrapper around a namespace's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub data: Value,
    /// Write time, epoch milliseconds
    pub timestamp: f64,
    pub version: u32,
    /// Lifetime in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
}

impl Envelope {
    /// Wrap `data` as written at `now`
    pub fn wrap(data: Value, options: &StorageOptions, now: f64) -> Self {
        Self {
            data,
            timestamp: now,
            version: options.version.filter(|&v| v != 0).unwrap_or(DEFAULT_VERSION),
            // Sub-millisecond lifetimes stay fractional so they never read as 0
            expires: options.expires.map(|d| d.as_nanos() as f64 / 1_000_000.0),
        }
    }

    /// Expired iff a non-zero lifetime is set and `now` is past it
    pub fn is_expired(&self, now: f64) -> bool {
        match self.expires {
            Some(expires) if expires > 0.0 => now > self.timestamp + expires,
            _ => false,
        }
    }

    pub fn serialize(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse stored text, requiring a well-formed envelope
    pub fn deserialize(text: &str) -> Result<Self, StorageError> {
        let raw: Value = serde_json::from_str(text)?;
        if !is_well_formed_envelope(&raw) {
            return Err(StorageError::MalformedEnvelope);
        }
        // Numeric but non-integral versions land here
        serde_json::from_value(raw).map_err(|_| StorageError::MalformedEnvelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wrap_defaults() {
        let env = Envelope::wrap(json!({"transactions": []}), &StorageOptions::default(), 42.0);
        assert_eq!(env.timestamp, 42.0);
        assert_eq!(env.version, 1);
        assert_eq!(env.expires, None);
    }

    #[test]
    fn test_wrap_with_options() {
        let options = StorageOptions::expires_in(Duration::from_millis(10)).with_version(3);
        let env = Envelope::wrap(json!({}), &options, 0.0);
        assert_eq!(env.version, 3);
        assert_eq!(env.expires, Some(10.0));
    }

    #[test]
    fn test_expiry_boundary() {
        let env = Envelope::wrap(
            json!({}),
            &StorageOptions::expires_in(Duration::from_millis(10)),
            100.0,
        );
        assert!(!env.is_expired(100.0));
        assert!(!env.is_expired(110.0));
        assert!(env.is_expired(110.5));
    }

    #[test]
    fn test_zero_expiry_never_expires() {
        let env = Envelope::wrap(
            json!({}),
            &StorageOptions::expires_in(Duration::ZERO),
            0.0,
        );
        assert!(!env.is_expired(f64::MAX));
    }

    #[test]
    fn test_sub_millisecond_expiry_still_expires() {
        let env = Envelope::wrap(
            json!({}),
            &StorageOptions::expires_in(Duration::from_micros(500)),
            100.0,
        );
        assert_eq!(env.expires, Some(0.5));
        assert!(!env.is_expired(100.5));
        assert!(env.is_expired(101.0));
        assert!(env.is_expired(1_000_100.0));
    }

    #[test]
    fn test_zero_version_uses_default() {
        let env = Envelope::wrap(json!({}), &StorageOptions::default().with_version(0), 0.0);
        assert_eq!(env.version, DEFAULT_VERSION);
    }

    #[test]
    fn test_serialized_layout() {
        let env = Envelope::wrap(json!({"requests": []}), &StorageOptions::default(), 5.0);
        let value: Value = serde_json::from_str(&env.serialize().unwrap()).unwrap();
        assert_eq!(value, json!({"data": {"requests": []}, "timestamp": 5.0, "version": 1}));
    }

    #[test]
    fn test_deserialize_rejects_corrupt_text() {
        assert!(matches!(
            Envelope::deserialize("{oops"),
            Err(StorageError::Parse { .. })
        ));
        assert!(matches!(
            Envelope::deserialize(r#"{"timestamp": 1, "version": 1}"#),
            Err(StorageError::MalformedEnvelope)
        ));
        assert!(matches!(
            Envelope::deserialize(r#"{"data": {}, "timestamp": 1, "version": 1.5}"#),
            Err(StorageError::MalformedEnvelope)
        ));
    }

    #[test]
    fn test_deserialize_accepts_integer_timestamps() {
        let env = Envelope::deserialize(
            r#"{"data": {"credentials": {}}, "timestamp": 1700000000000, "version": 1, "expires": 60000}"#,
        )
        .unwrap();
        assert_eq!(env.timestamp, 1_700_000_000_000.0);
        assert_eq!(env.expires, Some(60_000.0));
    }
}
