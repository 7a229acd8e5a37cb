// Connection settings and pool bounds

use super::error::{ConfigError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Key holding the target database in a `ConnectionConfig`
pub const DATABASE_KEY: &str = "database";

const REDACTED_KEYS: &[&str] = &["password"];

/// Opaque connection parameters (host, port, user, password, database, ...)
///
/// Values are passed through to the driver untouched. Per-plugin copies are
/// made with `with_database`; the caller's map is never modified.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ConnectionConfig(BTreeMap<String, String>);

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn database(&self) -> Option<&str> {
        self.get(DATABASE_KEY)
    }

    /// Copy of this config pointing at another database
    pub fn with_database(&self, database: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.0.insert(DATABASE_KEY.to_string(), database.into());
        copy
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ConnectionConfig
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.0 {
            if REDACTED_KEYS.contains(&key.as_str()) {
                map.entry(key, &"***");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

/// Connection pool bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSize {
    min: u32,
    max: u32,
}

impl PoolSize {
    /// `max` must be positive and `min <= max`; `min` may be zero
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if max == 0 || min > max {
            return Err(ConfigError::InvalidPoolSize { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }
}

impl Default for PoolSize {
    fn default() -> Self {
        Self { min: 1, max: 20 }
    }
}
