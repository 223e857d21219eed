//! Resolver configuration
//!
//! Loaded from YAML; every field is optional. Durations are whole seconds.
//!
//! ```yaml
//! database: refdata
//! write_timeout: 3600
//! read_timeout: 30
//! cleanup_batch_size: 5000
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Logical database name sessions are opened against
    pub database: String,
    /// Deadline on each bulk-ingest write
    #[serde(with = "seconds")]
    pub write_timeout: Duration,
    /// Deadline on a whole lookup call; unbounded when absent
    #[serde(with = "optional_seconds")]
    pub read_timeout: Option<Duration>,
    #[serde(with = "seconds")]
    pub cleanup_timeout: Duration,
    /// Nodes deleted per internal cleanup transaction
    pub cleanup_batch_size: usize,
    /// Worker count the CLI uses when none is given
    pub default_workers: usize,
    /// Reject overlapping or inverted attribute intervals at ingest
    pub validate_timelines: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            database: "neo4j".to_string(),
            write_timeout: Duration::from_secs(60 * 60),
            read_timeout: None,
            cleanup_timeout: Duration::from_secs(5 * 60),
            cleanup_batch_size: 10_000,
            default_workers: 4,
            validate_timelines: true,
        }
    }
}

impl ResolverConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}

mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod optional_seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|secs| secs.map(Duration::from_secs))
    }
}
