//! Tape latency configuration.
//!
//! Configuration is a list of `key=value` lines. Recognized keys are `readDelay` and `writeDelay`,
//! both in milliseconds. Missing or malformed settings fall back to zero and never fail loading.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use log;
use serde::de::value::{Error as ValueError, MapDeserializer};
use serde::{Deserialize, Deserializer};

/// Per-operation tape delays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LatencyConfig {
    /// Delay applied before each read.
    #[serde(deserialize_with = "millis_or_zero")]
    pub read_delay: Duration,
    /// Delay applied before each write.
    #[serde(deserialize_with = "millis_or_zero")]
    pub write_delay: Duration,
}

impl LatencyConfig {
    pub fn new(read_delay: Duration, write_delay: Duration) -> Self {
        LatencyConfig {
            read_delay,
            write_delay,
        }
    }

    /// Loads configuration from a file. An unreadable file yields zero delays.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(err) => {
                log::warn!("latency config {} not loaded, using zero delays: {}", path.display(), err);
                LatencyConfig::default()
            }
        }
    }

    /// Parses configuration text. Unknown keys are ignored, the last occurrence of a key wins.
    pub fn parse(content: &str) -> Self {
        let settings: BTreeMap<String, String> = content
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
            .collect();

        return match LatencyConfig::deserialize(MapDeserializer::<_, ValueError>::new(settings.into_iter())) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("latency config malformed, using zero delays: {}", err);
                LatencyConfig::default()
            }
        };
    }
}

fn millis_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let millis = match raw.parse::<u64>() {
        Ok(millis) => millis,
        Err(err) => {
            log::warn!("delay value {:?} ignored: {}", raw, err);
            0
        }
    };

    return Ok(Duration::from_millis(millis));
}
