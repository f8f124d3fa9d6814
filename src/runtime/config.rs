//! Harvester configuration.

use serde::{Deserialize, Serialize};

/// Replies buffered per subscriber before a slow subscriber starts lagging.
pub const DEFAULT_REPLY_CAPACITY: usize = 1024;

/// Runtime settings of a harvester.
///
/// Missing fields fall back to their defaults when deserialized, so the
/// struct can be embedded in a larger application config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvesterConfig {
    /// Name recorded on the harvester's tracing span.
    pub label: String,

    /// Capacity of the reply broadcast channel. Must be non-zero.
    pub reply_capacity: usize,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            label: "harvester".to_string(),
            reply_capacity: DEFAULT_REPLY_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let config: HarvesterConfig = serde_json::from_str(r#"{ "label": "auth" }"#).unwrap();

        assert_eq!(config.label, "auth");
        assert_eq!(config.reply_capacity, DEFAULT_REPLY_CAPACITY);
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = HarvesterConfig {
            label: "search".to_string(),
            reply_capacity: 8,
        };

        let json = serde_json::to_string(&config).unwrap();
        let deserialized: HarvesterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
