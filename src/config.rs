//! Engine configuration and the per-light preference contract.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::identity::LightAddress;
use crate::types::TemperatureRange;

/// Global engine configuration, read once at startup.
///
/// The serialized field names match the preference file the external
/// persistence layer maintains.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalConfig {
    /// Retry budget for connection attempts and command writes.
    pub max_connection_attempts: u32,
    /// Connect to matching fixtures as soon as discovery sights them.
    pub auto_connect_on_discover: bool,
    /// Addresses accepted by discovery regardless of advertised name.
    pub whitelisted_addresses: Vec<LightAddress>,
    /// Delay between retry attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Deadline for a single link establishment attempt, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Deadline for a single command write, in milliseconds.
    pub write_timeout_ms: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        GlobalConfig {
            max_connection_attempts: 6,
            auto_connect_on_discover: true,
            whitelisted_addresses: Vec::new(),
            retry_delay_ms: 1_000,
            connect_timeout_ms: 10_000,
            write_timeout_ms: 2_000,
        }
    }
}

impl GlobalConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// Operator preferences for a single fixture, keyed by address.
///
/// Merged into the entity at creation time and persisted back through the
/// [`PreferenceSource`] whenever they change. None of these affect the
/// wire protocol.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LightPreferences {
    /// Display-name override.
    pub custom_name: Option<String>,
    /// CCT bounds override for fixtures wider or narrower than 3200-5600 K.
    pub custom_temperature_range: Option<TemperatureRange>,
    /// Fixture physically supports only CCT mode.
    pub cct_only: bool,
}

impl LightPreferences {
    pub fn is_default(&self) -> bool {
        *self == LightPreferences::default()
    }
}

/// External collaborator that persists per-light preference records.
///
/// The engine reads a record at entity creation and calls back whenever a
/// light's preferences change; the on-disk format is the collaborator's
/// concern.
pub trait PreferenceSource: Send + Sync + 'static {
    fn load(&self, address: &LightAddress) -> Option<LightPreferences>;
    fn persist(&self, address: &LightAddress, preferences: &LightPreferences);
}

/// A [`PreferenceSource`] that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPreferences;

impl PreferenceSource for NoPreferences {
    fn load(&self, _address: &LightAddress) -> Option<LightPreferences> {
        None
    }

    fn persist(&self, _address: &LightAddress, _preferences: &LightPreferences) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipping_policy() {
        let config = GlobalConfig::default();
        assert_eq!(config.max_connection_attempts, 6);
        assert!(config.auto_connect_on_discover);
        assert!(config.whitelisted_addresses.is_empty());
    }

    #[test]
    fn partial_config_files_deserialize() {
        let config: GlobalConfig =
            serde_json::from_str(r#"{"maxConnectionAttempts": 3}"#).unwrap();
        assert_eq!(config.max_connection_attempts, 3);
        assert!(config.auto_connect_on_discover);
    }

    #[test]
    fn preference_record_round_trip() {
        let prefs = LightPreferences {
            custom_name: Some("Key light".into()),
            custom_temperature_range: TemperatureRange::create(27, 65),
            cct_only: false,
        };
        let json = serde_json::to_string(&prefs).unwrap();
        let back: LightPreferences = serde_json::from_str(&json).unwrap();
        assert_eq!(back, prefs);
        assert!(!back.is_default());
    }
}
