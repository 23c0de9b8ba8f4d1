//! In-memory record of one managed fixture.

use serde::{Deserialize, Serialize};

use crate::config::LightPreferences;
use crate::identity::{LightAddress, LightIdentity, ProtocolVariant};
use crate::parameters::LightParameters;
use crate::protocol::PowerChannelStatus;
use crate::types::TemperatureRange;

/// Lifecycle state of a light's logical connection.
///
/// A transient disconnect only regresses this state; the entity itself
/// survives until explicitly removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Identity known, no transport link.
    Discovered,
    /// A link establishment attempt is in flight.
    Connecting,
    /// Link live and subscribed to notifications; eligible for commands.
    Connected,
    /// Link lost, or never established after exhausting retries.
    Disconnected,
    /// Deleted from the managed set; terminal.
    Removed,
}

/// Mutable per-fixture record, owned exclusively by the session manager.
///
/// External components never hold a reference into the managed set; they
/// read [`LightSnapshot`] copies instead.
#[derive(Debug, Clone)]
pub struct LightEntity {
    pub(crate) identity: LightIdentity,
    pub(crate) state: ConnectionState,
    pub(crate) preferences: LightPreferences,
    /// Most recent successfully-sent state, replayed on reconnect.
    pub(crate) last_parameters: Option<LightParameters>,
    /// Distinguishes "user turned this off" from "never configured".
    pub(crate) manually_toggled_off: bool,
    /// Raw decoded status from the last notification, display only.
    pub(crate) power_and_channel: Option<PowerChannelStatus>,
}

impl LightEntity {
    pub fn new(identity: LightIdentity, preferences: LightPreferences) -> Self {
        LightEntity {
            identity,
            state: ConnectionState::Discovered,
            preferences,
            last_parameters: None,
            manually_toggled_off: false,
            power_and_channel: None,
        }
    }

    pub fn address(&self) -> &LightAddress {
        &self.identity.address
    }

    pub fn variant(&self) -> ProtocolVariant {
        self.identity.variant
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Custom name if set, otherwise the advertised name.
    pub fn display_name(&self) -> &str {
        self.preferences
            .custom_name
            .as_deref()
            .unwrap_or(&self.identity.name)
    }

    /// The CCT bounds this fixture accepts (custom override or default).
    pub fn temperature_range(&self) -> TemperatureRange {
        self.preferences
            .custom_temperature_range
            .unwrap_or_default()
    }

    /// Read-only copy handed to external callers.
    pub fn snapshot(&self) -> LightSnapshot {
        LightSnapshot {
            address: self.identity.address.clone(),
            display_name: self.display_name().to_string(),
            variant: self.identity.variant,
            state: self.state,
            rssi: self.identity.rssi,
            current_parameters: self.last_parameters.clone(),
            power_and_channel: self.power_and_channel,
        }
    }
}

/// Point-in-time copy of a light's externally visible state.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightSnapshot {
    pub address: LightAddress,
    pub display_name: String,
    pub variant: ProtocolVariant,
    pub state: ConnectionState,
    pub rssi: Option<i16>,
    pub current_parameters: Option<LightParameters>,
    pub power_and_channel: Option<PowerChannelStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str) -> LightEntity {
        LightEntity::new(
            LightIdentity::new(name, LightAddress::new("AA:00"), Some(-40)),
            LightPreferences::default(),
        )
    }

    #[test]
    fn display_name_prefers_custom() {
        let mut e = entity("NEEWER-SL90");
        assert_eq!(e.display_name(), "NEEWER-SL90");
        e.preferences.custom_name = Some("Fill light".into());
        assert_eq!(e.display_name(), "Fill light");
    }

    #[test]
    fn temperature_range_falls_back_to_default() {
        let mut e = entity("NEEWER-SL90");
        assert_eq!(e.temperature_range(), TemperatureRange::default());
        e.preferences.custom_temperature_range = TemperatureRange::create(27, 65);
        assert_eq!(e.temperature_range().max(), 65);
    }

    #[test]
    fn snapshot_reflects_entity() {
        let mut e = entity("NEEWER-Infinity TL60");
        e.last_parameters = Some(LightParameters::cct(56, 50));
        let snap = e.snapshot();
        assert_eq!(snap.variant, ProtocolVariant::InfinityStyle);
        assert_eq!(snap.state, ConnectionState::Discovered);
        assert_eq!(snap.current_parameters, Some(LightParameters::cct(56, 50)));
    }
}
