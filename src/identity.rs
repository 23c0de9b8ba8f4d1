//! Fixture identity, addressing, and protocol variant detection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Hardware address of a fixture (MAC on most platforms, GUID on macOS).
///
/// Addresses are normalized to uppercase so that the same fixture seen
/// through different code paths always hashes to the same entry.
///
/// # Examples
///
/// ```
/// use neewer_lights_rs::LightAddress;
///
/// let addr: LightAddress = "aa:bb:cc:dd:ee:ff".parse().unwrap();
/// assert_eq!(addr.as_str(), "AA:BB:CC:DD:EE:FF");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LightAddress(String);

impl LightAddress {
    pub fn new(raw: &str) -> Self {
        LightAddress(raw.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for LightAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(LightAddress::new(s))
    }
}

impl fmt::Display for LightAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LightAddress {
    fn from(raw: &str) -> Self {
        LightAddress::new(raw)
    }
}

/// The wire dialect a fixture generation speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVariant {
    /// Brightness and hue/temperature travel in a single command.
    LegacyCombined,
    /// Older fixtures that require brightness and hue/temperature as two
    /// independent writes, brightness first.
    LegacySeparate,
    /// Infinity-generation framing: GM axis, extended effect catalog.
    InfinityStyle,
    /// Speaks the Infinity framing but advertises no lighting capability
    /// (remotes, battery handles). Excluded from command targeting.
    InfinityNonLighting,
}

impl ProtocolVariant {
    /// Whether this device can be targeted by lighting commands.
    pub fn is_lighting(self) -> bool {
        !matches!(self, ProtocolVariant::InfinityNonLighting)
    }

    /// Whether the GM (green/magenta) axis is encodable on this variant.
    pub fn supports_gm(self) -> bool {
        matches!(self, ProtocolVariant::InfinityStyle)
    }
}

/// Immutable identity of a discovered or whitelisted fixture.
///
/// Only the signal strength is refreshed by later scans; name, address and
/// detected variant never change for the lifetime of the entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightIdentity {
    /// Name the fixture advertises over the air.
    pub name: String,
    /// Hardware address, unique per fixture.
    pub address: LightAddress,
    /// Signal strength at the last scan that sighted this fixture.
    pub rssi: Option<i16>,
    /// Wire dialect detected from the advertised name.
    pub variant: ProtocolVariant,
}

impl LightIdentity {
    pub fn new(name: &str, address: LightAddress, rssi: Option<i16>) -> Self {
        LightIdentity {
            name: name.to_string(),
            variant: detect_variant(name),
            address,
            rssi,
        }
    }
}

/// Advertised-name prefixes that mark a manageable fixture.
const FIXTURE_PREFIXES: [&str; 3] = ["NEEWER", "NW-", "NWR"];

/// Models that require brightness and hue/temperature as separate writes.
const SEPARATE_COMMAND_MODELS: [&str; 4] = ["SRP16", "SRP18", "WRP18", "ZK-CK"];

/// Infinity-protocol devices without a light head.
const NON_LIGHTING_MODELS: [&str; 2] = ["RC-", "REMOTE"];

/// Whether an advertised name matches a known fixture-name pattern.
///
/// Whitelisted addresses bypass this check entirely (for fixtures with
/// non-conforming names).
pub fn matches_fixture_name(name: &str) -> bool {
    let upper = name.trim().to_uppercase();
    FIXTURE_PREFIXES.iter().any(|p| upper.starts_with(p))
}

/// Detect the wire dialect from the advertised name.
///
/// Unrecognized names fall back to the combined legacy dialect, which every
/// pre-Infinity fixture accepts.
pub fn detect_variant(name: &str) -> ProtocolVariant {
    let upper = name.trim().to_uppercase();
    if NON_LIGHTING_MODELS.iter().any(|m| upper.contains(m)) {
        return ProtocolVariant::InfinityNonLighting;
    }
    if upper.contains("INFINITY") {
        return ProtocolVariant::InfinityStyle;
    }
    if SEPARATE_COMMAND_MODELS.iter().any(|m| upper.contains(m)) {
        return ProtocolVariant::LegacySeparate;
    }
    ProtocolVariant::LegacyCombined
}
