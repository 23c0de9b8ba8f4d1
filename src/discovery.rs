//! Fixture discovery over the wireless medium.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;

use crate::errors::Error;
use crate::identity::{self, LightAddress, LightIdentity};
use crate::transport::Transport;

type Result<T> = std::result::Result<T, Error>;

/// Scan for manageable fixtures.
///
/// A candidate qualifies when its advertised name matches a known
/// fixture-name pattern, or its address appears in the operator-supplied
/// whitelist (for fixtures with non-conforming names). Candidates are
/// deduplicated by address within the scan; repeated sightings keep the
/// strongest signal reading.
///
/// Each invocation is a fresh scan. An unavailable adapter surfaces as
/// [`Error::Discovery`]; it is not fatal to the engine.
pub async fn scan_for_lights<T: Transport>(
    transport: &T,
    duration: Duration,
    whitelist: &[LightAddress],
) -> Result<Vec<LightIdentity>> {
    let sighted = transport.scan(duration).await?;
    debug!("scan finished: {} advertisement(s)", sighted.len());

    let mut candidates: HashMap<LightAddress, LightIdentity> = HashMap::new();
    for ad in sighted {
        let name = ad.name.as_deref().unwrap_or_default();
        let qualified =
            identity::matches_fixture_name(name) || whitelist.contains(&ad.address);
        if !qualified {
            continue;
        }
        candidates
            .entry(ad.address.clone())
            .and_modify(|existing| {
                if ad.rssi.is_some() {
                    existing.rssi = existing.rssi.max(ad.rssi);
                }
            })
            .or_insert_with(|| LightIdentity::new(name, ad.address.clone(), ad.rssi));
    }

    debug!("{} candidate fixture(s) after filtering", candidates.len());
    Ok(candidates.into_values().collect())
}
