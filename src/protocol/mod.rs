//! Stateless translation between [`LightParameters`] and wire bytes.
//!
//! Every command frame has the shape
//! `[header byte(s), command tag, payload length, payload.., checksum]`
//! where the checksum is the low byte of the sum of all preceding bytes.
//! The legacy dialects use a single `0x78` header byte; Infinity-generation
//! fixtures use the two-byte `0x78 0x8F` header, a wider CCT range, a GM
//! axis, and a larger scene catalog.
//!
//! Encoding validates against the target variant's bounds and fails with
//! [`EncodeError`] before any bytes are produced. Decoding validates the
//! checksum first, so any corrupted byte is reported as a checksum
//! mismatch rather than misparsed.

mod infinity;
mod legacy;

use serde::{Deserialize, Serialize};

use crate::errors::{DecodeError, EncodeError};
use crate::identity::ProtocolVariant;
use crate::parameters::LightParameters;
use crate::types::TemperatureRange;

/// Decoded power/channel status reported by a fixture notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerChannelStatus {
    pub power_on: bool,
    pub channel: u8,
}

/// Low byte of the sum of `bytes` (8-bit wraparound).
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

/// Encode parameters into one or more command frames for `variant`.
///
/// `LegacySeparate` CCT parameters produce two frames (brightness first,
/// then temperature); every other combination produces exactly one.
///
/// # Examples
///
/// ```
/// use neewer_lights_rs::{LightParameters, ProtocolVariant, protocol};
///
/// let frames = protocol::encode(
///     ProtocolVariant::LegacyCombined,
///     &LightParameters::cct(56, 20),
/// )
/// .unwrap();
/// assert_eq!(frames, vec![vec![120, 135, 2, 20, 56, 77]]);
/// ```
pub fn encode(
    variant: ProtocolVariant,
    parameters: &LightParameters,
) -> Result<Vec<Vec<u8>>, EncodeError> {
    match variant {
        ProtocolVariant::LegacyCombined => legacy::encode_combined(parameters),
        ProtocolVariant::LegacySeparate => legacy::encode_separate(parameters),
        ProtocolVariant::InfinityStyle => infinity::encode(parameters),
        ProtocolVariant::InfinityNonLighting => Err(EncodeError::NotALight),
    }
}

/// Encode a protocol-level power toggle.
pub fn encode_power(variant: ProtocolVariant, on: bool) -> Result<Vec<u8>, EncodeError> {
    match variant {
        ProtocolVariant::LegacyCombined | ProtocolVariant::LegacySeparate => {
            Ok(legacy::encode_power(on))
        }
        ProtocolVariant::InfinityStyle => Ok(infinity::encode_power(on)),
        ProtocolVariant::InfinityNonLighting => Err(EncodeError::NotALight),
    }
}

/// Encode a request for the fixture's power/channel status notification.
pub fn encode_status_request(variant: ProtocolVariant) -> Vec<u8> {
    match variant {
        ProtocolVariant::LegacyCombined | ProtocolVariant::LegacySeparate => {
            legacy::encode_status_request()
        }
        ProtocolVariant::InfinityStyle | ProtocolVariant::InfinityNonLighting => {
            infinity::encode_status_request()
        }
    }
}

/// Decode an unsolicited notification into a [`PowerChannelStatus`].
pub fn decode_notification(
    variant: ProtocolVariant,
    raw: &[u8],
) -> Result<PowerChannelStatus, DecodeError> {
    match variant {
        ProtocolVariant::LegacyCombined | ProtocolVariant::LegacySeparate => {
            legacy::decode_notification(raw)
        }
        ProtocolVariant::InfinityStyle | ProtocolVariant::InfinityNonLighting => {
            infinity::decode_notification(raw)
        }
    }
}

/// The CCT temperature span `variant` can express on the wire.
///
/// Preset recall clamps into this range (after the per-light capability
/// clamp); direct encodes reject out-of-range values instead.
pub fn cct_wire_range(variant: ProtocolVariant) -> TemperatureRange {
    match variant {
        ProtocolVariant::LegacyCombined | ProtocolVariant::LegacySeparate => {
            TemperatureRange::from_bounds(legacy::CCT_MIN, legacy::CCT_MAX)
        }
        ProtocolVariant::InfinityStyle | ProtocolVariant::InfinityNonLighting => {
            TemperatureRange::from_bounds(infinity::CCT_MIN, infinity::CCT_MAX)
        }
    }
}

/// Parse a full set of encoded command frames back into parameters.
///
/// The inverse of [`encode`]: `LegacySeparate` CCT expects the two-frame
/// brightness/temperature pair, everything else a single frame.
pub fn decode_parameters(
    variant: ProtocolVariant,
    frames: &[Vec<u8>],
) -> Result<LightParameters, DecodeError> {
    match variant {
        ProtocolVariant::LegacyCombined => legacy::decode_combined(frames),
        ProtocolVariant::LegacySeparate => legacy::decode_separate(frames),
        ProtocolVariant::InfinityStyle => infinity::decode_parameters(frames),
        ProtocolVariant::InfinityNonLighting => Err(DecodeError::UnknownTag(0)),
    }
}

/// Strip and verify the trailing checksum, returning the frame body.
///
/// Checked before any structural parsing so that a flipped byte anywhere
/// in the frame surfaces as a checksum mismatch.
pub(crate) fn verify_checksum(raw: &[u8], min_len: usize) -> Result<&[u8], DecodeError> {
    if raw.len() < min_len {
        return Err(DecodeError::Truncated(raw.len()));
    }
    let (body, tail) = raw.split_at(raw.len() - 1);
    let computed = checksum(body);
    if computed != tail[0] {
        return Err(DecodeError::ChecksumMismatch {
            computed,
            found: tail[0],
        });
    }
    Ok(body)
}

pub(crate) fn check_range(
    field: &'static str,
    value: i32,
    min: i32,
    max: i32,
) -> Result<(), EncodeError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(EncodeError::out_of_range(field, value, min, max))
    }
}

pub(crate) fn expect_payload_len(expected: usize, found: usize) -> Result<(), DecodeError> {
    if expected == found {
        Ok(())
    } else {
        Err(DecodeError::LengthMismatch {
            declared: expected,
            found,
        })
    }
}
