//! Codec for the single-byte-header legacy dialects.

use crate::errors::{DecodeError, EncodeError};
use crate::parameters::LightParameters;
use crate::types::LegacyScene;

use super::{check_range, checksum, expect_payload_len, verify_checksum};

pub(crate) const HEADER: u8 = 0x78;

const TAG_NOTIFY_STATUS: u8 = 0x01;
const TAG_POWER: u8 = 0x81;
const TAG_BRIGHTNESS: u8 = 0x82;
const TAG_TEMPERATURE: u8 = 0x83;
const TAG_STATUS_REQUEST: u8 = 0x84;
const TAG_HSI: u8 = 0x86;
const TAG_CCT: u8 = 0x87;
const TAG_SCENE: u8 = 0x88;

// Header, tag, length, checksum.
const MIN_FRAME_LEN: usize = 4;

/// CCT temperature bounds this dialect can put on the wire.
pub(crate) const CCT_MIN: u8 = 32;
pub(crate) const CCT_MAX: u8 = 85;

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(4 + payload.len());
    bytes.push(HEADER);
    bytes.push(tag);
    bytes.push(payload.len() as u8);
    bytes.extend_from_slice(payload);
    bytes.push(checksum(&bytes));
    bytes
}

fn validate(parameters: &LightParameters) -> Result<(), EncodeError> {
    match *parameters {
        LightParameters::Cct {
            temperature,
            brightness,
            gm,
        } => {
            check_range("brightness", i32::from(brightness), 0, 100)?;
            check_range(
                "temperature",
                i32::from(temperature),
                i32::from(CCT_MIN),
                i32::from(CCT_MAX),
            )?;
            // No GM axis on pre-Infinity hardware.
            check_range("gm", i32::from(gm), 0, 0)
        }
        LightParameters::Hsi {
            hue,
            saturation,
            brightness,
        } => {
            check_range("brightness", i32::from(brightness), 0, 100)?;
            check_range("hue", i32::from(hue), 0, 360)?;
            check_range("saturation", i32::from(saturation), 0, 100)
        }
        LightParameters::Scene {
            scene_id,
            brightness,
            speed,
            sparks,
        } => {
            check_range("brightness", i32::from(brightness), 0, 100)?;
            if LegacyScene::create(scene_id).is_none() {
                return Err(EncodeError::UnknownScene(scene_id));
            }
            check_range("speed", i32::from(speed), 0, 0)?;
            check_range("sparks", i32::from(sparks), 0, 0)
        }
    }
}

pub(crate) fn encode_combined(parameters: &LightParameters) -> Result<Vec<Vec<u8>>, EncodeError> {
    validate(parameters)?;
    let bytes = match *parameters {
        LightParameters::Cct {
            temperature,
            brightness,
            ..
        } => frame(TAG_CCT, &[brightness, temperature]),
        LightParameters::Hsi {
            hue,
            saturation,
            brightness,
        } => {
            let [hue_lo, hue_hi] = hue.to_le_bytes();
            frame(TAG_HSI, &[hue_lo, hue_hi, saturation, brightness])
        }
        LightParameters::Scene {
            scene_id,
            brightness,
            ..
        } => frame(TAG_SCENE, &[brightness, scene_id]),
    };
    Ok(vec![bytes])
}

/// Older fixtures want brightness and temperature as two sequential writes.
pub(crate) fn encode_separate(parameters: &LightParameters) -> Result<Vec<Vec<u8>>, EncodeError> {
    validate(parameters)?;
    match *parameters {
        LightParameters::Cct {
            temperature,
            brightness,
            ..
        } => Ok(vec![
            frame(TAG_BRIGHTNESS, &[brightness]),
            frame(TAG_TEMPERATURE, &[temperature]),
        ]),
        // Only the CCT axes split; color and scenes stay combined.
        _ => encode_combined(parameters),
    }
}

pub(crate) fn encode_power(on: bool) -> Vec<u8> {
    frame(TAG_POWER, &[if on { 0x01 } else { 0x02 }])
}

pub(crate) fn encode_status_request() -> Vec<u8> {
    frame(TAG_STATUS_REQUEST, &[])
}

/// Split a checksum-verified frame into `(tag, payload)`.
fn open_frame(raw: &[u8]) -> Result<(u8, &[u8]), DecodeError> {
    let body = verify_checksum(raw, MIN_FRAME_LEN)?;
    if body[0] != HEADER {
        return Err(DecodeError::BadHeader(body[0]));
    }
    let tag = body[1];
    let declared = usize::from(body[2]);
    let payload = &body[3..];
    if payload.len() != declared {
        return Err(DecodeError::LengthMismatch {
            declared,
            found: payload.len(),
        });
    }
    Ok((tag, payload))
}

pub(crate) fn decode_notification(
    raw: &[u8],
) -> Result<super::PowerChannelStatus, DecodeError> {
    let (tag, payload) = open_frame(raw)?;
    if tag != TAG_NOTIFY_STATUS {
        return Err(DecodeError::UnknownTag(tag));
    }
    expect_payload_len(2, payload.len())?;
    Ok(super::PowerChannelStatus {
        power_on: payload[0] == 0x01,
        channel: payload[1],
    })
}

pub(crate) fn decode_combined(frames: &[Vec<u8>]) -> Result<LightParameters, DecodeError> {
    let [frame] = frames else {
        return Err(DecodeError::FrameCount {
            expected: 1,
            found: frames.len(),
        });
    };
    let (tag, payload) = open_frame(frame)?;
    match tag {
        TAG_CCT => {
            expect_payload_len(2, payload.len())?;
            Ok(LightParameters::cct(payload[1], payload[0]))
        }
        TAG_HSI => {
            expect_payload_len(4, payload.len())?;
            Ok(LightParameters::hsi(
                u16::from_le_bytes([payload[0], payload[1]]),
                payload[2],
                payload[3],
            ))
        }
        TAG_SCENE => {
            expect_payload_len(2, payload.len())?;
            Ok(LightParameters::scene(payload[1], payload[0]))
        }
        other => Err(DecodeError::UnknownTag(other)),
    }
}

pub(crate) fn decode_separate(frames: &[Vec<u8>]) -> Result<LightParameters, DecodeError> {
    match frames {
        [brightness_frame, temperature_frame] => {
            let (tag, payload) = open_frame(brightness_frame)?;
            if tag != TAG_BRIGHTNESS {
                return Err(DecodeError::UnknownTag(tag));
            }
            expect_payload_len(1, payload.len())?;
            let brightness = payload[0];

            let (tag, payload) = open_frame(temperature_frame)?;
            if tag != TAG_TEMPERATURE {
                return Err(DecodeError::UnknownTag(tag));
            }
            expect_payload_len(1, payload.len())?;
            Ok(LightParameters::cct(payload[0], brightness))
        }
        [_] => decode_combined(frames),
        _ => Err(DecodeError::FrameCount {
            expected: 2,
            found: frames.len(),
        }),
    }
}
