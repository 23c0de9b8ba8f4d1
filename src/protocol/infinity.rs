//! Codec for the Infinity-generation dialect.
//!
//! Same overall framing idea as the legacy dialect but with a two-byte
//! header, the GM axis folded into the CCT payload, a wider temperature
//! range, and the extended scene catalog with speed/sparks knobs.

use crate::errors::{DecodeError, EncodeError};
use crate::parameters::LightParameters;
use crate::types::InfinityScene;

use super::{check_range, checksum, expect_payload_len, verify_checksum};

pub(crate) const HEADER: [u8; 2] = [0x78, 0x8F];

const TAG_NOTIFY_STATUS: u8 = 0x01;
const TAG_POWER: u8 = 0x81;
const TAG_STATUS_REQUEST: u8 = 0x84;
const TAG_HSI: u8 = 0x86;
const TAG_CCT: u8 = 0x87;
const TAG_SCENE: u8 = 0x8B;

// GM travels offset by +50 so the wire byte stays unsigned.
const GM_OFFSET: i8 = 50;

// Header pair, tag, length, checksum.
const MIN_FRAME_LEN: usize = 5;

/// CCT temperature bounds this dialect can put on the wire.
pub(crate) const CCT_MIN: u8 = 27;
pub(crate) const CCT_MAX: u8 = 100;

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(5 + payload.len());
    bytes.extend_from_slice(&HEADER);
    bytes.push(tag);
    bytes.push(payload.len() as u8);
    bytes.extend_from_slice(payload);
    bytes.push(checksum(&bytes));
    bytes
}

pub(crate) fn encode(parameters: &LightParameters) -> Result<Vec<Vec<u8>>, EncodeError> {
    let bytes = match *parameters {
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
            check_range("gm", i32::from(gm), -50, 50)?;
            frame(
                TAG_CCT,
                &[brightness, temperature, (gm + GM_OFFSET) as u8],
            )
        }
        LightParameters::Hsi {
            hue,
            saturation,
            brightness,
        } => {
            check_range("brightness", i32::from(brightness), 0, 100)?;
            check_range("hue", i32::from(hue), 0, 360)?;
            check_range("saturation", i32::from(saturation), 0, 100)?;
            let [hue_lo, hue_hi] = hue.to_le_bytes();
            frame(TAG_HSI, &[hue_lo, hue_hi, saturation, brightness])
        }
        LightParameters::Scene {
            scene_id,
            brightness,
            speed,
            sparks,
        } => {
            check_range("brightness", i32::from(brightness), 0, 100)?;
            if InfinityScene::create(scene_id).is_none() {
                return Err(EncodeError::UnknownScene(scene_id));
            }
            check_range("speed", i32::from(speed), 0, 10)?;
            check_range("sparks", i32::from(sparks), 0, 10)?;
            frame(TAG_SCENE, &[scene_id, brightness, speed, sparks])
        }
    };
    Ok(vec![bytes])
}

pub(crate) fn encode_power(on: bool) -> Vec<u8> {
    frame(TAG_POWER, &[if on { 0x01 } else { 0x02 }])
}

pub(crate) fn encode_status_request() -> Vec<u8> {
    frame(TAG_STATUS_REQUEST, &[])
}

fn open_frame(raw: &[u8]) -> Result<(u8, &[u8]), DecodeError> {
    let body = verify_checksum(raw, MIN_FRAME_LEN)?;
    if body[0] != HEADER[0] {
        return Err(DecodeError::BadHeader(body[0]));
    }
    if body[1] != HEADER[1] {
        return Err(DecodeError::BadHeader(body[1]));
    }
    let tag = body[2];
    let declared = usize::from(body[3]);
    let payload = &body[4..];
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

pub(crate) fn decode_parameters(frames: &[Vec<u8>]) -> Result<LightParameters, DecodeError> {
    let [frame] = frames else {
        return Err(DecodeError::FrameCount {
            expected: 1,
            found: frames.len(),
        });
    };
    let (tag, payload) = open_frame(frame)?;
    match tag {
        TAG_CCT => {
            expect_payload_len(3, payload.len())?;
            Ok(LightParameters::Cct {
                temperature: payload[1],
                brightness: payload[0],
                gm: payload[2].wrapping_sub(GM_OFFSET as u8) as i8,
            })
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
            expect_payload_len(4, payload.len())?;
            Ok(LightParameters::Scene {
                scene_id: payload[0],
                brightness: payload[1],
                speed: payload[2],
                sparks: payload[3],
            })
        }
        other => Err(DecodeError::UnknownTag(other)),
    }
}
