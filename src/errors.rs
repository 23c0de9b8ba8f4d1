use crate::identity::LightAddress;

/// All error types that can occur when driving Neewer lights.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The Bluetooth adapter is missing or the scan could not start.
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// Link establishment failed after exhausting the configured attempts.
    #[error("connection to {address} failed after {attempts} attempts")]
    ConnectionExhausted {
        address: LightAddress,
        attempts: u32,
    },

    /// A transport-level operation failed while communicating with a light.
    #[error("transport {action} error: {reason}")]
    Transport { action: String, reason: String },

    /// A write to the light's command characteristic failed.
    #[error("write to {address} failed: {reason}")]
    Write {
        address: LightAddress,
        reason: String,
    },

    /// A transport operation exceeded its deadline.
    #[error("operation timed out")]
    Timeout,

    /// The address is not present in the managed set.
    #[error("unknown light {0}")]
    UnknownLight(LightAddress),

    /// The light exists but is not currently connected.
    #[error("light {0} is not connected")]
    NotConnected(LightAddress),

    /// Requested parameters violate the target variant's wire bounds.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// A notification from a light could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Preset slot index outside 1..=8.
    #[error("invalid preset slot {0}; slots are numbered 1-8")]
    InvalidSlot(usize),
}

impl Error {
    /// Create a new transport error
    pub fn transport(action: &str, reason: impl ToString) -> Self {
        Error::Transport {
            action: action.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a new write error
    pub fn write(address: &LightAddress, reason: impl ToString) -> Self {
        Error::Write {
            address: address.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Rejection reasons produced by the codec before any bytes are built.
///
/// Bounds are variant-specific; a failed encode never produces partial
/// output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// A numeric field lies outside the variant's declared bounds.
    #[error("{field} {value} out of range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },

    /// The scene id is not in the target variant's effect catalog.
    #[error("scene {0} is not in this fixture's effect catalog")]
    UnknownScene(u8),

    /// The device speaks the protocol but advertises no lighting capability.
    #[error("device advertises no lighting capability")]
    NotALight,
}

impl EncodeError {
    pub(crate) fn out_of_range(field: &'static str, value: i32, min: i32, max: i32) -> Self {
        EncodeError::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }
}

/// Failures while decoding bytes received from a light.
///
/// Decoding never panics on malformed wire input; a single bad packet is
/// reported as a value and discarded by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Fewer bytes than the smallest valid frame.
    #[error("frame too short: {0} bytes")]
    Truncated(usize),

    /// The trailing checksum does not match the byte sum.
    #[error("checksum mismatch: computed {computed:#04x}, found {found:#04x}")]
    ChecksumMismatch { computed: u8, found: u8 },

    /// The frame does not start with the expected header byte(s).
    #[error("unexpected header byte {0:#04x}")]
    BadHeader(u8),

    /// The command tag is not one this variant produces.
    #[error("unknown command tag {0:#04x}")]
    UnknownTag(u8),

    /// The declared payload length disagrees with the frame size.
    #[error("payload length {found} does not match declared {declared}")]
    LengthMismatch { declared: usize, found: usize },

    /// A `LegacySeparate` parameter set needs exactly two frames.
    #[error("expected {expected} command frame(s), got {found}")]
    FrameCount { expected: usize, found: usize },
}
