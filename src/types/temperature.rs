//! Color temperature range handling for CCT mode.

use serde::{Deserialize, Serialize};

/// A CCT range in hundreds of Kelvin (so `32` means 3200 K).
///
/// The default range covers the 3200-5600 K span common to most fixtures.
/// Per-light overrides may widen it, but never beyond 1000-10000 K.
///
/// # Examples
///
/// ```
/// use neewer_lights_rs::TemperatureRange;
///
/// let range = TemperatureRange::default();
/// assert_eq!(range.min(), 32);
/// assert_eq!(range.max(), 56);
/// assert_eq!(range.clamp(85), 56);
///
/// assert!(TemperatureRange::create(27, 65).is_some());
/// assert!(TemperatureRange::create(5, 65).is_none()); // below 1000 K
/// assert!(TemperatureRange::create(65, 27).is_none()); // inverted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemperatureRange {
    min: u8,
    max: u8,
}

impl TemperatureRange {
    /// Hard lower bound: 1000 K.
    pub const FLOOR: u8 = 10;
    /// Hard upper bound: 10000 K.
    pub const CEILING: u8 = 100;

    const DEFAULT_MIN: u8 = 32;
    const DEFAULT_MAX: u8 = 56;

    /// Range from known-good wire bounds; callers guarantee ordering.
    pub(crate) const fn from_bounds(min: u8, max: u8) -> Self {
        TemperatureRange { min, max }
    }

    /// Create a range, rejecting inverted or out-of-bound endpoints.
    pub fn create(min: u8, max: u8) -> Option<Self> {
        if min <= max && (Self::FLOOR..=Self::CEILING).contains(&min) && max <= Self::CEILING {
            Some(TemperatureRange { min, max })
        } else {
            None
        }
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    /// Clamp a temperature into this range.
    pub fn clamp(&self, temperature: u8) -> u8 {
        temperature.clamp(self.min, self.max)
    }
}

impl Default for TemperatureRange {
    fn default() -> Self {
        TemperatureRange {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}
