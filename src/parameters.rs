//! Human-level lighting parameters.

use serde::{Deserialize, Serialize};

use crate::types::TemperatureRange;

/// A complete description of what a light should display.
///
/// Exactly one mode is active per light at any time. Switching modes
/// discards the previous mode's specific fields, but brightness carries
/// over (see [`LightParameters::carrying_brightness_from`]).
///
/// Numeric fields are plain integers; range validation happens in the
/// protocol codec against the target variant's bounds, and preset recall
/// clamps instead of rejecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LightParameters {
    /// White light on the warm/cool axis. Temperature is in hundreds of
    /// Kelvin (32-85), gm is the green/magenta shift (-50..50, Infinity
    /// fixtures only).
    Cct {
        temperature: u8,
        brightness: u8,
        gm: i8,
    },
    /// Colored light: hue 0-360, saturation 0-100, brightness 0-100.
    Hsi {
        hue: u16,
        saturation: u8,
        brightness: u8,
    },
    /// Built-in animated effect. Speed and sparks (0-10) only apply to
    /// Infinity fixtures.
    Scene {
        scene_id: u8,
        brightness: u8,
        speed: u8,
        sparks: u8,
    },
}

impl LightParameters {
    /// CCT parameters with a neutral GM axis.
    pub fn cct(temperature: u8, brightness: u8) -> Self {
        LightParameters::Cct {
            temperature,
            brightness,
            gm: 0,
        }
    }

    pub fn hsi(hue: u16, saturation: u8, brightness: u8) -> Self {
        LightParameters::Hsi {
            hue,
            saturation,
            brightness,
        }
    }

    /// A scene with default speed and no sparks.
    pub fn scene(scene_id: u8, brightness: u8) -> Self {
        LightParameters::Scene {
            scene_id,
            brightness,
            speed: 0,
            sparks: 0,
        }
    }

    /// The brightness component, present in every mode.
    pub fn brightness(&self) -> u8 {
        match *self {
            LightParameters::Cct { brightness, .. }
            | LightParameters::Hsi { brightness, .. }
            | LightParameters::Scene { brightness, .. } => brightness,
        }
    }

    /// Replace the brightness component, leaving the mode untouched.
    pub fn with_brightness(mut self, value: u8) -> Self {
        match &mut self {
            LightParameters::Cct { brightness, .. }
            | LightParameters::Hsi { brightness, .. }
            | LightParameters::Scene { brightness, .. } => *brightness = value,
        }
        self
    }

    /// Apply the mode-switch invariant: the previous mode's fields are
    /// discarded, its brightness carries over into `self`.
    ///
    /// # Examples
    ///
    /// ```
    /// use neewer_lights_rs::LightParameters;
    ///
    /// let previous = LightParameters::cct(56, 75);
    /// let next = LightParameters::hsi(120, 100, 20).carrying_brightness_from(&previous);
    /// assert_eq!(next.brightness(), 75);
    /// ```
    pub fn carrying_brightness_from(self, previous: &LightParameters) -> Self {
        self.with_brightness(previous.brightness())
    }

    /// Clamp CCT temperature into a light's capability range.
    ///
    /// Other modes pass through unchanged. Used by preset recall, which
    /// clamps per target instead of rejecting.
    pub fn clamped_to(&self, range: &TemperatureRange) -> Self {
        match *self {
            LightParameters::Cct {
                temperature,
                brightness,
                gm,
            } => LightParameters::Cct {
                temperature: range.clamp(temperature),
                brightness,
                gm,
            },
            ref other => other.clone(),
        }
    }

    /// Whether these parameters are representable on a CCT-only fixture.
    pub fn is_cct(&self) -> bool {
        matches!(self, LightParameters::Cct { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_carries_across_mode_switch() {
        let cct = LightParameters::cct(32, 60);
        let scene = LightParameters::scene(3, 100).carrying_brightness_from(&cct);
        assert_eq!(scene.brightness(), 60);
        assert!(matches!(scene, LightParameters::Scene { scene_id: 3, .. }));
    }

    #[test]
    fn clamping_only_touches_cct_temperature() {
        let range = TemperatureRange::create(32, 56).unwrap();
        let clamped = LightParameters::cct(85, 50).clamped_to(&range);
        assert_eq!(clamped, LightParameters::cct(56, 50));

        let hsi = LightParameters::hsi(10, 90, 40);
        assert_eq!(hsi.clamped_to(&range), hsi);
    }

    #[test]
    fn serde_mode_tag_round_trip() {
        let params = LightParameters::hsi(240, 100, 20);
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"mode\":\"hsi\""));
        let back: LightParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
