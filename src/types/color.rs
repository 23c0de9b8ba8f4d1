//! Presentation-side color conversions.
//!
//! These are not part of the wire protocol; the UI uses them to render
//! swatches and gradients for the current light state.

use serde::{Deserialize, Serialize};

/// An RGB color with red, green, and blue components (0-255 each).
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// Approximate the RGB appearance of a color temperature in Kelvin.
///
/// Uses the Tanner Helland curve fit of the Planckian locus. The fit is
/// defined for roughly 1000-40000 K; each channel is clamped to 0-255 at
/// the boundaries, so out-of-domain inputs saturate rather than wrap.
///
/// # Examples
///
/// ```
/// use neewer_lights_rs::temperature_to_rgb;
///
/// let warm = temperature_to_rgb(3200);
/// let cool = temperature_to_rgb(5600);
/// assert_eq!(warm.red, 255);
/// assert!(warm.blue < cool.blue);
/// ```
pub fn temperature_to_rgb(kelvin: u32) -> Color {
    let t = kelvin as f64 / 100.0;

    let red = if t <= 66.0 {
        255.0
    } else {
        329.698727446 * (t - 60.0).powf(-0.1332047592)
    };

    let green = if t <= 66.0 {
        99.4708025861 * t.ln() - 161.1195681661
    } else {
        288.1221695283 * (t - 60.0).powf(-0.0755148492)
    };

    let blue = if t >= 66.0 {
        255.0
    } else if t <= 19.0 {
        0.0
    } else {
        138.5177312231 * (t - 10.0).ln() - 305.0447927307
    };

    Color::rgb(clamp_channel(red), clamp_channel(green), clamp_channel(blue))
}

/// Convert hue (0-360 degrees), saturation and value (0-100 percent) to RGB.
///
/// Inputs outside the domain are clamped before conversion.
///
/// # Examples
///
/// ```
/// use neewer_lights_rs::{hsv_to_rgb, Color};
///
/// assert_eq!(hsv_to_rgb(0, 100, 100), Color::rgb(255, 0, 0));
/// assert_eq!(hsv_to_rgb(120, 100, 100), Color::rgb(0, 255, 0));
/// assert_eq!(hsv_to_rgb(240, 0, 100), Color::rgb(255, 255, 255));
/// ```
pub fn hsv_to_rgb(hue: u16, saturation: u8, value: u8) -> Color {
    let h = f64::from(hue.min(360)) % 360.0;
    let s = f64::from(saturation.min(100)) / 100.0;
    let v = f64::from(value.min(100)) / 100.0;

    if s == 0.0 {
        let gray = clamp_channel(v * 255.0);
        return Color::rgb(gray, gray, gray);
    }

    let h = h / 60.0;
    let i = h.floor();
    let f = h - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match i as u8 % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    Color::rgb(
        clamp_channel(r * 255.0),
        clamp_channel(g * 255.0),
        clamp_channel(b * 255.0),
    )
}

fn clamp_channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}
