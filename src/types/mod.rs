//! Small value types shared across the engine.

mod color;
mod scene;
mod temperature;

pub use color::{Color, hsv_to_rgb, temperature_to_rgb};
pub use scene::{InfinityScene, LegacyScene, scene_catalog_size};
pub use temperature::TemperatureRange;
