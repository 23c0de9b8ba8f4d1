//! Built-in animated scene catalogs.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::identity::ProtocolVariant;

/// Animated effects available on pre-Infinity fixtures (scene ids 1-9).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, EnumIter, PartialEq, Eq)]
pub enum LegacyScene {
    SquadCar = 1,
    Ambulance = 2,
    FireEngine = 3,
    Fireworks = 4,
    Party = 5,
    CandleLight = 6,
    Lightning = 7,
    Paparazzi = 8,
    Screen = 9,
}

impl LegacyScene {
    pub fn create(id: u8) -> Option<Self> {
        LegacyScene::iter().find(|scene| *scene as u8 == id)
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

/// The extended effect catalog on Infinity-generation fixtures (ids 1-17).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, EnumIter, PartialEq, Eq)]
pub enum InfinityScene {
    Lightning = 1,
    Paparazzi = 2,
    DefectiveBulb = 3,
    Explosion = 4,
    Welding = 5,
    CctFlash = 6,
    HueFlash = 7,
    CctPulse = 8,
    HuePulse = 9,
    CopCar = 10,
    CandleLight = 11,
    HsiLoop = 12,
    CctLoop = 13,
    IntLoop = 14,
    TvScreen = 15,
    Firework = 16,
    Party = 17,
}

impl InfinityScene {
    pub fn create(id: u8) -> Option<Self> {
        InfinityScene::iter().find(|scene| *scene as u8 == id)
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

/// Number of scenes a variant's catalog holds (0 for non-lighting devices).
pub fn scene_catalog_size(variant: ProtocolVariant) -> u8 {
    match variant {
        ProtocolVariant::LegacyCombined | ProtocolVariant::LegacySeparate => {
            LegacyScene::iter().count() as u8
        }
        ProtocolVariant::InfinityStyle => InfinityScene::iter().count() as u8,
        ProtocolVariant::InfinityNonLighting => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogs_are_dense() {
        // Every id from 1 to the catalog size resolves to an effect.
        for id in 1..=scene_catalog_size(ProtocolVariant::LegacyCombined) {
            assert!(LegacyScene::create(id).is_some(), "legacy id {id}");
        }
        for id in 1..=scene_catalog_size(ProtocolVariant::InfinityStyle) {
            assert!(InfinityScene::create(id).is_some(), "infinity id {id}");
        }
        assert!(LegacyScene::create(10).is_none());
        assert!(InfinityScene::create(18).is_none());
    }

    #[test]
    fn catalog_sizes() {
        assert_eq!(scene_catalog_size(ProtocolVariant::LegacyCombined), 9);
        assert_eq!(scene_catalog_size(ProtocolVariant::LegacySeparate), 9);
        assert_eq!(scene_catalog_size(ProtocolVariant::InfinityStyle), 17);
        assert_eq!(scene_catalog_size(ProtocolVariant::InfinityNonLighting), 0);
    }
}
