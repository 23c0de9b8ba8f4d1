//! Eight-slot preset registry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::identity::LightAddress;
use crate::parameters::LightParameters;
use crate::types::TemperatureRange;

type Result<T> = std::result::Result<T, Error>;

/// Number of preset slots, numbered 1 through 8.
pub const SLOT_COUNT: usize = 8;

/// Contents of one preset slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PresetSlot {
    /// One parameter set applied to every targeted light, each light
    /// independently clamped to its own capability bounds on recall.
    Global { parameters: LightParameters },
    /// Exact per-light capture; recall applies each entry only to the
    /// light it was captured from.
    Snapshot {
        per_light: HashMap<LightAddress, LightParameters>,
    },
}

/// What recall decided for one target.
#[derive(Debug, Clone, PartialEq)]
pub enum RecallAction {
    /// Send these (already clamped) parameters.
    Apply(LightParameters),
    /// Target has no captured state in this snapshot.
    Skip,
}

/// Holds the eight preset slots and their built-in defaults.
///
/// A slot differing from its built-in default is "custom"; the distinction
/// only matters to callers (indicator state), the store just exposes the
/// comparison.
#[derive(Debug, Clone)]
pub struct PresetStore {
    slots: [PresetSlot; SLOT_COUNT],
}

impl Default for PresetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PresetStore {
    pub fn new() -> Self {
        PresetStore {
            slots: default_slots(),
        }
    }

    /// Restore persisted slots, falling back to defaults for bad indices.
    pub fn with_slots(slots: [PresetSlot; SLOT_COUNT]) -> Self {
        PresetStore { slots }
    }

    pub fn slot(&self, slot: usize) -> Result<&PresetSlot> {
        self.slots
            .get(slot.wrapping_sub(1))
            .ok_or(Error::InvalidSlot(slot))
    }

    /// Overwrite a slot. Last writer wins; a slot is never left partially
    /// updated.
    pub fn save(&mut self, slot: usize, contents: PresetSlot) -> Result<()> {
        let index = self.index(slot)?;
        self.slots[index] = contents;
        Ok(())
    }

    /// Restore a slot to its fixed built-in default.
    pub fn reset(&mut self, slot: usize) -> Result<()> {
        let index = self.index(slot)?;
        self.slots[index] = default_slots()[index].clone();
        Ok(())
    }

    /// Whether a slot differs from its built-in default.
    pub fn is_custom(&self, slot: usize) -> Result<bool> {
        let index = self.index(slot)?;
        Ok(self.slots[index] != default_slots()[index])
    }

    pub fn is_snapshot(&self, slot: usize) -> Result<bool> {
        Ok(matches!(self.slot(slot)?, PresetSlot::Snapshot { .. }))
    }

    /// Decide what each target receives on recall.
    ///
    /// Global presets clamp to each target's capability bounds without
    /// mutating the stored preset; snapshot presets apply only to targets
    /// present in the captured mapping and skip the rest.
    pub fn recall_plan(
        &self,
        slot: usize,
        targets: &[(LightAddress, TemperatureRange)],
    ) -> Result<Vec<(LightAddress, RecallAction)>> {
        let contents = self.slot(slot)?;
        let plan = targets
            .iter()
            .map(|(address, range)| {
                let action = match contents {
                    PresetSlot::Global { parameters } => {
                        RecallAction::Apply(parameters.clamped_to(range))
                    }
                    PresetSlot::Snapshot { per_light } => match per_light.get(address) {
                        Some(parameters) => RecallAction::Apply(parameters.clone()),
                        None => RecallAction::Skip,
                    },
                };
                (address.clone(), action)
            })
            .collect();
        Ok(plan)
    }

    fn index(&self, slot: usize) -> Result<usize> {
        if (1..=SLOT_COUNT).contains(&slot) {
            Ok(slot - 1)
        } else {
            Err(Error::InvalidSlot(slot))
        }
    }
}

fn global(parameters: LightParameters) -> PresetSlot {
    PresetSlot::Global { parameters }
}

/// The fixed built-in preset table: three CCT whites and five saturated
/// hues, all at modest intensity.
fn default_slots() -> [PresetSlot; SLOT_COUNT] {
    [
        global(LightParameters::cct(56, 20)),
        global(LightParameters::cct(32, 20)),
        global(LightParameters::cct(56, 0)),
        global(LightParameters::hsi(0, 100, 20)),
        global(LightParameters::hsi(240, 100, 20)),
        global(LightParameters::hsi(120, 100, 20)),
        global(LightParameters::hsi(300, 100, 20)),
        global(LightParameters::hsi(160, 100, 20)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> LightAddress {
        LightAddress::new(s)
    }

    #[test]
    fn slots_start_at_builtin_defaults() {
        let store = PresetStore::new();
        for slot in 1..=SLOT_COUNT {
            assert!(!store.is_custom(slot).unwrap(), "slot {slot}");
        }
        assert_eq!(
            store.slot(1).unwrap(),
            &global(LightParameters::cct(56, 20))
        );
    }

    #[test]
    fn slot_indices_outside_one_to_eight_are_rejected() {
        let mut store = PresetStore::new();
        assert!(matches!(store.slot(0), Err(Error::InvalidSlot(0))));
        assert!(matches!(store.reset(9), Err(Error::InvalidSlot(9))));
    }

    #[test]
    fn save_marks_custom_and_reset_restores() {
        let mut store = PresetStore::new();
        store
            .save(2, global(LightParameters::hsi(45, 80, 60)))
            .unwrap();
        assert!(store.is_custom(2).unwrap());

        store.reset(2).unwrap();
        assert!(!store.is_custom(2).unwrap());
        assert_eq!(
            store.slot(2).unwrap(),
            &global(LightParameters::cct(32, 20))
        );
    }

    #[test]
    fn global_recall_clamps_per_target_without_mutating_the_slot() {
        let mut store = PresetStore::new();
        store.save(1, global(LightParameters::cct(85, 50))).unwrap();

        let narrow = TemperatureRange::create(32, 56).unwrap();
        let wide = TemperatureRange::create(27, 100).unwrap();
        let plan = store
            .recall_plan(1, &[(addr("X"), narrow), (addr("Y"), wide)])
            .unwrap();

        assert_eq!(
            plan[0].1,
            RecallAction::Apply(LightParameters::cct(56, 50))
        );
        assert_eq!(
            plan[1].1,
            RecallAction::Apply(LightParameters::cct(85, 50))
        );
        // Stored preset value stays 85.
        assert_eq!(
            store.slot(1).unwrap(),
            &global(LightParameters::cct(85, 50))
        );
    }

    #[test]
    fn snapshot_recall_skips_uncaptured_targets() {
        let mut store = PresetStore::new();
        let per_light = HashMap::from([
            (addr("X"), LightParameters::cct(56, 50)),
            (addr("Y"), LightParameters::hsi(0, 100, 20)),
        ]);
        store.save(4, PresetSlot::Snapshot { per_light }).unwrap();

        let default_range = TemperatureRange::default();
        let plan = store
            .recall_plan(
                4,
                &[
                    (addr("X"), default_range),
                    (addr("Z"), default_range),
                ],
            )
            .unwrap();

        assert_eq!(
            plan[0].1,
            RecallAction::Apply(LightParameters::cct(56, 50))
        );
        assert_eq!(plan[1].1, RecallAction::Skip);
    }
}
