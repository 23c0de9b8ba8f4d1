//! # neewer_lights_rs
//!
//! An async Rust engine for controlling Neewer studio lights over Bluetooth LE.
//!
//! This crate discovers Neewer fixtures, maintains a supervised connection to
//! each one, and translates typed lighting parameters into the lights' binary
//! command protocol. It supports CCT (white) mode, HSI (color) mode, animated
//! scene effects, power control, and an eight-slot preset system.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use neewer_lights_rs::{
//!     BtleTransport, GlobalConfig, LightParameters, NoPreferences, SessionManager,
//! };
//!
//! async fn light_the_set() -> Result<(), neewer_lights_rs::Error> {
//!     let transport = BtleTransport::new().await?;
//!     let session = SessionManager::new(transport, GlobalConfig::default(), NoPreferences);
//!
//!     // Find and connect every Neewer fixture in range.
//!     session.discover(Duration::from_secs(8)).await?;
//!
//!     // Daylight white at half intensity, everywhere.
//!     let targets: Vec<_> = session
//!         .list_lights()
//!         .await
//!         .into_iter()
//!         .map(|l| l.address)
//!         .collect();
//!     session
//!         .set_parameters(&targets, &LightParameters::cct(56, 50))
//!         .await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Discovery**: Find fixtures by advertised name (plus an operator
//!   whitelist for odd names) with [`SessionManager::discover`]
//! - **Supervised Connections**: Each light gets its own task with bounded
//!   retry; one light's failure never affects another
//! - **CCT / HSI / Scenes**: Typed parameters via [`LightParameters`]
//! - **Protocol Variants**: Legacy and Infinity-style fixtures, including
//!   models that split brightness and temperature into separate commands
//! - **Presets**: Eight slots, global or per-light snapshot, via
//!   [`SessionManager::save_preset`] and [`SessionManager::recall_preset`]
//! - **Status Notifications**: Power/channel updates streamed from each
//!   fixture, surfaced as [`SessionEvent`]s
//!
//! ## Communication
//!
//! Fixtures are controlled over a GATT write characteristic and report
//! status on a companion notify characteristic. The default
//! `transport-btleplug` feature provides the real Bluetooth transport;
//! everything above it is written against the [`Transport`] trait and runs
//! unmodified against an in-memory transport in tests.
//!
//! [`Transport`]: transport::Transport

mod config;
mod discovery;
mod entity;
mod errors;
mod identity;
mod parameters;
mod presets;
pub mod protocol;
mod session;
pub mod transport;
pub mod types;

// Re-export public API
pub use config::{GlobalConfig, LightPreferences, NoPreferences, PreferenceSource};
pub use discovery::scan_for_lights;
pub use entity::{ConnectionState, LightSnapshot};
pub use errors::{DecodeError, EncodeError, Error};
pub use identity::{LightAddress, LightIdentity, ProtocolVariant};
pub use parameters::LightParameters;
pub use presets::{PresetSlot, PresetStore, RecallAction, SLOT_COUNT};
pub use session::{
    OutcomeMap, PresetSaveMode, SessionEvent, SessionManager, SubmitOutcome,
};
pub use types::{
    Color, InfinityScene, LegacyScene, TemperatureRange, hsv_to_rgb, scene_catalog_size,
    temperature_to_rgb,
};

#[cfg(feature = "transport-btleplug")]
pub use transport::BtleTransport;
