//! Wireless transport abstraction.
//!
//! The engine never touches a Bluetooth stack directly: discovery and the
//! session manager are written against the [`Transport`] / [`Link`] trait
//! pair, so the whole engine runs against an in-memory transport in tests.
//! The default `transport-btleplug` feature provides the real GATT
//! implementation.

use std::future::Future;
use std::time::Duration;

use futures::stream::BoxStream;
use uuid::{Uuid, uuid};

use crate::errors::Error;
use crate::identity::LightAddress;

#[cfg(feature = "transport-btleplug")]
mod btleplug_impl;

#[cfg(feature = "transport-btleplug")]
pub use btleplug_impl::BtleTransport;

type Result<T> = std::result::Result<T, Error>;

/// GATT characteristic commands are written to.
pub const LIGHT_WRITE_UUID: Uuid = uuid!("69400002-B5A3-F393-E0A9-E50E24DCCA99");

/// GATT characteristic fixtures notify status on.
pub const LIGHT_NOTIFY_UUID: Uuid = uuid!("69400003-B5A3-F393-E0A9-E50E24DCCA99");

/// A raw sighting from a scan, before fixture matching.
#[derive(Debug, Clone)]
pub struct Advertisement {
    pub name: Option<String>,
    pub address: LightAddress,
    pub rssi: Option<i16>,
}

/// Stream of raw notification payloads from a connected fixture.
pub type NotificationStream = BoxStream<'static, Vec<u8>>;

/// Access to the wireless medium: scanning and link establishment.
pub trait Transport: Send + Sync + 'static {
    type Link: Link;

    /// Scan for `duration` and return everything sighted. Each invocation
    /// is a fresh scan.
    fn scan(&self, duration: Duration) -> impl Future<Output = Result<Vec<Advertisement>>> + Send;

    /// Establish a link to the fixture at `address`.
    fn connect(
        &self,
        address: &LightAddress,
    ) -> impl Future<Output = Result<Self::Link>> + Send;
}

/// A live link to one fixture.
pub trait Link: Send + Sync + 'static {
    /// Write one command frame to the fixture.
    fn write(&self, frame: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Subscribe to the fixture's notification channel.
    fn notifications(&self) -> impl Future<Output = Result<NotificationStream>> + Send;

    /// Tear the link down.
    fn disconnect(&self) -> impl Future<Output = Result<()>> + Send;
}
