//! btleplug-backed GATT transport.

use std::time::Duration;

use btleplug::api::{
    Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use log::debug;

use crate::errors::Error;
use crate::identity::LightAddress;

use super::{Advertisement, LIGHT_NOTIFY_UUID, LIGHT_WRITE_UUID, Link, NotificationStream, Transport};

type Result<T> = std::result::Result<T, Error>;

/// Transport over the system Bluetooth adapter.
pub struct BtleTransport {
    adapter: Adapter,
}

impl BtleTransport {
    /// Bind to the first available Bluetooth adapter.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|e| Error::Discovery(e.to_string()))?;
        let adapter = manager
            .adapters()
            .await
            .map_err(|e| Error::Discovery(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Discovery("no bluetooth adapter found".into()))?;
        Ok(BtleTransport { adapter })
    }

    async fn find_peripheral(&self, address: &LightAddress) -> Result<Peripheral> {
        let peripherals = self
            .adapter
            .peripherals()
            .await
            .map_err(|e| Error::transport("enumerate", e))?;
        for peripheral in peripherals {
            if LightAddress::new(&peripheral.address().to_string()) == *address {
                return Ok(peripheral);
            }
        }
        Err(Error::UnknownLight(address.clone()))
    }
}

impl Transport for BtleTransport {
    type Link = BtleLink;

    async fn scan(&self, duration: Duration) -> Result<Vec<Advertisement>> {
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| Error::Discovery(e.to_string()))?;
        tokio::time::sleep(duration).await;
        self.adapter
            .stop_scan()
            .await
            .map_err(|e| Error::Discovery(e.to_string()))?;

        let peripherals = self
            .adapter
            .peripherals()
            .await
            .map_err(|e| Error::Discovery(e.to_string()))?;

        let mut sighted = Vec::with_capacity(peripherals.len());
        for peripheral in peripherals {
            let address = LightAddress::new(&peripheral.address().to_string());
            let properties = peripheral
                .properties()
                .await
                .map_err(|e| Error::transport("properties", e))?;
            let (name, rssi) = match properties {
                Some(p) => (p.local_name, p.rssi),
                None => (None, None),
            };
            sighted.push(Advertisement {
                name,
                address,
                rssi,
            });
        }
        Ok(sighted)
    }

    async fn connect(&self, address: &LightAddress) -> Result<BtleLink> {
        let peripheral = self.find_peripheral(address).await?;
        peripheral
            .connect()
            .await
            .map_err(|e| Error::transport("connect", e))?;
        peripheral
            .discover_services()
            .await
            .map_err(|e| Error::transport("discover services", e))?;

        let characteristics = peripheral.characteristics();
        let write_char = find_characteristic(&characteristics, LIGHT_WRITE_UUID, address)?;
        let notify_char = find_characteristic(&characteristics, LIGHT_NOTIFY_UUID, address)?;
        debug!("GATT link established to {address}");

        Ok(BtleLink {
            peripheral,
            write_char,
            notify_char,
        })
    }
}

fn find_characteristic(
    characteristics: &std::collections::BTreeSet<Characteristic>,
    uuid: uuid::Uuid,
    address: &LightAddress,
) -> Result<Characteristic> {
    characteristics
        .iter()
        .find(|c| c.uuid == uuid)
        .cloned()
        .ok_or_else(|| Error::write(address, format!("characteristic {uuid} not found")))
}

/// A live GATT connection to one fixture.
pub struct BtleLink {
    peripheral: Peripheral,
    write_char: Characteristic,
    notify_char: Characteristic,
}

impl Link for BtleLink {
    async fn write(&self, frame: &[u8]) -> Result<()> {
        self.peripheral
            .write(&self.write_char, frame, WriteType::WithoutResponse)
            .await
            .map_err(|e| Error::transport("write", e))
    }

    async fn notifications(&self) -> Result<NotificationStream> {
        self.peripheral
            .subscribe(&self.notify_char)
            .await
            .map_err(|e| Error::transport("subscribe", e))?;
        let notify_uuid = self.notify_char.uuid;
        let stream = self
            .peripheral
            .notifications()
            .await
            .map_err(|e| Error::transport("notifications", e))?
            .filter_map(move |n| {
                futures::future::ready((n.uuid == notify_uuid).then_some(n.value))
            })
            .boxed();
        Ok(stream)
    }

    async fn disconnect(&self) -> Result<()> {
        self.peripheral
            .disconnect()
            .await
            .map_err(|e| Error::transport("disconnect", e))
    }
}
