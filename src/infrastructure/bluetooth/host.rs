//! Host adapter radio backed by btleplug.
//!
//! btleplug hands out parsed advertisement fields, not the raw frame, so the
//! frame given to the decoder is rebuilt from the manufacturer data: one
//! `0xFF` AD structure per company identifier, in identifier order.

use crate::domain::advertisement::AD_TYPE_MANUFACTURER_SPECIFIC;
use crate::domain::error::RadioError;
use crate::domain::models::RawEvent;
use crate::infrastructure::bluetooth::radio::{EventReceiver, Radio, ScanFilter, ScanSettings};
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _};
use btleplug::platform::{Adapter, Manager};
use futures::stream::StreamExt;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

fn backend(e: btleplug::Error) -> RadioError {
    RadioError::Backend(e.to_string())
}

pub struct BtleplugRadio {
    adapter: Adapter,
    pump: Option<JoinHandle<()>>,
    stopping: Option<JoinHandle<()>>,
}

impl BtleplugRadio {
    /// Open the first adapter the platform reports.
    pub async fn new() -> Result<Self, RadioError> {
        let manager = Manager::new().await.map_err(backend)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(backend)?
            .into_iter()
            .next()
            .ok_or(RadioError::NoAdapter)?;

        match adapter.adapter_info().await {
            Ok(info) => info!("Using Bluetooth adapter: {}", info),
            Err(e) => debug!("Adapter info unavailable: {}", e),
        }

        Ok(Self {
            adapter,
            pump: None,
            stopping: None,
        })
    }
}

/// Rebuild an advertisement frame from manufacturer data. Entries that do
/// not fit in a single AD structure are skipped.
pub fn synthesize_record(manufacturer_data: &HashMap<u16, Vec<u8>>) -> Vec<u8> {
    let mut ids: Vec<&u16> = manufacturer_data.keys().collect();
    ids.sort();

    let mut frame = Vec::new();
    for id in ids {
        let data = &manufacturer_data[id];
        let Ok(length) = u8::try_from(data.len() + 3) else {
            continue;
        };
        frame.push(length);
        frame.push(AD_TYPE_MANUFACTURER_SPECIFIC);
        frame.extend_from_slice(&id.to_le_bytes());
        frame.extend_from_slice(data);
    }
    frame
}

async fn pump(adapter: Adapter, filter: ScanFilter, tx: mpsc::UnboundedSender<RawEvent>) {
    let mut events = match adapter.events().await {
        Ok(events) => events,
        Err(e) => {
            error!("Failed to subscribe to adapter events: {}", e);
            return;
        }
    };
    if let Err(e) = adapter.start_scan(btleplug::api::ScanFilter::default()).await {
        error!("Adapter refused to scan: {}", e);
        return;
    }

    while let Some(event) = events.next().await {
        let (id, advertised) = match event {
            CentralEvent::ManufacturerDataAdvertisement {
                id,
                manufacturer_data,
            } => (id, Some(manufacturer_data)),
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => (id, None),
            _ => continue,
        };

        let Ok(peripheral) = adapter.peripheral(&id).await else {
            continue;
        };
        let Ok(Some(props)) = peripheral.properties().await else {
            continue;
        };

        let address = props.address.to_string();
        if !filter.allows(&address) {
            continue;
        }

        let manufacturer_data = advertised.unwrap_or(props.manufacturer_data);
        let event = RawEvent {
            address,
            rssi: props.rssi.unwrap_or_default(),
            data: synthesize_record(&manufacturer_data),
        };
        if tx.send(event).is_err() {
            break;
        }
    }
}

impl Radio for BtleplugRadio {
    fn start_scan(
        &mut self,
        filter: &ScanFilter,
        settings: &ScanSettings,
    ) -> Result<EventReceiver, RadioError> {
        if let Some(previous) = self.pump.take() {
            previous.abort();
        }
        // Scan mode is platform controlled here
        debug!("btleplug scan start ({:?}, {:?})", filter, settings.mode);

        let (tx, rx) = mpsc::unbounded_channel();
        self.pump = Some(tokio::spawn(pump(
            self.adapter.clone(),
            filter.clone(),
            tx,
        )));
        Ok(rx)
    }

    fn stop_scan(&mut self) {
        let Some(pump) = self.pump.take() else {
            return;
        };
        pump.abort();

        let adapter = self.adapter.clone();
        self.stopping = Some(tokio::spawn(async move {
            if let Err(e) = adapter.stop_scan().await {
                warn!("Failed to stop scan: {}", e);
            }
        }));
    }

    async fn shutdown(&mut self) {
        if let Some(stopping) = self.stopping.take() {
            if let Err(e) = stopping.await {
                warn!("Stop scan request did not complete: {}", e);
            }
        }
    }
}

impl Drop for BtleplugRadio {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}
