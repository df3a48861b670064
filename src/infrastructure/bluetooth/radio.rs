//! Radio capability
//!
//! The controller talks to the host's BLE scanner through [`Radio`]. Both
//! calls are non-blocking requests: `start_scan` hands back the stream the
//! advertisements will arrive on, and the stream closing while scanning means
//! the adapter went away.

use crate::domain::error::RadioError;
use crate::domain::models::{RawEvent, ScanTarget};
pub use crate::domain::models::ScanMode;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, watch};
use tracing::debug;

pub type EventReceiver = mpsc::UnboundedReceiver<RawEvent>;

/// Radio-level filter. Only address filtering is pushed down to the radio;
/// manufacturer matching needs the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilter {
    pub address: Option<String>,
    pub accept_all: bool,
}

impl ScanFilter {
    pub fn for_target(target: &ScanTarget) -> Self {
        match &target.address {
            Some(address) => Self {
                address: Some(address.clone()),
                accept_all: false,
            },
            None => Self {
                address: None,
                accept_all: true,
            },
        }
    }

    pub fn allows(&self, address: &str) -> bool {
        self.accept_all || self.address.as_deref() == Some(address)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanSettings {
    pub mode: ScanMode,
}

pub trait Radio: Send + 'static {
    /// Begin delivering advertisements matching `filter`.
    fn start_scan(
        &mut self,
        filter: &ScanFilter,
        settings: &ScanSettings,
    ) -> Result<EventReceiver, RadioError>;

    /// Stop delivering advertisements. Safe to call when not scanning.
    fn stop_scan(&mut self);

    /// Wait for stop requests still in flight at the platform boundary.
    /// Called once the session has ended, before the radio is dropped.
    fn shutdown(&mut self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

struct SimulatedInner {
    enabled: bool,
    active: Option<(ScanFilter, mpsc::UnboundedSender<RawEvent>)>,
    starts: usize,
    stops: usize,
}

/// In-process radio. Events are pushed with [`SimulatedRadio::inject`] and
/// only delivered while a scan is active and the filter allows them.
#[derive(Clone)]
pub struct SimulatedRadio {
    inner: Arc<Mutex<SimulatedInner>>,
    scanning: Arc<watch::Sender<bool>>,
}

impl Default for SimulatedRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRadio {
    pub fn new() -> Self {
        let (scanning, _) = watch::channel(false);
        Self {
            inner: Arc::new(Mutex::new(SimulatedInner {
                enabled: true,
                active: None,
                starts: 0,
                stops: 0,
            })),
            scanning: Arc::new(scanning),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Turn the adapter on or off. Switching off mid-scan closes the stream.
    pub fn set_enabled(&self, enabled: bool) {
        let mut inner = self.lock();
        inner.enabled = enabled;
        if !enabled && inner.active.take().is_some() {
            self.scanning.send_replace(false);
        }
    }

    /// Deliver an advertisement. Returns whether it reached a listener.
    pub fn inject(&self, event: RawEvent) -> bool {
        let inner = self.lock();
        match &inner.active {
            Some((filter, tx)) if filter.allows(&event.address) => tx.send(event).is_ok(),
            _ => false,
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.lock().active.is_some()
    }

    /// Watch the scanning flag, e.g. to wait for the next window to open.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.scanning.subscribe()
    }

    pub fn start_count(&self) -> usize {
        self.lock().starts
    }

    pub fn stop_count(&self) -> usize {
        self.lock().stops
    }

    pub fn active_filter(&self) -> Option<ScanFilter> {
        self.lock().active.as_ref().map(|(f, _)| f.clone())
    }
}

impl Radio for SimulatedRadio {
    fn start_scan(
        &mut self,
        filter: &ScanFilter,
        settings: &ScanSettings,
    ) -> Result<EventReceiver, RadioError> {
        let mut inner = self.lock();
        if !inner.enabled {
            return Err(RadioError::Disabled);
        }
        debug!("Simulated scan start ({:?}, {:?})", filter, settings.mode);
        let (tx, rx) = mpsc::unbounded_channel();
        inner.active = Some((filter.clone(), tx));
        inner.starts += 1;
        self.scanning.send_replace(true);
        Ok(rx)
    }

    fn stop_scan(&mut self) {
        let mut inner = self.lock();
        inner.stops += 1;
        if inner.active.take().is_some() {
            debug!("Simulated scan stop");
            self.scanning.send_replace(false);
        }
    }
}
