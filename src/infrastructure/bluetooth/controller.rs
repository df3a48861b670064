//! Scan Cycle Controller
//!
//! Drives the radio in fixed-length scan windows and routes every
//! advertisement through filter → decoder → suppressor → dispatcher.
//!
//! ```text
//!  Idle ──start──► Scanning ──window elapsed──► Restarting
//!                     ▲                             │
//!                     └──────── settle delay ───────┘
//!
//!  any state ──cancel / radio lost──► Stopped
//! ```
//!
//! All state (cycle state, suppression state) lives on the controller's own
//! task; only uploads run elsewhere.

use crate::domain::advertisement;
use crate::domain::error::{RadioError, SessionError};
use crate::domain::filter::SightingFilter;
use crate::domain::models::{CycleState, RawEvent, ScanTarget, Sighting};
use crate::domain::settings::Settings;
use crate::domain::suppression::{DuplicateSuppressor, SuppressionState, Verdict};
use crate::infrastructure::bluetooth::dispatcher::ReportDispatcher;
use crate::infrastructure::bluetooth::radio::{EventReceiver, Radio, ScanFilter, ScanSettings};
use crate::infrastructure::upload::Uploader;
use chrono::{DateTime, Local};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Source of sighting timestamps.
pub trait Clock: Send + 'static {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Wall time at creation advanced by tokio's monotonic clock. Never steps
/// backwards, and follows `tokio::time::pause` in tests.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    wall: DateTime<Local>,
    start: tokio::time::Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            wall: Local::now(),
            start: tokio::time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Local> {
        let elapsed = chrono::Duration::from_std(self.start.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall + elapsed
    }
}

/// Shortest scan window accepted from settings. A window that elapses
/// immediately would restart the radio on every pass of the event loop.
pub const MIN_SCAN_WINDOW: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleConfig {
    /// How long each scan window stays open before a forced restart
    pub scan_window: Duration,
    /// Pause between stop and restart so the radio can settle
    pub restart_settle: Duration,
    pub scan_settings: ScanSettings,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            scan_window: Duration::from_millis(60_000),
            restart_settle: Duration::from_millis(100),
            scan_settings: ScanSettings::default(),
        }
    }
}

impl CycleConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let mut scan_window = settings.scan_window();
        if scan_window < MIN_SCAN_WINDOW {
            warn!(
                "scan_window_ms {} is too short, using {} ms",
                settings.scan_window_ms,
                MIN_SCAN_WINDOW.as_millis()
            );
            scan_window = MIN_SCAN_WINDOW;
        }
        Self {
            scan_window,
            restart_settle: settings.restart_settle(),
            scan_settings: ScanSettings {
                mode: settings.scan_mode,
            },
        }
    }
}

pub struct ScanCycleController<R, U, C = SystemClock> {
    radio: R,
    radio_filter: ScanFilter,
    filter: SightingFilter,
    suppressor: DuplicateSuppressor,
    dispatcher: ReportDispatcher<U>,
    clock: C,
    config: CycleConfig,
    state: watch::Sender<CycleState>,
    events: Option<EventReceiver>,
}

impl<R: Radio, U: Uploader, C: Clock> ScanCycleController<R, U, C> {
    pub fn new(
        radio: R,
        target: &ScanTarget,
        dispatcher: ReportDispatcher<U>,
        clock: C,
        config: CycleConfig,
    ) -> Self {
        let (state, _) = watch::channel(CycleState::Idle);
        Self {
            radio,
            radio_filter: ScanFilter::for_target(target),
            filter: SightingFilter::new(target),
            suppressor: DuplicateSuppressor::new(),
            dispatcher,
            clock,
            config,
            state,
            events: None,
        }
    }

    pub fn state(&self) -> CycleState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CycleState> {
        self.state.subscribe()
    }

    pub fn suppression_state(&self) -> &SuppressionState {
        self.suppressor.state()
    }

    pub fn into_radio(self) -> R {
        self.radio
    }

    fn set_state(&self, state: CycleState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!("Scan cycle {:?} -> {:?}", previous, state);
        }
    }

    fn open_window(&mut self) -> Result<EventReceiver, SessionError> {
        match self
            .radio
            .start_scan(&self.radio_filter, &self.config.scan_settings)
        {
            Ok(events) => {
                self.set_state(CycleState::Scanning);
                info!("Start scanning ({:?})", self.radio_filter);
                Ok(events)
            }
            Err(e) => {
                error!("Failed to start scan: {}", e);
                self.set_state(CycleState::Stopped);
                Err(e.into())
            }
        }
    }

    /// Open the first scan window (`Idle → Scanning`). Does nothing unless
    /// the controller is still idle.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.state() != CycleState::Idle {
            return Ok(());
        }
        let events = self.open_window()?;
        self.events = Some(events);
        Ok(())
    }

    /// Route one advertisement. Returns the upload task if it was reported.
    pub fn handle_event(&mut self, event: RawEvent) -> Option<JoinHandle<()>> {
        if self.state() != CycleState::Scanning {
            trace!("Dropping event from {} while {:?}", event.address, self.state());
            return None;
        }

        if let Err(reason) = self.filter.check(&event) {
            trace!("Rejected {}: {:?}", event.address, reason);
            return None;
        }

        let sighting = Sighting {
            payload_hex: advertisement::truncated_hex(&event.data),
            address: event.address,
            rssi: event.rssi,
            observed_at: self.clock.now(),
        };

        match self.suppressor.admit(&sighting) {
            Verdict::Report => {
                info!("Found device: {} ({} dBm)", sighting.address, sighting.rssi);
                Some(self.dispatcher.dispatch(&sighting))
            }
            Verdict::TooSoon => {
                debug!("Last report: {}", sighting.address);
                None
            }
            Verdict::SameContent => {
                debug!("Same report: {}", sighting.address);
                None
            }
        }
    }

    /// Run scan windows until `cancel` fires or the radio fails. Always ends
    /// in [`CycleState::Stopped`] with a final stop request to the radio.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<(), SessionError> {
        if self.state() == CycleState::Stopped {
            return Ok(());
        }

        let result = self.cycle(cancel).await;

        self.radio.stop_scan();
        self.set_state(CycleState::Stopped);
        match &result {
            Ok(()) => info!("Scan session stopped"),
            Err(e) => error!("Scan session ended: {}", e),
        }
        result
    }

    async fn cycle(&mut self, cancel: &CancellationToken) -> Result<(), SessionError> {
        let mut events = match self.events.take() {
            Some(events) => events,
            None => self.open_window()?,
        };

        loop {
            let window = tokio::time::sleep(self.config.scan_window);
            tokio::pin!(window);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(()),
                    _ = &mut window => break,
                    event = events.recv() => match event {
                        Some(event) => {
                            self.handle_event(event);
                        }
                        None => return Err(RadioError::StreamClosed.into()),
                    },
                }
            }

            self.set_state(CycleState::Restarting);
            info!("Scan window elapsed, restarting scan");
            self.radio.stop_scan();
            // Anything still buffered arrived while restarting
            drop(events);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.config.restart_settle) => {}
            }

            events = self.open_window()?;
        }
    }
}
