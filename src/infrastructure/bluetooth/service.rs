//! Scan Service
//!
//! Owns one scan session at a time. Starting a session checks the target,
//! takes the keep-alive lock and spawns a [`ScanCycleController`] on its own
//! task; stopping cancels it and waits for the radio to be released.

use crate::domain::error::{RadioError, SessionError};
use crate::domain::filter::SightingFilter;
use crate::domain::models::CycleState;
use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::controller::{
    Clock, CycleConfig, ScanCycleController, SystemClock,
};
use crate::infrastructure::bluetooth::dispatcher::ReportDispatcher;
use crate::infrastructure::bluetooth::radio::Radio;
use crate::infrastructure::keep_alive::{KeepAlive, KeepAliveGuard};
use crate::infrastructure::upload::Uploader;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

type SessionOutput<R> = (R, Result<(), SessionError>);

struct Session<R> {
    cancel: CancellationToken,
    task: JoinHandle<SessionOutput<R>>,
    state: watch::Receiver<CycleState>,
}

pub struct ScanService<R, U, C = SystemClock> {
    radio: Option<R>,
    uploader: Arc<U>,
    keep_alive: Arc<dyn KeepAlive>,
    clock: C,
    session: Option<Session<R>>,
}

impl<R: Radio, U: Uploader> ScanService<R, U, SystemClock> {
    pub fn new(radio: R, uploader: Arc<U>, keep_alive: Arc<dyn KeepAlive>) -> Self {
        Self::with_clock(radio, uploader, keep_alive, SystemClock)
    }
}

impl<R: Radio, U: Uploader, C: Clock + Clone> ScanService<R, U, C> {
    pub fn with_clock(
        radio: R,
        uploader: Arc<U>,
        keep_alive: Arc<dyn KeepAlive>,
        clock: C,
    ) -> Self {
        Self {
            radio: Some(radio),
            uploader,
            keep_alive,
            clock,
            session: None,
        }
    }

    /// Start a session for the target in `settings`.
    ///
    /// Fails without touching the radio when no target is configured. A radio
    /// that refuses to scan is reported here rather than from [`wait`].
    ///
    /// [`wait`]: ScanService::wait
    pub async fn start(&mut self, settings: &Settings) -> Result<(), SessionError> {
        let target = settings.scan_target();
        if !target.is_configured() {
            warn!("Refusing to start: no target address or manufacturer set");
            return Err(SessionError::NoTarget);
        }

        if self.is_running() {
            return Err(SessionError::AlreadyRunning);
        }
        if let Some(name) = SightingFilter::new(&target).unknown_manufacturer() {
            warn!(
                "Manufacturer {:?} is not a known company name and will never match; use the 0xNNNN identifier",
                name
            );
        }
        // Collect a session that already ended on its own
        if let Some(Err(e)) = self.reap().await {
            warn!("Previous scan session had failed: {}", e);
        }

        let radio = self
            .radio
            .take()
            .ok_or_else(|| RadioError::Backend("radio lost with previous session".into()))?;

        let mut controller = ScanCycleController::new(
            radio,
            &target,
            ReportDispatcher::new(Arc::clone(&self.uploader)),
            self.clock.clone(),
            CycleConfig::from_settings(settings),
        );
        let guard = KeepAliveGuard::acquire(Arc::clone(&self.keep_alive));

        if let Err(e) = controller.start() {
            drop(guard);
            self.radio = Some(controller.into_radio());
            return Err(e);
        }

        info!(
            "Scan session started (address: {:?}, manufacturer: {:?})",
            target.address, target.manufacturer
        );

        let cancel = CancellationToken::new();
        let state = controller.subscribe();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(
            async move {
                let _keep_alive = guard;
                let result = controller.run(&task_cancel).await;
                (controller.into_radio(), result)
            }
            .in_current_span(),
        );

        self.session = Some(Session {
            cancel,
            task,
            state,
        });
        Ok(())
    }

    /// Cancel the running session, wait for it to release the radio and for
    /// the radio's final stop request to complete. Safe to call repeatedly.
    pub async fn stop(&mut self) {
        if let Some(session) = &self.session {
            session.cancel.cancel();
        }
        if let Some(Err(e)) = self.reap().await {
            warn!("Scan session had failed: {}", e);
        }
        if let Some(radio) = self.radio.as_mut() {
            radio.shutdown().await;
        }
    }

    /// Wait for the current session to end on its own. Returns immediately
    /// with `Ok` when there is none. Cancel safe.
    pub async fn wait(&mut self) -> Result<(), SessionError> {
        self.reap().await.unwrap_or(Ok(()))
    }

    async fn reap(&mut self) -> Option<Result<(), SessionError>> {
        let session = self.session.as_mut()?;
        let output = (&mut session.task).await;
        self.session = None;

        match output {
            Ok((radio, result)) => {
                self.radio = Some(radio);
                Some(result)
            }
            Err(e) => {
                warn!("Scan session task aborted: {}", e);
                Some(Err(RadioError::Backend(format!("session task aborted: {}", e)).into()))
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| !session.task.is_finished())
    }

    pub fn state(&self) -> CycleState {
        match &self.session {
            Some(session) => *session.state.borrow(),
            None => CycleState::Idle,
        }
    }

    pub fn radio(&self) -> Option<&R> {
        self.radio.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bluetooth::radio::SimulatedRadio;
    use crate::infrastructure::keep_alive::ProcessKeepAlive;
    use crate::infrastructure::upload::RecordingUploader;
    use tracing_test::traced_test;

    fn settings(address: &str, manufacturer: &str) -> Settings {
        Settings {
            target_address: address.into(),
            target_manufacturer: manufacturer.into(),
            ..Settings::default()
        }
    }

    fn service(
        radio: &SimulatedRadio,
        lock: &Arc<ProcessKeepAlive>,
    ) -> ScanService<SimulatedRadio, RecordingUploader> {
        ScanService::new(
            radio.clone(),
            Arc::new(RecordingUploader::new()),
            lock.clone(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_target_refuses_to_start() {
        let radio = SimulatedRadio::new();
        let lock = Arc::new(ProcessKeepAlive::new());
        let mut service = service(&radio, &lock);

        assert!(matches!(
            service.start(&settings("  ", "")).await,
            Err(SessionError::NoTarget)
        ));
        assert_eq!(radio.start_count(), 0);
        assert!(!lock.is_held());
        assert!(!service.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_stop_lifecycle() {
        let radio = SimulatedRadio::new();
        let lock = Arc::new(ProcessKeepAlive::new());
        let mut service = service(&radio, &lock);

        service.start(&settings("AA:BB:CC:DD:EE:FF", "")).await.unwrap();
        assert!(service.is_running());
        assert!(lock.is_held());
        assert_eq!(service.state(), CycleState::Scanning);
        assert!(matches!(
            service.start(&settings("AA:BB:CC:DD:EE:FF", "")).await,
            Err(SessionError::AlreadyRunning)
        ));

        service.stop().await;
        assert!(!service.is_running());
        assert!(!lock.is_held());
        assert!(!radio.is_scanning());
        // Idempotent
        service.stop().await;

        // The radio is handed back, so a new session can start
        service.start(&settings("", "Apple, Inc.")).await.unwrap();
        assert_eq!(radio.start_count(), 2);
        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_unknown_manufacturer_name_warns() {
        let radio = SimulatedRadio::new();
        let lock = Arc::new(ProcessKeepAlive::new());
        let mut service = service(&radio, &lock);

        service.start(&settings("", "Apple Inc.")).await.unwrap();
        assert!(logs_contain("\"Apple Inc.\" is not a known company name"));
        service.stop().await;

        service.start(&settings("", "Apple, Inc.")).await.unwrap();
        assert!(!logs_contain("\"Apple, Inc.\" is not a known company name"));
        service.stop().await;
    }

    /// Radio whose stop request completes on a background task, like the
    /// btleplug adapter.
    struct DeferredStopRadio {
        inner: SimulatedRadio,
        stopped: Arc<std::sync::atomic::AtomicBool>,
        stopping: Option<JoinHandle<()>>,
    }

    impl Radio for DeferredStopRadio {
        fn start_scan(
            &mut self,
            filter: &crate::infrastructure::bluetooth::radio::ScanFilter,
            settings: &crate::infrastructure::bluetooth::radio::ScanSettings,
        ) -> Result<crate::infrastructure::bluetooth::radio::EventReceiver, RadioError> {
            self.inner.start_scan(filter, settings)
        }

        fn stop_scan(&mut self) {
            self.inner.stop_scan();
            let stopped = Arc::clone(&self.stopped);
            self.stopping = Some(tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                stopped.store(true, std::sync::atomic::Ordering::SeqCst);
            }));
        }

        async fn shutdown(&mut self) {
            if let Some(stopping) = self.stopping.take() {
                let _ = stopping.await;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_final_stop_request() {
        let stopped = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let radio = DeferredStopRadio {
            inner: SimulatedRadio::new(),
            stopped: Arc::clone(&stopped),
            stopping: None,
        };
        let mut service = ScanService::new(
            radio,
            Arc::new(RecordingUploader::new()),
            Arc::new(ProcessKeepAlive::new()),
        );

        service.start(&settings("AA:BB:CC:DD:EE:FF", "")).await.unwrap();
        service.stop().await;
        assert!(stopped.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_radio_fails_start() {
        let radio = SimulatedRadio::new();
        radio.set_enabled(false);
        let lock = Arc::new(ProcessKeepAlive::new());
        let mut service = service(&radio, &lock);

        assert!(matches!(
            service.start(&settings("AA:BB:CC:DD:EE:FF", "")).await,
            Err(SessionError::RadioUnavailable(RadioError::Disabled))
        ));
        assert!(!lock.is_held());
        assert!(service.radio().is_some());

        radio.set_enabled(true);
        service.start(&settings("AA:BB:CC:DD:EE:FF", "")).await.unwrap();
        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_reports_radio_loss() {
        let radio = SimulatedRadio::new();
        let lock = Arc::new(ProcessKeepAlive::new());
        let mut service = service(&radio, &lock);

        service.start(&settings("AA:BB:CC:DD:EE:FF", "")).await.unwrap();
        radio.set_enabled(false);

        assert!(matches!(
            service.wait().await,
            Err(SessionError::RadioUnavailable(RadioError::StreamClosed))
        ));
        assert!(!lock.is_held());
        assert_eq!(service.state(), CycleState::Idle);
    }
}
