use crate::domain::models::Sighting;
use crate::infrastructure::upload::Uploader;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument};

/// Sends admitted sightings without blocking the scan loop. Every dispatch
/// is its own task; failures are logged and dropped.
pub struct ReportDispatcher<U> {
    uploader: Arc<U>,
}

impl<U> Clone for ReportDispatcher<U> {
    fn clone(&self) -> Self {
        Self {
            uploader: Arc::clone(&self.uploader),
        }
    }
}

impl<U: Uploader> ReportDispatcher<U> {
    pub fn new(uploader: Arc<U>) -> Self {
        Self { uploader }
    }

    /// Fire-and-forget upload. The handle is only useful to tests.
    pub fn dispatch(&self, sighting: &Sighting) -> JoinHandle<()> {
        let uploader = Arc::clone(&self.uploader);
        let payload = sighting.to_payload();
        tokio::spawn(async move {
            let mac = payload.mac.clone();
            match uploader.send(payload).await {
                Ok(()) => info!("Reported sighting of {}", mac),
                Err(e) => warn!("Upload failed for {}: {}", mac, e),
            }
        }
        .in_current_span())
    }
}
