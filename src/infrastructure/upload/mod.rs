//! Upload collaborators
//!
//! - [`webdav`] - PUT reports to a WebDAV server
//! - [`RecordingUploader`] - in-memory sink, for dry runs and tests

pub mod webdav;

use crate::domain::error::UploadError;
use crate::domain::models::ReportPayload;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::info;

pub use webdav::WebdavUploader;

pub trait Uploader: Send + Sync + 'static {
    fn send(&self, report: ReportPayload)
        -> impl Future<Output = Result<(), UploadError>> + Send;
}

/// Keeps every report in memory. Can be told to fail the next N sends.
#[derive(Clone, Default)]
pub struct RecordingUploader {
    reports: Arc<Mutex<Vec<ReportPayload>>>,
    fail_next: Arc<Mutex<usize>>,
}

impl RecordingUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, count: usize) {
        *self.fail_next.lock().unwrap_or_else(|e| e.into_inner()) = count;
    }

    pub fn reports(&self) -> Vec<ReportPayload> {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Uploader for RecordingUploader {
    async fn send(&self, report: ReportPayload) -> Result<(), UploadError> {
        {
            let mut fail = self.fail_next.lock().unwrap_or_else(|e| e.into_inner());
            if *fail > 0 {
                *fail -= 1;
                return Err(UploadError::Network("simulated failure".into()));
            }
        }
        info!("Report {} {} {} {}", report.time, report.mac, report.rssi, report.data);
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(report);
        Ok(())
    }
}
