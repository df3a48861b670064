use crate::domain::error::UploadError;
use crate::domain::models::ReportPayload;
use crate::domain::settings::Settings;
use crate::infrastructure::upload::Uploader;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// WebDAV credentials and target resource.
#[derive(Debug, Clone)]
pub struct WebdavConfig {
    /// Full resource URL the report is written to
    pub url: String,
    pub username: String,
    pub password: String,
}

impl WebdavConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            url: settings.webdav_url.trim().to_string(),
            username: settings.webdav_username.clone(),
            password: settings.webdav_password.clone(),
        }
    }
}

/// Writes each report as a JSON document with an HTTP PUT. The resource is
/// overwritten every time; the server keeps the latest sighting.
#[derive(Clone)]
pub struct WebdavUploader {
    client: Client,
    config: WebdavConfig,
}

impl WebdavUploader {
    pub fn new(config: WebdavConfig) -> Result<Self, UploadError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: WebdavConfig) -> Self {
        Self { client, config }
    }
}

impl Uploader for WebdavUploader {
    async fn send(&self, report: ReportPayload) -> Result<(), UploadError> {
        if self.config.url.is_empty() {
            return Err(UploadError::NotConfigured);
        }

        let body = serde_json::to_vec(&report)?;
        let mut request = self
            .client
            .put(&self.config.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        if !self.config.username.is_empty() {
            request = request.basic_auth(&self.config.username, Some(&self.config.password));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status.as_u16()));
        }

        debug!("Uploaded report for {} ({})", report.mac, status);
        Ok(())
    }
}
