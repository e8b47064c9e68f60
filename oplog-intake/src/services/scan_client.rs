//! Scan/save service client
//!
//! HTTP implementation of [`IntakeBackend`]:
//! - `POST {base}scan`: multipart upload (part `file`), JSON object back
//! - `POST {base}save`: JSON record body, any 2xx is success
//!
//! No retries here: a failure surfaces on the item and the user decides.

use super::backend::{BackendError, IntakeBackend};
use crate::models::ImagePayload;
use oplog_common::config::{ServiceConfig, ServiceEndpoint};
use oplog_common::RecordFields;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

const USER_AGENT: &str = concat!("oplog-intake/", env!("CARGO_PKG_VERSION"));
const SCAN_PATH: &str = "scan";
const SAVE_PATH: &str = "save";

/// Recognition service + record store client
pub struct ScanServiceClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ScanServiceClient {
    pub fn new(endpoint: &ServiceEndpoint, timeout: Duration) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: endpoint.base_url(),
        })
    }

    /// Build from the resolved `[service]` configuration
    pub fn from_config(config: &ServiceConfig) -> Result<Self, BackendError> {
        Self::new(&config.endpoint(), Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Probe the service root
    pub async fn health(&self) -> Result<(), BackendError> {
        let response = self
            .http_client
            .get(&self.base_url)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        check_status(response.status())
    }
}

fn check_status(status: reqwest::StatusCode) -> Result<(), BackendError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(BackendError::Status(status.as_u16()))
    }
}

#[async_trait::async_trait]
impl IntakeBackend for ScanServiceClient {
    async fn recognize(&self, image: &ImagePayload) -> Result<RecordFields, BackendError> {
        let part = Part::bytes(image.data().to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(|e| BackendError::InvalidResponse(format!("bad MIME type: {}", e)))?;
        let form = Form::new().part("file", part);

        tracing::debug!(
            file = %image.file_name,
            bytes = image.len(),
            "Uploading image for recognition"
        );

        let response = self
            .http_client
            .post(self.url(SCAN_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        check_status(response.status())?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        let fields = RecordFields::from_json(body)
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        tracing::debug!(fields = fields.len(), "Recognition response decoded");
        Ok(fields)
    }

    async fn persist(&self, fields: &RecordFields) -> Result<(), BackendError> {
        let response = self
            .http_client
            .post(self.url(SAVE_PATH))
            .json(&fields.to_json())
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        check_status(response.status())
    }
}
