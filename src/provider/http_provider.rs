//! HTTP provider client for queue-style generation APIs
//!
//! A request is submitted to `{queue_url}/{invocation_id}`, its status is polled
//! (with logs) until it completes, and the result is fetched from the response URL.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::assets::{AssetUploader, LocalAsset};
use crate::config::ProviderConfig;
use crate::error::{AppError, Result};
use crate::provider::traits::{
    LogLine, ProgressSender, ProviderError, ProviderGateway, ProviderOutput, QueueUpdate,
};

/// Header naming the real target when requests go through a proxy
pub const PROXY_TARGET_HEADER: &str = "x-fal-target-url";

/// HTTP-based generation provider
pub struct HttpProvider {
    client: Client,
    config: ProviderConfig,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    request_id: String,
    #[serde(default)]
    status_url: Option<String>,
    #[serde(default)]
    response_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    logs: Option<Vec<LogLine>>,
}

#[derive(Debug, Serialize)]
struct InitiateUpload<'a> {
    content_type: &'a str,
    file_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct InitiatedUpload {
    upload_url: String,
    file_url: String,
}

impl HttpProvider {
    /// Create a new provider client from configuration
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build a request to `target`, routed through the proxy when one is configured
    fn request(&self, method: Method, target: &str) -> RequestBuilder {
        let builder = match &self.config.proxy_url {
            Some(proxy) => self
                .client
                .request(method, proxy)
                .header(PROXY_TARGET_HEADER, target),
            None => self.client.request(method, target),
        };

        if self.config.api_key.is_empty() {
            builder
        } else {
            builder.header("Authorization", format!("Key {}", self.config.api_key))
        }
    }

    fn submit_url(&self, invocation_id: &str) -> String {
        format!("{}/{}", self.config.queue_url.trim_end_matches('/'), invocation_id)
    }

    async fn poll_until_complete(&self, status_url: &str, progress: &ProgressSender) -> std::result::Result<(), ProviderError> {
        let target = with_logs_query(status_url);
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        let mut forwarded = 0usize;

        loop {
            let response = self
                .request(Method::GET, &target)
                .send()
                .await
                .map_err(transport_error)?;
            let status: StatusResponse = read_json(response).await?;

            // Status responses repeat the full log so far; forward only the tail
            let logs = status.logs.unwrap_or_default();
            if logs.len() > forwarded {
                let fresh = logs[forwarded..].to_vec();
                forwarded = logs.len();
                let _ = progress.send(QueueUpdate {
                    status: Some(status.status.clone()),
                    logs: fresh,
                });
            }

            match status.status.as_str() {
                "COMPLETED" => return Ok(()),
                "IN_QUEUE" | "IN_PROGRESS" => tokio::time::sleep(interval).await,
                other => {
                    return Err(ProviderError::new(format!("Unexpected queue status '{}'", other)));
                }
            }
        }
    }
}

fn with_logs_query(url: &str) -> String {
    if url.contains('?') {
        format!("{}&logs=1", url)
    } else {
        format!("{}?logs=1", url)
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    ProviderError::new(format!("Request to provider failed: {}", e))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> std::result::Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::from_response(status.as_u16(), &body));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::new(format!("Failed to parse provider response: {}", e)))
}

#[async_trait]
impl ProviderGateway for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn submit(
        &self,
        invocation_id: &str,
        input: serde_json::Value,
        progress: ProgressSender,
    ) -> std::result::Result<ProviderOutput, ProviderError> {
        let submit_url = self.submit_url(invocation_id);
        debug!(invocation_id = %invocation_id, url = %submit_url, "Submitting generation request");

        let response = self
            .request(Method::POST, &submit_url)
            .json(&input)
            .send()
            .await
            .map_err(transport_error)?;
        let submitted: SubmitResponse = read_json(response).await?;

        let status_url = submitted
            .status_url
            .unwrap_or_else(|| format!("{}/requests/{}/status", submit_url, submitted.request_id));
        let response_url = submitted
            .response_url
            .unwrap_or_else(|| format!("{}/requests/{}", submit_url, submitted.request_id));

        debug!(
            invocation_id = %invocation_id,
            request_id = %submitted.request_id,
            "Generation request queued"
        );

        self.poll_until_complete(&status_url, &progress).await?;

        let response = self
            .request(Method::GET, &response_url)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }
}

#[async_trait]
impl AssetUploader for HttpProvider {
    async fn upload(&self, asset: &LocalAsset) -> Result<String> {
        let content_type = asset.effective_content_type().unwrap_or("application/octet-stream");
        let initiate_url = format!(
            "{}/storage/upload/initiate",
            self.config.storage_url.trim_end_matches('/')
        );

        let response = self
            .request(Method::POST, &initiate_url)
            .json(&InitiateUpload {
                content_type,
                file_name: &asset.file_name,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UploadFailed(format!("Storage returned {}: {}", status, body)));
        }

        let initiated: InitiatedUpload = response.json().await?;

        let put = self
            .client
            .put(&initiated.upload_url)
            .header(CONTENT_TYPE, content_type)
            .body(asset.bytes.clone())
            .send()
            .await?;

        if !put.status().is_success() {
            let status = put.status();
            warn!(file = %asset.file_name, status = %status, "Asset upload rejected by storage");
            return Err(AppError::UploadFailed(format!("Upload of '{}' returned {}", asset.file_name, status)));
        }

        debug!(file = %asset.file_name, url = %initiated.file_url, "Uploaded reference asset");
        Ok(initiated.file_url)
    }
}
