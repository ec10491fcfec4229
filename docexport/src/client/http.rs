//! reqwest-backed [`DocumentService`] for the Coda REST API v1.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{CanvasContent, ContentUpdate, CreatedPage, DocumentService, NewPage, UpdateReceipt};
use crate::config::ApiConfig;
use crate::core::{ExportFormat, ExportStatusReport, ExportSubmission, JobStatus, PageRef};
use crate::errors::{ConfigError, ExportError};

/// Longest service message copied into an error.
const MAX_ERROR_MESSAGE_LEN: usize = 200;

/// HTTP client for the document service.
#[derive(Debug, Clone)]
pub struct HttpDocumentService {
    client: Client,
    base_url: Url,
    config: ApiConfig,
}

impl HttpDocumentService {
    /// Creates a client from validated API settings.
    pub fn new(config: ApiConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ConfigError::invalid("base_url", e.to_string()))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ConfigError::invalid("http_client", e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Builds an API URL from unencoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ExportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ExportError::InvalidRequest("base URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ExportError> {
        let response = request
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ExportError::TransientService(format!("unexpected response body: {e}")))
    }
}

#[async_trait]
impl DocumentService for HttpDocumentService {
    async fn submit_export(
        &self,
        page: &PageRef,
        format: ExportFormat,
    ) -> Result<ExportSubmission, ExportError> {
        let url = self.endpoint(&[
            "docs",
            &page.document_id,
            "pages",
            &page.page_id_or_name,
            "export",
        ])?;
        let body = json!({ "outputFormat": format.as_str() });

        let response: ExportResponse = self.send_json(self.client.post(url).json(&body)).await?;
        tracing::debug!(job_id = %response.id, page = %page, "Export submitted");

        Ok(ExportSubmission {
            job_id: response.id.clone(),
            report: response.into_report(),
        })
    }

    async fn get_export_status(
        &self,
        page: &PageRef,
        job_id: &str,
    ) -> Result<ExportStatusReport, ExportError> {
        let url = self.endpoint(&[
            "docs",
            &page.document_id,
            "pages",
            &page.page_id_or_name,
            "export",
            job_id,
        ])?;

        let response: ExportResponse = self.send_json(self.client.get(url)).await?;
        Ok(response.into_report())
    }

    async fn download_content(&self, content_locator: &str) -> Result<String, ExportError> {
        let url = Url::parse(content_locator)
            .map_err(|e| ExportError::Fetch(format!("invalid content locator: {e}")))?;

        // Download links are pre-signed; the API token is not sent.
        let response = self.client.get(url).send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ExportError::Fetch("content is not valid UTF-8".to_string()))
    }

    async fn create_page(
        &self,
        document_id: &str,
        page: &NewPage,
    ) -> Result<CreatedPage, ExportError> {
        let url = self.endpoint(&["docs", document_id, "pages"])?;
        let body = create_page_body(page);

        self.send_json(self.client.post(url).json(&body)).await
    }

    async fn update_page_content(
        &self,
        page: &PageRef,
        update: &ContentUpdate,
    ) -> Result<UpdateReceipt, ExportError> {
        let url = self.endpoint(&["docs", &page.document_id, "pages", &page.page_id_or_name])?;
        let body = update_page_body(update);

        self.send_json(self.client.put(url).json(&body)).await
    }
}

/// Export status as the API spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
enum WireStatus {
    Pending,
    InProgress,
    Complete,
    Failed,
    #[serde(other)]
    Unknown,
}

impl From<WireStatus> for JobStatus {
    fn from(status: WireStatus) -> Self {
        match status {
            WireStatus::Pending => Self::Pending,
            // Unrecognized states are not terminal; keep polling.
            WireStatus::InProgress | WireStatus::Unknown => Self::InProgress,
            WireStatus::Complete => Self::Complete,
            WireStatus::Failed => Self::Failed,
        }
    }
}

/// Body of the export submit and export status endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportResponse {
    id: String,
    status: WireStatus,
    #[serde(default)]
    download_link: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ExportResponse {
    fn into_report(self) -> ExportStatusReport {
        ExportStatusReport {
            status: self.status.into(),
            content_locator: self.download_link,
            failure_reason: self.error,
        }
    }
}

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status_message: Option<String>,
}

fn canvas_content(content: &CanvasContent) -> Value {
    json!({
        "format": content.format.as_str(),
        "content": content.content,
    })
}

/// Body of the create page endpoint.
fn create_page_body(page: &NewPage) -> Value {
    let mut body = json!({ "name": page.name });
    if let Some(content) = &page.content {
        body["pageContent"] = json!({
            "type": "canvas",
            "canvasContent": canvas_content(content),
        });
    }
    body
}

/// Body of the update page endpoint.
fn update_page_body(update: &ContentUpdate) -> Value {
    json!({
        "contentUpdate": {
            "insertionMode": update.mode.as_str(),
            "canvasContent": canvas_content(&update.content),
        },
    })
}

fn transport_error(err: reqwest::Error) -> ExportError {
    if err.is_timeout() {
        ExportError::TransientService("request timed out".to_string())
    } else if err.is_connect() {
        ExportError::TransientService("could not connect to the document service".to_string())
    } else {
        ExportError::TransientService(format!("request failed: {err}"))
    }
}

/// Maps a non-success HTTP status to an error kind.
fn classify_status(status: StatusCode, body: &str) -> ExportError {
    let message = error_message(status, body);

    if status == StatusCode::NOT_FOUND {
        ExportError::NotFound(message)
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ExportError::TransientService(message)
    } else {
        ExportError::InvalidRequest(message)
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.status_message))
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_default();
    let detail: String = detail.chars().take(MAX_ERROR_MESSAGE_LEN).collect();

    format!("HTTP {}: {}", status.as_u16(), detail)
}
