//! HTTP client for the loan backend.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::{
    error::{ApiError, ApiVerb, Result},
    types::{ApplicationData, ApplyRequest, ChatReply, ChatRequest, DocumentFile, UploadResult},
};

/// Operations the UI needs from the loan backend.
///
/// Each call is a single attempt: no retry, no timeout, no backoff.
#[async_trait]
pub trait LoanBackend: Send + Sync {
    /// `POST /api/chat`.
    async fn post_chat(&self, request: &ChatRequest) -> Result<ChatReply>;

    /// `POST /api/apply`. The reply body is returned as-is.
    async fn save_application(&self, session_id: &str, data: &ApplicationData) -> Result<Value>;

    /// `POST /api/upload` as multipart `{file, sessionId}`.
    async fn upload_doc(&self, session_id: &str, file: DocumentFile) -> Result<UploadResult>;

    /// Direct link to a generated sanction letter. Never fetched by the UI.
    fn download_url(&self, pdf_id: &str) -> String;
}

/// reqwest-backed [`LoanBackend`].
///
/// # Example
///
/// ```rust,no_run
/// use loan_advisor_ui::api::{ChatRequest, LoanApiClient, LoanBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = LoanApiClient::new("http://localhost:5000")?;
/// let reply = client
///     .post_chat(&ChatRequest::new("session-1", "hello"))
///     .await?;
/// println!("{:?}", reply.reply);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LoanApiClient {
    base_url: Url,
    http: reqwest::Client,
}

impl LoanApiClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The backend base URL (e.g., "http://localhost:5000")
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a new client with a custom reqwest client.
    pub fn with_client(base_url: impl AsRef<str>, http: reqwest::Client) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self { base_url, http })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Append path segments to the base URL, keeping any base path prefix.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn handle_response<T: DeserializeOwned>(
        verb: ApiVerb,
        response: std::result::Result<reqwest::Response, reqwest::Error>,
    ) -> Result<T> {
        let response = response.map_err(|source| {
            tracing::warn!(
                name: "backend.request.failed",
                verb = %verb,
                error = %source,
                "Backend request failed"
            );
            ApiError::Transport { verb, source }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                name: "backend.request.failed",
                verb = %verb,
                status = status.as_u16(),
                "Backend returned an error status"
            );
            return Err(ApiError::Status {
                verb,
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|source| ApiError::Decode { verb, source })
    }
}

#[async_trait]
impl LoanBackend for LoanApiClient {
    async fn post_chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let response = self
            .http
            .post(self.url(&["api", "chat"]))
            .json(request)
            .send()
            .await;
        Self::handle_response(ApiVerb::Chat, response).await
    }

    async fn save_application(&self, session_id: &str, data: &ApplicationData) -> Result<Value> {
        let body = ApplyRequest { session_id, data };
        let response = self
            .http
            .post(self.url(&["api", "apply"]))
            .json(&body)
            .send()
            .await;
        Self::handle_response(ApiVerb::Apply, response).await
    }

    async fn upload_doc(&self, session_id: &str, file: DocumentFile) -> Result<UploadResult> {
        let content_type = file.resolved_content_type();
        let size = file.bytes.len();
        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.file_name.clone())
            .mime_str(&content_type)
            .map_err(|e| ApiError::InvalidRequest {
                verb: ApiVerb::Upload,
                message: format!("invalid content type '{content_type}': {e}"),
            })?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("sessionId", session_id.to_string());

        tracing::info!(
            name: "upload.forwarded",
            file_name = %file.file_name,
            content_type = %content_type,
            size = size,
            "Forwarding document to backend"
        );

        let response = self
            .http
            .post(self.url(&["api", "upload"]))
            .multipart(form)
            .send()
            .await;
        Self::handle_response(ApiVerb::Upload, response).await
    }

    fn download_url(&self, pdf_id: &str) -> String {
        self.url(&["api", "download", pdf_id]).to_string()
    }
}
