//! Relay Transport
//!
//! HTTP access to the relay daemon. [`RelayClient::send`] inspects the
//! response shape before anything is streamed: only a successful plain text
//! response becomes [`RelayReply::Stream`]; JSON bodies are decoded into the
//! fallback, model-not-found and error cases.

use std::time::Duration;

use relay_core::fallback::EXTRACTION_UNAVAILABLE_TEXT;
use relay_core::{DocumentResponse, ErrorBody, FileInfo, GenerationRequest, ModelList};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::document::{LoadedDocument, LocalFile};
use crate::error::ClientError;

/// Default relay address
pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000";

/// What the relay answered to a question
#[derive(Debug)]
pub enum RelayReply {
    /// A plain text stream to read chunk by chunk
    Stream(reqwest::Response),
    /// A complete degraded answer
    Fallback(String),
    /// The requested model is not installed
    ModelNotFound(String),
    /// Any other error
    Error {
        /// HTTP status
        status: u16,
        /// Error message
        message: String,
    },
}

/// Client for the relay daemon
#[derive(Clone, Debug)]
pub struct RelayClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl Default for RelayClient {
    fn default() -> Self {
        Self::new(DEFAULT_RELAY_URL)
    }
}

impl RelayClient {
    /// Create a client for the relay at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http_client: reqwest::Client::new(),
        }
    }

    /// Relay base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, route: &str) -> String {
        format!("{}{route}", self.base_url)
    }

    /// Ask a question
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] when the relay cannot be reached.
    pub async fn send(&self, request: &GenerationRequest) -> Result<RelayReply, ClientError> {
        let response = self
            .http_client
            .post(self.endpoint("/api/chat"))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));

        debug!(status = %status, is_json, "Relay responded");

        if status.is_success() && !is_json {
            return Ok(RelayReply::Stream(response));
        }

        let text = response.text().await?;
        let Ok(body) = serde_json::from_str::<ErrorBody>(&text) else {
            let message = if text.trim().is_empty() {
                format!("HTTP error! status: {}", status.as_u16())
            } else {
                text
            };
            return Ok(RelayReply::Error {
                status: status.as_u16(),
                message,
            });
        };

        if let Some(fallback) = body.fallback_response {
            return Ok(RelayReply::Fallback(fallback));
        }
        if let Some(model) = body.missing_model() {
            return Ok(RelayReply::ModelNotFound(model.to_string()));
        }
        Ok(RelayReply::Error {
            status: status.as_u16(),
            message: body.error,
        })
    }

    /// Models offered by the relay
    ///
    /// Falls back to the static list when the relay cannot be queried.
    pub async fn list_models(&self) -> ModelList {
        let result = async {
            self.http_client
                .get(self.endpoint("/api/models"))
                .timeout(Duration::from_secs(5))
                .send()
                .await?
                .error_for_status()?
                .json::<ModelList>()
                .await
        }
        .await;

        result.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to fetch models from relay");
            ModelList::fallback(e.to_string())
        })
    }

    /// Upload a PDF for extraction
    ///
    /// Never fails: a degraded or unreachable extraction yields a content
    /// summary built from the file's own information.
    pub async fn upload_document(&self, file: LocalFile) -> LoadedDocument {
        let file_info = FileInfo::new(&file.name, file.bytes.len() as u64, &file.content_type);

        match self.post_document(file).await {
            Ok(DocumentResponse::Extracted(doc)) => {
                debug!(name = %doc.file_info.name, chars = doc.text.len(), "Document extracted");
                LoadedDocument::extracted(doc.text, doc.file_info)
            }
            Ok(DocumentResponse::Degraded(degraded)) => {
                warn!(
                    error = %degraded.error,
                    details = ?degraded.details,
                    "Relay could not extract document text"
                );
                LoadedDocument::summary(file_info, &degraded.fallback_text)
            }
            Err(e) => {
                warn!(error = %e, "Document upload failed");
                LoadedDocument::summary(file_info, EXTRACTION_UNAVAILABLE_TEXT)
            }
        }
    }

    async fn post_document(&self, file: LocalFile) -> Result<DocumentResponse, reqwest::Error> {
        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.content_type)?;
        let form = reqwest::multipart::Form::new().part("pdf", part);

        self.http_client
            .post(self.endpoint("/api/pdf"))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json::<DocumentResponse>()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = RelayClient::new("http://relay:3000/");
        assert_eq!(client.base_url(), "http://relay:3000");
        assert_eq!(client.endpoint("/api/chat"), "http://relay:3000/api/chat");
        assert_eq!(RelayClient::default().base_url(), DEFAULT_RELAY_URL);
    }
}
