//! Document Extraction
//!
//! Turns an uploaded PDF into the text a [`GenerationRequest`] carries.
//! Parsing is delegated to `pdf-extract` on the blocking pool. A PDF that
//! cannot be parsed still yields a response: file information plus a
//! fallback text, so the surface can keep going with degraded content.
//!
//! [`GenerationRequest`]: crate::GenerationRequest

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::fallback::EXTRACTION_FALLBACK_TEXT;

/// Prefix of a degraded document text built from file information
pub const CONTENT_SUMMARY_HEADER: &str = "CONTENT SUMMARY:";

/// Default chunk size for [`split_text_into_chunks`]
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Basic information about an uploaded file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// File name
    pub name: String,
    /// Human-readable size, e.g. `"12.34 KB"`
    pub size: String,
    /// MIME type
    #[serde(rename = "type")]
    pub content_type: String,
    /// When the file was received or last modified
    pub last_modified: String,
}

impl FileInfo {
    /// Describe a file received now
    pub fn new(name: impl Into<String>, size_bytes: u64, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: format_size(size_bytes),
            content_type: content_type.into(),
            last_modified: chrono::Local::now()
                .format("%-m/%-d/%Y, %-I:%M:%S %p")
                .to_string(),
        }
    }
}

/// Format a byte count as kilobytes with two decimals
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / 1024.0)
}

/// Successful extraction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedDocument {
    /// Extracted text
    pub text: String,
    /// Information about the uploaded file
    pub file_info: FileInfo,
}

/// Failed extraction, still answered with HTTP 200
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DegradedDocument {
    /// Error description
    pub error: String,
    /// Underlying cause
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Text to use in place of the document content
    pub fallback_text: String,
}

impl DegradedDocument {
    /// Degraded response for an extraction failure
    pub fn new(details: impl Into<String>) -> Self {
        Self {
            error: "Failed to process PDF".to_string(),
            details: Some(details.into()),
            fallback_text: EXTRACTION_FALLBACK_TEXT.to_string(),
        }
    }
}

/// Body of `POST /api/pdf`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentResponse {
    /// Text was extracted
    Extracted(ExtractedDocument),
    /// Text could not be extracted
    Degraded(DegradedDocument),
}

/// Extract the text of a PDF
///
/// Never fails: parser errors, parser panics and PDFs without a text layer
/// produce [`DocumentResponse::Degraded`].
pub async fn extract_document(
    bytes: Vec<u8>,
    name: impl Into<String>,
    content_type: impl Into<String>,
) -> DocumentResponse {
    let file_info = FileInfo::new(name, bytes.len() as u64, content_type);
    debug!(name = %file_info.name, size = %file_info.size, "Extracting document text");

    let result = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;

    match result {
        Ok(Ok(text)) if !text.trim().is_empty() => {
            DocumentResponse::Extracted(ExtractedDocument { text, file_info })
        }
        Ok(Ok(_)) => {
            warn!(name = %file_info.name, "PDF has no extractable text");
            DocumentResponse::Degraded(DegradedDocument::new("No text layer found in PDF"))
        }
        Ok(Err(e)) => {
            warn!(name = %file_info.name, error = %e, "Error processing PDF");
            DocumentResponse::Degraded(DegradedDocument::new(e.to_string()))
        }
        Err(e) => {
            warn!(name = %file_info.name, error = %e, "PDF parser aborted");
            DocumentResponse::Degraded(DegradedDocument::new("PDF parser aborted"))
        }
    }
}

/// Document text built from file information when extraction degraded
#[must_use]
pub fn content_summary(info: &FileInfo, body: &str) -> String {
    format!(
        "{CONTENT_SUMMARY_HEADER}\nFile: {}\nSize: {}\nType: {}\nLast Modified: {}\n\n{body}",
        info.name, info.size, info.content_type, info.last_modified
    )
}

/// Whether a document text is real content rather than a content summary
#[must_use]
pub fn is_full_content(text: &str) -> bool {
    !text.trim_start().starts_with(CONTENT_SUMMARY_HEADER)
}

/// Pack paragraphs into chunks of at most `chunk_size` characters
///
/// Paragraphs are separated by blank lines and never split, so a single
/// paragraph longer than `chunk_size` becomes its own oversized chunk.
#[must_use]
pub fn split_text_into_chunks(text: &str, chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n") {
        if !current.is_empty()
            && current.chars().count() + paragraph.chars().count() > chunk_size
        {
            chunks.push(current.trim().to_string());
            current.clear();
        }
        current.push_str(paragraph);
        current.push_str("\n\n");
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}
