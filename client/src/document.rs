//! Loaded Document
//!
//! The document text a session asks questions about. It is either the text
//! the relay extracted or a `CONTENT SUMMARY:` block built from file
//! information when extraction degraded.

use std::path::{Path, PathBuf};

use relay_core::{content_summary, is_full_content, FileInfo};

use crate::error::ClientError;

/// MIME type sent with uploaded PDFs
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Document text held by a session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedDocument {
    /// Text sent as document content with every question
    pub text: String,
    /// Whether `text` is extracted content rather than a summary
    pub full_content: bool,
    /// Information about the source file
    pub file_info: FileInfo,
}

impl LoadedDocument {
    /// Document with extracted text
    pub fn extracted(text: impl Into<String>, file_info: FileInfo) -> Self {
        let text = text.into();
        Self {
            full_content: is_full_content(&text),
            text,
            file_info,
        }
    }

    /// Document reduced to a content summary of `file_info`
    #[must_use]
    pub fn summary(file_info: FileInfo, body: &str) -> Self {
        Self {
            text: content_summary(&file_info, body),
            full_content: false,
            file_info,
        }
    }

    /// Whether there is any text to ask about
    #[must_use]
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// A file read from disk, ready for upload
#[derive(Clone, Debug)]
pub struct LocalFile {
    /// File name without directories
    pub name: String,
    /// Raw bytes
    pub bytes: Vec<u8>,
    /// MIME type guessed from the extension
    pub content_type: String,
}

impl LocalFile {
    /// Whether the file should go through PDF extraction
    #[must_use]
    pub fn is_pdf(&self) -> bool {
        self.content_type == PDF_CONTENT_TYPE
    }

    /// Use the file's own text as the document
    ///
    /// For plain text files that need no extraction.
    #[must_use]
    pub fn into_text_document(self) -> LoadedDocument {
        let file_info = FileInfo::new(&self.name, self.bytes.len() as u64, &self.content_type);
        LoadedDocument::extracted(String::from_utf8_lossy(&self.bytes), file_info)
    }
}

/// Read a document from disk
///
/// # Errors
///
/// Returns [`ClientError::DocumentRead`] when the file cannot be read.
pub async fn read_local_file(path: &Path) -> Result<LocalFile, ClientError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ClientError::DocumentRead {
            path: PathBuf::from(path),
            source,
        })?;

    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    let content_type = if is_pdf { PDF_CONTENT_TYPE } else { "text/plain" };

    Ok(LocalFile {
        name,
        bytes,
        content_type: content_type.to_string(),
    })
}
