//! `POST /api/pdf`
//!
//! Multipart upload of one PDF under the field `pdf` (or `file`). Extraction
//! failures are answered with HTTP 200 and a degraded body, so a surface can
//! continue with the fallback text.

use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{info, warn};

use relay_core::{extract_document, ErrorBody};

/// Multipart field names accepted for the uploaded file
pub const FILE_FIELDS: [&str; 2] = ["pdf", "file"];

/// Extract the text of an uploaded PDF
pub async fn upload_document(mut multipart: Multipart) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Invalid multipart upload");
                return (e.status(), Json(ErrorBody::new(e.body_text()))).into_response();
            }
        };

        let is_file = field.name().is_some_and(|name| FILE_FIELDS.contains(&name));
        if !is_file {
            continue;
        }

        let name = field.file_name().unwrap_or("document.pdf").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/pdf")
            .to_string();

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, name = %name, "Failed to read uploaded file");
                return (e.status(), Json(ErrorBody::new(e.body_text()))).into_response();
            }
        };

        info!(name = %name, bytes = bytes.len(), "Processing PDF upload");
        return Json(extract_document(bytes.to_vec(), name, content_type).await).into_response();
    }

    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody::new("No PDF file provided")),
    )
        .into_response()
}
