//! Model Listing
//!
//! Lists the models installed in the backend. When the backend cannot be
//! queried the caller still gets a usable list, flagged as a fallback.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend::LlmBackend;

/// Models offered when the backend cannot be queried
pub const FALLBACK_MODELS: [&str; 7] = [
    "llama2",
    "mistral",
    "gemma",
    "phi",
    "codellama",
    "llama3",
    "orca-mini",
];

/// Body of `GET /api/models`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelList {
    /// Model ids
    pub models: Vec<String>,
    /// Whether `models` is the static fallback list
    #[serde(default, skip_serializing_if = "is_false")]
    pub fallback: bool,
    /// Why the backend could not be queried
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

impl ModelList {
    /// The static fallback list with the reason it was used
    pub fn fallback(error: impl Into<String>) -> Self {
        Self {
            models: FALLBACK_MODELS.iter().map(ToString::to_string).collect(),
            fallback: true,
            error: Some(error.into()),
        }
    }
}

/// Query the backend for its models
pub async fn available_models(backend: &dyn LlmBackend) -> ModelList {
    match backend.list_models().await {
        Ok(models) => ModelList {
            models: models.into_iter().map(|m| m.name).collect(),
            fallback: false,
            error: None,
        },
        Err(e) => {
            warn!(error = %e, "Error fetching models, using fallback list");
            ModelList::fallback(e.to_string())
        }
    }
}
