//! Generation Requests
//!
//! The request a surface sends to the relay, and how it maps onto the
//! backend's chat request.
//!
//! The wire form accepts both the descriptive field names (`documentText`,
//! `question`, `modelId`, `topP`, ...) and the short ones older surfaces send
//! (`pdfContent`, `query`, `model`, `top_p`, ...).

use serde::{Deserialize, Deserializer, Serialize};

use crate::backend::{ChatMessage, ChatOptions, ChatRequest};
use crate::error::RelayError;

/// Model used when the caller does not name one
pub const DEFAULT_MODEL: &str = "llama2";

/// System prompt used when the caller does not supply one
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on the provided PDF content.\n\
Use only the information from the PDF to answer the question.\n\
If the answer cannot be found in the PDF content, say so clearly.";

/// Sampling parameters, each defaulted independently when omitted
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParameters {
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Nucleus sampling threshold
    #[serde(default = "default_top_p", alias = "top_p")]
    pub top_p: f32,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens", alias = "max_tokens")]
    pub max_tokens: u32,
    /// Presence penalty
    #[serde(default, alias = "presence_penalty")]
    pub presence_penalty: f32,
    /// Frequency penalty
    #[serde(default, alias = "frequency_penalty")]
    pub frequency_penalty: f32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_max_tokens() -> u32 {
    2000
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
        }
    }
}

impl GenerationParameters {
    /// Map onto the backend's option names
    #[must_use]
    pub fn to_options(&self) -> ChatOptions {
        ChatOptions {
            temperature: self.temperature,
            top_p: self.top_p,
            num_predict: self.max_tokens,
            presence_penalty: self.presence_penalty,
            frequency_penalty: self.frequency_penalty,
        }
    }
}

/// A question about a document, as sent by a surface
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Extracted document text
    #[serde(default, alias = "pdfContent", deserialize_with = "null_as_empty")]
    pub document_text: String,
    /// The user's question
    #[serde(default, alias = "query", deserialize_with = "null_as_empty")]
    pub question: String,
    /// Backend model id (relay default when absent)
    #[serde(default, alias = "model", skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// System prompt override (blank means default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Sampling parameters
    #[serde(default)]
    pub parameters: GenerationParameters,
}

/// `null` reads as an empty string, so validation reports it as missing
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl GenerationRequest {
    /// Create a request for a document and a question
    pub fn new(document_text: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            document_text: document_text.into(),
            question: question.into(),
            ..Default::default()
        }
    }

    /// Set the model id
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_id = Some(model.into());
        self
    }

    /// Set the system prompt
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the sampling parameters
    #[must_use]
    pub fn with_parameters(mut self, parameters: GenerationParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Reject requests without document text or question
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MissingFields`] when either field is blank.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.document_text.trim().is_empty() || self.question.trim().is_empty() {
            return Err(RelayError::MissingFields);
        }
        Ok(())
    }

    /// The model to use, falling back to `default_model`
    #[must_use]
    pub fn model_or<'a>(&'a self, default_model: &'a str) -> &'a str {
        self.model_id
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(default_model)
    }

    /// The system prompt to use
    #[must_use]
    pub fn effective_system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    /// The user message: document text and question joined by a fixed separator
    #[must_use]
    pub fn user_content(&self) -> String {
        format!(
            "PDF Content: {}\n\nQuestion: {}",
            self.document_text, self.question
        )
    }

    /// Build the backend chat request (always streaming)
    #[must_use]
    pub fn to_chat_request(&self, default_model: &str) -> ChatRequest {
        ChatRequest {
            model: self.model_or(default_model).to_string(),
            messages: vec![
                ChatMessage::system(self.effective_system_prompt()),
                ChatMessage::user(self.user_content()),
            ],
            stream: true,
            options: self.parameters.to_options(),
        }
    }
}
