//! Session Controller
//!
//! Drives one question at a time through a [`StreamSession`]. The answer in
//! progress is published on a `watch` channel so a surface can redraw it as
//! chunks arrive; the committed result is returned as an [`Outcome`] and
//! appended to the [`Transcript`].
//!
//! `submit` takes `&mut self`, so a controller never has two requests in
//! flight.

use futures::StreamExt;
use relay_core::fallback::missing_model_instructions;
use relay_core::{GenerationParameters, GenerationRequest};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::document::LoadedDocument;
use crate::error::ClientError;
use crate::messages::{ConversationMessage, Transcript};
use crate::session::{SessionState, StreamSession};
use crate::transport::{RelayClient, RelayReply};

/// Notice committed when a request is cancelled before any text arrived
pub const CANCELLED_NOTICE: &str = "Response stopped by user";

/// Generation settings sent with every question
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatSettings {
    /// Model id, relay default when `None`
    pub model: Option<String>,
    /// System prompt override
    pub system_prompt: Option<String>,
    /// Sampling parameters
    pub parameters: GenerationParameters,
}

/// Result of one submitted question
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    /// Terminal state of the session
    pub state: SessionState,
    /// Committed assistant message, if any text was produced
    pub message: Option<ConversationMessage>,
    /// System notice describing an error or cancellation
    pub notice: Option<ConversationMessage>,
}

/// Client-side session controller
#[derive(Debug)]
pub struct SessionController {
    client: RelayClient,
    settings: ChatSettings,
    document: Option<LoadedDocument>,
    transcript: Transcript,
    progress: watch::Sender<String>,
}

impl SessionController {
    /// Create a controller without a document
    #[must_use]
    pub fn new(client: RelayClient, settings: ChatSettings) -> Self {
        let (progress, _) = watch::channel(String::new());
        Self {
            client,
            settings,
            document: None,
            transcript: Transcript::new(),
            progress,
        }
    }

    /// Current settings
    #[must_use]
    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Mutable settings, applied from the next question on
    pub fn settings_mut(&mut self) -> &mut ChatSettings {
        &mut self.settings
    }

    /// Loaded document
    #[must_use]
    pub fn document(&self) -> Option<&LoadedDocument> {
        self.document.as_ref()
    }

    /// Conversation so far
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Watch the answer in progress
    ///
    /// The value is the whole buffer so far, reset to empty on each submit.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.progress.subscribe()
    }

    /// Replace the document and start a fresh conversation
    pub fn load_document(&mut self, document: LoadedDocument) {
        let notice = if document.full_content {
            format!(
                "PDF \"{}\" ({}) loaded. Ask a question about its content.",
                document.file_info.name, document.file_info.size
            )
        } else {
            format!(
                "PDF \"{}\" ({}) loaded, but its text could not be extracted. \
                 Answers will be based on basic file information only.",
                document.file_info.name, document.file_info.size
            )
        };
        info!(
            name = %document.file_info.name,
            full_content = document.full_content,
            "Document loaded"
        );

        self.transcript.clear();
        self.transcript.push(ConversationMessage::system(notice));
        self.document = Some(document);
    }

    /// Ask a question about the loaded document
    ///
    /// Resolves once the session reaches a terminal state. Cancelling
    /// `cancel` stops reading and drops the relay connection; the partial
    /// answer is committed with an interruption marker.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoDocument`] without any network call when no
    /// document text is loaded.
    pub async fn submit(
        &mut self,
        question: &str,
        cancel: CancellationToken,
    ) -> Result<Outcome, ClientError> {
        let document_text = match &self.document {
            Some(doc) if doc.has_text() => doc.text.clone(),
            _ => return Err(ClientError::NoDocument),
        };

        let mut request = GenerationRequest::new(document_text, question)
            .with_parameters(self.settings.parameters);
        request.model_id.clone_from(&self.settings.model);
        request.system_prompt.clone_from(&self.settings.system_prompt);

        self.transcript.push(ConversationMessage::user(question));
        self.progress.send_replace(String::new());

        let mut session = StreamSession::new();
        session.transition(SessionState::Sending)?;

        let reply = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            reply = self.client.send(&request) => Some(reply),
        };

        let outcome = match reply {
            None => {
                debug!("Cancelled before the relay answered");
                session.transition(SessionState::Cancelled)?;
                Outcome {
                    state: SessionState::Cancelled,
                    message: None,
                    notice: Some(ConversationMessage::system(CANCELLED_NOTICE)),
                }
            }
            Some(Err(e)) => {
                warn!(error = %e, "Request to relay failed");
                session.fail()?;
                Self::failed(None, e.to_string())
            }
            Some(Ok(RelayReply::Fallback(text))) => {
                let text = session.complete_with(text)?;
                Outcome {
                    state: SessionState::Completed,
                    message: Some(ConversationMessage::assistant(text)),
                    notice: None,
                }
            }
            Some(Ok(RelayReply::ModelNotFound(model))) => {
                warn!(model = %model, "Model not installed");
                session.fail()?;
                Self::failed(None, missing_model_instructions(&model))
            }
            Some(Ok(RelayReply::Error { status, message })) => {
                warn!(status, error = %message, "Relay returned an error");
                session.fail()?;
                Self::failed(None, ClientError::Relay { status, message }.to_string())
            }
            Some(Ok(RelayReply::Stream(response))) => {
                session.transition(SessionState::Streaming)?;
                self.read_stream(&mut session, response, &cancel).await?
            }
        };

        if let Some(message) = &outcome.message {
            self.transcript.push(message.clone());
        }
        if let Some(notice) = &outcome.notice {
            self.transcript.push(notice.clone());
        }
        Ok(outcome)
    }

    async fn read_stream(
        &self,
        session: &mut StreamSession,
        response: reqwest::Response,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ClientError> {
        let mut body = response.bytes_stream();

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                next = body.next() => Some(next),
            };

            let Some(next) = next else {
                drop(body);
                let text = session.cancel()?;
                info!(chars = text.len(), "Response stopped by user");
                return Ok(Outcome {
                    state: SessionState::Cancelled,
                    message: Some(ConversationMessage::assistant(text)),
                    notice: None,
                });
            };

            match next {
                Some(Ok(bytes)) => {
                    if session.append(&bytes) {
                        self.progress.send_replace(session.buffer().to_string());
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Error reading relay stream");
                    let partial = session.fail()?;
                    return Ok(Self::failed(partial, format!("Error reading response: {e}")));
                }
                None => {
                    let text = session.complete()?;
                    self.progress.send_replace(text.clone());
                    debug!(chars = text.len(), "Response complete");
                    return Ok(Outcome {
                        state: SessionState::Completed,
                        message: Some(ConversationMessage::assistant(text)),
                        notice: None,
                    });
                }
            }
        }
    }

    fn failed(partial: Option<String>, notice: String) -> Outcome {
        Outcome {
            state: SessionState::Failed,
            message: partial.map(ConversationMessage::assistant),
            notice: Some(ConversationMessage::system(notice)),
        }
    }
}
