//! Session Controller: one submission lifecycle at a time.
//!
//! Each submission shows the typing indicator, turns the host's input into a
//! request, dispatches it, and renders either the streamed reply or the
//! upload result. Any failure becomes a single Assistant error message. The
//! controller also owns the transcript and the reset operation.

use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::single_flight::{FlightPermit, SingleFlight};
use parley_core::{Error, FileRequest, Host, Request, Result, TextRequest, Transcript, input};
use parley_render::{Rendered, StreamConsumer, StreamOutcome, StreamReport, StreamState, View};
use parley_transport::Transport;

pub const BUSY_NOTICE: &str = "Still working on the previous reply";
pub const RESET_CONFIRMED: &str = "Chat history has been reset.";
pub const RESET_FAILED: &str = "Failed to reset chat history.";
pub const DEFAULT_UPLOAD_LANGUAGE: &str = "python";

/// Result of one accepted submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The reply streamed to completion
    Streamed(StreamReport),
    /// The upload analysis was appended at `index`
    Uploaded { index: usize },
    /// Cancelled by the caller; `index` is the marked message when the stream had opened
    Cancelled { index: Option<usize> },
    /// The error message appended at `error_index`
    Failed { error_index: usize, message: String },
}

/// Result of [`SessionController::reset`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    Confirmed,
    /// Local state was cleared anyway
    RemoteFailed(String),
}

/// Shows the typing indicator for as long as it lives
struct TypingIndicator<'a> {
    view: &'a dyn View,
}

impl<'a> TypingIndicator<'a> {
    fn show(view: &'a dyn View) -> Self {
        view.typing_indicator(true);
        Self { view }
    }
}

impl Drop for TypingIndicator<'_> {
    fn drop(&mut self) {
        self.view.typing_indicator(false);
    }
}

pub struct SessionController {
    transport: Arc<dyn Transport>,
    host: Arc<dyn Host>,
    view: Arc<dyn View>,
    transcript: Mutex<Transcript>,
    consumer: StreamConsumer,
    flight: SingleFlight,
    upload_language: String,
}

impl SessionController {
    pub fn new(
        transport: Arc<dyn Transport>, host: Arc<dyn Host>, view: Arc<dyn View>, consumer: StreamConsumer,
    ) -> Self {
        Self {
            transport,
            host,
            view,
            transcript: Mutex::new(Transcript::new()),
            consumer,
            flight: SingleFlight::new(),
            upload_language: DEFAULT_UPLOAD_LANGUAGE.to_string(),
        }
    }

    /// Set the fixed language used to render upload results
    pub fn with_upload_language(mut self, language: impl Into<String>) -> Self {
        self.upload_language = language.into();
        self
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Snapshot of the transcript
    pub fn transcript(&self) -> Transcript {
        self.transcript.lock().unwrap().clone()
    }

    pub fn stream_state(&self) -> StreamState {
        self.consumer.state()
    }

    pub fn is_busy(&self) -> bool {
        self.flight.is_busy()
    }

    pub async fn submit(&self) -> Result<SubmitOutcome> {
        self.submit_with_cancel(&CancellationToken::new()).await
    }

    /// Run one submission from the host's current input
    ///
    /// Returns `Err` only for submissions that never started:
    /// [`Error::EmptySubmission`] (nothing happens at all) and [`Error::Busy`]
    /// (another submission is in flight; the input is left untouched).
    /// Everything after acceptance resolves to a [`SubmitOutcome`].
    pub async fn submit_with_cancel(&self, cancel: &CancellationToken) -> Result<SubmitOutcome> {
        // Empty input is ignored before the busy check so it never posts a notice.
        input::collect(self.host.as_ref())?;
        let _permit = self.acquire()?;

        let (request, index) = {
            let mut transcript = self.transcript.lock().unwrap();
            input::accept(self.host.as_ref(), &mut transcript)?
        };
        self.emit_appended(index, None);

        let _typing = TypingIndicator::show(self.view.as_ref());

        let result = match &request {
            Request::Text(text) => self.stream_reply(text, cancel).await,
            Request::File(file) => self.upload(file).await,
        };

        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let error_index = self.push_error(&e);
                Ok(SubmitOutcome::Failed { error_index, message: e.transcript_text() })
            }
        }
    }

    /// Clear the transcript locally and remotely, then confirm with one message
    ///
    /// The local clear happens whether or not the remote call succeeds; only
    /// the confirmation text differs. Rejected with [`Error::Busy`] while a
    /// submission is in flight.
    pub async fn reset(&self) -> Result<ResetOutcome> {
        let _permit = self.acquire()?;

        let remote = self.transport.reset().await;

        self.transcript.lock().unwrap().clear();
        self.view.transcript_cleared();

        let (text, outcome) = match remote {
            Ok(()) => (RESET_CONFIRMED, ResetOutcome::Confirmed),
            Err(e) => {
                tracing::warn!(error = %e, "remote reset failed");
                (RESET_FAILED, ResetOutcome::RemoteFailed(e.to_string()))
            }
        };

        let index = self.transcript.lock().unwrap().push_assistant(text);
        self.emit_appended(index, None);
        tracing::info!(?outcome, "transcript reset");

        Ok(outcome)
    }

    fn acquire(&self) -> Result<FlightPermit> {
        self.flight.try_acquire().ok_or_else(|| {
            tracing::debug!("submission rejected while another is in flight");
            self.view.notice(BUSY_NOTICE);
            Error::Busy
        })
    }

    async fn stream_reply(&self, request: &TextRequest, cancel: &CancellationToken) -> Result<SubmitOutcome> {
        let frames = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("chat request cancelled before the reply started");
                return Ok(SubmitOutcome::Cancelled { index: None });
            }
            frames = self.transport.send_text(request) => frames?,
        };

        let report = self.consumer.consume(frames, &self.transcript, self.view.as_ref(), cancel).await?;
        Ok(match report.outcome {
            StreamOutcome::Completed => SubmitOutcome::Streamed(report),
            StreamOutcome::Cancelled => SubmitOutcome::Cancelled { index: Some(report.index) },
        })
    }

    async fn upload(&self, request: &FileRequest) -> Result<SubmitOutcome> {
        let result = self.transport.send_file(request).await?;

        let mut rendered = self.consumer.renderer().render_code(&result.analysis, &self.upload_language);
        self.consumer.highlighter().highlight_pass(&mut rendered);

        let index = self.transcript.lock().unwrap().push_code(result.analysis);
        self.emit_appended(index, Some(rendered));
        tracing::debug!(index, file = request.file.name(), "upload result rendered");

        Ok(SubmitOutcome::Uploaded { index })
    }

    fn push_error(&self, error: &Error) -> usize {
        tracing::warn!(error = %error, "submission failed");
        let index = self.transcript.lock().unwrap().push_assistant(error.transcript_text());
        self.emit_appended(index, None);
        index
    }

    fn emit_appended(&self, index: usize, rendered: Option<Rendered>) {
        let message = self.transcript.lock().unwrap().get(index).cloned();
        if let Some(message) = message {
            let rendered = rendered.unwrap_or_else(|| self.consumer.renderer().render(&message.content));
            self.view.message_appended(index, &message, &rendered);
        }
    }
}
