//! Stream consumer and incremental renderer.
//!
//! Reads a reply body frame by frame, appends the decoded text to the open
//! Assistant message and re-renders the whole accumulated buffer after every
//! frame. Highlighting runs once, after the stream ends.
//!
//! State transitions:
//! - Idle -> Streaming (first read begins)
//! - Streaming -> Finalizing (end of stream)
//! - Finalizing -> Idle (highlighting done)
//! - Streaming -> Idle (transport failure or cancellation)

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::decoder::Utf8StreamDecoder;
use crate::markup::{MarkupRenderer, Rendered};
use crate::syntax::Highlighter;
use crate::view::View;
use parley_core::{Error, Message, Result, Transcript};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Streaming,
    Finalizing,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamState::Idle => write!(f, "Idle"),
            StreamState::Streaming => write!(f, "Streaming"),
            StreamState::Finalizing => write!(f, "Finalizing"),
        }
    }
}

impl StreamState {
    pub fn can_transition_to(&self, target: &StreamState) -> bool {
        matches!(
            (self, target),
            (StreamState::Idle, StreamState::Streaming)
                | (StreamState::Streaming, StreamState::Finalizing)
                | (StreamState::Finalizing, StreamState::Idle)
                // failure and cancellation
                | (StreamState::Streaming, StreamState::Idle)
        )
    }
}

/// Thread-safe holder of the current [`StreamState`]
#[derive(Debug, Default)]
pub struct StreamStateMachine {
    state: Mutex<StreamState>,
}

impl StreamStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> StreamState {
        *self.state.lock().unwrap()
    }

    /// Attempt to transition; an invalid transition leaves the state unchanged
    pub fn transition(&self, target: StreamState) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.can_transition_to(&target) {
            tracing::debug!("Stream state: {} -> {}", *state, target);
            *state = target;
            true
        } else {
            tracing::warn!("Invalid stream state transition: {} -> {}", *state, target);
            false
        }
    }

    /// Force the machine back to Idle
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        if *state != StreamState::Idle {
            tracing::warn!("Stream state machine reset to Idle from {}", *state);
            *state = StreamState::Idle;
        }
    }
}

/// How a consumed stream ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    Cancelled,
}

/// Summary of one consumed stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamReport {
    /// Transcript index of the streamed Assistant message
    pub index: usize,
    pub frames: usize,
    pub bytes: usize,
    /// Highlighting passes run over the final render; 1 on completion, 0 otherwise
    pub highlight_passes: usize,
    pub outcome: StreamOutcome,
}

enum StreamEnd {
    Completed,
    Cancelled,
    Failed(Error),
}

/// Consumes reply streams into the transcript
pub struct StreamConsumer {
    renderer: Arc<dyn MarkupRenderer>,
    highlighter: Arc<dyn Highlighter>,
    state: StreamStateMachine,
}

impl StreamConsumer {
    pub fn new(renderer: Arc<dyn MarkupRenderer>, highlighter: Arc<dyn Highlighter>) -> Self {
        Self { renderer, highlighter, state: StreamStateMachine::new() }
    }

    pub fn state(&self) -> StreamState {
        self.state.current()
    }

    pub fn renderer(&self) -> &dyn MarkupRenderer {
        self.renderer.as_ref()
    }

    pub fn highlighter(&self) -> &dyn Highlighter {
        self.highlighter.as_ref()
    }

    /// Drain `frames` into a new open Assistant message
    ///
    /// On transport failure the partial message is closed as-is and the error
    /// returned; the caller appends the error message. On cancellation the
    /// message is closed with the cancelled marker and no highlighting runs.
    /// The machine is back in `Idle` whenever this returns.
    pub async fn consume<S>(
        &self, mut frames: S, transcript: &Mutex<Transcript>, view: &dyn View, cancel: &CancellationToken,
    ) -> Result<StreamReport>
    where
        S: Stream<Item = Result<Bytes>> + Unpin,
    {
        if !self.state.transition(StreamState::Streaming) {
            return Err(Error::Busy);
        }

        let opened = {
            let mut transcript = transcript.lock().unwrap();
            transcript.open_stream().map(|index| (index, transcript.get(index).cloned()))
        };
        let index = match opened {
            Ok((index, Some(message))) => {
                view.message_appended(index, &message, &Rendered::default());
                index
            }
            Ok((index, None)) => index,
            Err(e) => {
                self.state.transition(StreamState::Idle);
                return Err(e);
            }
        };

        let mut decoder = Utf8StreamDecoder::new();
        let mut frame_count = 0;
        let mut byte_count = 0;

        let end = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break StreamEnd::Cancelled,
                next = frames.next() => next,
            };

            match next {
                Some(Ok(frame)) => {
                    frame_count += 1;
                    byte_count += frame.len();
                    let text = decoder.decode(&frame);
                    if !text.is_empty() {
                        self.append(index, &text, transcript, view);
                    }
                }
                Some(Err(e)) => break StreamEnd::Failed(e),
                None => break StreamEnd::Completed,
            }
        };

        let report = |highlight_passes, outcome| StreamReport {
            index,
            frames: frame_count,
            bytes: byte_count,
            highlight_passes,
            outcome,
        };

        match end {
            StreamEnd::Completed => {
                let tail = decoder.finish();
                if !tail.is_empty() {
                    self.append(index, &tail, transcript, view);
                }

                self.state.transition(StreamState::Finalizing);
                let closed = Self::close(transcript, Transcript::close_stream);
                let mut highlight_passes = 0;
                if let Some(message) = closed {
                    let mut rendered = self.renderer.render(&message.content);
                    let blocks = self.highlighter.highlight_pass(&mut rendered);
                    highlight_passes += 1;
                    tracing::debug!(index, blocks, "stream finalized");
                    view.message_finalized(index, &message, &rendered);
                }
                self.state.transition(StreamState::Idle);
                Ok(report(highlight_passes, StreamOutcome::Completed))
            }
            StreamEnd::Cancelled => {
                if decoder.has_pending() {
                    tracing::debug!(index, "dropping incomplete character at cancellation");
                }
                let closed = Self::close(transcript, Transcript::cancel_stream);
                if let Some(message) = closed {
                    view.message_finalized(index, &message, &self.renderer.render(&message.content));
                }
                self.state.transition(StreamState::Idle);
                tracing::info!(index, frames = frame_count, "stream cancelled");
                Ok(report(0, StreamOutcome::Cancelled))
            }
            StreamEnd::Failed(e) => {
                let tail = decoder.finish();
                if !tail.is_empty() {
                    self.append(index, &tail, transcript, view);
                }
                let closed = Self::close(transcript, Transcript::close_stream);
                if let Some(message) = closed {
                    view.message_finalized(index, &message, &self.renderer.render(&message.content));
                }
                self.state.transition(StreamState::Idle);
                tracing::warn!(index, frames = frame_count, error = %e, "stream failed");
                Err(e)
            }
        }
    }

    fn append(&self, index: usize, text: &str, transcript: &Mutex<Transcript>, view: &dyn View) {
        let snapshot = transcript.lock().unwrap().append_to_open(text).cloned();
        if let Some(message) = snapshot {
            let rendered = self.renderer.render(&message.content);
            view.message_updated(index, &message, &rendered);
        }
    }

    fn close(transcript: &Mutex<Transcript>, close: fn(&mut Transcript) -> Option<usize>) -> Option<Message> {
        let mut transcript = transcript.lock().unwrap();
        let index = close(&mut *transcript)?;
        transcript.get(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::MarkdownRenderer;
    use parley_core::{CatalogPanel, TransportError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingHighlighter {
        calls: AtomicUsize,
    }

    impl Highlighter for CountingHighlighter {
        fn highlight(&self, code: &str, _language: Option<&str>) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            format!("<hl>{}</hl>", code)
        }
    }

    #[derive(Default)]
    struct RecordingView {
        updates: Mutex<Vec<(String, Rendered)>>,
        finalized: Mutex<Vec<(usize, Message, Rendered)>>,
        appended: AtomicUsize,
    }

    impl View for RecordingView {
        fn message_appended(&self, _index: usize, _message: &Message, _rendered: &Rendered) {
            self.appended.fetch_add(1, Ordering::SeqCst);
        }

        fn message_updated(&self, _index: usize, message: &Message, rendered: &Rendered) {
            self.updates.lock().unwrap().push((message.content.clone(), rendered.clone()));
        }

        fn message_finalized(&self, index: usize, message: &Message, rendered: &Rendered) {
            self.finalized.lock().unwrap().push((index, message.clone(), rendered.clone()));
        }

        fn transcript_cleared(&self) {}

        fn typing_indicator(&self, _visible: bool) {}

        fn catalog_changed(&self, _panel: &CatalogPanel) {}
    }

    fn consumer(highlighter: Arc<CountingHighlighter>) -> StreamConsumer {
        StreamConsumer::new(Arc::new(MarkdownRenderer::new()), highlighter)
    }

    fn ok(bytes: &'static [u8]) -> Result<Bytes> {
        Ok(Bytes::from_static(bytes))
    }

    fn frames(chunks: Vec<Result<Bytes>>) -> impl Stream<Item = Result<Bytes>> + Unpin {
        futures::stream::iter(chunks)
    }

    #[test]
    fn test_state_transitions() {
        assert!(StreamState::Idle.can_transition_to(&StreamState::Streaming));
        assert!(StreamState::Streaming.can_transition_to(&StreamState::Finalizing));
        assert!(StreamState::Streaming.can_transition_to(&StreamState::Idle));
        assert!(StreamState::Finalizing.can_transition_to(&StreamState::Idle));
        assert!(!StreamState::Idle.can_transition_to(&StreamState::Finalizing));
        assert!(!StreamState::Finalizing.can_transition_to(&StreamState::Streaming));
    }

    #[test]
    fn test_state_machine_rejects_invalid_transition() {
        let machine = StreamStateMachine::new();
        assert!(!machine.transition(StreamState::Finalizing));
        assert_eq!(machine.current(), StreamState::Idle);

        assert!(machine.transition(StreamState::Streaming));
        machine.reset();
        assert_eq!(machine.current(), StreamState::Idle);
    }

    #[tokio::test]
    async fn test_two_frames_make_one_message_and_one_highlight_pass() {
        let highlighter = Arc::new(CountingHighlighter::default());
        let consumer = consumer(highlighter.clone());
        let transcript = Mutex::new(Transcript::new());
        let view = RecordingView::default();

        let report = consumer
            .consume(frames(vec![ok(b"He"), ok(b"llo")]), &transcript, &view, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, StreamOutcome::Completed);
        assert_eq!(report.frames, 2);
        assert_eq!(report.highlight_passes, 1);
        assert_eq!(consumer.state(), StreamState::Idle);

        let transcript = transcript.lock().unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.get(0).unwrap().content, "Hello");
        assert!(!transcript.has_open_stream());

        let updates = view.updates.lock().unwrap();
        let contents: Vec<&str> = updates.iter().map(|(content, _)| content.as_str()).collect();
        assert_eq!(contents, vec!["He", "Hello"]);
        assert_eq!(view.appended.load(Ordering::SeqCst), 1);
        assert_eq!(view.finalized.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_progressive_render_matches_final_render() {
        let highlighter = Arc::new(CountingHighlighter::default());
        let consumer = consumer(highlighter.clone());
        let transcript = Mutex::new(Transcript::new());
        let view = RecordingView::default();

        let chunks = vec![ok(b"Use **bo"), ok(b"ld**:\n\n```py"), ok(b"thon\nprint(1)\n"), ok(b"```\n")];
        consumer.consume(frames(chunks), &transcript, &view, &CancellationToken::new()).await.unwrap();

        let full = "Use **bold**:\n\n```python\nprint(1)\n```\n";
        let one_shot = MarkdownRenderer::new().render(full);
        let updates = view.updates.lock().unwrap();
        assert_eq!(updates.last().unwrap().1, one_shot);

        // Highlighting only ever touches the final render.
        assert!(updates.iter().all(|(_, rendered)| !rendered.is_highlighted()));
        let finalized = view.finalized.lock().unwrap();
        assert!(finalized[0].2.is_highlighted());
        assert_eq!(highlighter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_frames() {
        let consumer = consumer(Arc::new(CountingHighlighter::default()));
        let transcript = Mutex::new(Transcript::new());
        let view = RecordingView::default();

        let chunks = vec![ok(b"5 \xE2"), ok(b"\x82"), ok(b"\xAC")];
        consumer.consume(frames(chunks), &transcript, &view, &CancellationToken::new()).await.unwrap();

        assert_eq!(transcript.lock().unwrap().get(0).unwrap().content, "5 €");
        let updates = view.updates.lock().unwrap();
        assert!(updates.iter().all(|(content, _)| !content.contains('\u{FFFD}')));
    }

    #[tokio::test]
    async fn test_failure_keeps_partial_and_returns_to_idle() {
        let highlighter = Arc::new(CountingHighlighter::default());
        let consumer = consumer(highlighter.clone());
        let transcript = Mutex::new(Transcript::new());
        let view = RecordingView::default();

        let chunks =
            vec![ok(b"partial "), ok(b"```rust\nfn"), Err(TransportError::Stream("connection reset".to_string()).into())];
        let err = consumer.consume(frames(chunks), &transcript, &view, &CancellationToken::new()).await.unwrap_err();

        assert_eq!(err.transcript_text(), "Error: Stream interrupted: connection reset");
        assert_eq!(consumer.state(), StreamState::Idle);
        assert_eq!(highlighter.calls.load(Ordering::SeqCst), 0);

        let transcript = transcript.lock().unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.get(0).unwrap().content, "partial ```rust\nfn");
        assert!(!transcript.has_open_stream());
    }

    #[tokio::test]
    async fn test_cancellation_marks_message_without_highlighting() {
        let highlighter = Arc::new(CountingHighlighter::default());
        let consumer = consumer(highlighter.clone());
        let transcript = Mutex::new(Transcript::new());
        let view = RecordingView::default();
        let cancel = CancellationToken::new();

        let (tx, rx) = futures::channel::mpsc::unbounded::<Result<Bytes>>();
        tx.unbounded_send(Ok(Bytes::from_static(b"```rust\nlet"))).unwrap();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let report = consumer.consume(rx, &transcript, &view, &cancel).await.unwrap();
        drop(tx);

        assert_eq!(report.outcome, StreamOutcome::Cancelled);
        assert_eq!(report.highlight_passes, 0);
        assert_eq!(highlighter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(consumer.state(), StreamState::Idle);

        let transcript = transcript.lock().unwrap();
        let message = transcript.get(0).unwrap();
        assert_eq!(message.content, "```rust\nlet [cancelled]");
        assert!(message.is_cancelled());
    }

    #[tokio::test]
    async fn test_second_open_stream_is_rejected() {
        let consumer = consumer(Arc::new(CountingHighlighter::default()));
        let transcript = Mutex::new(Transcript::new());
        transcript.lock().unwrap().open_stream().unwrap();
        let view = RecordingView::default();

        let err = consumer.consume(frames(vec![ok(b"x")]), &transcript, &view, &CancellationToken::new()).await;
        assert!(matches!(err, Err(Error::Busy)));
        assert_eq!(consumer.state(), StreamState::Idle);
        assert_eq!(transcript.lock().unwrap().len(), 1);
    }
}
