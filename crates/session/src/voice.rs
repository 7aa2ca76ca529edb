//! Voice Capture Adapter.
//!
//! Drives the core [`VoiceCapture`] state machine from a [`SpeechRecognizer`].
//! One utterance per capture: the first transcript ends the session and
//! replaces the host's text field. Nothing is submitted automatically.

use std::process::Stdio;
use std::sync::{Arc, Mutex};

use parley_core::{Error, Host, Result, VoiceCapture, VoiceConfig, VoiceEvent, VoiceState, VoiceToggle};
use parley_render::View;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Platform speech facility
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Listen for a single utterance.
    ///
    /// `Ok(None)` means the session ended without a transcript, including
    /// when `cancel` fired.
    async fn recognize_once(&self, cancel: &CancellationToken) -> Result<Option<String>>;
}

/// Recognizer backed by an external command that prints transcripts on stdout
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// None when no command is configured
    pub fn from_config(config: &VoiceConfig) -> Option<Self> {
        let (program, args) = config.command.as_ref()?.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for CommandRecognizer {
    async fn recognize_once(&self, cancel: &CancellationToken) -> Result<Option<String>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Voice(format!("failed to start {}: {}", self.program, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Voice("recognizer stdout unavailable".to_string()))?;
        let mut lines = BufReader::new(stdout).lines();

        let first_line = async {
            while let Some(line) = lines.next_line().await? {
                let line = line.trim();
                if !line.is_empty() {
                    return Ok::<_, std::io::Error>(Some(line.to_string()));
                }
            }
            Ok(None)
        };

        let transcript = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(program = %self.program, "speech capture stopped");
                None
            }
            line = first_line => line.map_err(|e| Error::Voice(e.to_string()))?,
        };

        if let Err(e) = child.start_kill() {
            tracing::trace!(error = %e, "recognizer already exited");
        }
        Ok(transcript)
    }
}

pub struct VoiceAdapter {
    capture: Mutex<VoiceCapture>,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    active: Mutex<Option<CancellationToken>>,
}

impl VoiceAdapter {
    pub fn new(recognizer: Option<Arc<dyn SpeechRecognizer>>) -> Self {
        Self {
            capture: Mutex::new(VoiceCapture::new(recognizer.is_some())),
            recognizer,
            active: Mutex::new(None),
        }
    }

    pub fn from_config(config: &VoiceConfig) -> Self {
        let recognizer = CommandRecognizer::from_config(config).map(|r| Arc::new(r) as Arc<dyn SpeechRecognizer>);
        Self::new(recognizer)
    }

    pub fn control_visible(&self) -> bool {
        self.capture.lock().unwrap().control_visible()
    }

    pub fn state(&self) -> VoiceState {
        self.capture.lock().unwrap().state()
    }

    /// Press the voice control.
    ///
    /// Starting a capture waits for the utterance; the returned transcript
    /// has already been written to the host. Stopping returns immediately.
    pub async fn toggle(&self, host: &dyn Host, view: &dyn View) -> Option<String> {
        let action = self.capture.lock().unwrap().toggle();
        match action {
            VoiceToggle::Inert => None,
            VoiceToggle::StopCapture => {
                self.stop();
                None
            }
            VoiceToggle::StartCapture => self.capture_once(host, view).await,
        }
    }

    /// Cancel the running capture, if any
    pub fn stop(&self) {
        if let Some(token) = self.active.lock().unwrap().as_ref() {
            token.cancel();
        }
    }

    async fn capture_once(&self, host: &dyn Host, view: &dyn View) -> Option<String> {
        let recognizer = self.recognizer.clone()?;
        let token = CancellationToken::new();
        *self.active.lock().unwrap() = Some(token.clone());

        self.apply(VoiceEvent::Start, host, view);

        let event = match recognizer.recognize_once(&token).await {
            Ok(Some(transcript)) => VoiceEvent::Result(transcript),
            Ok(None) => VoiceEvent::End,
            Err(e) => VoiceEvent::Error(e.to_string()),
        };

        self.active.lock().unwrap().take();
        self.apply(event, host, view)
    }

    fn apply(&self, event: VoiceEvent, host: &dyn Host, view: &dyn View) -> Option<String> {
        let (written, before, after) = {
            let mut capture = self.capture.lock().unwrap();
            let before = capture.state();
            let written = capture.handle(event, host);
            (written, before, capture.state())
        };
        if before != after {
            view.voice_state_changed(after);
        }
        written
    }
}
