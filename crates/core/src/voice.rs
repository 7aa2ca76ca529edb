//! Voice capture state machine.
//!
//! Two states, toggled by one control:
//! - Idle -> Capturing (start)
//! - Capturing -> Idle (result, error or end)
//!
//! A result writes the transcript into the host's text field, overwriting
//! what was there. When the platform has no speech facility the machine is
//! inert and its control hidden.

use std::fmt;

use crate::host::Host;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VoiceState {
    #[default]
    Idle,
    Capturing,
}

impl fmt::Display for VoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceState::Idle => write!(f, "Idle"),
            VoiceState::Capturing => write!(f, "Capturing"),
        }
    }
}

/// Events reported by a capture session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    Start,
    Result(String),
    Error(String),
    End,
}

/// What pressing the control should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceToggle {
    StartCapture,
    StopCapture,
    /// Capability unavailable; nothing happens
    Inert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceCapture {
    state: VoiceState,
    available: bool,
}

impl VoiceCapture {
    pub fn new(available: bool) -> Self {
        Self { state: VoiceState::Idle, available }
    }

    pub fn unavailable() -> Self {
        Self::new(false)
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Whether the toggle control should be shown at all
    pub fn control_visible(&self) -> bool {
        self.available
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state == VoiceState::Capturing
    }

    pub fn toggle(&self) -> VoiceToggle {
        match (self.available, self.state) {
            (false, _) => VoiceToggle::Inert,
            (true, VoiceState::Idle) => VoiceToggle::StartCapture,
            (true, VoiceState::Capturing) => VoiceToggle::StopCapture,
        }
    }

    /// Apply an event; returns the transcript written to the host, if any
    pub fn handle(&mut self, event: VoiceEvent, host: &dyn Host) -> Option<String> {
        if !self.available {
            return None;
        }

        let previous = self.state;
        let written = match (self.state, event) {
            (VoiceState::Idle, VoiceEvent::Start) => {
                self.state = VoiceState::Capturing;
                None
            }
            (VoiceState::Capturing, VoiceEvent::Result(transcript)) => {
                host.set_text(&transcript);
                self.state = VoiceState::Idle;
                Some(transcript)
            }
            (VoiceState::Capturing, VoiceEvent::Error(reason)) => {
                tracing::warn!(%reason, "speech recognition error");
                self.state = VoiceState::Idle;
                None
            }
            (VoiceState::Capturing, VoiceEvent::End) => {
                self.state = VoiceState::Idle;
                None
            }
            (_, event) => {
                tracing::debug!(?event, state = %self.state, "voice event ignored");
                None
            }
        };

        if previous != self.state {
            tracing::debug!("Voice state: {} -> {}", previous, self.state);
        }
        written
    }
}
