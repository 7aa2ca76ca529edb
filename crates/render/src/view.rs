//! Rendering sink for transcript changes.

use parley_core::{CatalogPanel, Message, VoiceState};

use crate::markup::Rendered;

/// Where transcript and side-panel changes are drawn
///
/// The engine pushes every change through this trait and never reads back,
/// so a test double that only records calls is a complete implementation.
pub trait View: Send + Sync {
    /// A message was appended at `index`
    fn message_appended(&self, index: usize, message: &Message, rendered: &Rendered);

    /// The open message at `index` grew; `rendered` is the full re-render of its content
    fn message_updated(&self, index: usize, message: &Message, rendered: &Rendered);

    /// The stream at `index` closed; `rendered` carries the highlighted code blocks
    fn message_finalized(&self, index: usize, message: &Message, rendered: &Rendered);

    /// The transcript was wiped by a reset
    fn transcript_cleared(&self);

    /// Show or hide the transient typing indicator
    fn typing_indicator(&self, visible: bool);

    /// Short-lived status text outside the transcript
    fn notice(&self, _text: &str) {}

    fn catalog_changed(&self, _panel: &CatalogPanel) {}

    fn voice_state_changed(&self, _state: VoiceState) {}
}
