//! Input Normalizer: turns the active input into exactly one [`Request`].

use crate::error::{Error, Result};
use crate::host::Host;
use crate::request::{FileRequest, Request, TextRequest};
use crate::transcript::Transcript;

/// Build a request from the host's current input without side effects
///
/// A selected file wins over any text. Blank text with no file is
/// [`Error::EmptySubmission`].
pub fn collect(host: &dyn Host) -> Result<Request> {
    if let Some(file) = host.selected_file() {
        return Ok(Request::File(FileRequest { file }));
    }

    let text = host.text();
    let message = text.trim();
    if message.is_empty() {
        return Err(Error::EmptySubmission);
    }

    let agent = host.agent();
    let agent = if agent.trim().is_empty() { crate::host::DEFAULT_AGENT.to_string() } else { agent };

    Ok(Request::Text(TextRequest { message: message.to_string(), agent, source: host.surface() }))
}

/// Accept the current input: build the request, clear the inputs and log the User message
///
/// Returns the request and the index of the appended User message. On
/// [`Error::EmptySubmission`] neither the host nor the transcript is touched.
pub fn accept(host: &dyn Host, transcript: &mut Transcript) -> Result<(Request, usize)> {
    let request = collect(host)?;

    host.set_text("");
    host.clear_selected_file();

    let index = transcript.push_user(request.user_message());
    tracing::debug!(kind = request.kind(), index, "submission accepted");

    Ok((request, index))
}
