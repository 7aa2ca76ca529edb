use crate::error::{Error, Result};
use crate::message::{CANCELLED_MARKER, Message};

/// Transcript Store: the ordered log of messages in the current session
///
/// Supports:
/// - Appending user, assistant and code messages
/// - Opening a single streaming Assistant message and growing it in place
/// - Closing or cancelling the open message
/// - Clearing everything on reset
///
/// The sequence is append-only apart from the open message and [`Transcript::clear`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
    open: Option<usize>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a closed message and return its index
    ///
    /// A message flagged as streaming must come through [`Transcript::open_stream`].
    pub fn append(&mut self, mut message: Message) -> usize {
        message.streaming = false;
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> usize {
        self.append(Message::user(content))
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) -> usize {
        self.append(Message::assistant(content))
    }

    pub fn push_code(&mut self, content: impl Into<String>) -> usize {
        self.append(Message::code(content))
    }

    /// Append an empty Assistant message and record it as the open message
    ///
    /// Fails with [`Error::Busy`] if a stream is already open.
    pub fn open_stream(&mut self) -> Result<usize> {
        if self.open.is_some() {
            return Err(Error::Busy);
        }
        self.messages.push(Message::open_stream());
        let index = self.messages.len() - 1;
        self.open = Some(index);
        Ok(index)
    }

    /// Append decoded text to the open message
    ///
    /// Returns the updated message, or `None` when no stream is open.
    pub fn append_to_open(&mut self, text: &str) -> Option<&Message> {
        let index = self.open?;
        let message = self.messages.get_mut(index)?;
        message.content.push_str(text);
        Some(message)
    }

    /// Close the open message, keeping its content as-is
    pub fn close_stream(&mut self) -> Option<usize> {
        let index = self.open.take()?;
        if let Some(message) = self.messages.get_mut(index) {
            message.streaming = false;
        }
        Some(index)
    }

    /// Close the open message and mark it as cancelled, preserving partial output
    pub fn cancel_stream(&mut self) -> Option<usize> {
        let index = self.open.take()?;
        if let Some(message) = self.messages.get_mut(index) {
            if !message.content.ends_with(CANCELLED_MARKER) {
                message.content.push_str(CANCELLED_MARKER);
            }
            message.streaming = false;
        }
        Some(index)
    }

    pub fn open_index(&self) -> Option<usize> {
        self.open
    }

    pub fn open_message(&self) -> Option<&Message> {
        self.open.and_then(|index| self.messages.get(index))
    }

    pub fn has_open_stream(&self) -> bool {
        self.open.is_some()
    }

    /// Drop every message, including an open one
    pub fn clear(&mut self) {
        self.messages.clear();
        self.open = None;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn test_transcript_append_order() {
        let mut transcript = Transcript::new();
        assert!(transcript.is_empty());

        assert_eq!(transcript.push_user("hi"), 0);
        assert_eq!(transcript.push_assistant("hello"), 1);
        assert_eq!(transcript.push_code("x = 1"), 2);

        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.messages()[0].role, Role::User);
        assert_eq!(transcript.messages()[1].role, Role::Assistant);
        assert!(transcript.messages()[2].rendered_as_code);
    }

    #[test]
    fn test_append_never_leaves_streaming_flag() {
        let mut transcript = Transcript::new();
        let index = transcript.append(Message::open_stream());
        assert!(!transcript.get(index).unwrap().streaming);
        assert!(!transcript.has_open_stream());
    }

    #[test]
    fn test_streaming_grows_open_message() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi");
        let index = transcript.open_stream().unwrap();

        assert_eq!(transcript.append_to_open("He").unwrap().content, "He");
        assert_eq!(transcript.append_to_open("llo").unwrap().content, "Hello");
        assert_eq!(transcript.open_index(), Some(index));
        assert!(transcript.open_message().unwrap().streaming);

        assert_eq!(transcript.close_stream(), Some(index));
        assert!(!transcript.has_open_stream());
        assert_eq!(transcript.get(index).unwrap().content, "Hello");
        assert!(!transcript.get(index).unwrap().streaming);
    }

    #[test]
    fn test_single_open_stream() {
        let mut transcript = Transcript::new();
        transcript.open_stream().unwrap();
        assert!(matches!(transcript.open_stream(), Err(Error::Busy)));
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn test_append_to_open_without_stream() {
        let mut transcript = Transcript::new();
        transcript.push_assistant("done");
        assert!(transcript.append_to_open("more").is_none());
        assert_eq!(transcript.last().unwrap().content, "done");
    }

    #[test]
    fn test_cancel_stream_preserves_partial_output() {
        let mut transcript = Transcript::new();
        transcript.open_stream().unwrap();
        transcript.append_to_open("partial");

        let index = transcript.cancel_stream().unwrap();
        let message = transcript.get(index).unwrap();
        assert_eq!(message.content, "partial [cancelled]");
        assert!(message.is_cancelled());
        assert!(transcript.cancel_stream().is_none());
    }

    #[test]
    fn test_clear_drops_open_stream() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi");
        transcript.open_stream().unwrap();

        transcript.clear();
        assert!(transcript.is_empty());
        assert!(!transcript.has_open_stream());
        assert!(transcript.open_stream().is_ok());
    }
}
