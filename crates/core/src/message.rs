use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Who authored a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Label shown in the message metadata line
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Fred",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Marker appended to an open message that was cut short by cancellation
pub const CANCELLED_MARKER: &str = " [cancelled]";

/// A single transcript message
///
/// Messages are immutable once appended, with one exception: the open
/// Assistant message grows in place while its stream is running. Mutation
/// goes through [`crate::Transcript`] only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Render as a fixed-language code block instead of markup
    pub rendered_as_code: bool,
    pub timestamp: DateTime<Local>,
    /// True while this is the open message of a running stream
    pub streaming: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, false)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, false)
    }

    /// Assistant message holding a structured result rendered as code
    pub fn code(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, true)
    }

    /// Empty Assistant message that will receive streamed content
    pub fn open_stream() -> Self {
        Self { streaming: true, ..Self::new(Role::Assistant, String::new(), false) }
    }

    fn new(role: Role, content: impl Into<String>, rendered_as_code: bool) -> Self {
        Self { role, content: content.into(), rendered_as_code, timestamp: Local::now(), streaming: false }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_cancelled(&self) -> bool {
        !self.streaming && self.content.ends_with(CANCELLED_MARKER)
    }

    /// Metadata line, e.g. `Fred • 14:02:11`
    pub fn meta_line(&self) -> String {
        format!("{} • {}", self.role.display_name(), self.timestamp.format("%H:%M:%S"))
    }
}
