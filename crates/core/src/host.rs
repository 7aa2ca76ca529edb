//! Host Environment capability.
//!
//! The engine never touches a page, a terminal or any other surface
//! directly. Input fields, capability flags and the page origin are read
//! and written through this trait so every component can be driven by a
//! test double.

use crate::request::{FileHandle, Surface};

/// Agent identifier used when the host has no selection
pub const DEFAULT_AGENT: &str = "chat";

/// Typed accessors over the surface hosting the conversation
///
/// Methods take `&self`; implementations use interior mutability because
/// voice capture and catalog selection write the text field while a
/// submission may be running.
pub trait Host: Send + Sync {
    /// Current contents of the text input
    fn text(&self) -> String;

    /// Overwrite the text input
    fn set_text(&self, text: &str);

    /// File currently picked for upload, if any
    fn selected_file(&self) -> Option<FileHandle>;

    /// Clear the file picker
    fn clear_selected_file(&self);

    /// Whether the page is served from a loopback host
    fn is_loopback_host(&self) -> bool;

    /// Origin the page itself was served from
    fn origin(&self) -> String;

    /// Which surface is hosting the conversation
    fn surface(&self) -> Surface;

    /// Selected agent identifier
    fn agent(&self) -> String {
        DEFAULT_AGENT.to_string()
    }
}
