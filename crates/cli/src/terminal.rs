//! Terminal host and view.
//!
//! The text field and file picker are plain in-memory slots filled from the
//! command line or the repl. Streamed replies are printed as they grow;
//! highlighted code blocks follow once a message is finalized.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

use owo_colors::OwoColorize;
use parley_core::{CatalogPanel, Config, FileHandle, Host, Message, Result, Surface, VoiceState};
use parley_render::{Rendered, View};

pub struct TerminalHost {
    text: Mutex<String>,
    file: Mutex<Option<FileHandle>>,
    origin: String,
    loopback: bool,
    surface: Surface,
    agent: String,
}

impl TerminalHost {
    pub fn from_config(config: &Config) -> Result<Self> {
        let origin = config.server.origin.clone();
        let loopback = parley_transport::is_loopback(&origin)?;
        Ok(Self {
            text: Mutex::new(String::new()),
            file: Mutex::new(None),
            origin,
            loopback,
            surface: config.chat.surface,
            agent: config.chat.agent.clone(),
        })
    }

    pub fn select_file(&self, file: FileHandle) {
        *self.file.lock().unwrap() = Some(file);
    }
}

impl Host for TerminalHost {
    fn text(&self) -> String {
        self.text.lock().unwrap().clone()
    }

    fn set_text(&self, text: &str) {
        *self.text.lock().unwrap() = text.to_string();
    }

    fn selected_file(&self) -> Option<FileHandle> {
        self.file.lock().unwrap().clone()
    }

    fn clear_selected_file(&self) {
        *self.file.lock().unwrap() = None;
    }

    fn is_loopback_host(&self) -> bool {
        self.loopback
    }

    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn surface(&self) -> Surface {
        self.surface
    }

    fn agent(&self) -> String {
        self.agent.clone()
    }
}

/// Prints transcript changes to stdout and transient status to stderr
#[derive(Default)]
pub struct TerminalView {
    /// Bytes of each open message already written
    printed: Mutex<HashMap<usize, usize>>,
    compact: bool,
}

impl TerminalView {
    pub fn new(surface: Surface) -> Self {
        Self { printed: Mutex::new(HashMap::new()), compact: surface.compact_mode() }
    }

    fn header(&self, message: &Message) {
        if self.compact {
            return;
        }
        let meta = message.meta_line();
        if message.is_user() {
            println!("{}", meta.cyan().bold());
        } else {
            println!("{}", meta.green().bold());
        }
    }

    fn print_rest(&self, index: usize, content: &str) {
        let mut printed = self.printed.lock().unwrap();
        let done = printed.entry(index).or_insert(0);
        if let Some(rest) = content.get(*done..) {
            print!("{}", rest);
            *done = content.len();
        }
        std::io::stdout().flush().ok();
    }
}

fn print_highlighted(rendered: &Rendered) -> bool {
    let mut any = false;
    for block in rendered.code_blocks() {
        if let Some(highlighted) = &block.highlighted {
            print!("{}", highlighted);
            any = true;
        }
    }
    any
}

impl View for TerminalView {
    fn message_appended(&self, index: usize, message: &Message, rendered: &Rendered) {
        self.header(message);
        if message.streaming {
            self.printed.lock().unwrap().insert(index, 0);
            return;
        }
        if message.rendered_as_code && print_highlighted(rendered) {
            println!();
        } else if message.content.starts_with("Error: ") {
            println!("{}\n", message.content.red());
        } else {
            println!("{}\n", message.content);
        }
    }

    fn message_updated(&self, index: usize, message: &Message, _rendered: &Rendered) {
        self.print_rest(index, &message.content);
    }

    fn message_finalized(&self, index: usize, message: &Message, rendered: &Rendered) {
        self.print_rest(index, &message.content);
        self.printed.lock().unwrap().remove(&index);
        println!();
        if rendered.is_highlighted() {
            println!("{}", "─".repeat(40).dimmed());
            print_highlighted(rendered);
        }
        println!();
    }

    fn transcript_cleared(&self) {
        self.printed.lock().unwrap().clear();
        println!("{}", "── transcript cleared ──".dimmed());
    }

    fn typing_indicator(&self, visible: bool) {
        if visible {
            eprint!("{}", "Fred is typing…".dimmed().italic());
            eprint!("\r");
        } else {
            eprint!("\r\x1b[2K");
        }
        std::io::stderr().flush().ok();
    }

    fn notice(&self, text: &str) {
        eprintln!("{} {}", "Notice:".yellow().bold(), text);
    }

    fn catalog_changed(&self, panel: &CatalogPanel) {
        if let Some(status) = panel.status_line() {
            if matches!(panel, CatalogPanel::Failed(_)) {
                eprintln!("{}", status.red());
            } else {
                eprintln!("{}", status.dimmed());
            }
        }
        for (position, entry) in panel.entries().iter().enumerate() {
            println!("  {:>3}. {}", (position + 1).cyan(), entry);
        }
    }

    fn voice_state_changed(&self, state: VoiceState) {
        match state {
            VoiceState::Capturing => eprintln!("{} listening…", "Voice:".magenta().bold()),
            VoiceState::Idle => eprintln!("{} stopped", "Voice:".magenta().bold()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_from_default_config() {
        let host = TerminalHost::from_config(&Config::default()).unwrap();
        assert!(host.is_loopback_host());
        assert_eq!(host.surface(), Surface::Cli);
        assert_eq!(host.agent(), "chat");
        assert!(host.text().is_empty());
        assert!(host.selected_file().is_none());
    }

    #[test]
    fn test_host_remote_origin() {
        let mut config = Config::default();
        config.server.origin = "https://chat.example.com".to_string();
        let host = TerminalHost::from_config(&config).unwrap();
        assert!(!host.is_loopback_host());
        assert_eq!(host.origin(), "https://chat.example.com");
    }

    #[test]
    fn test_host_rejects_bad_origin() {
        let mut config = Config::default();
        config.server.origin = "not a url".to_string();
        assert!(TerminalHost::from_config(&config).is_err());
    }

    #[test]
    fn test_host_file_slot() {
        let host = TerminalHost::from_config(&Config::default()).unwrap();
        host.select_file(FileHandle::from_bytes("main.py", b"print(1)".to_vec()));
        assert_eq!(host.selected_file().unwrap().name(), "main.py");
        host.clear_selected_file();
        assert!(host.selected_file().is_none());
    }

    #[test]
    fn test_view_tracks_printed_prefix() {
        let view = TerminalView::new(Surface::Cli);
        let mut message = Message::open_stream();
        view.message_appended(1, &message, &Rendered::default());

        message.content.push_str("He");
        view.message_updated(1, &message, &Rendered::default());
        assert_eq!(view.printed.lock().unwrap()[&1], 2);

        message.content.push_str("llo");
        view.message_updated(1, &message, &Rendered::default());
        assert_eq!(view.printed.lock().unwrap()[&1], 5);

        message.streaming = false;
        view.message_finalized(1, &message, &Rendered::default());
        assert!(view.printed.lock().unwrap().is_empty());
    }
}
