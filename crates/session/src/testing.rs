//! Test doubles shared by the session tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use parley_core::{
    CatalogPanel, FileCatalogEntry, FileHandle, FileRequest, Host, Message, Result, Surface, TextRequest, UploadResult,
    VoiceState,
};
use parley_render::{Highlighter, Rendered, View};
use parley_transport::{FrameStream, MockResponse, MockTransport, Transport};
use tokio::sync::Notify;

pub struct RecordingHost {
    text: Mutex<String>,
    file: Mutex<Option<FileHandle>>,
    pub loopback: bool,
    pub agent: String,
}

impl RecordingHost {
    pub fn with_text(text: &str) -> Self {
        Self { text: Mutex::new(text.to_string()), file: Mutex::new(None), loopback: true, agent: "chat".to_string() }
    }

    pub fn with_file(file: FileHandle) -> Self {
        let host = Self::with_text("");
        *host.file.lock().unwrap() = Some(file);
        host
    }

    pub fn select_file(&self, file: FileHandle) {
        *self.file.lock().unwrap() = Some(file);
    }
}

impl Host for RecordingHost {
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
        "http://localhost:5173".to_string()
    }

    fn surface(&self) -> Surface {
        Surface::Web
    }

    fn agent(&self) -> String {
        self.agent.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Appended(usize, String),
    Updated(usize, String),
    /// index, content, code blocks highlighted
    Finalized(usize, String, bool),
    Cleared,
    Typing(bool),
    Notice(String),
    Catalog(CatalogPanel),
    Voice(VoiceState),
}

#[derive(Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
    appended: Mutex<Vec<(usize, Rendered)>>,
}

impl RecordingView {
    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Rendered form passed with the latest append at `index`
    pub fn appended_rendered(&self, index: usize) -> Option<Rendered> {
        self.appended.lock().unwrap().iter().rev().find(|(i, _)| *i == index).map(|(_, r)| r.clone())
    }

    pub fn typing_visible(&self) -> bool {
        self.events()
            .iter()
            .rev()
            .find_map(|event| match event {
                ViewEvent::Typing(visible) => Some(*visible),
                _ => None,
            })
            .unwrap_or(false)
    }

    fn push(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl View for RecordingView {
    fn message_appended(&self, index: usize, message: &Message, rendered: &Rendered) {
        self.appended.lock().unwrap().push((index, rendered.clone()));
        self.push(ViewEvent::Appended(index, message.content.clone()));
    }

    fn message_updated(&self, index: usize, message: &Message, _rendered: &Rendered) {
        self.push(ViewEvent::Updated(index, message.content.clone()));
    }

    fn message_finalized(&self, index: usize, message: &Message, rendered: &Rendered) {
        self.push(ViewEvent::Finalized(index, message.content.clone(), rendered.is_highlighted()));
    }

    fn transcript_cleared(&self) {
        self.push(ViewEvent::Cleared);
    }

    fn typing_indicator(&self, visible: bool) {
        self.push(ViewEvent::Typing(visible));
    }

    fn notice(&self, text: &str) {
        self.push(ViewEvent::Notice(text.to_string()));
    }

    fn catalog_changed(&self, panel: &CatalogPanel) {
        self.push(ViewEvent::Catalog(panel.clone()));
    }

    fn voice_state_changed(&self, state: VoiceState) {
        self.push(ViewEvent::Voice(state));
    }
}

#[derive(Default)]
pub struct CountingHighlighter {
    pub calls: AtomicUsize,
}

impl CountingHighlighter {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Highlighter for CountingHighlighter {
    fn highlight(&self, code: &str, language: Option<&str>) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        format!("<hl lang={:?}>{}</hl>", language, code)
    }
}

/// Mock transport whose chat requests wait until the gate is opened
pub struct GatedTransport {
    inner: MockTransport,
    gate: Arc<Notify>,
}

impl GatedTransport {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self { inner: MockTransport::new(responses), gate: Arc::new(Notify::new()) }
    }

    pub fn open(&self) {
        self.gate.notify_one();
    }
}

#[async_trait::async_trait]
impl Transport for GatedTransport {
    async fn send_text(&self, request: &TextRequest) -> Result<FrameStream> {
        self.gate.notified().await;
        self.inner.send_text(request).await
    }

    async fn send_file(&self, request: &FileRequest) -> Result<UploadResult> {
        self.inner.send_file(request).await
    }

    async fn reset(&self) -> Result<()> {
        self.inner.reset().await
    }

    async fn list_files(&self) -> Result<Vec<FileCatalogEntry>> {
        self.inner.list_files().await
    }

    async fn ping(&self) -> Result<serde_json::Value> {
        self.inner.ping().await
    }

    async fn analyze_folder(&self, folder_path: &str) -> Result<String> {
        self.inner.analyze_folder(folder_path).await
    }
}
