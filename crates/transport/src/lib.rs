pub mod endpoint;
pub mod health;
pub mod http;
pub mod mock;
pub mod types;

use bytes::Bytes;
use futures::stream::Stream;
use std::pin::Pin;

use parley_core::{FileCatalogEntry, FileRequest, TextRequest, UploadResult};

pub use endpoint::{Endpoint, is_loopback};
pub use health::{HealthCheckResult, check_health};
pub use http::HttpTransport;
pub use mock::{MockFrame, MockResponse, MockTransport, RecordedRequest};
pub use types::{AnalyzeResponse, ChatStreamBody, FileListResponse, NO_SUMMARY, WireMessage};

pub use parley_core::{Error, Result, TransportError};

/// Raw body of a streamed reply, in arrival order
///
/// Frames carry no boundary semantics: a multibyte character or a markup
/// token may be split across any two of them.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Network calls made on behalf of the conversation engine
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// `POST /chat-stream`: send one user message and return the reply body as a byte stream
    async fn send_text(&self, request: &TextRequest) -> Result<FrameStream>;

    /// `POST /upload`: send a file as multipart and return the parsed analysis
    async fn send_file(&self, request: &FileRequest) -> Result<UploadResult>;

    /// `POST /reset`: clear server-side conversation state
    async fn reset(&self) -> Result<()>;

    /// `GET /files`: list server-side files
    async fn list_files(&self) -> Result<Vec<FileCatalogEntry>>;

    /// `GET /ping`: backend liveness probe
    async fn ping(&self) -> Result<serde_json::Value>;

    /// `POST /analyze-folder`: summarize a server-side folder
    async fn analyze_folder(&self, folder_path: &str) -> Result<String>;
}
