use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::types::{AnalyzeResponse, ChatStreamBody};
use crate::{FrameStream, Transport};
use parley_core::{Error, FileCatalogEntry, FileRequest, Result, TextRequest, TransportError, UploadResult};

/// Scripted answers, consumed in order by every call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MockResponse {
    /// Streamed reply; `error` breaks the stream after the frames.
    /// `status` only affects logging: the body streams either way.
    Stream {
        frames: Vec<MockFrame>,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        delay_ms: u64,
        #[serde(default)]
        status: Option<u16>,
    },
    Upload { analysis: String },
    Files { files: Vec<String> },
    Summary {
        #[serde(default)]
        summary: Option<String>,
    },
    Ping { body: serde_json::Value },
    /// Plain success with no payload (reset)
    Ok,
    /// Non-success HTTP status for whichever call consumes it; a chat request gets an empty body
    Status { status: u16 },
    /// Success status with nothing to read
    MissingBody,
    /// Request that never reached the server
    Error { message: String },
    /// Success status with a body that is not the expected JSON
    Malformed { body: String },
}

/// One chunk of a scripted stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MockFrame {
    Text(String),
    Bytes(Vec<u8>),
}

impl MockFrame {
    fn into_bytes(self) -> Bytes {
        match self {
            MockFrame::Text(text) => Bytes::from(text),
            MockFrame::Bytes(bytes) => Bytes::from(bytes),
        }
    }
}

/// A call observed by [`MockTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedRequest {
    Text(ChatStreamBody),
    File { name: String, size: usize },
    Reset,
    ListFiles,
    Ping,
    Analyze { folder_path: String },
}

/// Mock configuration from TOML file
#[derive(Debug, Deserialize)]
struct MockConfig {
    responses: Vec<MockResponse>,
}

/// Deterministic transport that replays scripted responses and records calls
pub struct MockTransport {
    responses: Vec<MockResponse>,
    current: Arc<AtomicUsize>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self { responses, current: Arc::new(AtomicUsize::new(0)), requests: Mutex::new(Vec::new()) }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: MockConfig =
            toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse mock responses: {}", e)))?;
        Ok(Self::new(config.responses))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Every call seen so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.len().saturating_sub(self.current.load(Ordering::SeqCst))
    }

    fn record(&self, request: RecordedRequest) {
        self.requests.lock().unwrap().push(request);
    }

    fn get_next_response(&self) -> MockResponse {
        let index = self.current.fetch_add(1, Ordering::SeqCst);
        if index < self.responses.len() {
            self.responses[index].clone()
        } else {
            MockResponse::Error {
                message: format!(
                    "No more mock responses configured (requested: {}, available: {})",
                    index + 1,
                    self.responses.len()
                ),
            }
        }
    }

    /// Shared handling of responses that mean the same thing for every call
    fn failure(response: MockResponse, operation: &'static str) -> Error {
        match response {
            MockResponse::Status { status } => TransportError::status(operation, status).into(),
            MockResponse::MissingBody => TransportError::MissingBody.into(),
            MockResponse::Error { message } => TransportError::Request(message).into(),
            MockResponse::Malformed { body } => match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(_) => Error::Decode(format!("unexpected response shape: {}", body)),
                Err(e) => e.into(),
            },
            other => Error::Decode(format!("mock response {:?} does not answer {}", other, operation)),
        }
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send_text(&self, request: &TextRequest) -> Result<FrameStream> {
        self.record(RecordedRequest::Text(ChatStreamBody::from(request)));

        match self.get_next_response() {
            MockResponse::Stream { frames, error, delay_ms, status } => {
                if let Some(status) = status.filter(|s| !(200..300).contains(s)) {
                    tracing::warn!(status, "chat request answered with non-success status");
                }
                let stream = async_stream::stream! {
                    for frame in frames {
                        if delay_ms > 0 {
                            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        }
                        yield Ok(frame.into_bytes());
                    }
                    if let Some(message) = error {
                        yield Err(Error::from(TransportError::Stream(message)));
                    }
                };
                Ok(Box::pin(stream))
            }
            MockResponse::Status { status } => {
                tracing::warn!(status, "chat request answered with non-success status");
                Ok(Box::pin(futures::stream::empty::<Result<Bytes>>()))
            }
            other => Err(Self::failure(other, "Chat request")),
        }
    }

    async fn send_file(&self, request: &FileRequest) -> Result<UploadResult> {
        let size = request.file.read_bytes().await?.len();
        self.record(RecordedRequest::File { name: request.file.name().to_string(), size });

        match self.get_next_response() {
            MockResponse::Upload { analysis } => Ok(UploadResult { analysis }),
            other => Err(Self::failure(other, "Upload")),
        }
    }

    async fn reset(&self) -> Result<()> {
        self.record(RecordedRequest::Reset);

        match self.get_next_response() {
            MockResponse::Error { message } => Err(TransportError::Request(message).into()),
            _ => Ok(()),
        }
    }

    async fn list_files(&self) -> Result<Vec<FileCatalogEntry>> {
        self.record(RecordedRequest::ListFiles);

        match self.get_next_response() {
            MockResponse::Files { files } => Ok(files.into_iter().map(FileCatalogEntry::new).collect()),
            MockResponse::Status { .. } => Err(Error::CatalogFetch("Failed to fetch file list".to_string())),
            MockResponse::Error { message } => Err(Error::CatalogFetch(format!("Request failed: {}", message))),
            other => Err(Self::failure(other, "File list")),
        }
    }

    async fn ping(&self) -> Result<serde_json::Value> {
        self.record(RecordedRequest::Ping);

        match self.get_next_response() {
            MockResponse::Ping { body } => Ok(body),
            other => Err(Self::failure(other, "Ping")),
        }
    }

    async fn analyze_folder(&self, folder_path: &str) -> Result<String> {
        self.record(RecordedRequest::Analyze { folder_path: folder_path.to_string() });

        match self.get_next_response() {
            MockResponse::Summary { summary } => Ok(AnalyzeResponse { summary }.into_summary()),
            other => Err(Self::failure(other, "Folder analysis")),
        }
    }
}
