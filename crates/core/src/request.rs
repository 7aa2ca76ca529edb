use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// The calling surface, sent as the `source` tag of chat requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// Browser page (default)
    #[default]
    Web,
    /// Embedded IDE webview
    Vscode,
    /// Command-line invoked view
    Cli,
}

impl Surface {
    pub const VALUES: &[Surface] = &[Surface::Web, Surface::Vscode, Surface::Cli];

    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Web => "web",
            Surface::Vscode => "vscode",
            Surface::Cli => "cli",
        }
    }

    /// Cosmetic compact layout; carries no behavior beyond the view
    pub fn compact_mode(&self) -> bool {
        !matches!(self, Surface::Web)
    }
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Surface {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "web" => Ok(Surface::Web),
            "vscode" | "ide" => Ok(Surface::Vscode),
            "cli" => Ok(Surface::Cli),
            _ => Err(Error::Config(format!("invalid surface: {}", s))),
        }
    }
}

/// A free-text chat submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRequest {
    pub message: String,
    pub agent: String,
    pub source: Surface,
}

/// Where the bytes of a selected file come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Path(PathBuf),
    Memory(Vec<u8>),
}

/// A file picked for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    name: String,
    source: FileSource,
}

impl FileHandle {
    /// Handle backed by a file on disk; the display name is the final path component
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, source: FileSource::Path(path.to_path_buf()) }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), source: FileSource::Memory(bytes) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    /// Raw bytes of the file
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        match &self.source {
            FileSource::Path(path) => Ok(tokio::fs::read(path).await?),
            FileSource::Memory(bytes) => Ok(bytes.clone()),
        }
    }
}

/// A file upload submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRequest {
    pub file: FileHandle,
}

/// Exactly one of these is built per accepted submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Text(TextRequest),
    File(FileRequest),
}

impl Request {
    /// Content of the User message appended for this request
    pub fn user_message(&self) -> String {
        match self {
            Request::Text(text) => text.message.clone(),
            Request::File(file) => format!("File: {}", file.file.name()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Request::Text(_) => "text",
            Request::File(_) => "file",
        }
    }
}

/// Structured result of an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub analysis: String,
}

/// One server-side file name offered by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileCatalogEntry(String);

impl FileCatalogEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Text written into the input field when the entry is selected
    pub fn instruction(&self) -> String {
        format!("Let's work on the file: {}", self.0)
    }
}

impl std::fmt::Display for FileCatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the catalog panel currently shows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CatalogPanel {
    #[default]
    Empty,
    Loading,
    Entries(Vec<FileCatalogEntry>),
    /// Inline error shown in place of the list
    Failed(String),
}

impl CatalogPanel {
    pub fn entries(&self) -> &[FileCatalogEntry] {
        match self {
            CatalogPanel::Entries(entries) => entries,
            _ => &[],
        }
    }

    /// Single-line status for panels that are not a list
    pub fn status_line(&self) -> Option<String> {
        match self {
            CatalogPanel::Loading => Some("📁 Loading file list...".to_string()),
            CatalogPanel::Failed(reason) => Some(format!("❌ Error: {}", reason)),
            CatalogPanel::Empty | CatalogPanel::Entries(_) => None,
        }
    }
}
