pub mod config;
pub mod error;
pub mod host;
pub mod input;
pub mod logging;
pub mod message;
pub mod request;
pub mod transcript;
pub mod voice;

pub use config::{ChatConfig, Config, ConfigError, RenderConfig, ServerConfig, VoiceConfig};
pub use error::{Error, Result, TransportError};
pub use host::{DEFAULT_AGENT, Host};
pub use message::{CANCELLED_MARKER, Message, Role};
pub use request::{
    CatalogPanel, FileCatalogEntry, FileHandle, FileRequest, FileSource, Request, Surface, TextRequest, UploadResult,
};
pub use transcript::Transcript;
pub use voice::{VoiceCapture, VoiceEvent, VoiceState, VoiceToggle};
