use serde::{Deserialize, Serialize};

use parley_core::{FileCatalogEntry, Role, TextRequest};

/// One entry of the `messages` array sent to `/chat-stream`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl WireMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Body of `POST /chat-stream`
///
/// Only the newest user message is sent; history lives on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatStreamBody {
    pub messages: Vec<WireMessage>,
    pub agent: String,
    pub source: String,
}

impl From<&TextRequest> for ChatStreamBody {
    fn from(request: &TextRequest) -> Self {
        Self {
            messages: vec![WireMessage::user(request.message.clone())],
            agent: request.agent.clone(),
            source: request.source.as_str().to_string(),
        }
    }
}

/// Body of `GET /files`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<FileCatalogEntry>,
}

/// Body of `POST /analyze-folder`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub summary: Option<String>,
}

pub const NO_SUMMARY: &str = "No summary returned.";

impl AnalyzeResponse {
    pub fn into_summary(self) -> String {
        self.summary.unwrap_or_else(|| NO_SUMMARY.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::Surface;

    #[test]
    fn test_chat_stream_body_serialization() {
        let request = TextRequest { message: "hi".to_string(), agent: "chat".to_string(), source: Surface::Web };
        let json = serde_json::to_string(&ChatStreamBody::from(&request)).unwrap();
        assert_eq!(json, r#"{"messages":[{"role":"user","content":"hi"}],"agent":"chat","source":"web"}"#);
    }

    #[test]
    fn test_chat_stream_body_vscode_source() {
        let request = TextRequest { message: "x".to_string(), agent: "review".to_string(), source: Surface::Vscode };
        let body = ChatStreamBody::from(&request);
        assert_eq!(body.source, "vscode");
        assert_eq!(body.agent, "review");
        assert_eq!(body.messages.len(), 1);
    }

    #[test]
    fn test_file_list_response() {
        let response: FileListResponse = serde_json::from_str(r#"{"files":["a.py","b.py"]}"#).unwrap();
        let names: Vec<&str> = response.files.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["a.py", "b.py"]);

        let empty: FileListResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.files.is_empty());
    }

    #[test]
    fn test_analyze_response_default_summary() {
        let response: AnalyzeResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.into_summary(), "No summary returned.");

        let response: AnalyzeResponse = serde_json::from_str(r#"{"summary":"3 modules"}"#).unwrap();
        assert_eq!(response.into_summary(), "3 modules");
    }

    #[test]
    fn test_upload_result_requires_analysis() {
        assert!(serde_json::from_str::<parley_core::UploadResult>(r#"{"result":"x"}"#).is_err());
    }
}
