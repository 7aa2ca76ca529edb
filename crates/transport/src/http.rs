use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client as HttpClient, Response, StatusCode};

use crate::endpoint::Endpoint;
use crate::types::{AnalyzeResponse, ChatStreamBody, FileListResponse};
use crate::{FrameStream, Transport};
use parley_core::{Error, FileCatalogEntry, FileRequest, Result, TextRequest, TransportError, UploadResult};

/// Transport over HTTP against the assistant backend
pub struct HttpTransport {
    client: HttpClient,
    endpoint: Endpoint,
}

impl HttpTransport {
    pub fn new(endpoint: Endpoint) -> Self {
        Self::with_client(HttpClient::new(), endpoint)
    }

    pub fn with_client(client: HttpClient, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.bytes().await.map_err(request_failed)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

fn request_failed(err: reqwest::Error) -> Error {
    TransportError::Request(err.to_string()).into()
}

fn ensure_success(response: &Response, operation: &'static str) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        tracing::warn!(operation, status = status.as_u16(), "request rejected");
        Err(TransportError::status(operation, status.as_u16()).into())
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send_text(&self, request: &TextRequest) -> Result<FrameStream> {
        let url = self.endpoint.url("/chat-stream");
        let body = ChatStreamBody::from(request);
        tracing::debug!(url = %url, agent = %body.agent, source = %body.source, "sending chat request");

        let response = self.client.post(&url).json(&body).send().await.map_err(request_failed)?;

        // The reply body is streamed whatever the status; only a bodiless answer fails.
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Err(TransportError::MissingBody.into());
        }
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "chat request answered with non-success status");
        }

        let frames = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| Error::from(TransportError::Stream(e.to_string()))));

        Ok(Box::pin(frames))
    }

    async fn send_file(&self, request: &FileRequest) -> Result<UploadResult> {
        let url = self.endpoint.url("/upload");
        let bytes = request.file.read_bytes().await?;
        tracing::debug!(url = %url, file = request.file.name(), size = bytes.len(), "uploading file");

        let part = Part::bytes(bytes).file_name(request.file.name().to_string());
        let form = Form::new().part("file", part);

        let response = self.client.post(&url).multipart(form).send().await.map_err(request_failed)?;
        ensure_success(&response, "Upload")?;

        Self::read_json(response).await
    }

    async fn reset(&self) -> Result<()> {
        let url = self.endpoint.url("/reset");
        let response = self.client.post(&url).send().await.map_err(request_failed)?;
        tracing::debug!(status = response.status().as_u16(), "reset acknowledged");
        Ok(())
    }

    async fn list_files(&self) -> Result<Vec<FileCatalogEntry>> {
        let url = self.endpoint.url("/files");
        let response =
            self.client.get(&url).send().await.map_err(|e| Error::CatalogFetch(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            tracing::warn!(status = response.status().as_u16(), "file list rejected");
            return Err(Error::CatalogFetch("Failed to fetch file list".to_string()));
        }

        let list: FileListResponse = Self::read_json(response).await?;
        Ok(list.files)
    }

    async fn ping(&self) -> Result<serde_json::Value> {
        let url = self.endpoint.url("/ping");
        let response = self.client.get(&url).send().await.map_err(request_failed)?;
        ensure_success(&response, "Ping")?;

        Self::read_json(response).await
    }

    async fn analyze_folder(&self, folder_path: &str) -> Result<String> {
        let url = self.endpoint.url("/analyze-folder");
        let response =
            self.client.post(&url).form(&[("folder_path", folder_path)]).send().await.map_err(request_failed)?;
        ensure_success(&response, "Folder analysis")?;

        let analysis: AnalyzeResponse = Self::read_json(response).await?;
        Ok(analysis.into_summary())
    }
}
