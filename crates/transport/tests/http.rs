//! HTTP transport against an in-process backend bound to a random loopback port.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Form, Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::{Value, json};

use parley_core::config::ServerConfig;
use parley_core::{Error, FileHandle, FileRequest, Host, Surface, TextRequest};
use parley_transport::{Endpoint, HttpTransport, Transport};

#[derive(Clone, Default)]
struct Captured {
    chat_body: Arc<Mutex<Option<Value>>>,
}

async fn chat_stream(State(captured): State<Captured>, Json(body): Json<Value>) -> impl IntoResponse {
    *captured.chat_body.lock().unwrap() = Some(body);
    // "€" is split across the last two frames.
    let frames: Vec<Result<Vec<u8>, std::io::Error>> =
        vec![Ok(b"He".to_vec()), Ok(vec![b'l', b'l', b'o', b' ', 0xE2, 0x82]), Ok(vec![0xAC])];
    Body::from_stream(futures::stream::iter(frames))
}

async fn upload(mut multipart: Multipart) -> impl IntoResponse {
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.unwrap();
            return Json(json!({ "analysis": format!("{} has {} bytes", name, bytes.len()) })).into_response();
        }
    }
    StatusCode::BAD_REQUEST.into_response()
}

async fn analyze(Form(form): Form<HashMap<String, String>>) -> Json<Value> {
    match form.get("folder_path").map(String::as_str) {
        Some("src") => Json(json!({ "summary": "src holds 3 modules" })),
        _ => Json(json!({})),
    }
}

fn backend(captured: Captured) -> Router {
    Router::new()
        .route("/chat-stream", post(chat_stream))
        .route("/upload", post(upload))
        .route("/files", get(|| async { Json(json!({ "files": ["a.py", "b.py"] })) }))
        .route("/reset", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/ping", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/analyze-folder", post(analyze))
        .with_state(captured)
}

fn failing_backend() -> Router {
    Router::new()
        .route("/chat-stream", post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model overloaded") }))
        .route("/upload", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/files", get(|| async { StatusCode::NOT_FOUND }))
        .route("/ping", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
}

fn malformed_backend() -> Router {
    Router::new()
        .route("/chat-stream", post(|| async { StatusCode::NO_CONTENT }))
        .route("/upload", post(|| async { "<html>oops</html>" }))
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}:{}", addr.ip(), addr.port())
}

struct LoopbackHost;

impl Host for LoopbackHost {
    fn text(&self) -> String {
        String::new()
    }

    fn set_text(&self, _text: &str) {}

    fn selected_file(&self) -> Option<FileHandle> {
        None
    }

    fn clear_selected_file(&self) {}

    fn is_loopback_host(&self) -> bool {
        true
    }

    fn origin(&self) -> String {
        "http://localhost:5173".to_string()
    }

    fn surface(&self) -> Surface {
        Surface::Web
    }
}

#[tokio::test]
async fn chat_stream_posts_latest_message_and_streams_raw_bytes() {
    let captured = Captured::default();
    let base = spawn(backend(captured.clone())).await;

    let server = ServerConfig { dev_origin: base, ..ServerConfig::default() };
    let transport = HttpTransport::new(Endpoint::resolve(&LoopbackHost, &server));

    let request = TextRequest { message: "hi".to_string(), agent: "chat".to_string(), source: Surface::Web };
    let mut frames = transport.send_text(&request).await.unwrap();

    let mut body = Vec::new();
    while let Some(frame) = frames.next().await {
        body.extend_from_slice(&frame.unwrap());
    }
    assert_eq!(String::from_utf8(body).unwrap(), "Hello €");

    let sent = captured.chat_body.lock().unwrap().clone().unwrap();
    assert_eq!(sent, json!({"messages":[{"role":"user","content":"hi"}],"agent":"chat","source":"web"}));
}

#[tokio::test]
async fn upload_sends_multipart_file_field() {
    let base = spawn(backend(Captured::default())).await;
    let transport = HttpTransport::new(Endpoint::new(base));

    let request = FileRequest { file: FileHandle::from_bytes("main.py", b"print('hi')".to_vec()) };
    let result = transport.send_file(&request).await.unwrap();
    assert_eq!(result.analysis, "main.py has 11 bytes");
}

#[tokio::test]
async fn upload_reads_file_from_disk() {
    let base = spawn(backend(Captured::default())).await;
    let transport = HttpTransport::new(Endpoint::new(base));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.csv");
    std::fs::write(&path, "a,b\n1,2\n").unwrap();

    let result = transport.send_file(&FileRequest { file: FileHandle::from_path(&path) }).await.unwrap();
    assert_eq!(result.analysis, "report.csv has 8 bytes");
}

#[tokio::test]
async fn catalog_ping_analyze_and_reset() {
    let base = spawn(backend(Captured::default())).await;
    let transport = HttpTransport::new(Endpoint::new(base));

    let files = transport.list_files().await.unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["a.py", "b.py"]);

    assert_eq!(transport.ping().await.unwrap(), json!({"status": "ok"}));
    assert_eq!(transport.analyze_folder("src").await.unwrap(), "src holds 3 modules");
    assert_eq!(transport.analyze_folder("docs").await.unwrap(), "No summary returned.");

    // Any response to /reset counts as success, even a 500.
    transport.reset().await.unwrap();
}

#[tokio::test]
async fn non_success_statuses_fail_every_route_but_chat() {
    let base = spawn(failing_backend()).await;
    let transport = HttpTransport::new(Endpoint::new(base));

    // The chat route has no failure envelope: its body streams like any reply.
    let request = TextRequest { message: "hi".to_string(), agent: "chat".to_string(), source: Surface::Cli };
    let mut frames = transport.send_text(&request).await.unwrap();
    let mut body = Vec::new();
    while let Some(frame) = frames.next().await {
        body.extend_from_slice(&frame.unwrap());
    }
    assert_eq!(body, b"model overloaded");

    let upload = FileRequest { file: FileHandle::from_bytes("a.py", vec![]) };
    let err = transport.send_file(&upload).await.unwrap_err();
    assert_eq!(err.transcript_text(), "Error: Upload failed with status 500");

    let err = transport.list_files().await.unwrap_err();
    assert!(matches!(err, Error::CatalogFetch(ref m) if m == "Failed to fetch file list"));

    let err = transport.ping().await.unwrap_err();
    assert_eq!(err.to_string(), "Ping failed with status 503");
}

#[tokio::test]
async fn missing_body_and_malformed_json() {
    let base = spawn(malformed_backend()).await;
    let transport = HttpTransport::new(Endpoint::new(base));

    let request = TextRequest { message: "hi".to_string(), agent: "chat".to_string(), source: Surface::Web };
    let err = transport.send_text(&request).await.err().unwrap();
    assert_eq!(err.transcript_text(), "Error: No response body");

    let upload = FileRequest { file: FileHandle::from_bytes("a.py", vec![]) };
    let err = transport.send_file(&upload).await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

#[tokio::test]
async fn unreachable_backend_is_request_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpTransport::new(Endpoint::new(format!("http://{}", addr)));
    let err = transport.ping().await.unwrap_err();
    assert!(err.to_string().starts_with("Request failed: "));
}
