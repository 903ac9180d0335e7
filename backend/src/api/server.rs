//! HTTP server for the development report service.
//!
//! Accepts the same uploads as the production service. Instead of generating
//! anything it stores the uploaded workbook (and template) and hands them
//! back as the "generated" artifacts.
//!
//! # API Endpoints
//!
//! | Method | Path                          | Description                     |
//! |--------|-------------------------------|---------------------------------|
//! | GET    | `/health`                     | Health check                    |
//! | POST   | `/api/upload-report`          | Upload workbook + metadata      |
//! | GET    | `/api/download-report/{id}`   | Retrieve a generated artifact   |
//! | GET    | `/api/logs`                   | SSE stream for real-time logs   |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderValue, Method},
    response::{sse::Event, sse::KeepAlive, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::{self, LOG_BROADCASTER};
use super::types::{
    PairedUploadResponse, SingleUploadResponse, UploadResponse, FIELD_EXCEL, FIELD_LOGO, FIELD_PPT,
    REQUIRED_FIELDS,
};
use crate::error::{ServerError, ServerResult};
use crate::store::{ArtifactStore, StoredArtifact};

/// Largest request body accepted (three 5 MB files plus metadata).
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

const DOWNLOAD_PATH: &str = "/api/download-report";

/// Shared handler state.
#[derive(Clone, Default)]
pub struct AppState {
    pub store: Arc<ArtifactStore>,
    /// Prefix for download URLs; relative URLs when `None`.
    pub public_url: Option<String>,
}

impl AppState {
    pub fn new(public_url: Option<String>) -> Self {
        Self {
            store: Arc::new(ArtifactStore::new()),
            public_url: public_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    fn download_url(&self, id: Uuid) -> String {
        format!(
            "{}{}/{}",
            self.public_url.as_deref().unwrap_or(""),
            DOWNLOAD_PATH,
            id
        )
    }
}

/// Build the router; separate from [`start_server`] so tests can bind their own port.
pub fn router(state: AppState) -> Router {
    // Permissive CORS for local development
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload-report", post(upload_report))
        .route("/api/download-report/{id}", get(download_report))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(port: u16, public_url: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let public_url = public_url.or_else(|| Some(format!("http://localhost:{}", port)));
    let app = router(AppState::new(public_url));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Report service running on http://localhost:{}", port);
    println!("   POST /api/upload-report        - Upload workbook");
    println!("   GET  /api/download-report/{{id}} - Download artifact");
    println!("   GET  /api/logs                 - SSE log stream");
    println!("   GET  /health                   - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "weekly-report",
        "version": env!("CARGO_PKG_VERSION"),
        "artifacts": state.store.len(),
        "log_subscribers": LOG_BROADCASTER.subscriber_count(),
        "time": chrono::Utc::now().to_rfc3339(),
        "endpoints": {
            "upload": "POST /api/upload-report",
            "download": "GET /api/download-report/{id}",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(LOG_BROADCASTER.subscribe()).filter_map(|result| {
        // Lagged receivers skip what they missed
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

struct UploadedFile {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// Upload endpoint: store the workbook (and template) as artifacts.
async fn upload_report(State(state): State<AppState>, mut multipart: Multipart) -> ServerResult<Json<UploadResponse>> {
    let mut files: HashMap<String, UploadedFile> = HashMap::new();
    let mut fields: HashMap<String, String> = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            FIELD_EXCEL | FIELD_PPT | FIELD_LOGO => {
                let file_name = field.file_name().unwrap_or(&name).to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?.to_vec();
                files.insert(
                    name,
                    UploadedFile {
                        file_name,
                        content_type,
                        bytes,
                    },
                );
            }
            _ => {
                let value = field.text().await?;
                fields.insert(name, value);
            }
        }
    }

    let excel = files.remove(FIELD_EXCEL).ok_or_else(|| {
        logs::error("Upload rejected: no workbook");
        ServerError::BadRequest("No file part".to_string())
    })?;

    for required in REQUIRED_FIELDS {
        let present = fields.get(required).is_some_and(|v| !v.trim().is_empty());
        if !present {
            logs::error(format!("Upload rejected: {} is missing", required));
            return Err(ServerError::BadRequest(format!("Missing required field: {}", required)));
        }
    }

    logs::info(format!("📄 New upload: {} ({} bytes)", excel.file_name, excel.bytes.len()));
    for required in REQUIRED_FIELDS {
        logs::detail(format!("{}: {}", required, fields[required].trim()));
    }
    if let Some(logo) = files.get(FIELD_LOGO) {
        logs::detail(format!("logo: {} ({} bytes)", logo.file_name, logo.bytes.len()));
    }

    let report_id = state.store.insert(StoredArtifact::new(
        format!("report-{}", excel.file_name),
        excel.content_type,
        excel.bytes,
    ))?;

    let response = match files.remove(FIELD_PPT) {
        Some(ppt) => {
            let deck_id = state.store.insert(StoredArtifact::new(
                format!("presentation-{}", ppt.file_name),
                ppt.content_type,
                ppt.bytes,
            ))?;
            logs::success("Report and presentation ready");
            UploadResponse::Paired(PairedUploadResponse {
                excel_download_url: state.download_url(report_id),
                ppt_download_url: state.download_url(deck_id),
            })
        }
        None => {
            logs::success("Report ready");
            UploadResponse::Single(SingleUploadResponse {
                download_url: state.download_url(report_id),
            })
        }
    };

    Ok(Json(response))
}

/// Download endpoint: stored bytes as an attachment.
async fn download_report(State(state): State<AppState>, Path(id): Path<String>) -> ServerResult<Response> {
    let not_found = || ServerError::NotFound("Report not found".to_string());

    let artifact = match Uuid::parse_str(&id) {
        Ok(uuid) => state.store.get(&uuid)?,
        Err(_) => None,
    };
    let artifact = artifact.ok_or_else(|| {
        logs::warning(format!("Download miss: {}", id));
        not_found()
    })?;

    logs::info(format!("📥 Download: {}", artifact.file_name));

    let content_type = HeaderValue::from_str(&artifact.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", artifact.file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    let modified = HeaderValue::from_str(&artifact.created_at.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (header::LAST_MODIFIED, modified),
        ],
        artifact.bytes,
    )
        .into_response())
}
