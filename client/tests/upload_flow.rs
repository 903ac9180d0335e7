//! End-to-end flows against the development backend and ad-hoc servers.

use axum::{body::Bytes, http::StatusCode, routing::post, Router};
use report_backend::server::{router, AppState};
use rust_xlsxwriter::Workbook;
use std::time::Duration;

use weekly_report::models::{PPTX_MIME, XLSX_MIME};
use weekly_report::{
    follow_logs, parse_workbook, ArtifactKind, ClientConfig, DownloadDispatcher, DownloadError,
    GeneratedArtifact, LogBuffer, LogLevel, PreviewModel, SubmissionMode, TransferError,
    UploadOrchestrator, UploadRequest, UploadState, UploadableFile,
};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_backend() -> String {
    serve(router(AppState::new(None))).await
}

fn timesheet() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Week 1").unwrap();
    sheet.write_string(0, 0, "Name").unwrap();
    sheet.write_string(0, 1, "Hours").unwrap();
    sheet.write_string(1, 0, "Alice").unwrap();
    sheet.write_number(1, 1, 40).unwrap();
    workbook.add_worksheet().set_name("Week 2").unwrap();
    workbook.save_to_buffer().unwrap()
}

fn request(bytes: Vec<u8>) -> UploadRequest {
    UploadRequest::new(UploadableFile::new("week.xlsx", XLSX_MIME, bytes))
        .project_title("Apollo")
        .week_range("01 Jan 2024 - 07 Jan 2024")
        .company_name("Acme")
}

#[tokio::test]
async fn test_preview_upload_and_download() {
    let base = spawn_backend().await;
    let bytes = timesheet();

    let mut preview = PreviewModel::new(parse_workbook(&bytes).unwrap());
    assert_eq!(preview.sheet_names(), vec!["Week 1", "Week 2"]);
    assert_eq!(preview.set_active(9), Some(1));

    let orchestrator = UploadOrchestrator::http(ClientConfig::new(&base).unwrap());
    orchestrator.submit(request(bytes.clone())).unwrap();

    let state = orchestrator.settled().await;
    let artifacts = match &state {
        UploadState::Succeeded(artifacts) => artifacts.clone(),
        other => panic!("unexpected state: {:?}", other),
    };
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].kind, ArtifactKind::Report);
    assert!(artifacts[0].url.starts_with(&format!("{}/api/download-report/", base)));

    let dir = tempfile::tempdir().unwrap();
    let report = DownloadDispatcher::http(dir.path()).dispatch(&artifacts).await;
    assert!(report.all_succeeded());

    let saved = report.outcomes()[0].result.as_ref().unwrap();
    assert!(saved.file_name().unwrap().to_string_lossy().starts_with("report-"));
    assert!(saved.to_string_lossy().ends_with(".xlsx"));
    assert_eq!(std::fs::read(saved).unwrap(), bytes);
}

#[tokio::test]
async fn test_presentation_mode_returns_both_artifacts() {
    let base = spawn_backend().await;
    let config = ClientConfig::new(&base)
        .unwrap()
        .with_mode(SubmissionMode::Presentation);
    let orchestrator = UploadOrchestrator::http(config);

    let err = orchestrator.submit(request(timesheet())).unwrap_err();
    assert_eq!(err.fields(), vec!["ppt"]);

    let with_template = request(timesheet())
        .with_template(UploadableFile::new("deck.pptx", PPTX_MIME, b"slides".to_vec()));
    orchestrator.submit(with_template).unwrap();

    let state = orchestrator.settled().await;
    let kinds: Vec<ArtifactKind> = state.artifacts().iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![ArtifactKind::Report, ArtifactKind::Presentation]);

    let dir = tempfile::tempdir().unwrap();
    let report = DownloadDispatcher::http(dir.path()).dispatch(state.artifacts()).await;
    assert_eq!(report.succeeded(), 2);
    let deck = report.outcomes()[1].result.as_ref().unwrap();
    assert_eq!(std::fs::read(deck).unwrap(), b"slides");
}

#[tokio::test]
async fn test_server_error_status() {
    let app = Router::new().route(
        "/api/upload-report",
        post(|_body: Bytes| async { (StatusCode::INTERNAL_SERVER_ERROR, "generator crashed") }),
    );
    let base = serve(app).await;

    let orchestrator = UploadOrchestrator::http(ClientConfig::new(&base).unwrap());
    orchestrator.submit(request(vec![1; 2048])).unwrap();

    assert_eq!(
        orchestrator.settled().await,
        UploadState::Failed(TransferError::ServerError(500))
    );
}

#[tokio::test]
async fn test_unreachable_service() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let orchestrator = UploadOrchestrator::http(ClientConfig::new(&base).unwrap());
    orchestrator.submit(request(vec![1; 16])).unwrap();

    assert!(matches!(
        orchestrator.settled().await,
        UploadState::Failed(TransferError::NetworkError(_))
    ));
}

#[tokio::test]
async fn test_failed_download_does_not_block_others() {
    let base = spawn_backend().await;

    let orchestrator = UploadOrchestrator::http(ClientConfig::new(&base).unwrap());
    orchestrator.submit(request(vec![7; 64])).unwrap();
    let state = orchestrator.settled().await;

    let mut artifacts = vec![GeneratedArtifact::new(
        format!("{}/api/download-report/00000000-0000-4000-8000-000000000000", base),
        ArtifactKind::Presentation,
    )];
    artifacts.extend(state.artifacts().iter().cloned());

    let dir = tempfile::tempdir().unwrap();
    let report = DownloadDispatcher::http(dir.path()).dispatch(&artifacts).await;

    assert!(matches!(report.outcomes()[0].result, Err(DownloadError::Status(404))));
    assert!(report.outcomes()[1].result.is_ok());
}

#[tokio::test]
async fn test_log_stream_reaches_viewer() {
    let base = spawn_backend().await;
    let url = ClientConfig::new(&base).unwrap().logs_url();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let follower = tokio::spawn(async move {
        let client = reqwest::Client::new();
        let mut buffer = LogBuffer::new(10);
        let _ = follow_logs(&client, url, &mut buffer, |entry| {
            let _ = tx.send(entry.clone());
        })
        .await;
    });

    // Keep publishing until the subscription is live
    let mut received = None;
    for _ in 0..100 {
        report_backend::api::logs::success("log stream probe");
        if let Ok(Some(entry)) = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await {
            if entry.message == "log stream probe" {
                received = Some(entry);
                break;
            }
        }
    }

    let entry = received.expect("no log entry received");
    assert_eq!(entry.level, LogLevel::Success);
    follower.abort();
}
