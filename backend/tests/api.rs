//! HTTP contract tests for the development report service.

use report_backend::server::{router, AppState};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

async fn spawn_server(public_url: Option<String>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(AppState::new(public_url));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn file_part(bytes: &[u8], name: &str, mime: &str) -> Part {
    Part::bytes(bytes.to_vec()).file_name(name.to_string()).mime_str(mime).unwrap()
}

fn metadata(form: Form) -> Form {
    form.text("projectTitle", "Apollo")
        .text("weekRange", "01 Jan 2024 - 07 Jan 2024")
        .text("companyName", "Acme")
}

#[tokio::test]
async fn test_upload_then_download() {
    let base = spawn_server(None).await;
    let client = reqwest::Client::new();

    let form = metadata(Form::new().part("excel", file_part(b"workbook bytes", "week.xlsx", XLSX_MIME)));
    let response = client
        .post(format!("{}/api/upload-report", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    let url = body["downloadUrl"].as_str().unwrap();
    assert!(url.starts_with("/api/download-report/"));
    assert!(body.get("pptDownloadUrl").is_none());

    let download = client.get(format!("{}{}", base, url)).send().await.unwrap();
    assert_eq!(download.status(), 200);
    assert_eq!(download.headers()["content-type"], XLSX_MIME);
    assert!(download.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains("report-week.xlsx"));
    let modified = download.headers()["last-modified"].to_str().unwrap().to_string();
    assert!(modified.ends_with(" GMT"));
    assert!(chrono::DateTime::parse_from_rfc2822(&modified.replace("GMT", "+0000")).is_ok());
    assert_eq!(download.bytes().await.unwrap().as_ref(), b"workbook bytes");
}

#[tokio::test]
async fn test_template_yields_paired_urls() {
    let base = spawn_server(Some("https://reports.example.com/".to_string())).await;

    let form = metadata(
        Form::new()
            .part("excel", file_part(b"x", "week.xlsx", XLSX_MIME))
            .part("ppt", file_part(b"p", "deck.pptx", PPTX_MIME)),
    );
    let body: Value = reqwest::Client::new()
        .post(format!("{}/api/upload-report", base))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let excel = body["excelDownloadUrl"].as_str().unwrap();
    let ppt = body["pptDownloadUrl"].as_str().unwrap();
    assert!(excel.starts_with("https://reports.example.com/api/download-report/"));
    assert!(ppt.starts_with("https://reports.example.com/api/download-report/"));
    assert_ne!(excel, ppt);
}

#[tokio::test]
async fn test_missing_excel_is_rejected() {
    let base = spawn_server(None).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/upload-report", base))
        .multipart(metadata(Form::new()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "No file part");
}

#[tokio::test]
async fn test_blank_metadata_is_named() {
    let base = spawn_server(None).await;

    let form = Form::new()
        .part("excel", file_part(b"x", "week.xlsx", XLSX_MIME))
        .text("projectTitle", "  ")
        .text("weekRange", "01 Jan 2024 - 07 Jan 2024")
        .text("companyName", "Acme");
    let response = reqwest::Client::new()
        .post(format!("{}/api/upload-report", base))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("projectTitle"));
}

#[tokio::test]
async fn test_unknown_report() {
    let base = spawn_server(None).await;
    let client = reqwest::Client::new();

    for id in ["not-a-uuid", "6a1f0c1e-8d0b-4c57-9a43-5b1d3d7f9e21"] {
        let response = client
            .get(format!("{}/api/download-report/{}", base, id))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"], "Report not found");
    }
}

#[tokio::test]
async fn test_health() {
    let base = spawn_server(None).await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["artifacts"], 0);
    assert!(body["log_subscribers"].is_u64());
}
