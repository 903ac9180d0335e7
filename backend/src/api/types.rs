//! Request and response bodies of the report API.
//!
//! Field names follow the production service's camelCase contract.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Multipart field carrying the timesheet workbook.
pub const FIELD_EXCEL: &str = "excel";
/// Multipart field carrying the presentation template.
pub const FIELD_PPT: &str = "ppt";
/// Multipart field carrying the company logo.
pub const FIELD_LOGO: &str = "logoFile";

/// Text fields every upload must carry, non-blank.
pub const REQUIRED_FIELDS: [&str; 3] = ["projectTitle", "weekRange", "companyName"];

/// Answer to an upload with only a workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleUploadResponse {
    pub download_url: String,
}

/// Answer to an upload that also carried a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairedUploadResponse {
    pub excel_download_url: String,
    pub ppt_download_url: String,
}

/// Either upload answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadResponse {
    Paired(PairedUploadResponse),
    Single(SingleUploadResponse),
}

/// Error body: `{"message": ...}`.
pub fn error_response(message: &str) -> Value {
    json!({ "message": message })
}
