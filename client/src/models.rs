//! Domain models for the upload pipeline.
//!
//! - [`UploadableFile`] - an immutable captured file (name, MIME type, bytes)
//! - [`FileKind`] - which slot of the submission a file fills
//! - [`CellValue`], [`SheetPreview`], [`PreviewSet`] - decoded workbook preview
//! - [`SubmissionMode`], [`UploadRequest`], [`WeekRange`] - what gets submitted
//! - [`UploadProgress`] - percent of file bytes handed to the transport
//! - [`GeneratedArtifact`], [`ArtifactKind`] - what the service hands back

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::ValidationError;

// =============================================================================
// Files
// =============================================================================

/// The role a file plays in a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// The workbook the report is built from.
    Spreadsheet,
    /// Presentation template.
    Template,
    /// Company logo image.
    Logo,
}

impl FileKind {
    /// Multipart field name for this kind of file.
    pub fn field_name(&self) -> &'static str {
        match self {
            FileKind::Spreadsheet => "excel",
            FileKind::Template => "ppt",
            FileKind::Logo => "logoFile",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Spreadsheet => write!(f, "Spreadsheet"),
            FileKind::Template => write!(f, "Template"),
            FileKind::Logo => write!(f, "Logo"),
        }
    }
}

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLS_MIME: &str = "application/vnd.ms-excel";
pub const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Guess a MIME type from a file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "xlsx" => XLSX_MIME,
        "xls" => XLS_MIME,
        "pptx" => PPTX_MIME,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => OCTET_STREAM,
    }
}

/// A file captured for validation, preview and upload.
///
/// The bytes sit behind a shared read-only buffer; clones are cheap and
/// nothing in the pipeline can modify them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadableFile {
    name: String,
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl UploadableFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, deriving its MIME type from the extension.
    pub async fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(name, mime_for_path(path), bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the bytes.
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

// =============================================================================
// Workbook Preview
// =============================================================================

/// A single decoded cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    /// Text, including the empty-string sentinel for blank cells.
    Text(String),
}

static EMPTY_CELL: CellValue = CellValue::Text(String::new());

impl CellValue {
    /// The blank-cell sentinel.
    pub fn empty() -> Self {
        CellValue::Text(String::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.is_empty())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            CellValue::Number(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(_) => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Integers without decimals
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(value as f64)
    }
}

/// One sheet of a workbook as a row-major grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetPreview {
    pub sheet_name: String,
    /// Rows may be ragged; missing trailing cells read as empty.
    pub data: Vec<Vec<CellValue>>,
}

impl SheetPreview {
    pub fn new(sheet_name: impl Into<String>, data: Vec<Vec<CellValue>>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            data,
        }
    }

    /// Row 0, if any.
    pub fn header(&self) -> Option<&[CellValue]> {
        self.data.first().map(Vec::as_slice)
    }

    /// Rows after the header.
    pub fn body(&self) -> &[Vec<CellValue>] {
        self.data.get(1..).unwrap_or(&[])
    }

    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    /// Width of the widest row.
    pub fn column_count(&self) -> usize {
        self.data.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell lookup; cells past the end of a short row are empty.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.data
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// Decoded sheets in the workbook's declared order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewSet {
    sheets: Vec<SheetPreview>,
}

impl PreviewSet {
    pub fn new(sheets: Vec<SheetPreview>) -> Self {
        Self { sheets }
    }

    pub fn sheets(&self) -> &[SheetPreview] {
        &self.sheets
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SheetPreview> {
        self.sheets.get(index)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.sheet_name.as_str()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.sheet_name == name)
    }
}

// =============================================================================
// Submission
// =============================================================================

pub const FIELD_PROJECT_TITLE: &str = "projectTitle";
pub const FIELD_WEEK_RANGE: &str = "weekRange";
pub const FIELD_COMPANY_NAME: &str = "companyName";

/// What the service is asked to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionMode {
    /// Spreadsheet report; a template may be attached but is not required.
    #[default]
    Report,
    /// Presentation built from a template; the template is required.
    Presentation,
}

impl SubmissionMode {
    pub fn requires_template(&self) -> bool {
        matches!(self, SubmissionMode::Presentation)
    }

    /// Metadata fields that must be present and non-blank.
    pub fn required_metadata(&self) -> &'static [&'static str] {
        &[FIELD_PROJECT_TITLE, FIELD_WEEK_RANGE, FIELD_COMPANY_NAME]
    }

    /// Kind assigned to a single-URL response.
    pub fn primary_artifact(&self) -> ArtifactKind {
        match self {
            SubmissionMode::Report => ArtifactKind::Report,
            SubmissionMode::Presentation => ArtifactKind::Presentation,
        }
    }
}

/// Files and metadata for one submission.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub spreadsheet: Option<UploadableFile>,
    pub template: Option<UploadableFile>,
    pub logo: Option<UploadableFile>,
    pub metadata: BTreeMap<String, String>,
}

impl UploadRequest {
    pub fn new(spreadsheet: UploadableFile) -> Self {
        Self {
            spreadsheet: Some(spreadsheet),
            ..Default::default()
        }
    }

    pub fn with_template(mut self, template: UploadableFile) -> Self {
        self.template = Some(template);
        self
    }

    pub fn with_logo(mut self, logo: UploadableFile) -> Self {
        self.logo = Some(logo);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }

    pub fn project_title(self, value: impl Into<String>) -> Self {
        self.with_field(FIELD_PROJECT_TITLE, value)
    }

    pub fn week_range(self, value: impl Into<String>) -> Self {
        self.with_field(FIELD_WEEK_RANGE, value)
    }

    pub fn company_name(self, value: impl Into<String>) -> Self {
        self.with_field(FIELD_COMPANY_NAME, value)
    }

    /// Metadata value trimmed, `None` when absent or blank.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.metadata
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Attached files with their kinds.
    pub fn files(&self) -> impl Iterator<Item = (FileKind, &UploadableFile)> {
        [
            (FileKind::Spreadsheet, self.spreadsheet.as_ref()),
            (FileKind::Template, self.template.as_ref()),
            (FileKind::Logo, self.logo.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, file)| file.map(|f| (kind, f)))
    }
}

const WEEK_DATE_FORMAT: &str = "%d %b %Y";

/// Inclusive date span shown on the report, e.g. `01 Jan 2024 - 07 Jan 2024`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvalidField {
                field: FIELD_WEEK_RANGE.to_string(),
                reason: "end date is before start date".to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse `"<DD Mon YYYY> - <DD Mon YYYY>"`.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidField {
            field: FIELD_WEEK_RANGE.to_string(),
            reason: reason.to_string(),
        };

        let (start, end) = value
            .split_once(" - ")
            .ok_or_else(|| invalid("expected '<DD Mon YYYY> - <DD Mon YYYY>'"))?;
        let start = NaiveDate::parse_from_str(start.trim(), WEEK_DATE_FORMAT)
            .map_err(|_| invalid("start date is not 'DD Mon YYYY'"))?;
        let end = NaiveDate::parse_from_str(end.trim(), WEEK_DATE_FORMAT)
            .map_err(|_| invalid("end date is not 'DD Mon YYYY'"))?;

        Self::new(start, end)
    }
}

impl fmt::Display for WeekRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format(WEEK_DATE_FORMAT),
            self.end.format(WEEK_DATE_FORMAT)
        )
    }
}

// =============================================================================
// Progress
// =============================================================================

/// Upload progress as a whole percent in `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct UploadProgress(u8);

impl UploadProgress {
    pub const ZERO: UploadProgress = UploadProgress(0);
    pub const COMPLETE: UploadProgress = UploadProgress(100);

    /// `sent / total` as a percent, clamped. An empty payload counts as done.
    pub fn from_bytes(sent: u64, total: u64) -> Self {
        if total == 0 {
            return Self::COMPLETE;
        }
        let percent = (sent.min(total) as u128 * 100 / total as u128) as u8;
        UploadProgress(percent)
    }

    pub fn percent(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for UploadProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

// =============================================================================
// Artifacts
// =============================================================================

/// Kind of file the service generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Report,
    Presentation,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Report => "report",
            ArtifactKind::Presentation => "presentation",
        }
    }

    /// Extension used when the download URL carries none.
    pub fn default_extension(&self) -> &'static str {
        match self {
            ArtifactKind::Report => "xlsx",
            ArtifactKind::Presentation => "pptx",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A downloadable output referenced by URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub url: String,
    pub kind: ArtifactKind,
}

impl GeneratedArtifact {
    pub fn new(url: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }
}

/// Drop artifacts whose URL was already seen, keeping first-seen order.
pub fn dedup_artifacts(artifacts: impl IntoIterator<Item = GeneratedArtifact>) -> Vec<GeneratedArtifact> {
    let mut seen = std::collections::HashSet::new();
    artifacts
        .into_iter()
        .filter(|a| seen.insert(a.url.clone()))
        .collect()
}
