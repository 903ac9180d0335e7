//! Local validation of files and submission fields.
//!
//! Nothing here performs I/O or touches file bytes. Two entry points:
//!
//! - [`validate`] checks a single file against the [`FilePolicy`] for its kind
//!   (type first, then size).
//! - [`check_request`] runs every check a submission needs and reports all
//!   problems at once, so the user can fix them in one pass.
//!
//! # Example
//!
//! ```rust,ignore
//! use weekly_report::{validate, FileKind, FilePolicy, UploadableFile};
//!
//! let file = UploadableFile::new("logo.bmp", "image/bmp", bytes);
//! assert!(validate(&file, FileKind::Logo, &FilePolicy::default()).is_ok());
//! ```

use std::collections::HashMap;

use crate::config::MAX_FILE_SIZE;
use crate::error::{ValidationError, ValidationResult};
use crate::models::{
    FileKind, SubmissionMode, UploadRequest, UploadableFile, WeekRange, FIELD_WEEK_RANGE, PPTX_MIME,
    XLSX_MIME, XLS_MIME,
};

/// Allowed types and size limit for one kind of file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindRule {
    /// MIME types; `type/*` entries match any subtype.
    pub allowed_types: Vec<String>,
    /// Maximum size in bytes (inclusive).
    pub max_bytes: u64,
}

impl KindRule {
    pub fn new<I, S>(allowed_types: I, max_bytes: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_types: allowed_types.into_iter().map(Into::into).collect(),
            max_bytes,
        }
    }

    fn allows(&self, declared: &str) -> bool {
        let declared = essence(declared);
        self.allowed_types.iter().any(|allowed| {
            let allowed = allowed.to_ascii_lowercase();
            match allowed.strip_suffix("/*") {
                Some(major) => declared
                    .split_once('/')
                    .is_some_and(|(m, _)| m == major),
                None => allowed == declared,
            }
        })
    }
}

/// Strip parameters and normalise case: `Image/PNG; q=1` -> `image/png`.
fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Per-kind validation policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePolicy {
    rules: HashMap<FileKind, KindRule>,
}

impl FilePolicy {
    /// Policy with no rules; every file of an unconfigured kind is rejected.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Replace the rule for `kind`.
    pub fn with_rule(mut self, kind: FileKind, rule: KindRule) -> Self {
        self.rules.insert(kind, rule);
        self
    }

    /// Change only the size limit for `kind`.
    pub fn with_max_bytes(mut self, kind: FileKind, max_bytes: u64) -> Self {
        if let Some(rule) = self.rules.get_mut(&kind) {
            rule.max_bytes = max_bytes;
        }
        self
    }

    pub fn rule(&self, kind: FileKind) -> Option<&KindRule> {
        self.rules.get(&kind)
    }
}

impl Default for FilePolicy {
    fn default() -> Self {
        Self::empty()
            .with_rule(
                FileKind::Spreadsheet,
                KindRule::new([XLSX_MIME, XLS_MIME], MAX_FILE_SIZE),
            )
            .with_rule(FileKind::Template, KindRule::new([PPTX_MIME], MAX_FILE_SIZE))
            .with_rule(FileKind::Logo, KindRule::new(["image/*"], MAX_FILE_SIZE))
    }
}

/// Check one file's declared type and size against the policy for `kind`.
pub fn validate(file: &UploadableFile, kind: FileKind, policy: &FilePolicy) -> ValidationResult<()> {
    let wrong_type = || ValidationError::WrongType {
        kind,
        declared: file.mime_type().to_string(),
    };

    let rule = policy.rule(kind).ok_or_else(wrong_type)?;

    if !rule.allows(file.mime_type()) {
        return Err(wrong_type());
    }

    if file.size() > rule.max_bytes {
        return Err(ValidationError::TooLarge {
            kind,
            size: file.size(),
            max: rule.max_bytes,
        });
    }

    Ok(())
}

/// Run every local check for a submission.
///
/// Order: spreadsheet, template, logo, then metadata fields in the order the
/// mode declares them.
pub fn check_request(
    request: &UploadRequest,
    mode: SubmissionMode,
    policy: &FilePolicy,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match &request.spreadsheet {
        Some(file) => collect(&mut errors, validate(file, FileKind::Spreadsheet, policy)),
        None => errors.push(ValidationError::MissingField(
            FileKind::Spreadsheet.field_name().to_string(),
        )),
    }

    match &request.template {
        Some(file) => collect(&mut errors, validate(file, FileKind::Template, policy)),
        None if mode.requires_template() => errors.push(ValidationError::MissingField(
            FileKind::Template.field_name().to_string(),
        )),
        None => {}
    }

    if let Some(file) = &request.logo {
        collect(&mut errors, validate(file, FileKind::Logo, policy));
    }

    for field in mode.required_metadata() {
        match request.field(field) {
            None => errors.push(ValidationError::MissingField(field.to_string())),
            Some(value) if *field == FIELD_WEEK_RANGE => {
                collect(&mut errors, WeekRange::parse(value).map(|_| ()));
            }
            Some(_) => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn collect(errors: &mut Vec<ValidationError>, result: ValidationResult<()>) {
    if let Err(e) = result {
        errors.push(e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FIELD_COMPANY_NAME, FIELD_PROJECT_TITLE};

    fn xlsx(size: usize) -> UploadableFile {
        UploadableFile::new("week.xlsx", XLSX_MIME, vec![0u8; size])
    }

    fn complete_request() -> UploadRequest {
        UploadRequest::new(xlsx(16))
            .project_title("Apollo")
            .week_range("01 Jan 2024 - 07 Jan 2024")
            .company_name("Acme")
    }

    #[test]
    fn test_wrong_type_for_every_foreign_mime() {
        let policy = FilePolicy::default();
        for mime in ["text/csv", "application/pdf", "image/png", "", PPTX_MIME] {
            let file = UploadableFile::new("data", mime, vec![1, 2, 3]);
            let err = validate(&file, FileKind::Spreadsheet, &policy).unwrap_err();
            assert!(matches!(err, ValidationError::WrongType { .. }), "{mime}");
        }
    }

    #[test]
    fn test_too_large() {
        let policy = FilePolicy::default().with_max_bytes(FileKind::Spreadsheet, 10);
        assert!(validate(&xlsx(10), FileKind::Spreadsheet, &policy).is_ok());

        let err = validate(&xlsx(11), FileKind::Spreadsheet, &policy).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLarge {
                kind: FileKind::Spreadsheet,
                size: 11,
                max: 10
            }
        );
    }

    #[test]
    fn test_default_limit_is_five_megabytes() {
        let policy = FilePolicy::default();
        assert!(validate(&xlsx(5 * 1024 * 1024), FileKind::Spreadsheet, &policy).is_ok());
        assert!(validate(&xlsx(5 * 1024 * 1024 + 1), FileKind::Spreadsheet, &policy).is_err());
    }

    #[test]
    fn test_type_checked_before_size() {
        let policy = FilePolicy::default().with_max_bytes(FileKind::Template, 1);
        let file = UploadableFile::new("t.key", "application/x-keynote", vec![0; 100]);
        let err = validate(&file, FileKind::Template, &policy).unwrap_err();
        assert!(matches!(err, ValidationError::WrongType { .. }));
    }

    #[test]
    fn test_logo_wildcard_and_parameters() {
        let policy = FilePolicy::default();
        let png = UploadableFile::new("logo.png", "Image/PNG; charset=binary", vec![0; 4]);
        assert!(validate(&png, FileKind::Logo, &policy).is_ok());

        let svg = UploadableFile::new("logo.svg", "image/svg+xml", vec![0; 4]);
        assert!(validate(&svg, FileKind::Logo, &policy).is_ok());

        let pdf = UploadableFile::new("logo.pdf", "application/pdf", vec![0; 4]);
        assert!(validate(&pdf, FileKind::Logo, &policy).is_err());
    }

    #[test]
    fn test_validation_does_not_touch_bytes() {
        let file = xlsx(32);
        let before = file.bytes().to_vec();
        let _ = validate(&file, FileKind::Spreadsheet, &FilePolicy::default());
        assert_eq!(file.bytes(), before.as_slice());
    }

    #[test]
    fn test_complete_request_passes() {
        assert!(check_request(&complete_request(), SubmissionMode::Report, &FilePolicy::default()).is_ok());
    }

    #[test]
    fn test_blank_project_title_is_named() {
        let request = complete_request().project_title("  ");
        let errors = check_request(&request, SubmissionMode::Report, &FilePolicy::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingField(FIELD_PROJECT_TITLE.into())]);
    }

    #[test]
    fn test_every_problem_is_reported() {
        let request = UploadRequest::default()
            .with_logo(UploadableFile::new("logo.txt", "text/plain", vec![0]))
            .week_range("last week");
        let errors = check_request(&request, SubmissionMode::Presentation, &FilePolicy::default()).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(ValidationError::field).collect();
        assert_eq!(
            fields,
            vec!["excel", "ppt", "logoFile", FIELD_PROJECT_TITLE, FIELD_WEEK_RANGE, FIELD_COMPANY_NAME]
        );
    }

    #[test]
    fn test_template_optional_in_report_mode() {
        let request = complete_request();
        assert!(check_request(&request, SubmissionMode::Report, &FilePolicy::default()).is_ok());
        let errors = check_request(&request, SubmissionMode::Presentation, &FilePolicy::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingField("ppt".into())]);
    }
}
