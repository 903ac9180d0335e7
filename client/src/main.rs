//! Weekly Report CLI - preview timesheets and generate reports
//!
//! # Commands
//!
//! ```bash
//! weekly-report preview week.xlsx --sheet Jan      # Print one sheet of a workbook
//! weekly-report submit week.xlsx \
//!     --project-title Apollo \
//!     --week-range "01 Jan 2024 - 07 Jan 2024" \
//!     --company-name Acme                          # Upload and download results
//! weekly-report week-range 2024-01-01 2024-01-07   # Format a week label
//! weekly-report logs                               # Follow the service log stream
//! ```

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

use weekly_report::{
    follow_logs, parse_workbook_in_background, validate, ClientConfig, ClientError, ClientResult,
    DownloadDispatcher, FileKind, FilePolicy, LogBuffer, ParseOptions, PreviewModel, SheetPreview,
    SubmissionMode, SubmitError, UploadOrchestrator, UploadRequest, UploadState, UploadableFile,
    WeekRange,
};

#[derive(Parser)]
#[command(name = "weekly-report")]
#[command(about = "Preview weekly timesheets and generate reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a workbook and print one of its sheets
    Preview {
        /// Workbook file (.xlsx or .xls)
        input: PathBuf,

        /// Sheet to show, by name or zero-based index (default: first)
        #[arg(short, long)]
        sheet: Option<String>,

        /// Only read the first N rows of each sheet
        #[arg(short, long)]
        rows: Option<usize>,
    },

    /// Upload a workbook and download the generated artifacts
    Submit(SubmitArgs),

    /// Print the week label for a date span
    WeekRange {
        /// First day (YYYY-MM-DD)
        start: NaiveDate,
        /// Last day (YYYY-MM-DD)
        end: NaiveDate,
    },

    /// Follow the report service's live log stream
    Logs {
        /// Report service URL (default: REPORT_BACKEND_URL or localhost:5000)
        #[arg(short, long)]
        backend: Option<String>,

        /// Entries kept in memory
        #[arg(short, long, default_value = "100")]
        capacity: usize,
    },
}

#[derive(Args)]
struct SubmitArgs {
    /// Workbook file (.xlsx or .xls)
    excel: PathBuf,

    #[arg(long)]
    project_title: String,

    /// e.g. "01 Jan 2024 - 07 Jan 2024"
    #[arg(long)]
    week_range: String,

    #[arg(long)]
    company_name: String,

    /// Presentation template (.pptx)
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Company logo image
    #[arg(short, long)]
    logo: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "report")]
    mode: ModeArg,

    /// Directory for downloaded artifacts (default: REPORT_DOWNLOAD_DIR or .)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Report service URL (default: REPORT_BACKEND_URL or localhost:5000)
    #[arg(short, long)]
    backend: Option<String>,

    /// Upload timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print artifact URLs without downloading them
    #[arg(long)]
    no_download: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Report,
    Presentation,
}

impl From<ModeArg> for SubmissionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Report => SubmissionMode::Report,
            ModeArg::Presentation => SubmissionMode::Presentation,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Preview { input, sheet, rows } => cmd_preview(&input, sheet.as_deref(), rows).await,
        Commands::Submit(args) => cmd_submit(args).await,
        Commands::WeekRange { start, end } => cmd_week_range(start, end),
        Commands::Logs { backend, capacity } => cmd_logs(backend.as_deref(), capacity).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_preview(input: &Path, sheet: Option<&str>, rows: Option<usize>) -> ClientResult<()> {
    eprintln!("📄 Previewing: {}", input.display());

    let file = UploadableFile::load(input).await?;
    validate(&file, FileKind::Spreadsheet, &FilePolicy::default())?;

    let set = parse_workbook_in_background(file.bytes(), ParseOptions { max_rows: rows }).await?;
    let mut model = PreviewModel::new(set);
    eprintln!("   Sheets: {}", model.sheet_names().join(", "));

    if let Some(wanted) = sheet {
        if !model.select_sheet(wanted) {
            let index = wanted
                .parse::<usize>()
                .map_err(|_| ClientError::Other(format!("No sheet named '{}'", wanted)))?;
            model.set_active(index);
        }
    }

    if let Some(current) = model.current() {
        eprintln!(
            "   Showing '{}': {} row(s) x {} column(s)\n",
            current.sheet_name,
            current.row_count(),
            current.column_count()
        );
        print_sheet(current);
    }

    Ok(())
}

fn print_sheet(sheet: &SheetPreview) {
    let width = sheet.column_count();
    for row in 0..sheet.row_count() {
        let cells: Vec<String> = (0..width).map(|col| sheet.cell(row, col).to_string()).collect();
        println!("{}", cells.join("\t"));
    }
}

async fn cmd_submit(args: SubmitArgs) -> ClientResult<()> {
    let mut config = ClientConfig::from_env()?.with_mode(args.mode.into());
    if let Some(url) = &args.backend {
        config = config.with_backend(url)?;
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(dir) = &args.out_dir {
        config = config.with_download_dir(dir);
    }

    eprintln!("📄 Loading: {}", args.excel.display());
    let mut request = UploadRequest::new(UploadableFile::load(&args.excel).await?)
        .project_title(args.project_title)
        .week_range(args.week_range)
        .company_name(args.company_name);
    if let Some(path) = &args.template {
        request = request.with_template(UploadableFile::load(path).await?);
    }
    if let Some(path) = &args.logo {
        request = request.with_logo(UploadableFile::load(path).await?);
    }

    let download_dir = config.download_dir.clone();
    let orchestrator = UploadOrchestrator::http(config);
    let mut updates = orchestrator.subscribe();

    if let Err(err) = orchestrator.submit(request) {
        if let SubmitError::Invalid(errors) = &err {
            for error in errors {
                eprintln!("   - {}: {}", error.field(), error);
            }
        }
        return Err(err.into());
    }

    let state = loop {
        let state = updates.borrow_and_update().clone();
        if let Some(progress) = state.progress() {
            eprint!("\r📤 Uploading... {:>4}", progress.to_string());
        }
        if state.is_settled() {
            break state;
        }
        if updates.changed().await.is_err() {
            break orchestrator.state();
        }
    };
    eprintln!();

    let artifacts = match state {
        UploadState::Succeeded(artifacts) => artifacts,
        UploadState::Failed(err) => return Err(err.into()),
        other => return Err(ClientError::Other(format!("Upload ended in state '{}'", other))),
    };

    eprintln!("✅ Report generated: {} artifact(s)", artifacts.len());
    for artifact in &artifacts {
        println!("{}\t{}", artifact.kind, artifact.url);
    }

    if args.no_download {
        return Ok(());
    }

    eprintln!("\n📥 Downloading to {}", download_dir.display());
    let report = DownloadDispatcher::http(download_dir).dispatch(&artifacts).await;
    for outcome in report.outcomes() {
        match &outcome.result {
            Ok(path) => eprintln!("   ✅ {}: {}", outcome.artifact.kind, path.display()),
            Err(e) => eprintln!("   ❌ {}: {}", outcome.artifact.kind, e),
        }
    }

    if !report.all_succeeded() {
        return Err(ClientError::Other(format!("{} download(s) failed", report.failed())));
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_week_range(start: NaiveDate, end: NaiveDate) -> ClientResult<()> {
    let range = WeekRange::new(start, end)?;
    println!("{}", range);
    Ok(())
}

async fn cmd_logs(backend: Option<&str>, capacity: usize) -> ClientResult<()> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = backend {
        config = config.with_backend(url)?;
    }

    let mut buffer = LogBuffer::new(capacity);
    follow_logs(&reqwest::Client::new(), config.logs_url(), &mut buffer, |entry| {
        println!("{}", entry)
    })
    .await?;

    if buffer.evicted() > 0 {
        eprintln!("   ({} older entries dropped)", buffer.evicted());
    }
    Ok(())
}
