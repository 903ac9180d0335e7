//! Report Backend - local stand-in for the weekly report service
//!
//! ```bash
//! report-backend                                   # Listen on port 5000
//! report-backend --port 8080                       # Another port
//! report-backend --public-url https://dev.example  # Prefix for download URLs
//! ```

use clap::Parser;

#[derive(Parser)]
#[command(name = "report-backend")]
#[command(about = "Development server for the weekly report upload API", long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "5000")]
    port: u16,

    /// Base URL placed in download links (default: http://localhost:<port>)
    #[arg(long, env = "REPORT_PUBLIC_URL")]
    public_url: Option<String>,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = report_backend::server::start_server(cli.port, cli.public_url).await {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}
