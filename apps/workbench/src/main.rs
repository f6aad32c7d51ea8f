//! # Workbench - Bundle Curation Server
//!
//! The main binary for the Workbench bundle engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based) over an in-memory bundle
//! - CLI interface for curating a working bundle document on disk
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               apps/workbench (THE BINARY)            │
//! │                                                      │
//! │   ┌─────────────┐            ┌─────────────┐         │
//! │   │   CLI       │            │   HTTP API  │         │
//! │   │  (clap)     │            │   (axum)    │         │
//! │   └──────┬──────┘            └──────┬──────┘         │
//! │          │                          │                │
//! │          └────────────┬─────────────┘                │
//! │                       ▼                              │
//! │              ┌────────────────┐                      │
//! │              │ workbench-core │                      │
//! │              │  (THE ENGINE)  │                      │
//! │              └────────────────┘                      │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! workbench server --host 127.0.0.1 --port 8080
//!
//! # CLI operations
//! workbench status
//! workbench load -f incoming-bundle.json
//! workbench delete threat-actor--3f1c...
//! workbench export -o bundle.json
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use workbench::cli;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — WORKBENCH_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("WORKBENCH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "workbench=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Workbench startup banner.
fn print_banner() {
    println!(
        r#"
  ██╗    ██╗ ██████╗ ██████╗ ██╗  ██╗██████╗ ███████╗███╗   ██╗ ██████╗██╗  ██╗
  ██║    ██║██╔═══██╗██╔══██╗██║ ██╔╝██╔══██╗██╔════╝████╗  ██║██╔════╝██║  ██║
  ██║ █╗ ██║██║   ██║██████╔╝█████╔╝ ██████╔╝█████╗  ██╔██╗ ██║██║     ███████║
  ██║███╗██║██║   ██║██╔══██╗██╔═██╗ ██╔══██╗██╔══╝  ██║╚██╗██║██║     ██╔══██║
  ╚███╔███╔╝╚██████╔╝██║  ██║██║  ██╗██████╔╝███████╗██║ ╚████║╚██████╗██║  ██║
   ╚══╝╚══╝  ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═╝╚═════╝ ╚══════╝╚═╝  ╚═══╝ ╚═════╝╚═╝  ╚═╝

  Bundle Curation Workbench v{}

  Staged • Consistent • Exportable
"#,
        env!("CARGO_PKG_VERSION")
    );
}
