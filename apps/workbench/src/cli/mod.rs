//! # Workbench CLI Module
//!
//! This module implements the CLI interface for Workbench.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show bundle status
//! - `list` - List objects of one category
//! - `load` - Classify and merge an external bundle document
//! - `delete` - Delete objects (cascading) by id
//! - `retype` - Change an observable's concrete type
//! - `export` - Export the bundle document to a file
//! - `init` - Initialize a new empty working bundle

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use workbench_core::WorkbenchError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Workbench - Bundle Curation Server
///
/// Curates a staged collection of threat-intelligence objects before
/// import: classification, cascade delete, dedup, context reconciliation
/// and snapshot export, over a working bundle document on disk.
#[derive(Parser, Debug)]
#[command(name = "workbench")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the working bundle document
    #[arg(short = 'B', long, global = true, default_value = "workbench-bundle.json")]
    pub bundle: PathBuf,

    /// Path to a TOML type-schema file (defaults to the built-in lists)
    #[arg(short = 'S', long, global = true)]
    pub schema: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Show bundle status
    Status,

    /// List objects of one category
    List {
        /// Category (domain, observable, relationship, container)
        #[arg(short, long, default_value = "domain")]
        category: String,
    },

    /// Classify and merge an external bundle document
    Load {
        /// Path to the input document (JSON)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Delete objects by id, cascading through references
    Delete {
        /// Object ids to delete
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Change an observable's concrete type (re-mints its id)
    Retype {
        /// Id of the observable to retype
        id: String,

        /// New concrete type (e.g. Domain-Name)
        new_type: String,
    },

    /// Export the bundle document to a file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Initialize a new empty working bundle
    Init {
        /// Force initialization even if the bundle file exists
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), WorkbenchError> {
    let json_mode = cli.json_mode;
    let schema = load_schema(cli.schema.as_deref())?;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            cmd_server(&cli.bundle, &schema, &host, port).await
        }
        Some(Commands::Status) => cmd_status(&cli.bundle, &schema, json_mode),
        Some(Commands::List { category }) => cmd_list(&cli.bundle, &schema, json_mode, &category),
        Some(Commands::Load { file }) => cmd_load(&cli.bundle, &schema, json_mode, &file),
        Some(Commands::Delete { ids }) => cmd_delete(&cli.bundle, &schema, json_mode, &ids),
        Some(Commands::Retype { id, new_type }) => {
            cmd_retype(&cli.bundle, &schema, json_mode, &id, &new_type)
        }
        Some(Commands::Export { output }) => cmd_export(&cli.bundle, &schema, &output),
        Some(Commands::Init { force }) => cmd_init(&cli.bundle, force),
        None => {
            // No subcommand - show status by default
            cmd_status(&cli.bundle, &schema, json_mode)
        }
    }
}
