//! CLI command definitions for checklist-graph
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod render;
pub mod scan;
pub mod view;

use clap::{Args, Parser, Subcommand};
use render::RenderArgs;
use scan::ScanArgs;
use std::path::PathBuf;
use view::ViewArgs;

/// Checklist tasks from Markdown notes, as a force-directed graph
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Root directory of the notes to scan (overrides config)
    #[arg(long, global = true)]
    pub vault: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the interactive graph view (default if no subcommand given)
    #[command(alias = "show")]
    Serve(ServeArgs),

    /// Scan the notes and print the extracted tasks
    Scan(ScanArgs),

    /// Lay out the graph once and write it as SVG
    Render(RenderArgs),
}

/// Arguments for the serve subcommand
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Host to bind the graph view to (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port for the graph view (overrides config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Do not rescan when documents change
    #[arg(long)]
    pub no_watch: bool,

    #[command(flatten)]
    pub view: ViewArgs,
}
