//! Scan subcommand: print the extracted tasks.

use super::view::ViewArgs;
use crate::format::OutputFormat;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the scan subcommand
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Output format (default: from config)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Output file path (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print only the tasks that the view would show
    #[arg(long)]
    pub filtered: bool,

    #[command(flatten)]
    pub view: ViewArgs,
}
