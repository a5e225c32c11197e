//! Render subcommand: settle the layout once and write an SVG.

use super::view::ViewArgs;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the render subcommand
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Output file path (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Viewport width in pixels (default: from config)
    #[arg(long)]
    pub width: Option<f64>,

    /// Viewport height in pixels (default: from config)
    #[arg(long)]
    pub height: Option<f64>,

    /// Upper bound on simulation ticks before giving up on convergence
    #[arg(long, default_value_t = 3000)]
    pub max_ticks: usize,

    #[command(flatten)]
    pub view: ViewArgs,
}
