//! CLI argument definitions.

use std::path::PathBuf;

use clap::Parser;

pub const VERSION: &str = concat!(
    env!("PAPERVIEW_VERSION"),
    " (",
    env!("PAPERVIEW_BUILD_TIME"),
    ")"
);

#[derive(Debug, Parser)]
#[command(name = "paperview")]
#[command(version = VERSION)]
#[command(about = "Mirror a rendered image onto an e-paper panel", long_about = None)]
pub struct Cli {
    /// TOML file with service settings.
    #[arg(short, long, env = "PAPERVIEW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding current_view.png and previous_view.png.
    #[arg(long, env = "PAPERVIEW_SHARED_DIR")]
    pub shared_dir: Option<PathBuf>,

    /// Seconds between polls.
    #[arg(long)]
    pub interval: Option<f64>,

    /// Fraction of pixels that must change to trigger a refresh.
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Every Nth refresh is a full refresh.
    #[arg(long)]
    pub full_every: Option<u32>,

    /// Never touch the hardware, even if it is present.
    #[arg(long)]
    pub simulate: bool,

    /// In simulation, write each frame to this PNG.
    #[arg(long)]
    pub preview: Option<PathBuf>,

    /// Delete the baseline first so the next image is always shown.
    #[arg(long)]
    pub reset_baseline: bool,

    /// Run a single poll and exit.
    #[arg(long)]
    pub once: bool,

    /// Log per-poll difference ratios.
    #[arg(short, long)]
    pub verbose: bool,
}
