//! Settings assembly: defaults, then the TOML file, then the command line.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use paperview_core::config::ServiceConfig;

use crate::args::Cli;

pub fn load(cli: &Cli) -> anyhow::Result<ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => from_file(path)?,
        None => ServiceConfig::default().with_shared_dir(default_shared_dir()),
    };
    apply_overrides(&mut config, cli);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Relative directories in the file are taken relative to the file itself.
pub fn from_file(path: &Path) -> anyhow::Result<ServiceConfig> {
    let text = fs::read_to_string(path).with_context(|| format!("read config {path:?}"))?;
    let mut config: ServiceConfig =
        toml::from_str(&text).with_context(|| format!("parse config {path:?}"))?;
    if config.shared_dir.is_relative() {
        if let Some(base) = path.parent() {
            config.shared_dir = base.join(&config.shared_dir);
        }
    }
    Ok(config)
}

pub fn apply_overrides(config: &mut ServiceConfig, cli: &Cli) {
    if let Some(dir) = &cli.shared_dir {
        config.shared_dir = dir.clone();
    }
    if let Some(interval) = cli.interval {
        config.poll_interval_secs = interval;
    }
    if let Some(threshold) = cli.threshold {
        config.change_threshold = threshold;
    }
    if let Some(every) = cli.full_every {
        config.full_refresh_every = every;
    }
    if let Some(preview) = &cli.preview {
        config.preview = Some(preview.clone());
    }
}

/// `shared/` beside the directory holding the executable.
fn default_shared_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent()?.parent().map(|root| root.join("shared")))
        .unwrap_or_else(|| PathBuf::from("shared"))
}
