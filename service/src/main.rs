use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use log::info;
use paperview_core::scheduler::RefreshScheduler;

mod args;
mod config;
mod hardware;

fn main() {
    if let Err(err) = real_main() {
        eprintln!("paperview: {err:#}");
        std::process::exit(1);
    }
}

fn real_main() -> anyhow::Result<()> {
    use clap::Parser as _;

    let cli = args::Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    info!("Starting display service {}", args::VERSION);

    let config = config::load(&cli)?;
    fs::create_dir_all(&config.shared_dir)
        .with_context(|| format!("create shared directory {:?}", config.shared_dir))?;

    let display = hardware::open_display(&config, cli.simulate);
    let mut scheduler = RefreshScheduler::new(display, &config);

    if cli.reset_baseline {
        scheduler.baseline().clear().context("remove baseline")?;
        info!("Baseline removed, next image will be shown");
    }

    if cli.once {
        let outcome = scheduler.tick();
        scheduler.shutdown();
        info!("{:?}", outcome.context("single poll failed")?);
        return Ok(());
    }

    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("install interrupt handler")?;

    scheduler.run(&stop);
    Ok(())
}
