//! The polling loop that decides when and how to refresh the panel.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use image::DynamicImage;
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::baseline::{BaselineError, BaselineStore};
use crate::change_detector::{self, DiffRatio};
use crate::config::ServiceConfig;
use crate::display::{Display, DisplayError, RefreshMode};
use crate::policy::RefreshPolicy;
use crate::present;

/// Upper bound on how long an idle loop takes to notice a stop request.
const STOP_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to read source image {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("error updating display: {0}")]
    Hardware(#[from] DisplayError),
    #[error("failed to persist baseline: {0}")]
    Baseline(#[from] BaselineError),
}

/// Why a refresh was triggered.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// No baseline on disk.
    FirstRun,
    Changed(DiffRatio),
    /// The baseline could not be read; refresh rather than risk a stale panel.
    CompareFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    WaitingForSource,
    Unchanged(DiffRatio),
    Refreshed {
        update: u64,
        mode: RefreshMode,
        trigger: Trigger,
    },
}

enum Decision {
    Update(Trigger),
    Skip(DiffRatio),
}

pub struct RefreshScheduler<D> {
    display: D,
    source: PathBuf,
    baseline: BaselineStore,
    policy: RefreshPolicy,
    poll_interval: Duration,
    update_count: u64,
}

impl<D: Display> RefreshScheduler<D> {
    pub fn new(display: D, config: &ServiceConfig) -> Self {
        Self {
            display,
            source: config.source_path(),
            baseline: BaselineStore::new(config.baseline_path()),
            policy: config.policy(),
            poll_interval: config.poll_interval(),
            update_count: 0,
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn baseline(&self) -> &BaselineStore {
        &self.baseline
    }

    /// Refreshes performed (or attempted) since start.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// One polling iteration. Errors leave the baseline untouched.
    pub fn tick(&mut self) -> Result<TickOutcome, ServiceError> {
        if !self.source.is_file() {
            info!("Waiting for image source...");
            return Ok(TickOutcome::WaitingForSource);
        }

        let current = image::open(&self.source).map_err(|source| ServiceError::Source {
            path: self.source.clone(),
            source,
        })?;

        let trigger = match self.decide(&current) {
            Decision::Skip(diff) => return Ok(TickOutcome::Unchanged(diff)),
            Decision::Update(trigger) => trigger,
        };

        self.update_count += 1;
        let mode = self.policy.mode_for(self.update_count);
        present::present(&mut self.display, &current, mode)?;

        // Persist what was pushed, not a re-read of the source, which the
        // renderer may have replaced in the meantime.
        self.baseline.store(&current)?;

        Ok(TickOutcome::Refreshed {
            update: self.update_count,
            mode,
            trigger,
        })
    }

    fn decide(&self, current: &DynamicImage) -> Decision {
        if !self.baseline.exists() {
            info!("No previous image found. First run. Updating display.");
            return Decision::Update(Trigger::FirstRun);
        }

        let previous = match self.baseline.load() {
            Ok(previous) => previous,
            Err(err) => {
                error!("Error comparing images: {err}");
                return Decision::Update(Trigger::CompareFailed(err.to_string()));
            }
        };

        let diff = change_detector::difference(current, &previous);
        debug!("Image difference: {diff}");
        if self.policy.should_refresh(diff) {
            info!(
                "Change detected ({diff} > {:.2}%). Updating display.",
                self.policy.threshold() * 100.0
            );
            Decision::Update(Trigger::Changed(diff))
        } else {
            debug!("Change below threshold. Skipping update.");
            Decision::Skip(diff)
        }
    }

    /// Polls until `stop` is set, then releases the display.
    ///
    /// A refresh in progress always completes before `stop` is observed.
    pub fn run(&mut self, stop: &AtomicBool) {
        info!(
            "Watching {} every {:?}{}",
            self.source.display(),
            self.poll_interval,
            if self.display.is_simulated() {
                " (simulation mode)"
            } else {
                ""
            }
        );

        while !stop.load(Ordering::SeqCst) {
            match self.tick() {
                Ok(TickOutcome::Refreshed { update, mode, .. }) => {
                    info!("Refresh #{update} done ({mode})");
                }
                Ok(_) => {}
                Err(err) => error!("Unexpected error: {err}"),
            }
            self.wait(stop);
        }

        info!("Exiting...");
        self.shutdown();
    }

    pub fn shutdown(&mut self) {
        if let Err(err) = self.display.shutdown() {
            warn!("Display shutdown failed: {err}");
        }
    }

    fn wait(&self, stop: &AtomicBool) {
        let start = Instant::now();
        while !stop.load(Ordering::SeqCst) {
            let elapsed = start.elapsed();
            if elapsed >= self.poll_interval {
                break;
            }
            thread::sleep((self.poll_interval - elapsed).min(STOP_POLL));
        }
    }
}
