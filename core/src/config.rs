use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::policy::{CHANGE_THRESHOLD, FULL_REFRESH_EVERY, RefreshPolicy};

pub const SOURCE_FILE: &str = "current_view.png";
pub const BASELINE_FILE: &str = "previous_view.png";
pub const POLL_INTERVAL_SECS: u64 = 5;
/// One day; longer intervals are certainly a typo.
pub const MAX_POLL_INTERVAL_SECS: f64 = 86_400.0;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("change threshold must be within [0, 1], got {0}")]
    Threshold(f64),
    #[error("full refresh cadence must be at least 1")]
    Cadence,
    #[error("poll interval must be within (0, 86400] seconds, got {0}")]
    Interval(f64),
    #[error("source and baseline must be different files ({0})")]
    SamePath(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Directory shared with the upstream renderer.
    pub shared_dir: PathBuf,
    pub source_file: String,
    pub baseline_file: String,
    pub poll_interval_secs: f64,
    /// Fraction of pixels that must change before the panel is refreshed.
    pub change_threshold: f64,
    pub full_refresh_every: u32,
    /// Simulation only: where to write the rendered frame.
    pub preview: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            shared_dir: PathBuf::from("shared"),
            source_file: SOURCE_FILE.to_string(),
            baseline_file: BASELINE_FILE.to_string(),
            poll_interval_secs: POLL_INTERVAL_SECS as f64,
            change_threshold: CHANGE_THRESHOLD,
            full_refresh_every: FULL_REFRESH_EVERY,
            preview: None,
        }
    }
}

impl ServiceConfig {
    pub fn with_shared_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.shared_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn source_path(&self) -> PathBuf {
        self.shared_dir.join(&self.source_file)
    }

    pub fn baseline_path(&self) -> PathBuf {
        self.shared_dir.join(&self.baseline_file)
    }

    /// Falls back to the default interval for negative or non-finite values.
    pub fn poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.poll_interval_secs)
            .unwrap_or(Duration::from_secs(POLL_INTERVAL_SECS))
    }

    pub fn policy(&self) -> RefreshPolicy {
        RefreshPolicy::new(self.change_threshold, self.full_refresh_every)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.change_threshold) {
            return Err(ConfigError::Threshold(self.change_threshold));
        }
        if self.full_refresh_every == 0 {
            return Err(ConfigError::Cadence);
        }
        let interval = self.poll_interval_secs;
        if !(interval > 0.0 && interval <= MAX_POLL_INTERVAL_SECS) {
            return Err(ConfigError::Interval(interval));
        }
        if self.source_file == self.baseline_file {
            return Err(ConfigError::SamePath(self.source_path()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_constants() {
        let config = ServiceConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.policy(), RefreshPolicy::new(0.015, 3));
        assert_eq!(config.source_path(), Path::new("shared/current_view.png"));
        assert_eq!(config.baseline_path(), Path::new("shared/previous_view.png"));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn validation_rejects_nonsense() {
        let mut config = ServiceConfig::default();
        config.change_threshold = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::Threshold(1.5)));

        let mut config = ServiceConfig::default();
        config.full_refresh_every = 0;
        assert_eq!(config.validate(), Err(ConfigError::Cadence));

        let mut config = ServiceConfig::default();
        config.poll_interval_secs = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::Interval(0.0)));

        let mut config = ServiceConfig::default();
        config.baseline_file = SOURCE_FILE.to_string();
        assert!(matches!(config.validate(), Err(ConfigError::SamePath(_))));
    }

    #[test]
    fn huge_or_invalid_intervals_are_rejected() {
        for secs in [1e19, 1e20, f64::INFINITY, f64::NAN, -1.0, MAX_POLL_INTERVAL_SECS + 1.0] {
            let mut config = ServiceConfig::default();
            config.poll_interval_secs = secs;
            assert!(
                matches!(config.validate(), Err(ConfigError::Interval(_))),
                "{secs} accepted"
            );
        }

        let mut config = ServiceConfig::default();
        config.poll_interval_secs = MAX_POLL_INTERVAL_SECS;
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.poll_interval(), Duration::from_secs(86_400));
    }
}
