//! The last image actually shown on the panel.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("image error on {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub struct BaselineStore {
    path: PathBuf,
}

impl BaselineStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn load(&self) -> Result<DynamicImage, BaselineError> {
        image::open(&self.path).map_err(|source| BaselineError::Image {
            path: self.path.clone(),
            source,
        })
    }

    /// Replaces the baseline. The image is written next to the target and
    /// renamed over it, so readers see either the old or the new file.
    pub fn store(&self, image: &DynamicImage) -> Result<(), BaselineError> {
        let tmp = self.tmp_path();
        image
            .save_with_format(&tmp, ImageFormat::Png)
            .map_err(|source| BaselineError::Image {
                path: tmp.clone(),
                source,
            })?;
        if let Err(source) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(BaselineError::Io {
                path: self.path.clone(),
                source,
            });
        }
        debug!("Baseline updated: {}", self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> Result<(), BaselineError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(BaselineError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "baseline".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
