//! Stand-in panel used when no hardware is attached.

use std::path::{Path, PathBuf};

use image::ImageFormat;
use log::info;

use crate::display::{Display, DisplayError, RefreshMode};
use crate::framebuffer::MonoFrame;

pub struct SimulatedDisplay {
    width: u32,
    height: u32,
    preview: Option<PathBuf>,
    pending: Option<RefreshMode>,
    last_mode: Option<RefreshMode>,
    last_frame: Option<MonoFrame>,
    refresh_count: u64,
    asleep: bool,
    shut_down: bool,
}

impl SimulatedDisplay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            preview: None,
            pending: None,
            last_mode: None,
            last_frame: None,
            refresh_count: 0,
            asleep: true,
            shut_down: false,
        }
    }

    /// Also write every pushed frame to `path` as a black/white PNG.
    pub fn with_preview<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.preview = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    pub fn last_mode(&self) -> Option<RefreshMode> {
        self.last_mode
    }

    pub fn last_frame(&self) -> Option<&MonoFrame> {
        self.last_frame.as_ref()
    }

    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl Display for SimulatedDisplay {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn initialize(&mut self, mode: RefreshMode) -> Result<(), DisplayError> {
        self.pending = Some(mode);
        self.asleep = false;
        Ok(())
    }

    fn push(&mut self, frame: &MonoFrame) -> Result<(), DisplayError> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(DisplayError::FrameSize {
                got: frame.dimensions(),
                expected: (self.width, self.height),
            });
        }
        let mode = self.pending.take().unwrap_or(RefreshMode::Full);
        info!(
            "Simulation: display updated with new image. Full refresh: {}",
            mode.is_full()
        );
        if let Some(path) = &self.preview {
            frame.to_luma().save_with_format(path, ImageFormat::Png)?;
            info!("Simulation: preview written to {}", path.display());
        }
        self.last_mode = Some(mode);
        self.last_frame = Some(frame.clone());
        self.refresh_count += 1;
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        self.asleep = true;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), DisplayError> {
        info!("Simulation: display released");
        self.shut_down = true;
        Ok(())
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::BinaryColor;

    #[test]
    fn rejects_frames_of_wrong_size() {
        let mut display = SimulatedDisplay::new(8, 8);
        display.initialize(RefreshMode::Full).unwrap();
        let err = display.push(&MonoFrame::new(16, 8)).unwrap_err();
        assert!(matches!(err, DisplayError::FrameSize { .. }));
        assert_eq!(display.refresh_count(), 0);
    }

    #[test]
    fn writes_preview_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.png");
        let mut display = SimulatedDisplay::new(8, 2).with_preview(&path);

        let mut frame = MonoFrame::new(8, 2);
        frame.set_pixel(1, 1, BinaryColor::On);
        display.initialize(RefreshMode::Full).unwrap();
        display.push(&frame).unwrap();

        let preview = image::open(&path).unwrap().to_luma8();
        assert_eq!(preview.get_pixel(1, 1).0, [0x00]);
        assert_eq!(preview.get_pixel(0, 0).0, [0xFF]);
    }
}
