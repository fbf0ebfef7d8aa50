use image::GrayImage;
use thiserror::Error;

use crate::framebuffer::MonoFrame;

/// Refresh modes for the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Standard refresh with the complete waveform, clears ghosting
    Full,
    /// Fast refresh, leaves faint artifacts behind
    Fast,
}

impl RefreshMode {
    pub fn is_full(self) -> bool {
        self == RefreshMode::Full
    }
}

impl core::fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RefreshMode::Full => f.write_str("full"),
            RefreshMode::Fast => f.write_str("fast"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("spi error: {0}")]
    Spi(String),
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("frame is {got:?}, panel expects {expected:?}")]
    FrameSize {
        got: (u32, u32),
        expected: (u32, u32),
    },
    #[error("preview write failed: {0}")]
    Preview(#[from] image::ImageError),
}

/// Capability interface of an e-paper panel.
///
/// A refresh is always `initialize` → `push` → `sleep`. `render` is pure and
/// may be called before the panel is woken up.
pub trait Display {
    /// Native panel resolution as `(width, height)`.
    fn dimensions(&self) -> (u32, u32);
    fn initialize(&mut self, mode: RefreshMode) -> Result<(), DisplayError>;
    /// Converts a 1-bit, panel-sized image into the native buffer encoding.
    fn render(&self, image: &GrayImage) -> MonoFrame {
        MonoFrame::from_luma(image)
    }
    fn push(&mut self, frame: &MonoFrame) -> Result<(), DisplayError>;
    fn sleep(&mut self) -> Result<(), DisplayError>;
    fn shutdown(&mut self) -> Result<(), DisplayError>;
    fn is_simulated(&self) -> bool {
        false
    }
}

impl<D: Display + ?Sized> Display for Box<D> {
    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }

    fn initialize(&mut self, mode: RefreshMode) -> Result<(), DisplayError> {
        (**self).initialize(mode)
    }

    fn render(&self, image: &GrayImage) -> MonoFrame {
        (**self).render(image)
    }

    fn push(&mut self, frame: &MonoFrame) -> Result<(), DisplayError> {
        (**self).push(frame)
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        (**self).sleep()
    }

    fn shutdown(&mut self) -> Result<(), DisplayError> {
        (**self).shutdown()
    }

    fn is_simulated(&self) -> bool {
        (**self).is_simulated()
    }
}
