//! Pushing an image through a [`Display`].

use image::imageops::{self, BiLevel, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage};
use log::info;

use crate::display::{Display, DisplayError, RefreshMode};

/// Fits `image` to the panel and reduces it to pure black and white.
///
/// Images already at panel resolution are not resampled. The reduction uses
/// Floyd–Steinberg error diffusion so gradients survive as dot patterns.
pub fn prepare(image: &DynamicImage, width: u32, height: u32) -> GrayImage {
    let mut luma = if image.dimensions() == (width, height) {
        image.to_luma8()
    } else {
        info!(
            "Resizing {}x{} -> {}x{}",
            image.width(),
            image.height(),
            width,
            height
        );
        image
            .resize_exact(width, height, FilterType::CatmullRom)
            .to_luma8()
    };
    imageops::dither(&mut luma, &BiLevel);
    luma
}

/// Runs one complete refresh: prepare, wake, transmit, sleep.
pub fn present<D: Display + ?Sized>(
    display: &mut D,
    image: &DynamicImage,
    mode: RefreshMode,
) -> Result<(), DisplayError> {
    let (width, height) = display.dimensions();
    let mono = prepare(image, width, height);
    let frame = display.render(&mono);

    match mode {
        RefreshMode::Full => info!("Mode: standard full refresh"),
        RefreshMode::Fast => info!("Mode: fast refresh"),
    }
    display.initialize(mode)?;

    info!("Displaying image...");
    display.push(&frame)?;

    info!("Sleeping display...");
    display.sleep()?;
    Ok(())
}
