//! Transparency recovery
//!
//! # Overview
//!
//! A figure rendered twice, once over white and once over black, carries enough
//! information to reconstruct its alpha channel: a fully opaque pixel looks the
//! same on both, a fully transparent one takes the background color.
//!
//! # Algorithm
//!
//! 1. `alpha = 1 + sum_c(black - white) / (255 * 3)`
//! 2. `color = black / alpha` (zero where alpha is zero)

use image::{imageops, ImageBuffer, Pixel, Rgb, RgbImage, Rgba, RgbaImage};
use thiserror::Error;
use tracing::debug;

use crate::crop::{BorderCropper, CropAmounts, CropError, CropOptions, CropOutcome, Padding};

/// Fully transparent pixel used as the crop background for RGBA output
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Error type for transparency operations
#[derive(Debug, Error)]
pub enum AlphaError {
    #[error("Renders differ in size: {white:?} on white, {black:?} on black")]
    SizeMismatch {
        white: (u32, u32),
        black: (u32, u32),
    },

    #[error("Crop failed: {0}")]
    Crop(#[from] CropError),
}

pub type Result<T> = std::result::Result<T, AlphaError>;

/// Recover an RGBA image from renders over white and over black backgrounds
pub fn recover_alpha(on_white: &RgbImage, on_black: &RgbImage) -> Result<RgbaImage> {
    if on_white.dimensions() != on_black.dimensions() {
        return Err(AlphaError::SizeMismatch {
            white: on_white.dimensions(),
            black: on_black.dimensions(),
        });
    }

    let (width, height) = on_white.dimensions();
    let mut transparent_pixels = 0u64;

    let out = ImageBuffer::from_fn(width, height, |x, y| {
        let white = on_white.get_pixel(x, y);
        let black = on_black.get_pixel(x, y);

        let diff: f32 = black
            .channels()
            .iter()
            .zip(white.channels())
            .map(|(&b, &w)| b as f32 - w as f32)
            .sum();
        let alpha = (1.0 + diff / (255.0 * 3.0)).clamp(0.0, 1.0);

        if alpha <= 0.0 {
            transparent_pixels += 1;
            return TRANSPARENT;
        }

        let mut px = [0u8; 4];
        for (dst, &b) in px.iter_mut().zip(black.channels()) {
            *dst = (b as f32 / alpha).round().clamp(0.0, 255.0) as u8;
        }
        px[3] = (alpha * 255.0).round() as u8;
        Rgba(px)
    });

    debug!(width, height, transparent_pixels, "recovered alpha channel");
    Ok(out)
}

/// Composite an RGBA image onto a solid background
pub fn flatten(rgba: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    let mut canvas = ImageBuffer::from_pixel(rgba.width(), rgba.height(), background.to_rgba());
    imageops::overlay(&mut canvas, rgba, 0, 0);
    ImageBuffer::from_fn(rgba.width(), rgba.height(), |x, y| {
        canvas.get_pixel(x, y).to_rgb()
    })
}

/// Crop an RGBA image against a fully transparent background
///
/// Pixels with zero alpha count as background whatever their color.
pub fn crop_transparent(
    mut rgba: RgbaImage,
    padding: Padding,
    amounts: CropAmounts,
) -> Result<CropOutcome<Rgba<u8>>> {
    for px in rgba.pixels_mut().filter(|px| px[3] == 0) {
        *px = TRANSPARENT;
    }

    let options = CropOptions::builder()
        .background(TRANSPARENT)
        .padding(padding)
        .amounts(amounts)
        .build();
    Ok(BorderCropper::crop_borders(&[rgba], &options)?)
}
