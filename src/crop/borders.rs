//! Border scanning and padding
//!
//! # Algorithm
//!
//! 1. Scan columns from the left, then from the right, rows from the top,
//!    then from the bottom, stopping at the first line where any channel of
//!    any frame differs from the background color
//! 2. Explicit per-edge amounts skip the scan for that edge
//! 3. Resolve the padding against the content size
//! 4. Positive padding places the content on a background-filled canvas,
//!    negative padding crops further inward

use image::{imageops, DynamicImage, ImageBuffer, Pixel, Rgba};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::types::{
    CropError, CropFileResult, CropOutcome, Edge, Frame, RelativeBBox, Result, Window,
};
use super::CropOptions;

/// Slack added to the right and bottom edges of the relative bounding box, in pixels
const BBOX_SLACK: f64 = 2.0;

/// Largest padded canvas, in pixels per frame
pub const MAX_CANVAS_PIXELS: u64 = 1 << 28;

/// Border cropper
pub struct BorderCropper;

impl BorderCropper {
    /// Crop the uniform borders of a stack of equally sized frames
    pub fn crop_borders<P>(frames: &[Frame<P>], options: &CropOptions<P>) -> Result<CropOutcome<P>>
    where
        P: Pixel<Subpixel = u8> + 'static,
    {
        let first = frames.first().ok_or(CropError::EmptyStack)?;
        let (w, h) = first.dimensions();
        if w == 0 || h == 0 {
            return Err(CropError::ZeroSized(w, h));
        }
        for (index, frame) in frames.iter().enumerate().skip(1) {
            if frame.dimensions() != (w, h) {
                return Err(CropError::FrameSizeMismatch {
                    index,
                    expected: (w, h),
                    actual: frame.dimensions(),
                });
            }
        }

        let background =
            |edge: Edge| -> P { options.background.unwrap_or_else(|| Self::sample_edge(first, edge)) };
        let amounts = &options.amounts;

        let left = match amounts.left {
            Some(n) => n.min(w - 1),
            None => {
                let bg = background(Edge::Left);
                (0..w)
                    .find(|&x| Self::column_differs(frames, x, &bg))
                    .unwrap_or(0)
            }
        };

        let right = match amounts.right {
            Some(n) => (w - 1).saturating_sub(n).max(left),
            None => {
                let bg = background(Edge::Right);
                (left..w)
                    .rev()
                    .find(|&x| Self::column_differs(frames, x, &bg))
                    .unwrap_or(w - 1)
            }
        };

        let top = match amounts.top {
            Some(n) => n.min(h - 1),
            None => {
                let bg = background(Edge::Top);
                (0..h)
                    .find(|&y| Self::row_differs(frames, y, &bg))
                    .unwrap_or(0)
            }
        };

        let bottom = match amounts.bottom {
            Some(n) => (h - 1).saturating_sub(n).max(top),
            None => {
                let bg = background(Edge::Bottom);
                (top..h)
                    .rev()
                    .find(|&y| Self::row_differs(frames, y, &bg))
                    .unwrap_or(h - 1)
            }
        };

        let content = Window {
            top,
            bottom,
            left,
            right,
        };
        debug!(?content, width = w, height = h, "border crop lines");

        let bbox_rel = Self::relative_bbox(&content, w, h);
        let padding = options.padding.resolve(bottom - top, right - left);
        let fill = background(Edge::Bottom);

        let (frames, source, placement) = if padding > 0 {
            let (pad, canvas_size) = u32::try_from(padding)
                .ok()
                .and_then(|pad| Some((pad, Self::padded_size(&content, pad)?)))
                .ok_or(CropError::PaddingTooLarge {
                    padding,
                    width: content.width(),
                    height: content.height(),
                })?;
            let placement = Window {
                top: pad,
                bottom: content.height() - 1 + pad,
                left: pad,
                right: content.width() - 1 + pad,
            };
            let padded = frames
                .iter()
                .map(|frame| Self::place_on_canvas(frame, &content, canvas_size, pad, fill))
                .collect();
            (padded, content, Some(placement))
        } else {
            let source = Self::shrink(&content, padding.unsigned_abs());
            let cropped = frames
                .iter()
                .map(|frame| Self::extract(frame, &source))
                .collect();
            (cropped, source, None)
        };

        Ok(CropOutcome {
            frames,
            source,
            placement,
            bbox_rel,
            padding,
            original_size: (w, h),
        })
    }

    /// Crop a dynamic image, keeping its color layout
    pub fn crop_image(
        image: &DynamicImage,
        options: &CropOptions<Rgba<u8>>,
    ) -> Result<(DynamicImage, CropOutcome<Rgba<u8>>)> {
        fn single<P: Pixel<Subpixel = u8> + 'static>(
            frame: Frame<P>,
            options: &CropOptions<P>,
        ) -> Result<(Frame<P>, CropOutcome<P>)> {
            let mut outcome = BorderCropper::crop_borders(std::slice::from_ref(&frame), options)?;
            let cropped = outcome.frames.remove(0);
            Ok((cropped, outcome))
        }

        let (cropped, outcome) = match image {
            DynamicImage::ImageLuma8(gray) => {
                let (img, o) = single(gray.clone(), &options.map(|p| p.to_luma()))?;
                (DynamicImage::ImageLuma8(img), o.without_frames())
            }
            DynamicImage::ImageLumaA8(gray) => {
                let (img, o) = single(gray.clone(), &options.map(|p| p.to_luma_alpha()))?;
                (DynamicImage::ImageLumaA8(img), o.without_frames())
            }
            img if img.color().has_alpha() => {
                let (img, o) = single(img.to_rgba8(), options)?;
                (DynamicImage::ImageRgba8(img), o.without_frames())
            }
            img => {
                let (img, o) = single(img.to_rgb8(), &options.map(|p| p.to_rgb()))?;
                (DynamicImage::ImageRgb8(img), o.without_frames())
            }
        };

        Ok((cropped, outcome))
    }

    /// Crop an image file and save the result
    pub fn crop_file(
        input_path: &Path,
        output_path: &Path,
        options: &CropOptions<Rgba<u8>>,
    ) -> Result<CropFileResult> {
        if !input_path.exists() {
            return Err(CropError::ImageNotFound(input_path.to_path_buf()));
        }

        let img = image::open(input_path).map_err(|e| CropError::InvalidImage(e.to_string()))?;
        let (cropped, outcome) = Self::crop_image(&img, options)?;

        cropped
            .save(output_path)
            .map_err(|e| CropError::InvalidImage(e.to_string()))?;

        let cropped_size = (cropped.width(), cropped.height());
        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            from = ?outcome.original_size,
            to = ?cropped_size,
            "cropped image"
        );

        Ok(CropFileResult {
            input_path: input_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
            original_size: outcome.original_size,
            cropped_size,
            source: outcome.source,
        })
    }

    /// Crop a batch of files in parallel
    pub fn crop_files(
        images: &[(PathBuf, PathBuf)],
        options: &CropOptions<Rgba<u8>>,
    ) -> Vec<Result<CropFileResult>> {
        images
            .par_iter()
            .map(|(input, output)| Self::crop_file(input, output, options))
            .collect()
    }

    /// Background sample taken from the middle of an edge of the first frame
    fn sample_edge<P: Pixel<Subpixel = u8> + 'static>(frame: &Frame<P>, edge: Edge) -> P {
        let (w, h) = frame.dimensions();
        let mid_row = h.div_ceil(2) - 1;
        let mid_col = w.div_ceil(2) - 1;
        match edge {
            Edge::Left => *frame.get_pixel(0, mid_row),
            Edge::Right => *frame.get_pixel(w - 1, mid_row),
            Edge::Top => *frame.get_pixel(mid_col, 0),
            Edge::Bottom => *frame.get_pixel(mid_col, h - 1),
        }
    }

    fn column_differs<P>(frames: &[Frame<P>], x: u32, bg: &P) -> bool
    where
        P: Pixel<Subpixel = u8> + 'static,
    {
        frames.iter().any(|frame| {
            (0..frame.height()).any(|y| frame.get_pixel(x, y).channels() != bg.channels())
        })
    }

    fn row_differs<P>(frames: &[Frame<P>], y: u32, bg: &P) -> bool
    where
        P: Pixel<Subpixel = u8> + 'static,
    {
        frames.iter().any(|frame| {
            (0..frame.width()).any(|x| frame.get_pixel(x, y).channels() != bg.channels())
        })
    }

    /// Content bounds as fractions of the image, y measured upward from the bottom
    fn relative_bbox(content: &Window, w: u32, h: u32) -> RelativeBBox {
        let (w, h) = (w as f64, h as f64);
        RelativeBBox {
            left: (content.left as f64 / w).clamp(0.0, 1.0),
            bottom: ((h - content.bottom as f64 - BBOX_SLACK) / h).clamp(0.0, 1.0),
            right: ((content.right as f64 + BBOX_SLACK) / w).clamp(0.0, 1.0),
            top: ((h - content.top as f64) / h).clamp(0.0, 1.0),
        }
    }

    /// Move every edge of `window` inward by `amount`, keeping at least one line
    fn shrink(window: &Window, amount: u64) -> Window {
        let amount = amount.min(u32::MAX as u64) as u32;
        let vertical = amount.min((window.bottom - window.top) / 2);
        let horizontal = amount.min((window.right - window.left) / 2);
        Window {
            top: window.top + vertical,
            bottom: window.bottom - vertical,
            left: window.left + horizontal,
            right: window.right - horizontal,
        }
    }

    fn extract<P>(frame: &Frame<P>, window: &Window) -> Frame<P>
    where
        P: Pixel<Subpixel = u8> + 'static,
    {
        imageops::crop_imm(
            frame,
            window.left,
            window.top,
            window.width(),
            window.height(),
        )
        .to_image()
    }

    /// Canvas size for content padded on every side; `None` when it is too large
    fn padded_size(content: &Window, pad: u32) -> Option<(u32, u32)> {
        let width = pad.checked_mul(2)?.checked_add(content.width())?;
        let height = pad.checked_mul(2)?.checked_add(content.height())?;
        (u64::from(width) * u64::from(height) <= MAX_CANVAS_PIXELS).then_some((width, height))
    }

    fn place_on_canvas<P: Pixel<Subpixel = u8> + 'static>(
        frame: &Frame<P>,
        content: &Window,
        canvas_size: (u32, u32),
        pad: u32,
        fill: P,
    ) -> Frame<P> {
        let mut canvas = ImageBuffer::from_pixel(canvas_size.0, canvas_size.1, fill);
        let cropped = Self::extract(frame, content);
        imageops::replace(&mut canvas, &cropped, pad as i64, pad as i64);
        canvas
    }
}

impl<P: Pixel<Subpixel = u8> + 'static> CropOutcome<P> {
    /// Drop the frames, keeping the geometry, retyped as RGBA
    fn without_frames(self) -> CropOutcome<Rgba<u8>> {
        CropOutcome {
            frames: Vec::new(),
            source: self.source,
            placement: self.placement,
            bbox_rel: self.bbox_rel,
            padding: self.padding,
            original_size: self.original_size,
        }
    }
}
