//! Border Cropping module
//!
//! Provides automatic removal of uniform borders from rendered figures.
//!
//! # Features
//!
//! - Per-edge scan against an explicit or sampled background color
//! - Explicit crop amounts for any subset of edges
//! - Relative or absolute padding, positive (canvas) or negative (extra crop)
//! - Relative bounding box for vector bounding-box correction
//! - Parallel batch processing of image files
//!
//! # Example
//!
//! ```rust,no_run
//! use figexport::{BorderCropper, CropOptions, Padding};
//! use image::Rgb;
//!
//! let figure = image::open("figure.png").unwrap().to_rgb8();
//! let options = CropOptions::builder()
//!     .background(Rgb([255, 255, 255]))
//!     .padding(Padding::absolute(10))
//!     .build();
//!
//! let outcome = BorderCropper::crop_borders(&[figure], &options).unwrap();
//! println!("Kept columns {}..={}", outcome.source.left, outcome.source.right);
//! ```

// Submodules
mod borders;
mod types;

// Re-export public API
pub use borders::BorderCropper;
pub use types::{
    CropAmounts, CropError, CropFileResult, CropOutcome, Edge, Frame, Padding, RelativeBBox,
    Result, Window,
};

use image::Pixel;

// ============================================================
// Options
// ============================================================

/// Border crop options
#[derive(Debug, Clone)]
pub struct CropOptions<P: Pixel<Subpixel = u8> + 'static> {
    /// Background color; `None` samples each edge's own background
    pub background: Option<P>,
    /// Padding applied after cropping
    pub padding: Padding,
    /// Explicit per-edge crop amounts
    pub amounts: CropAmounts,
}

impl<P: Pixel<Subpixel = u8> + 'static> Default for CropOptions<P> {
    fn default() -> Self {
        Self {
            background: None,
            padding: Padding::NONE,
            amounts: CropAmounts::auto(),
        }
    }
}

impl<P: Pixel<Subpixel = u8> + 'static> CropOptions<P> {
    /// Create a new options builder
    pub fn builder() -> CropOptionsBuilder<P> {
        CropOptionsBuilder::default()
    }

    /// Same options with the background converted to another pixel type
    pub fn map<Q, F>(&self, convert: F) -> CropOptions<Q>
    where
        Q: Pixel<Subpixel = u8> + 'static,
        F: Fn(P) -> Q,
    {
        CropOptions {
            background: self.background.map(convert),
            padding: self.padding,
            amounts: self.amounts,
        }
    }
}

/// Builder for CropOptions
#[derive(Debug)]
pub struct CropOptionsBuilder<P: Pixel<Subpixel = u8> + 'static> {
    options: CropOptions<P>,
}

impl<P: Pixel<Subpixel = u8> + 'static> Default for CropOptionsBuilder<P> {
    fn default() -> Self {
        Self {
            options: CropOptions::default(),
        }
    }
}

impl<P: Pixel<Subpixel = u8> + 'static> CropOptionsBuilder<P> {
    /// Set the background color
    #[must_use]
    pub fn background(mut self, color: P) -> Self {
        self.options.background = Some(color);
        self
    }

    /// Sample the background from each edge instead
    #[must_use]
    pub fn sampled_background(mut self) -> Self {
        self.options.background = None;
        self
    }

    /// Set the padding
    #[must_use]
    pub fn padding(mut self, padding: Padding) -> Self {
        self.options.padding = padding;
        self
    }

    /// Set explicit crop amounts
    #[must_use]
    pub fn amounts(mut self, amounts: CropAmounts) -> Self {
        self.options.amounts = amounts;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> CropOptions<P> {
        self.options
    }
}
