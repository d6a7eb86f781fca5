//! Figure Export module
//!
//! Turns a rendered figure (EPS/PS, PDF or bitmap) into the requested output
//! files, cropping and patching along the way.
//!
//! # Features
//!
//! - Vector pipeline: font swap, line fixes, bounding-box crop, EPS and PDF
//!   output through Ghostscript (pdftops for PDF input)
//! - Bitmap pipeline: alpha recovery, border crop, PNG/TIFF/JPEG/BMP/GIF output
//! - Anti-aliasing by supersampled rendering
//! - PDF appending with bookmarks
//! - Dry-run plans serialisable to JSON
//!
//! # Example
//!
//! ```rust,no_run
//! use figexport::{ExportOptions, Exporter, OutputFormat, Padding};
//! use std::path::Path;
//!
//! let options = ExportOptions::builder()
//!     .formats([OutputFormat::Pdf, OutputFormat::Png])
//!     .resolution(300)
//!     .padding(Padding::absolute(5))
//!     .build();
//!
//! let report = Exporter::new(options)
//!     .export(Path::new("figure.eps"), None)
//!     .unwrap();
//! for file in &report.outputs {
//!     println!("{} {:?}", file.path.display(), file.size);
//! }
//! ```

mod bitmap;
mod pipeline;
mod plan;
mod types;
mod vector;

pub use pipeline::Exporter;
pub use plan::{ExportPlan, PlanStep};
pub use types::{
    ColorSpace, ExportError, ExportReport, ExportedFile, InputKind, OutputFormat, Result,
};

use std::path::PathBuf;

use crate::crop::{CropAmounts, Padding};
use crate::eps::FontSwap;

// ============================================================
// Constants
// ============================================================

/// Points per inch; a 72 dpi render has one pixel per point
pub const POINTS_PER_INCH: f64 = 72.0;

/// Largest supported anti-aliasing factor
pub const MAX_ANTI_ALIAS: u8 = 4;

/// JPEG quality used when none is given
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

// ============================================================
// Options
// ============================================================

/// Export options
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Requested formats; empty infers from the output name, else PNG
    pub formats: Vec<OutputFormat>,
    /// Bitmap resolution in DPI; overrides `magnify`
    pub resolution: Option<u32>,
    /// Scale factor relative to 72 DPI
    pub magnify: f64,
    /// Supersampling factor (1 = off)
    pub anti_alias: u8,
    /// Image quality 0-100, above 100 for lossless
    pub quality: Option<u8>,
    /// Padding around the cropped figure (pixels for bitmaps, points for vector)
    pub padding: Padding,
    /// Crop borders
    pub crop: bool,
    /// Explicit crop amounts per edge
    pub crop_amounts: CropAmounts,
    /// Keep the background transparent
    pub transparent: bool,
    /// Render of the same figure over black, for alpha recovery of bitmaps
    pub on_black: Option<PathBuf>,
    /// Output color space
    pub color: ColorSpace,
    /// Append to an existing PDF
    pub append: bool,
    /// Bookmark title for the PDF page
    pub bookmark: Option<String>,
    /// Replace non-standard fonts with standard PostScript fonts
    pub font_swap: bool,
    /// Explicit font substitutions, applied after the automatic ones
    pub fonts: FontSwap,
    /// Scale dash patterns with line width and round line joins
    pub fix_lines: bool,
    /// Extra Ghostscript arguments
    pub gs_extra_args: Vec<String>,
    /// Ghostscript binary
    pub ghostscript: Option<PathBuf>,
    /// pdftops binary
    pub pdftops: Option<PathBuf>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            formats: Vec::new(),
            resolution: None,
            magnify: 1.0,
            anti_alias: 1,
            quality: None,
            padding: Padding::NONE,
            crop: true,
            crop_amounts: CropAmounts::auto(),
            transparent: false,
            on_black: None,
            color: ColorSpace::Rgb,
            append: false,
            bookmark: None,
            font_swap: true,
            fonts: FontSwap::new(),
            fix_lines: false,
            gs_extra_args: Vec::new(),
            ghostscript: None,
            pdftops: None,
        }
    }
}

impl ExportOptions {
    /// Create a new options builder
    pub fn builder() -> ExportOptionsBuilder {
        ExportOptionsBuilder::default()
    }

    /// Effective bitmap resolution in DPI
    pub fn dpi(&self) -> u32 {
        self.resolution
            .unwrap_or_else(|| (POINTS_PER_INCH * self.magnify).round() as u32)
            .max(1)
    }

    /// Check option ranges
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_ANTI_ALIAS).contains(&self.anti_alias) {
            return Err(Self::invalid(format!(
                "anti-aliasing factor must be 1-{}, got {}",
                MAX_ANTI_ALIAS, self.anti_alias
            )));
        }
        if self.resolution.is_none() && !(self.magnify.is_finite() && self.magnify > 0.0) {
            return Err(Self::invalid(format!(
                "magnification must be positive, got {}",
                self.magnify
            )));
        }
        if self.resolution == Some(0) {
            return Err(Self::invalid("resolution must be positive"));
        }
        if !self.padding.0.is_finite() {
            return Err(Self::invalid("padding must be a finite number"));
        }
        Ok(())
    }

    fn invalid(msg: impl Into<String>) -> ExportError {
        ExportError::InvalidOptions(msg.into())
    }
}

/// Builder for ExportOptions
#[derive(Debug, Default)]
pub struct ExportOptionsBuilder {
    options: ExportOptions,
}

impl ExportOptionsBuilder {
    /// Set the output formats
    #[must_use]
    pub fn formats(mut self, formats: impl IntoIterator<Item = OutputFormat>) -> Self {
        self.options.formats = formats.into_iter().collect();
        self
    }

    /// Add one output format
    #[must_use]
    pub fn format(mut self, format: OutputFormat) -> Self {
        if !self.options.formats.contains(&format) {
            self.options.formats.push(format);
        }
        self
    }

    /// Set the bitmap resolution in DPI
    #[must_use]
    pub fn resolution(mut self, dpi: u32) -> Self {
        self.options.resolution = Some(dpi);
        self
    }

    /// Set the magnification relative to 72 DPI
    #[must_use]
    pub fn magnify(mut self, magnify: f64) -> Self {
        self.options.magnify = magnify;
        self
    }

    /// Set the anti-aliasing factor (clamped to 1-4)
    #[must_use]
    pub fn anti_alias(mut self, factor: u8) -> Self {
        self.options.anti_alias = factor.clamp(1, MAX_ANTI_ALIAS);
        self
    }

    /// Set the image quality
    #[must_use]
    pub fn quality(mut self, quality: u8) -> Self {
        self.options.quality = Some(quality);
        self
    }

    /// Set the padding
    #[must_use]
    pub fn padding(mut self, padding: Padding) -> Self {
        self.options.padding = padding;
        self
    }

    /// Enable or disable border cropping
    #[must_use]
    pub fn crop(mut self, crop: bool) -> Self {
        self.options.crop = crop;
        self
    }

    /// Set explicit crop amounts
    #[must_use]
    pub fn crop_amounts(mut self, amounts: CropAmounts) -> Self {
        self.options.crop_amounts = amounts;
        self
    }

    /// Keep the background transparent
    #[must_use]
    pub fn transparent(mut self, transparent: bool) -> Self {
        self.options.transparent = transparent;
        self
    }

    /// Set the over-black companion render
    #[must_use]
    pub fn on_black(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.on_black = Some(path.into());
        self
    }

    /// Set the output color space
    #[must_use]
    pub fn color(mut self, color: ColorSpace) -> Self {
        self.options.color = color;
        self
    }

    /// Append to an existing PDF
    #[must_use]
    pub fn append(mut self, append: bool) -> Self {
        self.options.append = append;
        self
    }

    /// Set the bookmark title
    #[must_use]
    pub fn bookmark(mut self, title: impl Into<String>) -> Self {
        self.options.bookmark = Some(title.into());
        self
    }

    /// Enable or disable automatic font swapping
    #[must_use]
    pub fn font_swap(mut self, enabled: bool) -> Self {
        self.options.font_swap = enabled;
        self
    }

    /// Set explicit font substitutions
    #[must_use]
    pub fn fonts(mut self, fonts: FontSwap) -> Self {
        self.options.fonts = fonts;
        self
    }

    /// Enable line style fixes
    #[must_use]
    pub fn fix_lines(mut self, enabled: bool) -> Self {
        self.options.fix_lines = enabled;
        self
    }

    /// Set extra Ghostscript arguments
    #[must_use]
    pub fn gs_extra_args(mut self, args: Vec<String>) -> Self {
        self.options.gs_extra_args = args;
        self
    }

    /// Set the Ghostscript binary
    #[must_use]
    pub fn ghostscript(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.ghostscript = Some(path.into());
        self
    }

    /// Set the pdftops binary
    #[must_use]
    pub fn pdftops(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.pdftops = Some(path.into());
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> ExportOptions {
        self.options
    }
}
