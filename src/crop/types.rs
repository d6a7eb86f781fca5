//! Border crop core types
//!
//! Contains the data structures shared by the crop scanner and its callers.

use image::{ImageBuffer, Pixel};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================
// Error Types
// ============================================================

/// Border crop error types
#[derive(Debug, Error)]
pub enum CropError {
    #[error("Image stack is empty")]
    EmptyStack,

    #[error("Image has zero size ({0}x{1})")]
    ZeroSized(u32, u32),

    #[error("Frame {index} is {actual:?}, expected {expected:?}")]
    FrameSizeMismatch {
        index: usize,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Padding {padding} is too large for {width}x{height} content")]
    PaddingTooLarge {
        padding: i64,
        width: u32,
        height: u32,
    },

    #[error("Image not found: {0}")]
    ImageNotFound(PathBuf),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CropError>;

/// A single 8-bit frame of any pixel layout
pub type Frame<P> = ImageBuffer<P, Vec<u8>>;

// ============================================================
// Edges
// ============================================================

/// Image edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    /// All edges in scan order
    pub fn all() -> [Edge; 4] {
        [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom]
    }
}

// ============================================================
// Padding
// ============================================================

/// Padding around the cropped content
///
/// Magnitudes below 1 are a fraction of the mean content dimension,
/// anything else is an absolute count of pixels (or points for vector output).
/// Negative values crop further inward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Padding(pub f64);

impl Padding {
    /// No padding
    pub const NONE: Padding = Padding(0.0);

    /// Absolute padding in pixels/points
    pub fn absolute(amount: i64) -> Self {
        Self(amount as f64)
    }

    /// Padding relative to the content size
    pub fn fraction(fraction: f64) -> Self {
        Self(fraction.clamp(-0.999, 0.999))
    }

    /// Whether this is a relative padding
    pub fn is_fraction(&self) -> bool {
        self.0 != 0.0 && self.0.abs() < 1.0
    }

    /// Scale an absolute padding (e.g. points to pixels); fractions are unit-free
    pub fn scaled(&self, factor: f64) -> Self {
        if self.is_fraction() {
            *self
        } else {
            Self(self.0 * factor)
        }
    }

    /// Resolve to a signed pixel count
    ///
    /// `span_h` and `span_w` are the distances between the crop lines
    /// (`bottom - top` and `right - left`).
    pub fn resolve(&self, span_h: u32, span_w: u32) -> i64 {
        let p = self.0;
        if p == 0.0 || !p.is_finite() {
            return 0;
        }
        if p.abs() < 1.0 {
            let mean = (span_h as f64 + span_w as f64) / 2.0;
            (p.signum() * (mean * p.abs()).round()) as i64
        } else {
            p.round() as i64
        }
    }
}

// ============================================================
// Crop Amounts
// ============================================================

/// Explicit per-edge crop amounts; `None` auto-detects that edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CropAmounts {
    pub top: Option<u32>,
    pub right: Option<u32>,
    pub bottom: Option<u32>,
    pub left: Option<u32>,
}

impl CropAmounts {
    /// Auto-detect every edge
    pub fn auto() -> Self {
        Self::default()
    }

    /// Fixed amounts on every edge
    pub fn fixed(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top: Some(top),
            right: Some(right),
            bottom: Some(bottom),
            left: Some(left),
        }
    }

    /// Amount for an edge
    pub fn get(&self, edge: Edge) -> Option<u32> {
        match edge {
            Edge::Top => self.top,
            Edge::Right => self.right,
            Edge::Bottom => self.bottom,
            Edge::Left => self.left,
        }
    }

    /// True when every edge is scanned
    pub fn is_auto(&self) -> bool {
        Edge::all().iter().all(|&e| self.get(e).is_none())
    }
}

// ============================================================
// Results
// ============================================================

/// Inclusive, 0-based coordinate window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Window {
    /// Window covering a whole `width` x `height` image
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            top: 0,
            bottom: height.saturating_sub(1),
            left: 0,
            right: width.saturating_sub(1),
        }
    }

    /// Window width in pixels
    pub fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    /// Window height in pixels
    pub fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }
}

/// Bounding box as fractions of the original image, PostScript orientation (y up)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RelativeBBox {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl RelativeBBox {
    /// The whole image
    pub fn full() -> Self {
        Self {
            left: 0.0,
            bottom: 0.0,
            right: 1.0,
            top: 1.0,
        }
    }
}

/// Result of a border crop
#[derive(Debug, Clone)]
pub struct CropOutcome<P: Pixel<Subpixel = u8> + 'static> {
    /// Cropped (and possibly padded) frames
    pub frames: Vec<Frame<P>>,
    /// Window of the original image that was kept
    pub source: Window,
    /// Where `source` was placed on the padded canvas (positive padding only)
    pub placement: Option<Window>,
    /// Bounding box of the detected content relative to the original image
    pub bbox_rel: RelativeBBox,
    /// Padding in pixels after resolving fractions
    pub padding: i64,
    /// Original image size
    pub original_size: (u32, u32),
}

impl<P: Pixel<Subpixel = u8> + 'static> CropOutcome<P> {
    /// Output frame size
    pub fn output_size(&self) -> (u32, u32) {
        self.frames
            .first()
            .map(|f| f.dimensions())
            .unwrap_or((0, 0))
    }

    /// True when nothing was removed or added
    pub fn is_unchanged(&self) -> bool {
        self.output_size() == self.original_size
            && self.source == Window::full(self.original_size.0, self.original_size.1)
    }
}

/// Batch crop result for a single file
#[derive(Debug)]
pub struct CropFileResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub original_size: (u32, u32),
    pub cropped_size: (u32, u32),
    pub source: Window,
}
