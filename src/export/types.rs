//! Export type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::alpha::AlphaError;
use crate::crop::{CropError, Window};
use crate::eps::{BoundingBox, EpsError};
use crate::exit_codes;
use crate::pdf::PdfError;
use crate::tools::ToolError;

// ============================================================
// Error Types
// ============================================================

/// Export error types
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Unsupported input file: {0}")]
    UnsupportedInput(PathBuf),

    #[error("{0} output is not supported")]
    UnsupportedFormat(OutputFormat),

    #[error("Unsupported conversion: {0}")]
    UnsupportedConversion(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Crop(#[from] CropError),

    #[error(transparent)]
    Alpha(#[from] AlphaError),

    #[error(transparent)]
    Eps(#[from] EpsError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ExportError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            ExportError::InputNotFound(_) => exit_codes::INPUT_NOT_FOUND,
            ExportError::Crop(CropError::ImageNotFound(_)) => exit_codes::INPUT_NOT_FOUND,
            ExportError::Pdf(PdfError::NotFound(_)) => exit_codes::INPUT_NOT_FOUND,
            ExportError::UnsupportedInput(_)
            | ExportError::UnsupportedFormat(_)
            | ExportError::UnsupportedConversion(_)
            | ExportError::InvalidOptions(_)
            | ExportError::Crop(CropError::PaddingTooLarge { .. }) => exit_codes::INVALID_ARGS,
            ExportError::Tool(ToolError::NotFound { .. }) => exit_codes::TOOL_NOT_FOUND,
            ExportError::Tool(_)
            | ExportError::Eps(_)
            | ExportError::Crop(_)
            | ExportError::Alpha(_)
            | ExportError::Pdf(_)
            | ExportError::Image(_) => exit_codes::CONVERSION_FAILED,
            ExportError::IoError(_) => exit_codes::GENERAL_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;

// ============================================================
// Formats
// ============================================================

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Eps,
    Png,
    Tiff,
    Jpeg,
    Bmp,
    Gif,
    Svg,
    Emf,
}

impl OutputFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Eps => "eps",
            OutputFormat::Png => "png",
            OutputFormat::Tiff => "tif",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Gif => "gif",
            OutputFormat::Svg => "svg",
            OutputFormat::Emf => "emf",
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(
            self,
            OutputFormat::Pdf | OutputFormat::Eps | OutputFormat::Svg | OutputFormat::Emf
        )
    }

    /// Whether the format can carry an alpha channel
    pub fn supports_alpha(&self) -> bool {
        matches!(
            self,
            OutputFormat::Pdf | OutputFormat::Eps | OutputFormat::Png | OutputFormat::Tiff
        )
    }

    /// Whether files of this format can be produced at all
    pub fn is_supported(&self) -> bool {
        !matches!(self, OutputFormat::Svg | OutputFormat::Emf)
    }

    /// Encoder used for bitmap formats
    pub fn image_format(&self) -> Option<image::ImageFormat> {
        match self {
            OutputFormat::Png => Some(image::ImageFormat::Png),
            OutputFormat::Tiff => Some(image::ImageFormat::Tiff),
            OutputFormat::Jpeg => Some(image::ImageFormat::Jpeg),
            OutputFormat::Bmp => Some(image::ImageFormat::Bmp),
            OutputFormat::Gif => Some(image::ImageFormat::Gif),
            _ => None,
        }
    }

    /// `<base>.<ext>`, keeping any dots already in the base name
    pub fn output_path(&self, base: &Path) -> PathBuf {
        let mut name = base.as_os_str().to_os_string();
        name.push(".");
        name.push(self.extension());
        PathBuf::from(name)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_ascii_uppercase())
    }
}

impl FromStr for OutputFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "eps" => Ok(OutputFormat::Eps),
            "png" => Ok(OutputFormat::Png),
            "tif" | "tiff" => Ok(OutputFormat::Tiff),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "bmp" => Ok(OutputFormat::Bmp),
            "gif" => Ok(OutputFormat::Gif),
            "svg" => Ok(OutputFormat::Svg),
            "emf" => Ok(OutputFormat::Emf),
            other => Err(ExportError::InvalidOptions(format!(
                "unknown output format '{}'",
                other
            ))),
        }
    }
}

/// Output color space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    #[default]
    Rgb,
    Gray,
    /// Vector output only
    Cmyk,
}

/// Kind of figure being exported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// EPS or PS
    PostScript,
    Pdf,
    Bitmap,
}

impl InputKind {
    /// Detect the input kind from the file extension
    pub fn detect(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "eps" | "epsi" | "ps" => Ok(InputKind::PostScript),
            "pdf" => Ok(InputKind::Pdf),
            "png" | "tif" | "tiff" | "jpg" | "jpeg" | "bmp" | "gif" => Ok(InputKind::Bitmap),
            _ => Err(ExportError::UnsupportedInput(path.to_path_buf())),
        }
    }

    pub fn is_vector(&self) -> bool {
        !matches!(self, InputKind::Bitmap)
    }
}

// ============================================================
// Report
// ============================================================

/// One file written by an export
#[derive(Debug, Clone, Serialize)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub format: OutputFormat,
    /// Pixel size for bitmaps, point size (rounded) for vector files
    pub size: (u32, u32),
}

/// Result of an export
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub input: PathBuf,
    pub outputs: Vec<ExportedFile>,
    /// Region of the rendered figure that was kept
    pub source_window: Option<Window>,
    /// Bounding box written to vector outputs
    pub bbox: Option<BoundingBox>,
    /// Page count of the PDF output, when one was written
    pub pdf_pages: Option<usize>,
}

impl ExportReport {
    pub(crate) fn new(input: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            outputs: Vec::new(),
            source_window: None,
            bbox: None,
            pdf_pages: None,
        }
    }

    /// Output file for a format, if one was written
    pub fn output(&self, format: OutputFormat) -> Option<&ExportedFile> {
        self.outputs.iter().find(|o| o.format == format)
    }
}
