//! figexport - publication-quality figure export
//!
//! Crops, patches and converts figures rendered by a plotting program into
//! PDF, EPS and bitmap files.
//!
//! # Modules
//!
//! - [`crop`] - border detection and cropping with padding
//! - [`alpha`] - transparency recovery from renders over white and black
//! - [`eps`] - EPS bounding box, font and line-style patching
//! - [`tools`] - Ghostscript and pdftops drivers
//! - [`pdf`] - page count and media box queries
//! - [`export`] - the end-to-end export pipeline
//! - [`config`] - TOML configuration
//! - [`cli`] - command-line definitions
//! - [`progress`] - console progress display

pub mod alpha;
pub mod cli;
pub mod config;
pub mod crop;
pub mod eps;
pub mod export;
pub mod pdf;
pub mod progress;
pub mod tools;

// Re-exports for convenience
pub use alpha::{crop_transparent, flatten, recover_alpha, AlphaError};
pub use cli::{Cli, Commands, ConfigArgs, CropArgs, ExportArgs};
pub use config::{CliOverrides, Config, ConfigError};
pub use crop::{
    BorderCropper, CropAmounts, CropError, CropFileResult, CropOptions, CropOutcome, Padding,
    RelativeBBox, Window,
};
pub use eps::{BoundingBox, EpsDocument, EpsError, EpsPatch, FontSwap, LineFix};
pub use export::{
    ColorSpace, ExportError, ExportOptions, ExportPlan, ExportReport, ExportedFile, Exporter,
    InputKind, OutputFormat, PlanStep,
};
pub use pdf::PdfError;
pub use progress::{ExportStage, NoopProgress, OutputMode, ProgressCallback, ProgressTracker};
pub use tools::{Eps2PdfOptions, Ghostscript, Pdftops, ToolError};

/// Process exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_ARGS: i32 = 2;
    pub const INPUT_NOT_FOUND: i32 = 3;
    pub const TOOL_NOT_FOUND: i32 = 4;
    pub const CONVERSION_FAILED: i32 = 5;
}
