//! EPS Patching module
//!
//! Provides text-level fixes for Encapsulated PostScript produced by a figure
//! renderer.
//!
//! # Features
//!
//! - Bounding box parsing, cropping and rewriting ([`bbox`])
//! - Font substitution to the standard PostScript fonts ([`fonts`])
//! - Line style fixes: width-scaled dashes, round joins and caps ([`lines`])
//! - Creator header rewriting
//!
//! Documents are handled as Latin-1 text so arbitrary bytes survive a
//! load/patch/save cycle unchanged.

pub mod bbox;
pub mod fonts;
pub mod lines;

pub use bbox::{apply_relative_bbox, read_bbox, write_bbox, BoundingBox};
pub use fonts::{standard_font_for, FontSwap, STANDARD_FONTS};
pub use lines::{fix_line_styles, LineFix};

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// DOS EPS binary header magic (little endian 0xC6D3D0C5)
const DOS_EPS_MAGIC: [u8; 4] = [0xC5, 0xD0, 0xD3, 0xC6];

static CREATOR_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^%%Creator:[^\r\n]*").expect("valid regex"));

// ============================================================
// Error Types
// ============================================================

/// EPS patching error types
#[derive(Debug, Error)]
pub enum EpsError {
    #[error("No %%BoundingBox comment found")]
    MissingBoundingBox,

    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("Not a PostScript file: {0}")]
    NotPostScript(PathBuf),

    #[error("Invalid PostScript font name: {0}")]
    InvalidFontName(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EpsError>;

// ============================================================
// Document
// ============================================================

/// Changes applied to an EPS document in one pass
#[derive(Debug, Clone, Default)]
pub struct EpsPatch {
    /// New bounding box
    pub bbox: Option<BoundingBox>,
    /// Font substitutions
    pub fonts: Option<FontSwap>,
    /// Line style fixes
    pub lines: Option<LineFix>,
    /// New `%%Creator:` value
    pub creator: Option<String>,
}

/// What a patch changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchSummary {
    pub fonts_swapped: usize,
    pub lines_fixed: usize,
    pub bbox_rewritten: bool,
    pub creator_set: bool,
}

/// An EPS document held in memory
#[derive(Debug, Clone)]
pub struct EpsDocument {
    text: String,
}

impl EpsDocument {
    /// Wrap PostScript text
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Load a file, unwrapping the PostScript section of a DOS EPS binary
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let body = match Self::dos_eps_section(&bytes) {
            Some(section) => {
                debug!(path = %path.display(), "stripped DOS EPS preview header");
                section
            }
            None => &bytes[..],
        };

        if !body.starts_with(b"%!") {
            return Err(EpsError::NotPostScript(path.to_path_buf()));
        }

        Ok(Self {
            text: body.iter().map(|&b| b as char).collect(),
        })
    }

    /// Write the document back out as Latin-1
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes: Vec<u8> = self
            .text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect();
        std::fs::write(path, bytes)?;
        info!(path = %path.display(), "wrote EPS");
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bbox(&self) -> Result<BoundingBox> {
        read_bbox(&self.text)
    }

    /// Fonts named in the DSC comments
    pub fn fonts(&self) -> Vec<String> {
        FontSwap::document_fonts(&self.text)
    }

    /// Apply a patch in place
    pub fn patch(&mut self, patch: &EpsPatch) -> Result<PatchSummary> {
        let mut summary = PatchSummary::default();

        if let Some(fonts) = &patch.fonts {
            let (text, count) = fonts.apply(&self.text);
            self.text = text;
            summary.fonts_swapped = count;
        }

        if let Some(fix) = &patch.lines {
            let (text, count) = fix_line_styles(&self.text, fix);
            self.text = text;
            summary.lines_fixed = count;
        }

        if let Some(bbox) = &patch.bbox {
            // Fail before rewriting if the document has no box to rewrite
            read_bbox(&self.text)?;
            self.text = write_bbox(&self.text, bbox);
            summary.bbox_rewritten = true;
        }

        if let Some(creator) = &patch.creator {
            self.text = set_creator(&self.text, creator);
            summary.creator_set = true;
        }

        debug!(?summary, "patched EPS");
        Ok(summary)
    }

    fn dos_eps_section(bytes: &[u8]) -> Option<&[u8]> {
        if bytes.len() < 12 || bytes[..4] != DOS_EPS_MAGIC {
            return None;
        }
        let offset = u32::from_le_bytes(bytes[4..8].try_into().ok()?) as usize;
        let length = u32::from_le_bytes(bytes[8..12].try_into().ok()?) as usize;
        bytes.get(offset..offset.checked_add(length)?)
    }
}

/// Set the `%%Creator:` header, inserting it after the first line if absent
pub fn set_creator(text: &str, creator: &str) -> String {
    let line = format!("%%Creator: {}", creator);
    if CREATOR_LINE.is_match(text) {
        return CREATOR_LINE
            .replace(text, regex::NoExpand(&line))
            .into_owned();
    }
    match text.find('\n') {
        Some(pos) => format!("{}\n{}{}", &text[..pos], line, &text[pos..]),
        None => format!("{}\n{}", text, line),
    }
}
