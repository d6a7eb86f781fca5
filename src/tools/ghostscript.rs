//! Ghostscript driver
//!
//! Builds argument lists for the `pdfwrite` and PNG devices and runs them.
//! Argument construction is kept separate from execution so the exact
//! command line can be inspected (and shown by `--dry-run`).

use image::DynamicImage;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{locate_binary, run_tool, Result, ToolError};
use crate::export::ColorSpace;

/// Environment variable naming the Ghostscript binary
pub const GHOSTSCRIPT_ENV: &str = "GHOSTSCRIPT";

/// Binary names searched on `PATH`
const CANDIDATES: [&str; 3] = ["gs", "gswin64c", "gswin32c"];

/// Quality above which images are stored losslessly
const LOSSLESS_QUALITY: u8 = 100;

/// Below this JPEG quality, chroma is subsampled
const SUBSAMPLE_BELOW_QUALITY: u8 = 80;

/// Options for EPS to PDF conversion
#[derive(Debug, Clone, Default)]
pub struct Eps2PdfOptions {
    /// Image quality 0-100, or above 100 for lossless; `None` keeps Ghostscript defaults
    pub quality: Option<u8>,
    /// Output color space
    pub color: ColorSpace,
    /// Append to the destination if it already exists
    pub append: bool,
    /// Bookmark title for the new page
    pub bookmark: Option<String>,
    /// Raw extra Ghostscript arguments
    pub extra_args: Vec<String>,
}

/// Ghostscript executable
#[derive(Debug, Clone)]
pub struct Ghostscript {
    path: PathBuf,
}

impl Ghostscript {
    /// Locate Ghostscript from an explicit path, `$GHOSTSCRIPT` or `PATH`
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        let path = locate_binary("Ghostscript", explicit, GHOSTSCRIPT_ENV, &CANDIDATES)?;
        debug!(path = %path.display(), "using Ghostscript");
        Ok(Self { path })
    }

    /// Use a known binary without searching
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `gs --version`
    pub fn version(&self) -> Result<String> {
        let output = run_tool("Ghostscript", &self.path, ["--version"])?;
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if version.is_empty() {
            return Err(ToolError::InvalidOutput("empty version string".to_string()));
        }
        Ok(version)
    }

    /// Run with arbitrary arguments
    pub fn run(&self, args: &[OsString]) -> Result<()> {
        run_tool("Ghostscript", &self.path, args)?;
        Ok(())
    }

    /// Argument list for converting `sources` (EPS/PS/PDF) into the PDF `dest`
    ///
    /// `pdfmark` is an optional PostScript file placed after the sources.
    pub fn eps2pdf_args(
        sources: &[&Path],
        dest: &Path,
        pdfmark: Option<&Path>,
        options: &Eps2PdfOptions,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-q",
            "-dNOPAUSE",
            "-dBATCH",
            "-dEPSCrop",
            "-sDEVICE=pdfwrite",
            "-dPDFSETTINGS=/prepress",
            "-dAutoRotatePages=/None",
        ]
        .iter()
        .map(OsString::from)
        .collect();

        match options.color {
            ColorSpace::Rgb => {}
            ColorSpace::Gray => {
                args.push("-sColorConversionStrategy=Gray".into());
                args.push("-dProcessColorModel=/DeviceGray".into());
            }
            ColorSpace::Cmyk => {
                args.push("-sColorConversionStrategy=CMYK".into());
                args.push("-dProcessColorModel=/DeviceCMYK".into());
            }
        }

        let distiller = options.quality.map(|quality| {
            args.push("-dAutoFilterColorImages=false".into());
            args.push("-dAutoFilterGrayImages=false".into());
            if quality > LOSSLESS_QUALITY {
                args.push("-dColorImageFilter=/FlateEncode".into());
                args.push("-dGrayImageFilter=/FlateEncode".into());
                args.push("-dDownsampleColorImages=false".into());
                args.push("-dDownsampleGrayImages=false".into());
                "<< /ColorImageDownsampleThreshold 10 /GrayImageDownsampleThreshold 10 >> setdistillerparams"
                    .to_string()
            } else {
                args.push("-dColorImageFilter=/DCTEncode".into());
                args.push("-dGrayImageFilter=/DCTEncode".into());
                let sampling = if quality < SUBSAMPLE_BELOW_QUALITY {
                    "2 1 1 2"
                } else {
                    "1 1 1 1"
                };
                let dict = format!(
                    "<< /QFactor {:.2} /Blend 1 /HSample [{}] /VSample [{}] >>",
                    1.0 - quality as f64 / 100.0,
                    sampling,
                    sampling
                );
                format!(
                    "<< /ColorImageDict {} /GrayImageDict {} >> setdistillerparams",
                    dict, dict
                )
            }
        });

        args.extend(options.extra_args.iter().map(OsString::from));

        let mut output = OsString::from("-sOutputFile=");
        output.push(dest);
        args.push(output);

        if let Some(code) = distiller {
            args.push("-c".into());
            args.push(code.into());
        }

        args.push("-f".into());
        args.extend(sources.iter().map(|s| s.as_os_str().to_os_string()));
        if let Some(mark) = pdfmark {
            args.push(mark.as_os_str().to_os_string());
        }

        args
    }

    /// Convert an EPS file to PDF, optionally appending to an existing `dest`
    pub fn eps2pdf(&self, source: &Path, dest: &Path, options: &Eps2PdfOptions) -> Result<()> {
        let work_dir = tempfile::tempdir()?;

        let pdfmark = match &options.bookmark {
            Some(title) => {
                let path = work_dir.path().join("bookmark.ps");
                std::fs::write(&path, bookmark_pdfmark(title))?;
                Some(path)
            }
            None => None,
        };

        let appending = options.append && dest.is_file();
        let mut sources: Vec<&Path> = Vec::new();
        if appending {
            sources.push(dest);
        }
        sources.push(source);

        // Ghostscript cannot read and write the same file, so render next to it first
        let target_dir = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let staged = tempfile::Builder::new()
            .prefix(".figexport-")
            .suffix(".pdf")
            .tempfile_in(target_dir)?;

        let args = Self::eps2pdf_args(&sources, staged.path(), pdfmark.as_deref(), options);
        self.run(&args)?;

        staged
            .persist(dest)
            .map_err(|e| ToolError::IoError(e.error))?;

        info!(
            source = %source.display(),
            dest = %dest.display(),
            appended = appending,
            "converted EPS to PDF"
        );
        Ok(())
    }

    /// Argument list for rendering `source` to a PNG at `dpi`
    pub fn rasterize_args(source: &Path, dest: &Path, dpi: u32, alpha: bool) -> Vec<OsString> {
        let device = if alpha { "pngalpha" } else { "png16m" };
        let mut args: Vec<OsString> = vec![
            "-q".into(),
            "-dNOPAUSE".into(),
            "-dBATCH".into(),
            "-dSAFER".into(),
            "-dEPSCrop".into(),
            format!("-sDEVICE={}", device).into(),
            format!("-r{}", dpi.max(1)).into(),
            "-dTextAlphaBits=4".into(),
            "-dGraphicsAlphaBits=4".into(),
        ];
        let mut output = OsString::from("-sOutputFile=");
        output.push(dest);
        args.push(output);
        args.push("-f".into());
        args.push(source.as_os_str().to_os_string());
        args
    }

    /// Render the first page of `source` at `dpi`
    pub fn rasterize(&self, source: &Path, dpi: u32, alpha: bool) -> Result<DynamicImage> {
        let work_dir = tempfile::tempdir()?;
        let png = work_dir.path().join("render.png");

        self.run(&Self::rasterize_args(source, &png, dpi, alpha))?;

        let img = image::open(&png).map_err(|e| ToolError::InvalidOutput(e.to_string()))?;
        debug!(
            source = %source.display(),
            dpi,
            alpha,
            width = img.width(),
            height = img.height(),
            "rasterized"
        );
        Ok(img)
    }
}

/// pdfmark program adding an outline entry for the current page
pub fn bookmark_pdfmark(title: &str) -> String {
    let escaped: String = title
        .chars()
        .flat_map(|c| match c {
            '(' | ')' | '\\' => vec!['\\', c],
            c if c.is_control() => vec![' '],
            c => vec![c],
        })
        .collect();
    format!("[ /Title ({}) /OUT pdfmark\n", escaped)
}
