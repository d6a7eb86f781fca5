//! Dry-run export plans

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use super::pipeline::Job;
use super::types::{InputKind, OutputFormat};
use super::{ExportOptions, POINTS_PER_INCH};
use crate::crop::Padding;

/// One step of an export
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PlanStep {
    ConvertPdfToEps { source: PathBuf },
    LoadEps { path: PathBuf },
    PatchEps { font_swap: bool, fix_lines: bool },
    LoadBitmap { path: PathBuf },
    RecoverAlpha { on_black: PathBuf },
    Rasterize { dpi: u32, alpha: bool },
    CropBorders { padding: Padding },
    RewriteBoundingBox,
    ConvertEpsToPdf { append: bool, bookmark: Option<String> },
    Downsample { factor: u8 },
    Write { format: OutputFormat, path: PathBuf },
}

impl fmt::Display for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanStep::ConvertPdfToEps { source } => {
                write!(f, "convert {} to EPS with pdftops", source.display())
            }
            PlanStep::LoadEps { path } => write!(f, "load EPS {}", path.display()),
            PlanStep::PatchEps {
                font_swap,
                fix_lines,
            } => write!(f, "patch EPS (font swap: {}, line fixes: {})", font_swap, fix_lines),
            PlanStep::LoadBitmap { path } => write!(f, "load image {}", path.display()),
            PlanStep::RecoverAlpha { on_black } => {
                write!(f, "recover alpha using {}", on_black.display())
            }
            PlanStep::Rasterize { dpi, alpha } => {
                write!(f, "rasterize at {} dpi{}", dpi, if *alpha { " with alpha" } else { "" })
            }
            PlanStep::CropBorders { padding } => write!(f, "crop borders (padding {})", padding.0),
            PlanStep::RewriteBoundingBox => f.write_str("rewrite bounding box"),
            PlanStep::ConvertEpsToPdf { append, bookmark } => {
                f.write_str("convert EPS to PDF with Ghostscript")?;
                if *append {
                    f.write_str(", appending")?;
                }
                if let Some(title) = bookmark {
                    write!(f, ", bookmark \"{}\"", title)?;
                }
                Ok(())
            }
            PlanStep::Downsample { factor } => write!(f, "downsample by {}", factor),
            PlanStep::Write { format, path } => write!(f, "write {} {}", format, path.display()),
        }
    }
}

/// Ordered list of export steps
#[derive(Debug, Clone, Serialize)]
pub struct ExportPlan {
    pub input: PathBuf,
    pub kind: InputKind,
    pub outputs: Vec<PathBuf>,
    pub steps: Vec<PlanStep>,
}

impl ExportPlan {
    pub(crate) fn build(job: &Job, options: &ExportOptions) -> Self {
        let steps = match job.kind {
            InputKind::Bitmap => Self::bitmap_steps(job, options),
            InputKind::PostScript | InputKind::Pdf => Self::vector_steps(job, options),
        };
        Self {
            input: job.input.clone(),
            kind: job.kind,
            outputs: job.formats.iter().map(|f| job.output_path(*f)).collect(),
            steps,
        }
    }

    fn vector_steps(job: &Job, options: &ExportOptions) -> Vec<PlanStep> {
        let mut steps = Vec::new();
        if job.kind == InputKind::Pdf {
            steps.push(PlanStep::ConvertPdfToEps {
                source: job.input.clone(),
            });
        }
        steps.push(PlanStep::LoadEps {
            path: job.input.clone(),
        });
        steps.push(PlanStep::PatchEps {
            font_swap: options.font_swap,
            fix_lines: options.fix_lines,
        });

        if options.crop {
            steps.push(PlanStep::Rasterize {
                dpi: POINTS_PER_INCH as u32,
                alpha: options.transparent,
            });
            steps.push(PlanStep::CropBorders {
                padding: options.padding,
            });
            steps.push(PlanStep::RewriteBoundingBox);
        }

        if job.wants(OutputFormat::Eps) {
            steps.push(Self::write(job, OutputFormat::Eps));
        }
        if job.wants(OutputFormat::Pdf) {
            steps.push(PlanStep::ConvertEpsToPdf {
                append: options.append,
                bookmark: options.bookmark.clone(),
            });
            steps.push(Self::write(job, OutputFormat::Pdf));
        }

        if job.bitmap_formats().next().is_some() {
            let dpi = options.dpi() * u32::from(options.anti_alias);
            steps.push(PlanStep::Rasterize {
                dpi,
                alpha: options.transparent,
            });
            if options.crop {
                steps.push(PlanStep::CropBorders {
                    padding: options.padding.scaled(dpi as f64 / POINTS_PER_INCH),
                });
            }
            if options.anti_alias > 1 {
                steps.push(PlanStep::Downsample {
                    factor: options.anti_alias,
                });
            }
            steps.extend(job.bitmap_formats().map(|f| Self::write(job, f)));
        }
        steps
    }

    fn bitmap_steps(job: &Job, options: &ExportOptions) -> Vec<PlanStep> {
        let mut steps = vec![PlanStep::LoadBitmap {
            path: job.input.clone(),
        }];
        if options.transparent {
            if let Some(on_black) = &options.on_black {
                steps.push(PlanStep::RecoverAlpha {
                    on_black: on_black.clone(),
                });
            }
        }
        if options.crop {
            steps.push(PlanStep::CropBorders {
                padding: options.padding,
            });
        }
        steps.extend(job.bitmap_formats().map(|f| Self::write(job, f)));
        steps
    }

    fn write(job: &Job, format: OutputFormat) -> PlanStep {
        PlanStep::Write {
            format,
            path: job.output_path(format),
        }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ExportPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Export plan for {}", self.input.display())?;
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "  {:>2}. {}", i + 1, step)?;
        }
        Ok(())
    }
}
