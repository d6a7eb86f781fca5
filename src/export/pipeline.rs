//! Export entry point: input checks, output naming and dispatch

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::plan::ExportPlan;
use super::types::{ExportError, ExportReport, InputKind, OutputFormat, Result};
use super::{bitmap, vector, ExportOptions};
use crate::progress::{ExportStage, NoopProgress, ProgressCallback};

/// A validated export request
#[derive(Debug, Clone)]
pub(crate) struct Job {
    pub input: PathBuf,
    pub kind: InputKind,
    /// Output path without extension
    pub base: PathBuf,
    pub formats: Vec<OutputFormat>,
}

impl Job {
    pub fn output_path(&self, format: OutputFormat) -> PathBuf {
        format.output_path(&self.base)
    }

    pub fn bitmap_formats(&self) -> impl Iterator<Item = OutputFormat> + '_ {
        self.formats.iter().copied().filter(|f| !f.is_vector())
    }

    pub fn wants(&self, format: OutputFormat) -> bool {
        self.formats.contains(&format)
    }
}

/// Figure exporter
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    options: ExportOptions,
}

impl Exporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Describe the steps an export would take, without running anything
    pub fn plan(&self, input: &Path, output_base: Option<&Path>) -> Result<ExportPlan> {
        let job = self.prepare(input, output_base)?;
        Ok(ExportPlan::build(&job, &self.options))
    }

    /// Export `input` to `<output_base>.<ext>` for every requested format
    pub fn export(&self, input: &Path, output_base: Option<&Path>) -> Result<ExportReport> {
        self.export_with_progress(input, output_base, &mut NoopProgress)
    }

    /// Export, reporting stages to `progress`
    pub fn export_with_progress(
        &self,
        input: &Path,
        output_base: Option<&Path>,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExportReport> {
        progress.on_stage_start(ExportStage::Initializing);
        let job = self.prepare(input, output_base)?;
        progress.on_stage_complete(ExportStage::Initializing);

        info!(
            input = %job.input.display(),
            kind = ?job.kind,
            formats = ?job.formats,
            "exporting figure"
        );

        let report = match job.kind {
            InputKind::Bitmap => bitmap::export(&job, &self.options, progress)?,
            InputKind::PostScript | InputKind::Pdf => vector::export(&job, &self.options, progress)?,
        };

        progress.on_stage_start(ExportStage::Completed);
        Ok(report)
    }

    fn prepare(&self, input: &Path, output_base: Option<&Path>) -> Result<Job> {
        self.options.validate()?;

        if !input.is_file() {
            return Err(ExportError::InputNotFound(input.to_path_buf()));
        }
        let kind = InputKind::detect(input)?;
        let (base, formats) = resolve_outputs(input, output_base, &self.options.formats);

        if let Some(format) = formats.iter().find(|f| !f.is_supported()) {
            return Err(ExportError::UnsupportedFormat(*format));
        }
        if kind == InputKind::Bitmap {
            if let Some(format) = formats.iter().find(|f| f.is_vector()) {
                return Err(ExportError::UnsupportedConversion(format!(
                    "{} output needs an EPS, PS or PDF input",
                    format
                )));
            }
        }
        if self.options.append && !formats.contains(&OutputFormat::Pdf) {
            return Err(ExportError::UnsupportedConversion(
                "appending is only supported for PDF output".to_string(),
            ));
        }

        let job = Job {
            input: input.to_path_buf(),
            kind,
            base,
            formats,
        };

        for format in &job.formats {
            if job.output_path(*format) == job.input {
                return Err(ExportError::InvalidOptions(format!(
                    "{} output would overwrite the input; choose another output name",
                    format
                )));
            }
        }

        if self.options.on_black.is_some() && (kind.is_vector() || !self.options.transparent) {
            warn!("--on-black only applies to transparent exports of bitmap input; ignoring");
        }

        Ok(job)
    }
}

/// Output base and formats
///
/// A base ending in a known format extension has the extension stripped and,
/// when no formats were requested, selects that format.
pub(crate) fn resolve_outputs(
    input: &Path,
    output_base: Option<&Path>,
    requested: &[OutputFormat],
) -> (PathBuf, Vec<OutputFormat>) {
    let mut formats: Vec<OutputFormat> = Vec::new();
    for format in requested {
        if !formats.contains(format) {
            formats.push(*format);
        }
    }

    let base = match output_base {
        Some(base) => {
            let named = base
                .extension()
                .and_then(|e| e.to_str())
                .and_then(|e| e.parse::<OutputFormat>().ok());
            match named {
                Some(format) => {
                    if formats.is_empty() {
                        formats.push(format);
                    }
                    base.with_extension("")
                }
                None => base.to_path_buf(),
            }
        }
        None => input.with_extension(""),
    };

    if formats.is_empty() {
        formats.push(OutputFormat::Png);
    }
    (base, formats)
}
