//! Vector pipeline: EPS/PS and PDF inputs

use image::{DynamicImage, Rgba};
use once_cell::unsync::OnceCell;
use tracing::{debug, info, warn};

use super::bitmap::{crop_bitmap, downsample, scale_amounts, write_all};
use super::pipeline::Job;
use super::types::{ExportReport, ExportedFile, InputKind, OutputFormat, Result};
use super::{ExportOptions, POINTS_PER_INCH};
use crate::alpha::crop_transparent;
use crate::crop::{BorderCropper, CropOptions, RelativeBBox, Window};
use crate::eps::{apply_relative_bbox, BoundingBox, EpsDocument, EpsPatch, FontSwap, LineFix};
use crate::pdf;
use crate::progress::{ExportStage, ProgressCallback};
use crate::tools::{Eps2PdfOptions, Ghostscript, Pdftops};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Export an EPS/PS or PDF input
pub(crate) fn export(
    job: &Job,
    options: &ExportOptions,
    progress: &mut dyn ProgressCallback,
) -> Result<ExportReport> {
    let mut report = ExportReport::new(&job.input);
    let work_dir = tempfile::tempdir()?;
    let ghostscript = OnceCell::new();
    let gs = || ghostscript.get_or_try_init(|| Ghostscript::locate(options.ghostscript.as_deref()));

    // Load
    progress.on_stage_start(ExportStage::Loading);
    let source = match job.kind {
        InputKind::Pdf => {
            progress.on_stage_start(ExportStage::Converting);
            let pdftops = Pdftops::locate(options.pdftops.as_deref())?;
            let eps = work_dir.path().join("input.eps");
            pdftops.pdf2eps(&job.input, &eps)?;
            eps
        }
        _ => job.input.clone(),
    };
    let mut doc = EpsDocument::load(&source)?;
    progress.on_stage_complete(ExportStage::Loading);

    // Patch fonts, lines and creator
    progress.on_stage_start(ExportStage::Patching);
    let summary = doc.patch(&EpsPatch {
        fonts: font_swap(&doc, options),
        lines: options.fix_lines.then(LineFix::default),
        creator: Some(format!("figexport {}", env!("CARGO_PKG_VERSION"))),
        bbox: None,
    })?;
    debug!(?summary, "patched input");
    let patched = work_dir.path().join("patched.eps");
    doc.save(&patched)?;
    progress.on_stage_complete(ExportStage::Patching);

    // Crop by rewriting the bounding box
    let mut bbox = doc.bbox()?;
    if options.crop {
        progress.on_stage_start(ExportStage::Cropping);
        let render = gs()?.rasterize(&patched, POINTS_PER_INCH as u32, options.transparent)?;
        let (rel, window, padding_pt) = detect_borders(&render, options)?;
        let cropped = apply_relative_bbox(&bbox, &rel, padding_pt as f64);
        info!(from = ?bbox, to = ?cropped, "cropped bounding box");

        doc.patch(&EpsPatch {
            bbox: Some(cropped),
            ..Default::default()
        })?;
        bbox = cropped;
        report.source_window = Some(window);
        progress.on_stage_complete(ExportStage::Cropping);
    }
    report.bbox = Some(bbox);

    let figure = work_dir.path().join("figure.eps");
    doc.save(&figure)?;

    if job.wants(OutputFormat::Eps) {
        progress.on_stage_start(ExportStage::Writing);
        let path = job.output_path(OutputFormat::Eps);
        doc.save(&path)?;
        progress.on_output(&path);
        report.outputs.push(ExportedFile {
            path,
            format: OutputFormat::Eps,
            size: point_size(&bbox),
        });
    }

    if job.wants(OutputFormat::Pdf) {
        progress.on_stage_start(ExportStage::Converting);
        let path = job.output_path(OutputFormat::Pdf);
        let pages_before = if options.append && path.is_file() {
            pdf::page_count(&path).ok()
        } else {
            None
        };

        let eps2pdf = Eps2PdfOptions {
            quality: options.quality,
            color: options.color,
            append: options.append,
            bookmark: options.bookmark.clone(),
            extra_args: options.gs_extra_args.clone(),
        };
        gs()?.eps2pdf(&figure, &path, &eps2pdf)?;

        let pages = pdf::page_count(&path)?;
        if let Some(before) = pages_before {
            if pages <= before {
                warn!(
                    path = %path.display(),
                    before,
                    after = pages,
                    "append did not add a page"
                );
            }
        }
        let media = pdf::media_box(&path, pages as u32)?;
        report.pdf_pages = Some(pages);
        progress.on_output(&path);
        report.outputs.push(ExportedFile {
            path,
            format: OutputFormat::Pdf,
            size: point_size(&media),
        });
        progress.on_stage_complete(ExportStage::Converting);
    }

    if job.bitmap_formats().next().is_some() {
        progress.on_stage_start(ExportStage::Rasterizing);
        let dpi = options.dpi() * u32::from(options.anti_alias);
        let mut image = gs()?.rasterize(&patched, dpi, options.transparent)?;
        progress.on_stage_complete(ExportStage::Rasterizing);

        if options.crop {
            progress.on_stage_start(ExportStage::Cropping);
            let scale = dpi as f64 / POINTS_PER_INCH;
            let (cropped, _) = crop_bitmap(
                &image,
                options.transparent,
                Some(WHITE),
                options.padding.scaled(scale),
                scale_amounts(options.crop_amounts, scale),
            )?;
            image = cropped;
            progress.on_stage_complete(ExportStage::Cropping);
        }
        if options.anti_alias > 1 {
            image = downsample(&image, options.anti_alias);
        }

        write_all(job, &image, options, &mut report, progress)?;
    }

    Ok(report)
}

/// Fonts to swap: standard replacements for the document's fonts, then the configured map
fn font_swap(doc: &EpsDocument, options: &ExportOptions) -> Option<FontSwap> {
    if !options.font_swap {
        return None;
    }
    let fonts = doc.fonts();
    let swap = FontSwap::to_standard(fonts.iter().map(String::as_str)).merge(&options.fonts);
    (!swap.is_empty()).then_some(swap)
}

/// Border detection on a one-pixel-per-point render
///
/// Returns the relative box, the kept window and the resolved padding in points.
fn detect_borders(
    render: &DynamicImage,
    options: &ExportOptions,
) -> Result<(RelativeBBox, Window, i64)> {
    if options.transparent {
        let outcome = crop_transparent(render.to_rgba8(), options.padding, options.crop_amounts)?;
        return Ok((outcome.bbox_rel, outcome.source, outcome.padding));
    }

    let crop_options = CropOptions::builder()
        .background(WHITE)
        .padding(options.padding)
        .amounts(options.crop_amounts)
        .build();
    let (_, outcome) = BorderCropper::crop_image(render, &crop_options)?;
    Ok((outcome.bbox_rel, outcome.source, outcome.padding))
}

fn point_size(bbox: &BoundingBox) -> (u32, u32) {
    (
        bbox.width().round().max(0.0) as u32,
        bbox.height().round().max(0.0) as u32,
    )
}
