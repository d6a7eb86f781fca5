//! Bitmap pipeline and bitmap writers

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, Rgba};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info, warn};

use super::pipeline::Job;
use super::types::{ColorSpace, ExportError, ExportReport, ExportedFile, OutputFormat, Result};
use super::{ExportOptions, DEFAULT_JPEG_QUALITY};
use crate::alpha::{crop_transparent, flatten, recover_alpha};
use crate::crop::{BorderCropper, CropAmounts, CropError, CropOptions, Padding, Window};
use crate::progress::{ExportStage, ProgressCallback};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Export a bitmap input
pub(crate) fn export(
    job: &Job,
    options: &ExportOptions,
    progress: &mut dyn ProgressCallback,
) -> Result<ExportReport> {
    let mut report = ExportReport::new(&job.input);

    progress.on_stage_start(ExportStage::Loading);
    let mut image = image::open(&job.input)?;
    if options.transparent {
        image = match &options.on_black {
            Some(black_path) => {
                if !black_path.is_file() {
                    return Err(ExportError::InputNotFound(black_path.clone()));
                }
                let on_black = image::open(black_path)?.to_rgb8();
                DynamicImage::ImageRgba8(recover_alpha(&image.to_rgb8(), &on_black)?)
            }
            None => {
                if !image.color().has_alpha() {
                    warn!(
                        input = %job.input.display(),
                        "no alpha channel and no over-black render; exporting opaque"
                    );
                }
                image
            }
        };
    }
    progress.on_stage_complete(ExportStage::Loading);

    if options.crop {
        progress.on_stage_start(ExportStage::Cropping);
        let transparent = options.transparent && image.color().has_alpha();
        let (cropped, window) =
            crop_bitmap(&image, transparent, None, options.padding, options.crop_amounts)?;
        image = cropped;
        report.source_window = Some(window);
        progress.on_stage_complete(ExportStage::Cropping);
    }

    write_all(job, &image, options, &mut report, progress)?;
    Ok(report)
}

/// Crop a rendered figure
///
/// `transparent` crops against zero alpha; otherwise `background` (or each
/// edge's own color when `None`) is the border color.
pub(crate) fn crop_bitmap(
    image: &DynamicImage,
    transparent: bool,
    background: Option<Rgba<u8>>,
    padding: Padding,
    amounts: CropAmounts,
) -> Result<(DynamicImage, Window)> {
    if transparent {
        let outcome = crop_transparent(image.to_rgba8(), padding, amounts)?;
        let window = outcome.source;
        let frame = outcome
            .frames
            .into_iter()
            .next()
            .ok_or(CropError::EmptyStack)?;
        return Ok((DynamicImage::ImageRgba8(frame), window));
    }

    let crop_options = CropOptions {
        background,
        padding,
        amounts,
    };
    let (cropped, outcome) = BorderCropper::crop_image(image, &crop_options)?;
    Ok((cropped, outcome.source))
}

/// Scale explicit crop amounts from points to pixels
pub(crate) fn scale_amounts(amounts: CropAmounts, scale: f64) -> CropAmounts {
    let scale_one = |v: Option<u32>| v.map(|n| (n as f64 * scale).round() as u32);
    CropAmounts {
        top: scale_one(amounts.top),
        right: scale_one(amounts.right),
        bottom: scale_one(amounts.bottom),
        left: scale_one(amounts.left),
    }
}

/// Reduce a supersampled render by the anti-aliasing factor
pub(crate) fn downsample(image: &DynamicImage, factor: u8) -> DynamicImage {
    if factor <= 1 {
        return image.clone();
    }
    let factor = u32::from(factor);
    let width = (image.width() / factor).max(1);
    let height = (image.height() / factor).max(1);
    debug!(
        from = ?(image.width(), image.height()),
        to = ?(width, height),
        "downsampling"
    );
    image.resize_exact(width, height, FilterType::Triangle)
}

/// Write every bitmap format the job asks for
pub(crate) fn write_all(
    job: &Job,
    image: &DynamicImage,
    options: &ExportOptions,
    report: &mut ExportReport,
    progress: &mut dyn ProgressCallback,
) -> Result<()> {
    progress.on_stage_start(ExportStage::Writing);
    for format in job.bitmap_formats() {
        let path = job.output_path(format);
        let size = write_bitmap(image, format, &path, options)?;
        progress.on_output(&path);
        report.outputs.push(ExportedFile { path, format, size });
    }
    progress.on_stage_complete(ExportStage::Writing);
    Ok(())
}

/// Write one bitmap, converting color layout to what the format and options allow
pub fn write_bitmap(
    image: &DynamicImage,
    format: OutputFormat,
    path: &Path,
    options: &ExportOptions,
) -> Result<(u32, u32)> {
    let image_format = format
        .image_format()
        .ok_or(ExportError::UnsupportedFormat(format))?;
    let prepared = prepare_pixels(image, format, options);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    if format == OutputFormat::Jpeg {
        let quality = options
            .quality
            .unwrap_or(DEFAULT_JPEG_QUALITY)
            .clamp(1, 100);
        let writer = BufWriter::new(File::create(path)?);
        prepared.write_with_encoder(JpegEncoder::new_with_quality(writer, quality))?;
    } else {
        prepared.save_with_format(path, image_format)?;
    }

    info!(
        path = %path.display(),
        format = %format,
        width = prepared.width(),
        height = prepared.height(),
        "wrote bitmap"
    );
    Ok((prepared.width(), prepared.height()))
}

fn prepare_pixels(image: &DynamicImage, format: OutputFormat, options: &ExportOptions) -> DynamicImage {
    let has_alpha = image.color().has_alpha();
    let keep_alpha = has_alpha && options.transparent && format.supports_alpha();

    let base = if has_alpha && !keep_alpha {
        DynamicImage::ImageRgb8(flatten(&image.to_rgba8(), WHITE))
    } else {
        image.clone()
    };

    let colored = match options.color {
        ColorSpace::Gray if keep_alpha => DynamicImage::ImageLumaA8(base.to_luma_alpha8()),
        ColorSpace::Gray => DynamicImage::ImageLuma8(base.to_luma8()),
        ColorSpace::Cmyk => {
            warn!(format = %format, "CMYK is only supported for vector output; writing RGB");
            base
        }
        ColorSpace::Rgb => base,
    };

    // Encoders without gray or gray+alpha support
    match (format, &colored) {
        (OutputFormat::Gif, img) if img.color().has_alpha() => {
            DynamicImage::ImageRgba8(img.to_rgba8())
        }
        (OutputFormat::Gif, DynamicImage::ImageLuma8(img)) => {
            DynamicImage::ImageRgb8(DynamicImage::ImageLuma8(img.clone()).to_rgb8())
        }
        (OutputFormat::Tiff, DynamicImage::ImageLumaA8(img)) => {
            DynamicImage::ImageRgba8(DynamicImage::ImageLumaA8(img.clone()).to_rgba8())
        }
        _ => colored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbaImage};

    fn opaque_figure() -> DynamicImage {
        let mut img = image::RgbImage::from_pixel(40, 30, WHITE);
        for y in 10..20 {
            for x in 8..32 {
                img.put_pixel(x, y, Rgb([0, 0, 200]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    fn transparent_figure() -> DynamicImage {
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 0]));
        img.put_pixel(4, 4, Rgba([255, 0, 0, 128]));
        img.put_pixel(5, 6, Rgba([255, 0, 0, 255]));
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_crop_bitmap_white_background() {
        let white = Some(Rgba([255, 255, 255, 255]));
        let (cropped, window) = crop_bitmap(
            &opaque_figure(),
            false,
            white,
            Padding::absolute(2),
            CropAmounts::auto(),
        )
        .unwrap();

        assert_eq!(window.left, 8);
        assert_eq!(window.right, 31);
        assert_eq!((cropped.width(), cropped.height()), (28, 14));
        assert_eq!(cropped.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_crop_bitmap_transparent() {
        let (cropped, window) = crop_bitmap(
            &transparent_figure(),
            true,
            None,
            Padding::NONE,
            CropAmounts::auto(),
        )
        .unwrap();

        assert_eq!((window.left, window.top), (4, 4));
        assert_eq!((cropped.width(), cropped.height()), (2, 3));
        assert!(cropped.color().has_alpha());
    }

    #[test]
    fn test_scale_amounts() {
        let scaled = scale_amounts(
            CropAmounts {
                top: Some(3),
                left: Some(10),
                ..Default::default()
            },
            2.5,
        );
        assert_eq!(scaled.top, Some(8));
        assert_eq!(scaled.left, Some(25));
        assert_eq!(scaled.right, None);
    }

    #[test]
    fn test_downsample() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(9, 6));
        let small = downsample(&img, 3);
        assert_eq!((small.width(), small.height()), (3, 2));
        assert_eq!(downsample(&img, 1).dimensions(), (9, 6));
    }

    #[test]
    fn test_prepare_flattens_for_jpeg() {
        let options = ExportOptions::builder().transparent(true).build();
        let out = prepare_pixels(&transparent_figure(), OutputFormat::Jpeg, &options);

        assert!(!out.color().has_alpha());
        assert_eq!(out.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_prepare_keeps_alpha_for_png() {
        let options = ExportOptions::builder().transparent(true).build();
        let out = prepare_pixels(&transparent_figure(), OutputFormat::Png, &options);
        assert!(out.color().has_alpha());

        let opaque = ExportOptions::default();
        let out = prepare_pixels(&transparent_figure(), OutputFormat::Png, &opaque);
        assert!(!out.color().has_alpha());
    }

    #[test]
    fn test_prepare_gray_for_gif() {
        let options = ExportOptions::builder().color(ColorSpace::Gray).build();
        let out = prepare_pixels(&opaque_figure(), OutputFormat::Gif, &options);
        assert_eq!(out.color(), image::ColorType::Rgb8);

        let out = prepare_pixels(&opaque_figure(), OutputFormat::Bmp, &options);
        assert_eq!(out.color(), image::ColorType::L8);
    }

    #[test]
    fn test_write_bitmap_formats() {
        let temp_dir = tempfile::tempdir().unwrap();
        let options = ExportOptions::builder().quality(80).build();
        let figure = opaque_figure();

        for format in [
            OutputFormat::Png,
            OutputFormat::Tiff,
            OutputFormat::Jpeg,
            OutputFormat::Bmp,
            OutputFormat::Gif,
        ] {
            let path = format.output_path(&temp_dir.path().join("nested").join("fig"));
            let size = write_bitmap(&figure, format, &path, &options).unwrap();
            assert_eq!(size, (40, 30));

            let reread = image::open(&path).unwrap();
            assert_eq!(reread.dimensions(), (40, 30), "{}", format);
        }
    }

    #[test]
    fn test_write_bitmap_rejects_vector() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = write_bitmap(
            &opaque_figure(),
            OutputFormat::Eps,
            &temp_dir.path().join("fig.eps"),
            &ExportOptions::default(),
        );
        assert!(matches!(
            result,
            Err(ExportError::UnsupportedFormat(OutputFormat::Eps))
        ));
    }
}
