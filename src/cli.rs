//! Command-line interface definitions

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::crop::CropAmounts;
use crate::export::{ColorSpace, OutputFormat};

/// Publication-quality figure export
#[derive(Parser, Debug)]
#[command(name = "figexport")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a figure (EPS, PS, PDF or bitmap) to one or more formats
    Export(ExportArgs),
    /// Crop the borders of bitmap images
    Crop(CropArgs),
    /// Show external tools and config file locations
    Info,
    /// Create or show the configuration file
    Config(ConfigArgs),
}

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Input figure (.eps, .ps, .pdf, .png, .tif, .jpg, .bmp, .gif)
    pub input: PathBuf,

    /// Output name; the format extension is added (defaults to the input name)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write PDF
    #[arg(long)]
    pub pdf: bool,

    /// Write EPS
    #[arg(long)]
    pub eps: bool,

    /// Write PNG
    #[arg(long)]
    pub png: bool,

    /// Write TIFF
    #[arg(long)]
    pub tiff: bool,

    /// Write JPEG
    #[arg(long)]
    pub jpg: bool,

    /// Write BMP
    #[arg(long)]
    pub bmp: bool,

    /// Write GIF
    #[arg(long)]
    pub gif: bool,

    /// Write SVG (not supported)
    #[arg(long)]
    pub svg: bool,

    /// Write EMF (not supported)
    #[arg(long)]
    pub emf: bool,

    /// Bitmap resolution in DPI (overrides --magnify)
    #[arg(short, long)]
    pub resolution: Option<u32>,

    /// Bitmap scale relative to 72 DPI
    #[arg(short, long, default_value_t = 1.0)]
    pub magnify: f64,

    /// Anti-aliasing factor (1-4)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=4))]
    pub anti_alias: u8,

    /// Quality 0-100 (JPEG and PDF images), above 100 for lossless PDF images
    #[arg(long)]
    pub quality: Option<u8>,

    /// Padding around the figure: pixels/points, or a fraction of the size when below 1;
    /// negative values crop further
    #[arg(short, long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub padding: f64,

    /// Fixed crop per edge as "top,right,bottom,left"; empty or "auto" entries are detected
    #[arg(long, value_parser = parse_crop_amounts)]
    pub crop_amounts: Option<CropAmounts>,

    /// Keep the original borders
    #[arg(long)]
    pub no_crop: bool,

    /// Keep a transparent background
    #[arg(short, long)]
    pub transparent: bool,

    /// Render of the same bitmap figure over black, for alpha recovery
    #[arg(long)]
    pub on_black: Option<PathBuf>,

    /// Grayscale output
    #[arg(long, conflicts_with = "cmyk")]
    pub gray: bool,

    /// CMYK output (vector formats)
    #[arg(long)]
    pub cmyk: bool,

    /// Append to an existing PDF instead of overwriting it
    #[arg(long)]
    pub append: bool,

    /// Add a PDF bookmark with this title
    #[arg(long)]
    pub bookmark: Option<String>,

    /// Keep non-standard fonts as they are
    #[arg(long)]
    pub no_font_swap: bool,

    /// Improve dash patterns and line joins in EPS output
    #[arg(long)]
    pub fix_lines: bool,

    /// Extra Ghostscript argument (repeatable), e.g. -d=-dNOSAFER
    #[arg(short = 'd', long = "gs-option", allow_hyphen_values = true)]
    pub gs_options: Vec<String>,

    /// Show the export plan without running it
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report (or plan) as JSON
    #[arg(long)]
    pub json: bool,

    /// Config file (default: ./figexport.toml, then the user config)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl ExportArgs {
    /// Formats selected by flag, in a fixed order
    pub fn formats(&self) -> Vec<OutputFormat> {
        [
            (self.pdf, OutputFormat::Pdf),
            (self.eps, OutputFormat::Eps),
            (self.png, OutputFormat::Png),
            (self.tiff, OutputFormat::Tiff),
            (self.jpg, OutputFormat::Jpeg),
            (self.bmp, OutputFormat::Bmp),
            (self.gif, OutputFormat::Gif),
            (self.svg, OutputFormat::Svg),
            (self.emf, OutputFormat::Emf),
        ]
        .into_iter()
        .filter_map(|(on, format)| on.then_some(format))
        .collect()
    }

    /// Color space chosen on the command line, if any
    pub fn color(&self) -> Option<ColorSpace> {
        if self.gray {
            Some(ColorSpace::Gray)
        } else if self.cmyk {
            Some(ColorSpace::Cmyk)
        } else {
            None
        }
    }
}

/// Arguments for the crop command
#[derive(Args, Debug)]
pub struct CropArgs {
    /// Images to crop
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory (default: next to each input with a "_cropped" suffix)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Padding around the content: pixels, or a fraction of the size when below 1
    #[arg(short, long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub padding: f64,

    /// Fixed crop per edge as "top,right,bottom,left"
    #[arg(long, value_parser = parse_crop_amounts)]
    pub crop_amounts: Option<CropAmounts>,

    /// Background color as "R,G,B" or "#RRGGBB" (default: sampled per edge)
    #[arg(short, long, value_parser = parse_color)]
    pub background: Option<[u8; 3]>,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Write a config file with the default settings (default: the user config path)
    #[arg(long, conflicts_with = "show")]
    pub init: bool,

    /// Print the effective configuration
    #[arg(long, required_unless_present = "init")]
    pub show: bool,

    /// Overwrite an existing file with --init
    #[arg(long)]
    pub force: bool,

    /// Config file to read or write
    #[arg(short, long)]
    pub path: Option<PathBuf>,
}

// ============================================================
// Value Parsers
// ============================================================

/// Parse "top,right,bottom,left"; an empty or "auto" entry leaves that edge detected
pub fn parse_crop_amounts(s: &str) -> Result<CropAmounts, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!(
            "expected 4 comma-separated values (top,right,bottom,left), got {}",
            parts.len()
        ));
    }

    let mut values = [None; 4];
    for (value, part) in values.iter_mut().zip(&parts) {
        if part.is_empty() || part.eq_ignore_ascii_case("auto") {
            continue;
        }
        *value = Some(
            part.parse::<u32>()
                .map_err(|_| format!("invalid crop amount '{}'", part))?,
        );
    }

    Ok(CropAmounts {
        top: values[0],
        right: values[1],
        bottom: values[2],
        left: values[3],
    })
}

/// Parse "R,G,B" or "#RRGGBB"
pub fn parse_color(s: &str) -> Result<[u8; 3], String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("invalid hex color '{}'", s));
        }
        let mut rgb = [0u8; 3];
        for (i, channel) in rgb.iter_mut().enumerate() {
            *channel = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| format!("invalid hex color '{}'", s))?;
        }
        return Ok(rgb);
    }

    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected R,G,B, got '{}'", s));
    }
    let mut rgb = [0u8; 3];
    for (channel, part) in rgb.iter_mut().zip(&parts) {
        *channel = part
            .parse::<u8>()
            .map_err(|_| format!("invalid color component '{}'", part))?;
    }
    Ok(rgb)
}
