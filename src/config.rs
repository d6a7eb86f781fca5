//! Configuration file support
//!
//! Settings are read from TOML, searched in this order:
//! 1. the path given with `--config`
//! 2. `./figexport.toml`
//! 3. `<config dir>/figexport/config.toml`
//!
//! Values given on the command line ([`CliOverrides`]) take precedence over
//! the file.
//!
//! ```toml
//! [tools]
//! ghostscript = "/usr/local/bin/gs"
//!
//! [export]
//! resolution = 300
//! padding = 0.05
//! transparent = true
//!
//! [fonts]
//! Calibri = "Helvetica"
//!
//! [ghostscript]
//! extra_args = ["-dNOSAFER"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::crop::{CropAmounts, Padding};
use crate::eps::FontSwap;
use crate::export::{ColorSpace, ExportOptions, OutputFormat};

/// Config file name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "figexport.toml";

/// Config error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

// ============================================================
// File Structure
// ============================================================

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub export: ExportConfig,
    /// Font name to standard PostScript font
    pub fonts: BTreeMap<String, String>,
    pub ghostscript: GhostscriptConfig,
}

/// External tool locations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ghostscript: Option<PathBuf>,
    pub pdftops: Option<PathBuf>,
}

/// Export defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Bitmap DPI (overrides magnify)
    pub resolution: Option<u32>,
    pub magnify: f64,
    /// Pixels/points, or a fraction of the figure size when below 1
    pub padding: f64,
    pub quality: Option<u8>,
    pub anti_alias: u8,
    pub transparent: bool,
    pub crop: bool,
    pub font_swap: bool,
    pub fix_lines: bool,
    pub color: ColorSpace,
}

impl Default for ExportConfig {
    fn default() -> Self {
        let defaults = ExportOptions::default();
        Self {
            resolution: defaults.resolution,
            magnify: defaults.magnify,
            padding: defaults.padding.0,
            quality: defaults.quality,
            anti_alias: defaults.anti_alias,
            transparent: defaults.transparent,
            crop: defaults.crop,
            font_swap: defaults.font_swap,
            fix_lines: defaults.fix_lines,
            color: defaults.color,
        }
    }
}

/// Ghostscript settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostscriptConfig {
    /// Arguments added to every pdfwrite invocation
    pub extra_args: Vec<String>,
}

// ============================================================
// CLI Overrides
// ============================================================

/// Values given explicitly on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub formats: Vec<OutputFormat>,
    pub resolution: Option<u32>,
    pub magnify: Option<f64>,
    pub anti_alias: Option<u8>,
    pub quality: Option<u8>,
    pub padding: Option<f64>,
    pub crop: Option<bool>,
    pub crop_amounts: Option<CropAmounts>,
    pub transparent: Option<bool>,
    pub on_black: Option<PathBuf>,
    pub color: Option<ColorSpace>,
    pub append: bool,
    pub bookmark: Option<String>,
    pub font_swap: Option<bool>,
    pub fix_lines: Option<bool>,
    pub gs_extra_args: Vec<String>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================
// Loading
// ============================================================

impl Config {
    /// Load the first config file found in the default locations, or defaults
    pub fn load() -> Result<Self> {
        for path in Self::search_paths() {
            if path.is_file() {
                return Self::load_from_path(&path);
            }
        }
        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    /// Load a specific config file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the config, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        info!(path = %path.display(), "wrote config");
        Ok(())
    }

    /// Default locations, most specific first
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        paths.extend(Self::user_config_path());
        paths
    }

    /// `<config dir>/figexport/config.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("figexport").join("config.toml"))
    }

    /// Combine file settings with command-line values into export options
    pub fn merge_with_cli(&self, cli: &CliOverrides) -> Result<ExportOptions> {
        let fonts = FontSwap::from_map(&self.fonts)
            .map_err(|e| ConfigError::InvalidValue(format!("[fonts]: {}", e)))?;

        let mut gs_extra_args = self.ghostscript.extra_args.clone();
        gs_extra_args.extend(cli.gs_extra_args.iter().cloned());

        let resolution = match (cli.resolution, cli.magnify) {
            (Some(dpi), _) => Some(dpi),
            // An explicit magnification beats a configured resolution
            (None, Some(_)) => None,
            (None, None) => self.export.resolution,
        };

        Ok(ExportOptions {
            formats: cli.formats.clone(),
            resolution,
            magnify: cli.magnify.unwrap_or(self.export.magnify),
            anti_alias: cli.anti_alias.unwrap_or(self.export.anti_alias),
            quality: cli.quality.or(self.export.quality),
            padding: Padding(cli.padding.unwrap_or(self.export.padding)),
            crop: cli.crop.unwrap_or(self.export.crop),
            crop_amounts: cli.crop_amounts.unwrap_or_default(),
            transparent: cli.transparent.unwrap_or(self.export.transparent),
            on_black: cli.on_black.clone(),
            color: cli.color.unwrap_or(self.export.color),
            append: cli.append,
            bookmark: cli.bookmark.clone(),
            font_swap: cli.font_swap.unwrap_or(self.export.font_swap),
            fonts,
            fix_lines: cli.fix_lines.unwrap_or(self.export.fix_lines),
            gs_extra_args,
            ghostscript: self.tools.ghostscript.clone(),
            pdftops: self.tools.pdftops.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[tools]
ghostscript = "/opt/gs/bin/gs"

[export]
resolution = 300
padding = 0.05
transparent = true
color = "gray"

[fonts]
Calibri = "Helvetica"

[ghostscript]
extra_args = ["-dNOSAFER"]
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.export.magnify, 1.0);
        assert!(config.export.crop);
        assert!(config.export.font_swap);
        assert!(config.fonts.is_empty());
        assert!(config.tools.ghostscript.is_none());
    }

    #[test]
    fn test_parse_sample() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert_eq!(config.tools.ghostscript, Some(PathBuf::from("/opt/gs/bin/gs")));
        assert_eq!(config.export.resolution, Some(300));
        assert_eq!(config.export.padding, 0.05);
        assert!(config.export.transparent);
        assert_eq!(config.export.color, ColorSpace::Gray);
        // Unspecified keys keep their defaults
        assert!(config.export.crop);
        assert_eq!(config.fonts["Calibri"], "Helvetica");
        assert_eq!(config.ghostscript.extra_args, vec!["-dNOSAFER".to_string()]);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            Config::from_toml("[export]\nresolution = \"high\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::from_toml(SAMPLE).unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_merge_file_only() {
        let config = Config::from_toml(SAMPLE).unwrap();
        let options = config.merge_with_cli(&CliOverrides::new()).unwrap();

        assert_eq!(options.dpi(), 300);
        assert_eq!(options.padding, Padding(0.05));
        assert!(options.transparent);
        assert_eq!(options.color, ColorSpace::Gray);
        assert_eq!(options.fonts.len(), 1);
        assert_eq!(options.gs_extra_args, vec!["-dNOSAFER".to_string()]);
        assert_eq!(options.ghostscript, Some(PathBuf::from("/opt/gs/bin/gs")));
    }

    #[test]
    fn test_merge_cli_takes_precedence() {
        let config = Config::from_toml(SAMPLE).unwrap();
        let cli = CliOverrides {
            magnify: Some(2.0),
            padding: Some(10.0),
            transparent: Some(false),
            color: Some(ColorSpace::Cmyk),
            gs_extra_args: vec!["-dFastWebView".to_string()],
            ..Default::default()
        };
        let options = config.merge_with_cli(&cli).unwrap();

        // magnify on the command line beats the configured resolution
        assert_eq!(options.dpi(), 144);
        assert_eq!(options.padding, Padding(10.0));
        assert!(!options.transparent);
        assert_eq!(options.color, ColorSpace::Cmyk);
        assert_eq!(
            options.gs_extra_args,
            vec!["-dNOSAFER".to_string(), "-dFastWebView".to_string()]
        );
    }

    #[test]
    fn test_merge_rejects_bad_font_name() {
        let config = Config::from_toml("[fonts]\n\"My Font\" = \"Helvetica\"\n").unwrap();
        assert!(matches!(
            config.merge_with_cli(&CliOverrides::new()),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_load_from_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("conf").join("figexport.toml");

        let mut config = Config::default();
        config.export.anti_alias = 3;
        config.save(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.export.anti_alias, 3);
    }

    #[test]
    fn test_load_missing_path() {
        assert!(matches!(
            Config::load_from_path(Path::new("/nonexistent/figexport.toml")),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_search_paths_start_local() {
        let paths = Config::search_paths();
        assert_eq!(paths[0], PathBuf::from(LOCAL_CONFIG_FILE));
    }
}
