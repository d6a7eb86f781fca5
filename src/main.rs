//! figexport - publication-quality figure export
//!
//! CLI entry point

use anyhow::{bail, Context};
use clap::Parser;
use figexport::config::LOCAL_CONFIG_FILE;
use figexport::tools::{ghostscript::GHOSTSCRIPT_ENV, pdftops::PDFTOPS_ENV};
use figexport::{
    exit_codes,
    // CLI
    Cli, Commands, ConfigArgs, CropArgs, ExportArgs,
    // Config
    CliOverrides, Config, ConfigError,
    // Cropping
    BorderCropper, CropError, CropOptions, Padding,
    // Export
    ExportError, Exporter, OutputFormat,
    // Progress tracking
    OutputMode, ProgressTracker,
    // Tools
    Ghostscript, Pdftops, ToolError,
};
use image::Rgba;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable read for the log filter before RUST_LOG
const LOG_ENV: &str = "FIGEXPORT_LOG";

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Export(args) => run_export(args, cli.verbose, cli.quiet),
        Commands::Crop(args) => run_crop(args, cli.verbose, cli.quiet),
        Commands::Info => run_info(),
        Commands::Config(args) => run_config(args),
    };

    std::process::exit(match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    });
}

/// Log to stderr; the env filter wins over -v/-q
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn exit_code_for(error: &anyhow::Error) -> i32 {
    if let Some(e) = error.downcast_ref::<ExportError>() {
        return e.exit_code();
    }
    if let Some(e) = error.downcast_ref::<CropError>() {
        return match e {
            CropError::ImageNotFound(_) => exit_codes::INPUT_NOT_FOUND,
            CropError::PaddingTooLarge { .. } => exit_codes::INVALID_ARGS,
            _ => exit_codes::CONVERSION_FAILED,
        };
    }
    if let Some(e) = error.downcast_ref::<ConfigError>() {
        return match e {
            ConfigError::IoError(_) => exit_codes::GENERAL_ERROR,
            _ => exit_codes::INVALID_ARGS,
        };
    }
    if let Some(ToolError::NotFound { .. }) = error.downcast_ref::<ToolError>() {
        return exit_codes::TOOL_NOT_FOUND;
    }
    exit_codes::GENERAL_ERROR
}

fn output_mode(verbose: u8, quiet: bool) -> OutputMode {
    if quiet {
        OutputMode::Quiet
    } else {
        OutputMode::from_verbosity(verbose)
    }
}

// ============ Export Command ============

fn run_export(args: &ExportArgs, verbose: u8, quiet: bool) -> anyhow::Result<()> {
    let file_config = load_config(args.config.as_deref());

    // CLI takes precedence over the config file
    let cli_overrides = create_cli_overrides(args);
    let options = file_config.merge_with_cli(&cli_overrides)?;
    let exporter = Exporter::new(options);

    if args.dry_run {
        let plan = exporter.plan(&args.input, args.output.as_deref())?;
        if args.json {
            println!("{}", plan.to_json()?);
        } else {
            println!("=== Dry Run - Export Plan ===");
            println!();
            print!("{}", plan);
        }
        return Ok(());
    }

    // Keep stdout clean for JSON
    let mode = if args.json {
        OutputMode::Quiet
    } else {
        output_mode(verbose, quiet)
    };
    let mut tracker = ProgressTracker::new(1, mode);
    tracker.start_file(1, &args.input.display().to_string());

    let report = exporter.export_with_progress(&args.input, args.output.as_deref(), &mut tracker)?;
    tracker.complete_file();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        for file in &report.outputs {
            let unit = if file.format.is_vector() { "pt" } else { "px" };
            println!(
                "{} ({}x{} {})",
                file.path.display(),
                file.size.0,
                file.size.1,
                unit
            );
        }
    }

    Ok(())
}

/// Config from `--config`, else the default search; a broken file falls back to defaults
fn load_config(path: Option<&Path>) -> Config {
    let loaded = match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    loaded.unwrap_or_else(|e| {
        warn!("Failed to load config file: {}", e);
        Config::default()
    })
}

/// Create CLI overrides from ExportArgs
///
/// Values equal to the clap defaults are left unset so the config file can
/// provide them.
fn create_cli_overrides(args: &ExportArgs) -> CliOverrides {
    let mut overrides = CliOverrides::new();

    const DEFAULT_MAGNIFY: f64 = 1.0;
    const DEFAULT_ANTI_ALIAS: u8 = 1;
    const DEFAULT_PADDING: f64 = 0.0;

    overrides.formats = args.formats();
    overrides.resolution = args.resolution;
    if (args.magnify - DEFAULT_MAGNIFY).abs() > f64::EPSILON {
        overrides.magnify = Some(args.magnify);
    }
    if args.anti_alias != DEFAULT_ANTI_ALIAS {
        overrides.anti_alias = Some(args.anti_alias);
    }
    overrides.quality = args.quality;
    if (args.padding - DEFAULT_PADDING).abs() > f64::EPSILON {
        overrides.padding = Some(args.padding);
    }

    if args.no_crop {
        overrides.crop = Some(false);
    }
    overrides.crop_amounts = args.crop_amounts;
    if args.transparent {
        overrides.transparent = Some(true);
    }
    overrides.on_black = args.on_black.clone();
    overrides.color = args.color();

    overrides.append = args.append;
    overrides.bookmark = args.bookmark.clone();
    if args.no_font_swap {
        overrides.font_swap = Some(false);
    }
    if args.fix_lines {
        overrides.fix_lines = Some(true);
    }
    overrides.gs_extra_args = args.gs_options.clone();

    overrides
}

// ============ Crop Command ============

fn run_crop(args: &CropArgs, verbose: u8, quiet: bool) -> anyhow::Result<()> {
    let start_time = Instant::now();

    for input in &args.inputs {
        if !input.is_file() {
            return Err(CropError::ImageNotFound(input.clone()).into());
        }
    }

    let mut builder = CropOptions::builder().padding(Padding(args.padding));
    if let Some([r, g, b]) = args.background {
        builder = builder.background(Rgba([r, g, b, 255]));
    }
    if let Some(amounts) = args.crop_amounts {
        builder = builder.amounts(amounts);
    }
    let options = builder.build();

    let jobs: Vec<(PathBuf, PathBuf)> = args
        .inputs
        .iter()
        .map(|input| (input.clone(), cropped_path(input, args.output.as_deref())))
        .collect();

    // Parallel writes to one path would race
    let mut targets: HashMap<&Path, &Path> = HashMap::new();
    for (input, output) in &jobs {
        if let Some(first) = targets.insert(output.as_path(), input.as_path()) {
            bail!(
                "{} and {} would both be written to {}",
                first.display(),
                input.display(),
                output.display()
            );
        }
    }

    if let Some(dir) = &args.output {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
    }
    debug!(count = jobs.len(), "cropping images");

    let results = BorderCropper::crop_files(&jobs, &options);

    let tracker = ProgressTracker::new(jobs.len(), output_mode(verbose, quiet));
    let mut ok_count = 0usize;
    let mut error_count = 0usize;
    for (idx, (result, (input, _))) in results.iter().zip(&jobs).enumerate() {
        match result {
            Ok(cropped) => {
                ok_count += 1;
                tracker.update_batch(
                    idx + 1,
                    jobs.len(),
                    &format!(
                        "{} {}x{} -> {}x{}",
                        cropped.output_path.display(),
                        cropped.original_size.0,
                        cropped.original_size.1,
                        cropped.cropped_size.0,
                        cropped.cropped_size.1
                    ),
                );
            }
            Err(e) => {
                error_count += 1;
                eprintln!("Error cropping {}: {}", input.display(), e);
            }
        }
    }

    if !quiet {
        ProgressTracker::print_summary(jobs.len(), ok_count, error_count);
        println!("Total time: {:.2}s", start_time.elapsed().as_secs_f64());
    }

    if error_count > 0 {
        bail!("{} file(s) failed to crop", error_count);
    }
    Ok(())
}

/// `<dir>/<name>` when an output directory is given, else `<stem>_cropped.<ext>` beside the input
fn cropped_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    match (output_dir, input.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            let name = match input.extension() {
                Some(ext) => format!("{}_cropped.{}", stem, ext.to_string_lossy()),
                None => format!("{}_cropped", stem),
            };
            input.with_file_name(name)
        }
    }
}

// ============ Info Command ============

fn run_info() -> anyhow::Result<()> {
    println!("figexport v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("System Information:");
    println!("  Platform: {}", std::env::consts::OS);
    println!("  Arch: {}", std::env::consts::ARCH);
    println!("  Threads: {}", rayon::current_num_threads());

    let config = Config::load().unwrap_or_default();

    println!();
    println!("External Tools:");
    match Ghostscript::locate(config.tools.ghostscript.as_deref()) {
        Ok(gs) => print_tool("Ghostscript", gs.path(), gs.version().ok()),
        Err(_) => println!("  Ghostscript: Not found (set {} or [tools] ghostscript)", GHOSTSCRIPT_ENV),
    }
    match Pdftops::locate(config.tools.pdftops.as_deref()) {
        Ok(pdftops) => print_tool("pdftops", pdftops.path(), pdftops.version().ok()),
        Err(_) => println!("  pdftops: Not found (set {} or [tools] pdftops)", PDFTOPS_ENV),
    }

    println!();
    println!("Output Formats:");
    let formats = [
        OutputFormat::Pdf,
        OutputFormat::Eps,
        OutputFormat::Png,
        OutputFormat::Tiff,
        OutputFormat::Jpeg,
        OutputFormat::Bmp,
        OutputFormat::Gif,
        OutputFormat::Svg,
        OutputFormat::Emf,
    ];
    for format in formats {
        let status = if format.is_supported() { "supported" } else { "not supported" };
        println!("  {}: {}", format, status);
    }

    // Config File Locations
    println!();
    println!("Config File Locations:");
    println!("  Local: ./{}", LOCAL_CONFIG_FILE);
    if let Some(path) = Config::user_config_path() {
        println!("  User:  {}", path.display());
    }

    Ok(())
}

fn print_tool(name: &str, path: &Path, version: Option<String>) {
    match version.filter(|v| !v.is_empty() && v.len() < 80) {
        Some(version) => println!("  {}: {} ({})", name, version, path.display()),
        None => println!("  {}: {} (found)", name, path.display()),
    }
}

// ============ Config Command ============

fn run_config(args: &ConfigArgs) -> anyhow::Result<()> {
    if args.init {
        let path = args
            .path
            .clone()
            .or_else(Config::user_config_path)
            .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE));
        if path.exists() && !args.force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }
        Config::default().save(&path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let (config, source) = match &args.path {
        Some(path) => (Config::load_from_path(path)?, Some(path.clone())),
        None => {
            let found = Config::search_paths().into_iter().find(|p| p.is_file());
            match found {
                Some(path) => (Config::load_from_path(&path)?, Some(path)),
                None => (Config::default(), None),
            }
        }
    };

    match source {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# No config file found; showing defaults"),
    }
    print!("{}", config.to_toml()?);
    Ok(())
}
