//! Progress reporting for figure export.
//!
//! Stage banners for the command line, kept apart from the `tracing` log
//! stream, plus the [`ProgressCallback`] hook the exporter reports through.

use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

/// Export pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportStage {
    /// Initializing
    #[default]
    Initializing,
    /// Reading the input figure
    Loading,
    /// Rewriting PostScript (fonts, lines, bounding box)
    Patching,
    /// Detecting and removing borders
    Cropping,
    /// Rendering vector input to pixels
    Rasterizing,
    /// Running Ghostscript/pdftops conversions
    Converting,
    /// Writing output files
    Writing,
    /// Completed
    Completed,
}

impl ExportStage {
    pub fn name(&self) -> &'static str {
        match self {
            ExportStage::Initializing => "Initializing",
            ExportStage::Loading => "Loading",
            ExportStage::Patching => "Patching",
            ExportStage::Cropping => "Cropping",
            ExportStage::Rasterizing => "Rasterizing",
            ExportStage::Converting => "Converting",
            ExportStage::Writing => "Writing",
            ExportStage::Completed => "Completed",
        }
    }

    /// Short description shown next to the stage name
    pub fn description(&self) -> &'static str {
        match self {
            ExportStage::Initializing => "preparing",
            ExportStage::Loading => "reading input",
            ExportStage::Patching => "fixing PostScript",
            ExportStage::Cropping => "trimming borders",
            ExportStage::Rasterizing => "rendering bitmap",
            ExportStage::Converting => "running external tools",
            ExportStage::Writing => "saving outputs",
            ExportStage::Completed => "done",
        }
    }
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.description())
    }
}

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// No output
    Quiet,
    /// Stage display only
    #[default]
    Normal,
    /// Also list every file written
    Verbose,
    /// Everything, including per-item batch progress
    VeryVerbose,
}

impl OutputMode {
    /// Create OutputMode from verbosity level
    pub fn from_verbosity(level: u8) -> Self {
        match level {
            0 => OutputMode::Normal,
            1 => OutputMode::Verbose,
            _ => OutputMode::VeryVerbose,
        }
    }

    /// Check if output should be shown at this mode
    pub fn should_show(&self, required: OutputMode) -> bool {
        use OutputMode::*;
        match (self, required) {
            (Quiet, _) => false,
            (Normal, Quiet | Normal) => true,
            (Verbose, Quiet | Normal | Verbose) => true,
            (VeryVerbose, _) => true,
            _ => false,
        }
    }
}

// ============================================================
// Callback
// ============================================================

/// Receives stage events from the exporter
pub trait ProgressCallback {
    /// A stage has begun
    fn on_stage_start(&mut self, stage: ExportStage);

    /// A stage has finished
    fn on_stage_complete(&mut self, _stage: ExportStage) {}

    /// An output file has been written
    fn on_output(&mut self, _path: &Path) {}
}

/// Progress sink that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_stage_start(&mut self, _stage: ExportStage) {}
}

// ============================================================
// Tracker
// ============================================================

/// Progress bar width in characters
const PROGRESS_BAR_WIDTH: usize = 40;

/// Build a progress bar string
pub fn build_progress_bar(percent: u8) -> String {
    let percent = percent.min(100);
    let filled = (percent as usize * PROGRESS_BAR_WIDTH) / 100;
    let empty = PROGRESS_BAR_WIDTH - filled;
    format!("[{}{}]", "=".repeat(filled), "-".repeat(empty))
}

/// Console progress display
#[derive(Debug)]
pub struct ProgressTracker {
    /// Current file number (1-based)
    pub current_file: usize,
    /// Total number of files
    pub total_files: usize,
    /// Current filename
    pub current_filename: String,
    /// Current stage
    pub current_stage: ExportStage,
    /// Files written for the current input
    pub outputs_written: usize,
    start_time: Instant,
    output_mode: OutputMode,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(1, OutputMode::Normal)
    }
}

impl ProgressTracker {
    pub fn new(total_files: usize, output_mode: OutputMode) -> Self {
        Self {
            current_file: 0,
            total_files,
            current_filename: String::new(),
            current_stage: ExportStage::Initializing,
            outputs_written: 0,
            start_time: Instant::now(),
            output_mode,
        }
    }

    /// Start processing a new input
    pub fn start_file(&mut self, file_number: usize, filename: &str) {
        self.current_file = file_number;
        self.current_filename = filename.to_string();
        self.current_stage = ExportStage::Initializing;
        self.outputs_written = 0;
        self.start_time = Instant::now();

        if self.output_mode.should_show(OutputMode::Normal) {
            self.print_file_header();
        }
    }

    pub fn set_stage(&mut self, stage: ExportStage) {
        self.current_stage = stage;
        if self.output_mode.should_show(OutputMode::Normal) {
            println!("  Stage: {}", self.current_stage);
        }
    }

    /// Show batch progress after `done` of `total` items
    pub fn update_batch(&self, done: usize, total: usize, item: &str) {
        if total == 0 || !self.output_mode.should_show(OutputMode::Verbose) {
            return;
        }
        let percent = ((done as f64 / total as f64) * 100.0) as u8;
        print!(
            "\r    {} {:3}% ({}/{})",
            build_progress_bar(percent),
            percent,
            done,
            total
        );
        if self.output_mode.should_show(OutputMode::VeryVerbose) && !item.is_empty() {
            print!(" {}", item);
        }
        if done >= total {
            println!();
        }
        let _ = io::stdout().flush();
    }

    /// Mark the current input as complete
    pub fn complete_file(&mut self) {
        self.current_stage = ExportStage::Completed;

        if self.output_mode.should_show(OutputMode::Normal) {
            println!(
                "  Completed in {:.2}s ({} file(s) written)",
                self.elapsed_secs(),
                self.outputs_written
            );
            println!();
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    fn print_file_header(&self) {
        println!();
        println!("{}", "=".repeat(80));
        println!(
            "[File {}/{}] {}",
            self.current_file, self.total_files, self.current_filename
        );
        println!("{}", "=".repeat(80));
    }

    /// Print final summary
    pub fn print_summary(total_files: usize, ok_count: usize, error_count: usize) {
        println!();
        println!("{}", "=".repeat(80));
        println!("Export Summary");
        println!("{}", "=".repeat(80));
        println!("  Total files:  {}", total_files);
        println!("  Succeeded:    {}", ok_count);
        println!("  Errors:       {}", error_count);
        println!("{}", "=".repeat(80));
        println!();
    }
}

impl ProgressCallback for ProgressTracker {
    fn on_stage_start(&mut self, stage: ExportStage) {
        self.set_stage(stage);
    }

    fn on_output(&mut self, path: &Path) {
        self.outputs_written += 1;
        if self.output_mode.should_show(OutputMode::Verbose) {
            println!("    wrote {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_tracker_new() {
        let tracker = ProgressTracker::new(5, OutputMode::Normal);
        assert_eq!(tracker.total_files, 5);
        assert_eq!(tracker.current_file, 0);
        assert_eq!(tracker.current_stage, ExportStage::Initializing);
    }

    #[test]
    fn test_start_file_resets_outputs() {
        let mut tracker = ProgressTracker::new(3, OutputMode::Quiet);
        tracker.outputs_written = 4;
        tracker.start_file(1, "figure.eps");
        assert_eq!(tracker.current_file, 1);
        assert_eq!(tracker.current_filename, "figure.eps");
        assert_eq!(tracker.outputs_written, 0);
    }

    #[test]
    fn test_callback_updates_tracker() {
        let mut tracker = ProgressTracker::new(1, OutputMode::Quiet);
        tracker.on_stage_start(ExportStage::Cropping);
        assert_eq!(tracker.current_stage, ExportStage::Cropping);

        tracker.on_output(Path::new("out.png"));
        tracker.on_output(Path::new("out.pdf"));
        assert_eq!(tracker.outputs_written, 2);
    }

    #[test]
    fn test_complete_file() {
        let mut tracker = ProgressTracker::new(1, OutputMode::Quiet);
        tracker.start_file(1, "figure.pdf");
        tracker.complete_file();
        assert_eq!(tracker.current_stage, ExportStage::Completed);
    }

    #[test]
    fn test_noop_progress() {
        let mut sink = NoopProgress;
        sink.on_stage_start(ExportStage::Writing);
        sink.on_stage_complete(ExportStage::Writing);
        sink.on_output(Path::new("ignored.png"));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(ExportStage::Initializing.name(), "Initializing");
        assert_eq!(ExportStage::Patching.name(), "Patching");
        assert_eq!(ExportStage::Rasterizing.name(), "Rasterizing");
        assert_eq!(ExportStage::Completed.name(), "Completed");
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(
            format!("{}", ExportStage::Cropping),
            "Cropping (trimming borders)"
        );
    }

    #[test]
    fn test_build_progress_bar() {
        assert_eq!(
            build_progress_bar(0),
            "[----------------------------------------]"
        );
        assert_eq!(
            build_progress_bar(50),
            "[====================--------------------]"
        );
        assert_eq!(
            build_progress_bar(150),
            "[========================================]"
        );
    }

    #[test]
    fn test_output_mode_from_verbosity() {
        assert_eq!(OutputMode::from_verbosity(0), OutputMode::Normal);
        assert_eq!(OutputMode::from_verbosity(1), OutputMode::Verbose);
        assert_eq!(OutputMode::from_verbosity(7), OutputMode::VeryVerbose);
    }

    #[test]
    fn test_output_mode_gating() {
        assert!(!OutputMode::Quiet.should_show(OutputMode::Quiet));
        assert!(OutputMode::Normal.should_show(OutputMode::Normal));
        assert!(!OutputMode::Normal.should_show(OutputMode::Verbose));
        assert!(OutputMode::Verbose.should_show(OutputMode::Verbose));
        assert!(!OutputMode::Verbose.should_show(OutputMode::VeryVerbose));
        assert!(OutputMode::VeryVerbose.should_show(OutputMode::VeryVerbose));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ExportStage::default(), ExportStage::Initializing);
        assert_eq!(OutputMode::default(), OutputMode::Normal);
        assert_eq!(ProgressTracker::default().total_files, 1);
    }
}
