//! pdftops driver (PDF to EPS)

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{locate_binary, run_tool, Result, ToolError};

/// Environment variable naming the pdftops binary
pub const PDFTOPS_ENV: &str = "PDFTOPS";

/// pdftops executable
#[derive(Debug, Clone)]
pub struct Pdftops {
    path: PathBuf,
}

impl Pdftops {
    /// Locate pdftops from an explicit path, `$PDFTOPS` or `PATH`
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        let path = locate_binary("pdftops", explicit, PDFTOPS_ENV, &["pdftops"])?;
        debug!(path = %path.display(), "using pdftops");
        Ok(Self { path })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Version line; pdftops prints it on stderr
    pub fn version(&self) -> Result<String> {
        let output = run_tool("pdftops", &self.path, ["-v"])?;
        let text = if output.stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).into_owned()
        } else {
            String::from_utf8_lossy(&output.stderr).into_owned()
        };
        text.lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ToolError::InvalidOutput("empty version output".to_string()))
    }

    pub fn pdf2eps_args(source: &Path, dest: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-q", "-paper", "match", "-eps", "-level2"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(source.as_os_str().to_os_string());
        args.push(dest.as_os_str().to_os_string());
        args
    }

    /// Convert the first page of a PDF to EPS
    pub fn pdf2eps(&self, source: &Path, dest: &Path) -> Result<()> {
        run_tool("pdftops", &self.path, Self::pdf2eps_args(source, dest))?;
        if !dest.is_file() {
            return Err(ToolError::InvalidOutput(format!(
                "pdftops produced no file at {}",
                dest.display()
            )));
        }
        info!(source = %source.display(), dest = %dest.display(), "converted PDF to EPS");
        Ok(())
    }
}
