//! External Tools module
//!
//! Locates and drives the command-line converters the exporter depends on.
//!
//! # Features
//!
//! - **Ghostscript** ([`ghostscript`]) - EPS to PDF conversion, PDF appending,
//!   bookmarks and rasterization
//! - **pdftops** ([`pdftops`]) - PDF to EPS conversion
//!
//! Binaries are looked up from an explicit path first, then an environment
//! variable, then `PATH`.

pub mod ghostscript;
pub mod pdftops;

pub use ghostscript::{Eps2PdfOptions, Ghostscript};
pub use pdftops::Pdftops;

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use thiserror::Error;
use tracing::{debug, warn};

/// External tool error types
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{tool} not found (set its path in the config file or {env_var})")]
    NotFound { tool: String, env_var: String },

    #[error("{tool} failed (exit status {status:?}): {stderr}")]
    Failed {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Unexpected tool output: {0}")]
    InvalidOutput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ToolError>;

/// Find a binary: explicit path, then `env_var`, then the first candidate on `PATH`
pub(crate) fn locate_binary(
    tool: &str,
    explicit: Option<&Path>,
    env_var: &str,
    candidates: &[&str],
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        warn!(tool, path = %path.display(), "configured path does not exist, searching");
    }

    if let Some(path) = std::env::var_os(env_var).map(PathBuf::from) {
        if path.is_file() {
            return Ok(path);
        }
        if let Ok(found) = which::which(&path) {
            return Ok(found);
        }
    }

    candidates
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| ToolError::NotFound {
            tool: tool.to_string(),
            env_var: env_var.to_string(),
        })
}

/// Run a tool to completion, turning a non-zero exit into `ToolError::Failed`
pub(crate) fn run_tool<I, S>(tool: &str, binary: &Path, args: I) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
    debug!(
        tool,
        command = %format_command(binary, &args),
        "running external tool"
    );

    let output = Command::new(binary).args(&args).output()?;
    if !output.status.success() {
        return Err(ToolError::Failed {
            tool: tool.to_string(),
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

/// Shell-like rendering of a command for logs and dry runs
pub fn format_command(binary: &Path, args: &[OsString]) -> String {
    let mut parts = vec![quote(binary.as_os_str())];
    parts.extend(args.iter().map(|a| quote(a)));
    parts.join(" ")
}

fn quote(arg: &OsStr) -> String {
    let text = arg.to_string_lossy();
    if !text.is_empty() && !text.contains(|c: char| c.is_whitespace() || c == '"') {
        text.into_owned()
    } else {
        format!("\"{}\"", text.replace('"', "\\\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_command_quotes() {
        let args = vec![
            OsString::from("-q"),
            OsString::from("-sOutputFile=/tmp/my file.pdf"),
        ];
        let cmd = format_command(Path::new("/usr/bin/gs"), &args);
        assert_eq!(cmd, "/usr/bin/gs -q \"-sOutputFile=/tmp/my file.pdf\"");
    }

    #[test]
    fn test_locate_missing_tool() {
        let result = locate_binary(
            "nonexistent",
            Some(Path::new("/nonexistent/bin/tool")),
            "FIGEXPORT_TEST_UNSET_VAR",
            &["figexport-no-such-binary"],
        );
        assert!(matches!(result, Err(ToolError::NotFound { .. })));
    }

    #[test]
    fn test_locate_explicit_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let fake = temp_dir.path().join("gs");
        std::fs::write(&fake, b"#!/bin/sh\n").unwrap();

        let found = locate_binary("ghostscript", Some(&fake), "FIGEXPORT_TEST_UNSET_VAR", &[]);
        assert_eq!(found.unwrap(), fake);
    }

    #[test]
    fn test_error_display() {
        let err = ToolError::Failed {
            tool: "ghostscript".to_string(),
            status: Some(1),
            stderr: "Unrecoverable error".to_string(),
        };
        assert!(err.to_string().contains("ghostscript failed"));
        assert!(err.to_string().contains("Unrecoverable error"));

        let err = ToolError::NotFound {
            tool: "pdftops".to_string(),
            env_var: "PDFTOPS".to_string(),
        };
        assert!(err.to_string().contains("PDFTOPS"));
    }
}
