//! RPC coverage logging.
//!
//! Each test process appends the name of every executed operation to its own
//! file, so concurrent processes never share a writer. A reference list of
//! every operation the node advertises is written once per directory for
//! later comparison.

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::{CoverageError, RpcClient};

/// Name of the reference file listing every advertised operation.
pub const REFERENCE_FILENAME: &str = "rpc_interface.txt";

/// Append-only log of executed operation names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageLog {
    path: PathBuf,
}

impl CoverageLog {
    /// Log writing to `path`; the file is created on first record.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line. The file is opened and closed on every call.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub fn record(&self, operation: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{operation}")
    }
}

/// Coverage file unique to this process and node index.
#[must_use]
pub fn coverage_filename(dir: &Path, node_index: usize) -> PathBuf {
    dir.join(format!(
        "coverage.pid{}.node{node_index}.txt",
        std::process::id()
    ))
}

/// Operation names from `help` output: the first word of every non-blank
/// line that is not a `==` section header.
#[must_use]
pub fn parse_help_commands(help: &str) -> BTreeSet<String> {
    help.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('='))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Write [`REFERENCE_FILENAME`] into `dir` from the node's `help` output,
/// unless it already exists.
///
/// Returns whether the file was written.
///
/// # Errors
///
/// Returns an error if `help` fails, is not text, or the file cannot be
/// written.
pub async fn write_all_rpc_commands<C>(dir: &Path, client: &C) -> Result<bool, CoverageError>
where
    C: RpcClient + ?Sized,
{
    let filename = dir.join(REFERENCE_FILENAME);
    if filename.is_file() {
        return Ok(false);
    }

    let help = client.call("help", &[]).await?;
    let help = help.as_str().ok_or(CoverageError::HelpNotText)?;
    let mut contents = String::new();
    for command in parse_help_commands(help) {
        contents.push_str(&command);
        contents.push('\n');
    }
    fs::write(&filename, contents)?;
    tracing::debug!(path = %filename.display(), "wrote rpc reference list");
    Ok(true)
}
