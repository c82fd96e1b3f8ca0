//! Append-only result file.
//!
//! Each completed attempt appends its plain result line. The file is opened
//! per write with append+create, so results from earlier runs are kept and
//! nothing is ever truncated or rotated.
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
#[error("failed to append to {}: {source}", .path.display())]
pub struct SinkError {
    pub path: PathBuf,
    pub source: io::Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSink {
    path: PathBuf,
}

impl ResultSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, line: &str) -> Result<(), SinkError> {
        self.try_append(line).map_err(|source| SinkError {
            path: self.path.clone(),
            source,
        })
    }

    fn try_append(&self, line: &str) -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.append(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        let mut f = options.open(&self.path)?;
        writeln!(f, "{line}")
    }
}
