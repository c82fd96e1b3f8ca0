use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

pub type LineIter = Box<dyn Iterator<Item = io::Result<String>> + Send + 'static>;

/// Iterate lines from a file path using a buffered reader.
pub fn iter_lines_bufread<P: AsRef<Path>>(path: P) -> Result<LineIter> {
    let file = File::open(&path).with_context(|| format!("open {}", path.as_ref().display()))?;
    let reader = BufReader::new(file);
    Ok(Box::new(reader.lines()))
}

/// Read a host or username list. Entries are trimmed (which also drops a
/// trailing '\r') and blank lines are skipped, so a file ending in a newline
/// never yields an empty entry.
pub fn read_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for line in iter_lines_bufread(&path)? {
        let line = line.with_context(|| format!("read {}", path.as_ref().display()))?;
        let entry = line.trim();
        if !entry.is_empty() {
            out.push(entry.to_string());
        }
    }
    log::debug!("loaded {} entries from {}", out.len(), path.as_ref().display());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn read_list_drops_blank_and_crlf() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "alice\r\n\r\n  bob  \ncarol\n\n").unwrap();
        let v = read_list(f.path()).unwrap();
        assert_eq!(v, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn read_list_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let err = read_list(&missing).unwrap_err();
        assert!(format!("{err}").contains("nope.txt"));
    }
}
