use std::fs;
use std::path::{Path, PathBuf};

use crate::Report;
use crate::report::decode_reports;

use super::error::SourceError;
use super::ReportSource;

/// Reads report batches from a directory of `*.json` files, oldest file
/// name first. Each file holds one batch in the queue-message format.
///
/// Symlinks and non-JSON entries are skipped, the way the legacy intake
/// treated its report directories.
pub struct ReportDirSource {
    files: Vec<PathBuf>,
    next: usize,
}

impl ReportDirSource {
    pub fn open(dir: &Path) -> Result<Self, SourceError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_json = path
                .extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
            if !is_json || !entry.file_type()?.is_file() {
                continue;
            }
            files.push(path);
        }
        files.sort();
        Ok(ReportDirSource { files, next: 0 })
    }
}

impl ReportSource for ReportDirSource {
    fn next_batch(&mut self) -> Result<Option<Vec<Report>>, SourceError> {
        let Some(path) = self.files.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;

        let body = fs::read(path)?;
        let reports = decode_reports(&body).map_err(|error| SourceError::Report {
            file: path.display().to_string(),
            error,
        })?;
        Ok(Some(reports))
    }
}
