use thiserror::Error;

use crate::report::ReportError;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("report file {file}: {error}")]
    Report { file: String, error: ReportError },
}
