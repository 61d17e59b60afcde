use thiserror::Error;

use crate::wire::WireError;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("malformed report document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed observation block: {0}")]
    Wire(#[from] WireError),
}
