//! Report intake sources.
//!
//! The queue worker feeds message bodies straight into
//! [`decode_reports`](crate::decode_reports); this module keeps the older
//! filesystem intake alive as an interface so batch tooling can replay
//! report directories through the same pipeline. Scheduling of periodic
//! scans belongs to the operator, not to this crate.

pub mod dir;
pub mod error;

pub use dir::ReportDirSource;
pub use error::SourceError;

use crate::Report;

/// Anything that can produce report batches for analysis.
///
/// One batch corresponds to one queue message: a JSON array of reports
/// sharing a user and installation.
pub trait ReportSource {
    /// Next batch, or `None` when the source is exhausted.
    fn next_batch(&mut self) -> Result<Option<Vec<Report>>, SourceError>;
}
