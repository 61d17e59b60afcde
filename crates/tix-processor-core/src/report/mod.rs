//! Signed report envelope and batch aggregation.
//!
//! Reports arrive as a JSON array in the queue message body. Field names
//! are lowerCamelCase on the wire and snake_case internally; the `message`
//! field is the wire codec's base64 observation block. The typed decode is
//! the schema check: a document that misses required keys, carries an
//! unknown packet type or a malformed observation block fails with a
//! [`ReportError`], never a panic. Unknown keys are ignored on decode and
//! omitted on encode.

pub mod error;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::wire::{WireError, deserialize_observations, serialize_observations};
use crate::{Observation, PacketType};

pub use error::ReportError;

/// One signed measurement report from a probe.
///
/// `from`/`to` are `ip:port` socket strings. Signature material is carried
/// verbatim; verification happens upstream of this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub from_endpoint: String,
    pub to_endpoint: String,
    pub packet_type: PacketType,
    pub initial_timestamp: i64,
    pub received_timestamp: i64,
    pub sent_timestamp: i64,
    pub final_timestamp: i64,
    pub public_key: String,
    pub observations: Vec<Observation>,
    pub signature: String,
    pub user_id: u64,
    pub installation_id: u64,
}

/// External form of [`Report`]: the declarative field map between the JSON
/// document and the internal record.
///
/// `receivedTimestamp` is canonical on encode; some report variants say
/// `receptionTimestamp`, accepted as an alias.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReport {
    from: String,
    to: String,
    #[serde(rename = "type")]
    packet_type: PacketType,
    initial_timestamp: i64,
    #[serde(alias = "receptionTimestamp")]
    received_timestamp: i64,
    sent_timestamp: i64,
    final_timestamp: i64,
    public_key: String,
    message: String,
    signature: String,
    user_id: u64,
    installation_id: u64,
}

impl Report {
    fn from_raw(raw: RawReport) -> Result<Self, WireError> {
        Ok(Report {
            from_endpoint: raw.from,
            to_endpoint: raw.to,
            packet_type: raw.packet_type,
            initial_timestamp: raw.initial_timestamp,
            received_timestamp: raw.received_timestamp,
            sent_timestamp: raw.sent_timestamp,
            final_timestamp: raw.final_timestamp,
            public_key: raw.public_key,
            observations: deserialize_observations(&raw.message)?,
            signature: raw.signature,
            user_id: raw.user_id,
            installation_id: raw.installation_id,
        })
    }

    fn to_raw(&self) -> RawReport {
        RawReport {
            from: self.from_endpoint.clone(),
            to: self.to_endpoint.clone(),
            packet_type: self.packet_type,
            initial_timestamp: self.initial_timestamp,
            received_timestamp: self.received_timestamp,
            sent_timestamp: self.sent_timestamp,
            final_timestamp: self.final_timestamp,
            public_key: self.public_key.clone(),
            message: serialize_observations(&self.observations),
            signature: self.signature.clone(),
            user_id: self.user_id,
            installation_id: self.installation_id,
        }
    }

    /// IP portion of `from`: everything before the first `:`.
    pub fn source_ip(&self) -> &str {
        self.from_endpoint
            .split(':')
            .next()
            .unwrap_or(&self.from_endpoint)
    }
}

/// Decode a queue message body into reports.
pub fn decode_reports(body: &[u8]) -> Result<Vec<Report>, ReportError> {
    let raw: Vec<RawReport> = serde_json::from_slice(body)?;
    raw.into_iter()
        .map(|raw| Report::from_raw(raw).map_err(ReportError::Wire))
        .collect()
}

/// Encode reports as the JSON array form carried by queue messages.
pub fn encode_reports(reports: &[Report]) -> Result<String, ReportError> {
    let raw: Vec<RawReport> = reports.iter().map(Report::to_raw).collect();
    Ok(serde_json::to_string(&raw)?)
}

/// Gather one batch's observations, grouped by source IP.
///
/// Observations of the same IP are merged as a set keyed by the record's
/// full field tuple, preserving first-seen order. A batch is expected to
/// carry a single IP (ingestion-layer guarantee); when several appear the
/// first encountered wins. Returns `None` for an empty batch.
pub fn collect_observations(reports: &[Report]) -> Option<(String, Vec<Observation>)> {
    let first_ip = reports.first()?.source_ip().to_string();

    let mut seen: HashSet<Observation> = HashSet::new();
    let mut observations: Vec<Observation> = Vec::new();
    for report in reports {
        if report.source_ip() != first_ip {
            continue;
        }
        for observation in &report.observations {
            if seen.insert(*observation) {
                observations.push(*observation);
            }
        }
    }

    if observations.is_empty() {
        return None;
    }
    Some((first_ip, observations))
}
