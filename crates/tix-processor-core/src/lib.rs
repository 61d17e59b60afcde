//! Observation-analysis engine for the TiX network-quality platform.
//!
//! This crate exposes the per-batch analysis pipeline used by the queue
//! worker and tests: signed reports are decoded into observations, grouped
//! by source IP, and condensed into upstream/downstream usage, congestion
//! quality and self-similarity (Hurst) figures. Decoding is byte-oriented
//! and side-effect free; all I/O lives in the worker crate.
//!
//! Key guarantees:
//! - `analyze` is a pure function of its input observations and constants.
//! - Wire and JSON codecs round-trip byte-exactly.
//!
//! # Examples
//! ```no_run
//! use tix_processor_core::{analyze, collect_observations, decode_reports};
//!
//! let reports = decode_reports(br#"[]"#)?;
//! if let Some((ip, observations)) = collect_observations(&reports) {
//!     let result = analyze(&observations)?;
//!     println!("quality for {ip}: {}", result.upstream.quality);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

mod analysis;
mod report;
mod source;
mod wire;

pub use analysis::clock::ClockError;
pub use analysis::histogram::HistogramError;
pub use analysis::hurst::{HurstError, estimate as estimate_hurst};
pub use analysis::{
    AnalysisError, PhiEstimate, PhiFunction, analyze, fit_phi_function, phi_estimates,
};
pub use report::{Report, ReportError, collect_observations, decode_reports, encode_reports};
pub use source::{ReportDirSource, ReportSource, SourceError};
pub use wire::{WireError, deserialize_observations, serialize_observations};

/// Nanoseconds in a day; intra-day timestamps are taken modulo this.
pub const NANOS_PER_DAY: i64 = 24 * 60 * 60 * 1_000_000_000;

/// Probe packet class carried in every observation and report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketType {
    /// Small probe packet; the only class currently analyzed.
    #[serde(rename = "S")]
    Short,
    /// Large probe packet; decoded and retained, not yet analyzed.
    #[serde(rename = "L")]
    Long,
}

impl PacketType {
    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'S' => Some(PacketType::Short),
            b'L' => Some(PacketType::Long),
            _ => None,
        }
    }

    pub(crate) fn as_byte(self) -> u8 {
        match self {
            PacketType::Short => b'S',
            PacketType::Long => b'L',
        }
    }
}

/// One probed packet: four path timestamps plus identity.
///
/// The four intra-day timestamps are nanoseconds since local start of day,
/// in `[0, NANOS_PER_DAY)`. An observation is identified by the full
/// 7-tuple of its fields; batches merge observations as sets on that key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Observation {
    /// Seconds since the Unix epoch of the packet's transmission.
    pub day_timestamp: i64,
    /// Short or long probe.
    pub packet_type: PacketType,
    /// Probe size in bytes as sent to the server.
    pub packet_size: i32,
    /// Client clock, packet sent to the server.
    pub initial_timestamp: i64,
    /// Server clock, packet received.
    pub reception_timestamp: i64,
    /// Server clock, packet echoed back.
    pub sent_timestamp: i64,
    /// Client clock, packet received back.
    pub final_timestamp: i64,
}

impl Observation {
    /// Round-trip time as seen by the client clock.
    pub fn rtt(&self) -> i64 {
        self.final_timestamp - self.initial_timestamp
    }
}

/// Per-direction Hurst figures from the two independent estimators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HurstEstimate {
    /// Rescaled-Range (R/S) estimate.
    pub rs: f64,
    /// Wavelet (Daubechies-2) estimate.
    pub wavelet: f64,
}

impl HurstEstimate {
    /// Combined value used by the congestion criterion.
    pub fn effective(&self) -> f64 {
        (self.rs + self.wavelet) / 2.0
    }
}

/// Usage, quality and self-similarity for one direction of the link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionReport {
    /// Fraction of meaningful observations above the modal-bin threshold.
    pub usage: f64,
    /// Fraction of analyzed minutes not classified as congested.
    pub quality: f64,
    /// Estimated Hurst exponents.
    pub hurst: HurstEstimate,
}

/// Condensed result of analyzing one observation batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// `day_timestamp` of the most recent meaningful observation.
    pub timestamp: i64,
    /// Client-to-server metrics.
    pub upstream: DirectionReport,
    /// Server-to-client metrics.
    pub downstream: DirectionReport,
}
