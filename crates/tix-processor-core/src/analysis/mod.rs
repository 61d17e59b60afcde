//! Batch analysis pipeline.
//!
//! `analyze` condenses one IP's observation batch into usage, quality and
//! Hurst figures per direction: modal RTT, clock-skew regression,
//! meaningful-window filtering, per-direction histograms and the two Hurst
//! estimators, in that order. Every stage failure surfaces as one
//! [`AnalysisError`] so the worker can map it to its ack/reject policy.

use thiserror::Error;

use crate::{AnalysisResult, DirectionReport, Observation, PacketType};

pub mod clock;
pub mod histogram;
pub mod hurst;
pub mod regression;
pub mod usage;

pub use clock::{PhiEstimate, PhiFunction, fit_phi_function, phi_estimates};

use clock::ClockError;
use histogram::{HistogramError, characterize};
use hurst::{HurstError, power_of_two_suffix};
use usage::meaningful_observations;

/// Largest tolerated hole between consecutive observations, seconds.
/// A bigger hole means the probe lost connectivity and the minutes in
/// between can never be measured.
pub const OBSERVATION_GAP_LIMIT_SECONDS: i64 = 180;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no short-packet observations in the batch")]
    NoShortObservations,
    #[error("degenerate histogram: {0}")]
    DegenerateHistogram(#[from] HistogramError),
    #[error("clock regression failed: {0}")]
    Clock(#[from] ClockError),
    #[error(
        "observation span of {got_seconds}s does not exceed the {window_seconds}s meaningful window"
    )]
    InsufficientSpan {
        got_seconds: i64,
        window_seconds: i64,
    },
    #[error("observation gap of {gap_seconds}s exceeds the {limit_seconds}s limit")]
    ExcessiveGap {
        gap_seconds: i64,
        limit_seconds: i64,
    },
    #[error("hurst estimation failed: {0}")]
    Hurst(#[from] HurstError),
    #[error("no minute reached {minimum} observations for the quality score")]
    NoQualifyingMinutes { minimum: usize },
}

/// Link direction; selects the one-way time projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upstream,
    Downstream,
}

impl Direction {
    /// One-way time of an observation under the clock correction `phi`.
    pub fn one_way_time(self, observation: &Observation, phi: &PhiFunction) -> f64 {
        match self {
            Direction::Upstream => {
                observation.reception_timestamp as f64
                    - phi.eval(observation.day_timestamp)
                    - observation.initial_timestamp as f64
            }
            Direction::Downstream => {
                observation.final_timestamp as f64 - observation.sent_timestamp as f64
                    + phi.eval(observation.day_timestamp)
            }
        }
    }
}

/// Analyze one batch of observations belonging to a single source IP.
///
/// Long packets are filtered out up front; the remaining pipeline is a
/// pure function of the short observations and the fixed constants.
pub fn analyze(observations: &[Observation]) -> Result<AnalysisResult, AnalysisError> {
    let mut short: Vec<Observation> = observations
        .iter()
        .filter(|observation| observation.packet_type == PacketType::Short)
        .copied()
        .collect();
    if short.is_empty() {
        return Err(AnalysisError::NoShortObservations);
    }
    short.sort_by_key(|observation| observation.day_timestamp);
    check_observation_gap(&short)?;

    let rtt_values: Vec<f64> = short
        .iter()
        .map(|observation| observation.rtt() as f64)
        .collect();
    let tau = characterize(&rtt_values)?.mode;
    let phi = fit_phi_function(&short, tau)?;

    let meaningful = meaningful_observations(&short)?;

    let upstream = direction_report(&meaningful, &phi, Direction::Upstream)?;
    let downstream = direction_report(&meaningful, &phi, Direction::Downstream)?;

    let timestamp = meaningful
        .last()
        .map(|observation| observation.day_timestamp)
        .ok_or(AnalysisError::NoShortObservations)?;

    Ok(AnalysisResult {
        timestamp,
        upstream,
        downstream,
    })
}

fn direction_report(
    meaningful: &[Observation],
    phi: &PhiFunction,
    direction: Direction,
) -> Result<DirectionReport, AnalysisError> {
    let usage_value = usage::usage(meaningful, phi, direction)?;

    let capped = power_of_two_suffix(meaningful);
    let series: Vec<f64> = capped
        .iter()
        .map(|observation| direction.one_way_time(observation, phi))
        .collect();
    let hurst = hurst::estimate(&series)?;

    let quality_value = usage::quality(meaningful, phi, direction, hurst.effective())?;

    Ok(DirectionReport {
        usage: usage_value,
        quality: quality_value,
        hurst,
    })
}

fn check_observation_gap(sorted: &[Observation]) -> Result<(), AnalysisError> {
    let mut largest = 0i64;
    for pair in sorted.windows(2) {
        largest = largest.max(pair[1].day_timestamp - pair[0].day_timestamp);
    }
    if largest > OBSERVATION_GAP_LIMIT_SECONDS {
        return Err(AnalysisError::ExcessiveGap {
            gap_seconds: largest,
            limit_seconds: OBSERVATION_GAP_LIMIT_SECONDS,
        });
    }
    Ok(())
}
