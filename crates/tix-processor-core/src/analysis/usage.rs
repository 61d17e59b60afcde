use std::collections::BTreeMap;

use crate::Observation;

use super::clock::{PhiFunction, minute_bucket};
use super::histogram::characterize;
use super::{AnalysisError, Direction};

/// Only observations within this window of the newest one are analyzed.
pub const MEANINGFUL_WINDOW_SECONDS: i64 = 10 * 60;

/// A minute is congested when usage sits below this while the effective
/// Hurst exponent sits above [`HURST_CONGESTION_THRESHOLD`].
pub const CONGESTION_THRESHOLD: f64 = 0.5;
pub const HURST_CONGESTION_THRESHOLD: f64 = 0.7;

/// Minutes with fewer observations than this say nothing about congestion.
pub const MIN_OBSERVATIONS_PER_MINUTE: usize = 30;

/// Restrict a time-ordered batch to the last ten minutes.
///
/// The batch's full span must strictly exceed the window; a span of
/// exactly ten minutes is insufficient.
pub fn meaningful_observations(
    observations: &[Observation],
) -> Result<Vec<Observation>, AnalysisError> {
    let (Some(first), Some(last)) = (observations.first(), observations.last()) else {
        return Err(AnalysisError::NoShortObservations);
    };
    let span_seconds = last.day_timestamp - first.day_timestamp;
    if span_seconds <= MEANINGFUL_WINDOW_SECONDS {
        return Err(AnalysisError::InsufficientSpan {
            got_seconds: span_seconds,
            window_seconds: MEANINGFUL_WINDOW_SECONDS,
        });
    }

    let threshold = last.day_timestamp - MEANINGFUL_WINDOW_SECONDS;
    Ok(observations
        .iter()
        .filter(|observation| observation.day_timestamp > threshold)
        .copied()
        .collect())
}

/// Fraction of observations whose one-way time exceeds the direction's
/// modal-bin threshold.
pub fn usage(
    observations: &[Observation],
    phi: &PhiFunction,
    direction: Direction,
) -> Result<f64, AnalysisError> {
    let values: Vec<f64> = observations
        .iter()
        .map(|observation| direction.one_way_time(observation, phi))
        .collect();
    let characterization = characterize(&values)?;
    let over_threshold = values
        .iter()
        .filter(|&&value| value > characterization.threshold)
        .count();
    Ok(over_threshold as f64 / values.len() as f64)
}

/// Fraction of analyzed minutes not classified as congested.
///
/// Minutes with fewer than [`MIN_OBSERVATIONS_PER_MINUTE`] observations are
/// dropped; each remaining minute gets a fresh usage figure against its own
/// histogram.
pub fn quality(
    observations: &[Observation],
    phi: &PhiFunction,
    direction: Direction,
    effective_hurst: f64,
) -> Result<f64, AnalysisError> {
    let mut minutes: BTreeMap<i64, Vec<Observation>> = BTreeMap::new();
    for observation in observations {
        minutes
            .entry(minute_bucket(observation.day_timestamp))
            .or_default()
            .push(*observation);
    }
    minutes.retain(|_, bucket| bucket.len() >= MIN_OBSERVATIONS_PER_MINUTE);
    if minutes.is_empty() {
        return Err(AnalysisError::NoQualifyingMinutes {
            minimum: MIN_OBSERVATIONS_PER_MINUTE,
        });
    }

    let mut congested = 0usize;
    for bucket in minutes.values() {
        let minute_usage = usage(bucket, phi, direction)?;
        if minute_usage < CONGESTION_THRESHOLD && effective_hurst > HURST_CONGESTION_THRESHOLD {
            congested += 1;
        }
    }
    Ok((minutes.len() - congested) as f64 / minutes.len() as f64)
}
