use std::collections::BTreeMap;

use thiserror::Error;

use crate::Observation;

use super::regression::least_squares;

/// Fixed probe serialization delays, nanoseconds.
pub const UPSTREAM_SERIALIZATION: i64 = 15_000;
pub const DOWNSTREAM_SERIALIZATION: i64 = 15_000;

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("need at least 2 minute buckets for the clock regression, got {count}")]
    InsufficientMinutes { count: usize },
}

/// Client/server clock offset as a linear function of absolute time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhiFunction {
    pub slope: f64,
    pub intercept: f64,
}

impl PhiFunction {
    /// Offset estimate at `day_timestamp`, nanoseconds.
    pub fn eval(&self, day_timestamp: i64) -> f64 {
        self.slope * day_timestamp as f64 + self.intercept
    }
}

/// Clock-offset estimates for one observation.
///
/// Bound to observations by position: the fixer returns one estimate per
/// input observation, keeping `Observation` itself immutable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhiEstimate {
    pub upstream_phi: f64,
    pub downstream_phi: f64,
    pub estimated_phi: f64,
}

/// Per-observation phi estimates from the modal RTT `tau`.
pub fn phi_estimates(observations: &[Observation], tau: f64) -> Vec<PhiEstimate> {
    observations
        .iter()
        .map(|observation| {
            let upstream_phi = (observation.reception_timestamp
                - observation.initial_timestamp
                - UPSTREAM_SERIALIZATION) as f64
                - tau;
            let downstream_phi = (observation.sent_timestamp - observation.final_timestamp
                + DOWNSTREAM_SERIALIZATION) as f64
                + tau;
            PhiEstimate {
                upstream_phi,
                downstream_phi,
                estimated_phi: (upstream_phi + downstream_phi) / 2.0,
            }
        })
        .collect()
}

/// Fit `φ(t)` by least squares over per-minute medians of the estimated
/// phi values.
pub fn fit_phi_function(
    observations: &[Observation],
    tau: f64,
) -> Result<PhiFunction, ClockError> {
    let estimates = phi_estimates(observations, tau);

    let mut buckets: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for (observation, estimate) in observations.iter().zip(&estimates) {
        buckets
            .entry(minute_bucket(observation.day_timestamp))
            .or_default()
            .push(estimate.estimated_phi);
    }
    if buckets.len() < 2 {
        return Err(ClockError::InsufficientMinutes {
            count: buckets.len(),
        });
    }

    let mut minutes = Vec::with_capacity(buckets.len());
    let mut medians = Vec::with_capacity(buckets.len());
    for (minute, mut phis) in buckets {
        minutes.push(minute as f64);
        medians.push(median(&mut phis));
    }

    let (slope, intercept) = least_squares(&minutes, &medians);
    Ok(PhiFunction { slope, intercept })
}

/// `day_timestamp` truncated to its UTC minute.
pub(crate) fn minute_bucket(day_timestamp: i64) -> i64 {
    day_timestamp - day_timestamp.rem_euclid(60)
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ClockError, DOWNSTREAM_SERIALIZATION, UPSTREAM_SERIALIZATION, fit_phi_function, median,
        minute_bucket, phi_estimates,
    };
    use crate::{Observation, PacketType};

    fn observation(day_timestamp: i64, reception: i64, sent: i64) -> Observation {
        Observation {
            day_timestamp,
            packet_type: PacketType::Short,
            packet_size: 64,
            initial_timestamp: 1_000_000,
            reception_timestamp: reception,
            sent_timestamp: sent,
            final_timestamp: 3_000_000,
        }
    }

    #[test]
    fn phi_estimates_match_definition() {
        let tau = 500_000.0;
        let observations = [observation(1_700_000_000, 1_400_000, 2_600_000)];
        let estimates = phi_estimates(&observations, tau);
        let expected_upstream =
            (1_400_000 - 1_000_000 - UPSTREAM_SERIALIZATION) as f64 - tau;
        let expected_downstream =
            (2_600_000 - 3_000_000 + DOWNSTREAM_SERIALIZATION) as f64 + tau;
        assert_eq!(estimates[0].upstream_phi, expected_upstream);
        assert_eq!(estimates[0].downstream_phi, expected_downstream);
        assert_eq!(
            estimates[0].estimated_phi,
            (expected_upstream + expected_downstream) / 2.0
        );
    }

    #[test]
    fn regression_recovers_drift_across_minutes() {
        // Clock offset grows by 60_000 ns per minute bucket.
        let base = 1_700_000_040;
        let mut observations = Vec::new();
        for minute in 0..5i64 {
            for second in 0..3i64 {
                let ts = base + minute * 60 + second;
                let offset = minute * 60_000;
                observations.push(observation(
                    ts,
                    1_400_000 + offset,
                    2_600_000 + offset,
                ));
            }
        }
        let phi = fit_phi_function(&observations, 0.0).unwrap();
        assert!((phi.slope - 1_000.0).abs() < 1e-6, "slope {}", phi.slope);
    }

    #[test]
    fn single_minute_is_insufficient() {
        let observations = [
            observation(1_700_000_000, 1_400_000, 2_600_000),
            observation(1_700_000_001, 1_400_000, 2_600_000),
        ];
        let err = fit_phi_function(&observations, 0.0).unwrap_err();
        assert!(matches!(err, ClockError::InsufficientMinutes { count: 1 }));
    }

    #[test]
    fn minute_bucket_truncates_utc() {
        assert_eq!(minute_bucket(1_700_000_059), 1_700_000_040);
        assert_eq!(minute_bucket(1_700_000_040), 1_700_000_040);
    }

    #[test]
    fn median_handles_even_and_odd() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), 2.5);
    }
}
