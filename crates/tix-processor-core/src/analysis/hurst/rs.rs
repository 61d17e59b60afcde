//! Rescaled-Range (R/S) Hurst estimator.
//!
//! For a grid of logarithmically spaced window lengths, the range of the
//! mean-adjusted cumulative sum is divided by the window's standard
//! deviation; the Hurst exponent is the slope of log10(R/S) against
//! log10(window length) over the calibrated lag band.

use super::HurstError;
use crate::analysis::regression::least_squares;

const NBLK: usize = 5;
const NLAG: usize = 50;
const POWER1: f64 = 0.7;
const POWER2: f64 = 2.5;

pub fn estimate(series: &[f64]) -> Result<f64, HurstError> {
    let n = series.len();
    if n < NBLK {
        return Err(HurstError::SeriesTooShort {
            length: n,
            needed: NBLK,
        });
    }

    let mut cumulative = vec![0.0; n];
    let mut cumulative_sq = vec![0.0; n];
    cumulative[0] = series[0];
    cumulative_sq[0] = series[0] * series[0];
    for i in 1..n {
        cumulative[i] = cumulative[i - 1] + series[i];
        cumulative_sq[i] = cumulative_sq[i - 1] + series[i] * series[i];
    }

    let blksize = n / NBLK;
    let increment = (n as f64).log10() / NLAG as f64;

    let mut window_lengths = [0usize; NLAG];
    let mut ranges = vec![0.0; NBLK * NLAG];
    let mut rescaled = vec![0.0; NBLK * NLAG];

    for k in 0..NLAG {
        let exact = 10f64.powf(increment * (k + 1) as f64);
        // The final lag spans the whole series; floor keeps it in range.
        let d = if k == NLAG - 1 {
            exact.floor() as usize
        } else {
            exact.ceil() as usize
        }
        .clamp(1, n);
        window_lengths[k] = d;

        let values_for_lag = if d > blksize {
            // A correction of NBLK would leave no window; clamp it down,
            // matching the reference implementation.
            let correction =
                (((d - blksize) as f64 / blksize as f64).ceil() as usize).min(NBLK - 1);
            NBLK - correction
        } else {
            NBLK
        };

        for i in 0..values_for_lag {
            let start = blksize * i;
            let (sum_base, sq_base) = if i == 0 {
                (0.0, 0.0)
            } else {
                (cumulative[start - 1], cumulative_sq[start - 1])
            };
            let ave = (cumulative[start + d - 1] - sum_base) / d as f64;

            let mut max = 0.0f64;
            let mut min = 0.0f64;
            for j in 0..d {
                let temp = cumulative[start + j] - sum_base - (j + 1) as f64 * ave;
                if temp > max {
                    max = temp;
                } else if temp < min {
                    min = temp;
                }
            }
            let range = max - min;
            ranges[k * NBLK + i] = range;

            let second_moment = (cumulative_sq[start + d - 1] - sq_base) / d as f64;
            rescaled[k * NBLK + i] = if second_moment > ave * ave {
                range / (second_moment - ave * ave).sqrt()
            } else {
                range
            };
        }
    }

    // Fit over the calibrated lag band, discarding zero ranges.
    let mut log_lengths = Vec::new();
    let mut log_rescaled = Vec::new();
    for k in 0..NLAG {
        let position = k as f64 * increment;
        if position < POWER1 || position > POWER2 {
            continue;
        }
        let log_length = (window_lengths[k] as f64).log10();
        for i in 0..NBLK {
            if ranges[k * NBLK + i] > 0.0 {
                log_lengths.push(log_length);
                log_rescaled.push(rescaled[k * NBLK + i].log10());
            }
        }
    }
    if log_lengths.is_empty() {
        return Err(HurstError::ConstantSeries);
    }

    let (slope, _) = least_squares(&log_lengths, &log_rescaled);
    Ok(slope)
}
