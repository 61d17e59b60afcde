//! Self-similarity (Hurst exponent) estimation.
//!
//! Two independent estimators run over the same power-of-two-truncated
//! series: the classic Rescaled-Range statistic and a Daubechies-2 wavelet
//! log-scale regression. Their disagreement is expected; the congestion
//! criterion uses the arithmetic mean of the two.

pub mod rs;
pub mod wavelet;

use thiserror::Error;

use crate::HurstEstimate;

#[derive(Debug, Error)]
pub enum HurstError {
    #[error("constant series: no usable statistic for the Hurst fit")]
    ConstantSeries,
    #[error("series too short for the Hurst estimators: got {length}, need {needed}")]
    SeriesTooShort { length: usize, needed: usize },
}

/// Run both estimators over one directional time series.
pub fn estimate(series: &[f64]) -> Result<HurstEstimate, HurstError> {
    Ok(HurstEstimate {
        rs: rs::estimate(series)?,
        wavelet: wavelet::estimate(series)?,
    })
}

/// Last `2^⌊log₂ n⌋` items: the window both estimators operate on.
pub fn power_of_two_suffix<T>(items: &[T]) -> &[T] {
    if items.is_empty() {
        return items;
    }
    let truncated = 1usize << items.len().ilog2();
    &items[items.len() - truncated..]
}
