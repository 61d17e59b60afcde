use thiserror::Error;

/// Weight of the fastest bin's midpoint in the threshold policy.
const ALPHA: f64 = 0.5;

#[derive(Debug, Error)]
pub enum HistogramError {
    #[error("not enough datapoints for a histogram: got {count}, need at least 4")]
    TooFewDatapoints { count: usize },
    #[error("zero-width histogram bin at index {index}")]
    ZeroWidthBin { index: usize },
}

/// One equi-populated bin over the sorted projection values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

impl Bin {
    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    pub fn mid(&self) -> f64 {
        self.lo + self.width() / 2.0
    }
}

/// Modal value and congestion-decision threshold of a projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Characterization {
    pub mode: f64,
    pub threshold: f64,
}

/// Build the equi-populated histogram: `⌊√n⌋` bins of `⌊n/B⌋` sorted
/// values each, remainder appended to the last bin.
pub fn build_bins(values: &[f64]) -> Result<Vec<Bin>, HistogramError> {
    let n = values.len();
    if n < 4 {
        return Err(HistogramError::TooFewDatapoints { count: n });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let bin_count = (n as f64).sqrt().floor() as usize;
    let per_bin = n / bin_count;
    let mut bins = Vec::with_capacity(bin_count);
    for index in 0..bin_count {
        let start = index * per_bin;
        let end = if index == bin_count - 1 {
            n
        } else {
            start + per_bin
        };
        let slice = &sorted[start..end];
        bins.push(Bin {
            lo: slice[0],
            hi: slice[slice.len() - 1],
            count: slice.len(),
        });
    }
    Ok(bins)
}

/// Probability density per bin: `count / (n · width)`.
pub fn bin_probabilities(bins: &[Bin]) -> Result<Vec<f64>, HistogramError> {
    let total: usize = bins.iter().map(|bin| bin.count).sum();
    bins.iter()
        .enumerate()
        .map(|(index, bin)| {
            let width = bin.width();
            if width <= 0.0 {
                return Err(HistogramError::ZeroWidthBin { index });
            }
            Ok(bin.count as f64 / (total as f64 * width))
        })
        .collect()
}

/// Derive the modal value and threshold of a projection's distribution.
///
/// The mode is the midpoint of the highest-density bin. When the fastest
/// bin is also the most probable the threshold falls back to the second
/// bin's midpoint; otherwise it is `mode + ALPHA · mid(bin[0])`.
pub fn characterize(values: &[f64]) -> Result<Characterization, HistogramError> {
    let bins = build_bins(values)?;
    let probabilities = bin_probabilities(&bins)?;

    // First index of the maximum density; ties resolve to the fastest bin.
    let mut mode_index = 0;
    for (index, probability) in probabilities.iter().enumerate() {
        if *probability > probabilities[mode_index] {
            mode_index = index;
        }
    }
    let mode = bins[mode_index].mid();

    let threshold = if probabilities[0] == probabilities[mode_index] {
        bins[1].mid()
    } else {
        mode + ALPHA * bins[0].mid()
    };
    Ok(Characterization { mode, threshold })
}
