//! Wavelet Hurst estimator.
//!
//! A periodized Daubechies-2 discrete wavelet transform decomposes the
//! power-of-two prefix of the series; per-octave log2 averages of the
//! squared detail coefficients are regressed in log10 space over the
//! configured octave band. The reported value is the slope of the
//! `log10(Y·X)/2` fit.

use super::HurstError;
use crate::analysis::regression::least_squares;

/// Wavelet order N; db2 has 2N = 4 filter taps.
const ORDER: usize = 2;
/// Beginning and ending octave of the regression band.
const OCTAVE: (usize, usize) = (2, 8);

/// Daubechies-2 orthonormal decomposition filters.
const DEC_LO: [f64; 4] = [
    0.482_962_913_144_534_1,
    0.836_516_303_737_807_9,
    0.224_143_868_042_013_4,
    -0.129_409_522_551_260_4,
];
const DEC_HI: [f64; 4] = [
    -0.129_409_522_551_260_4,
    -0.224_143_868_042_013_4,
    0.836_516_303_737_807_9,
    -0.482_962_913_144_534_1,
];

pub fn estimate(series: &[f64]) -> Result<f64, HurstError> {
    let n = series.len();
    if n < 2 {
        return Err(HurstError::SeriesTooShort {
            length: n,
            needed: 128,
        });
    }
    let length = 1usize << n.ilog2();
    let max_level = length.ilog2() as usize;

    let noctave = max_level - 1;
    // Boundary effect of the 2N-tap filter: skip the coarsest octaves.
    let bound = (2.0 * ORDER as f64).log2().ceil() as usize;
    if noctave <= bound {
        return Err(HurstError::SeriesTooShort {
            length: n,
            needed: 128,
        });
    }
    let usable = noctave - bound;

    let details = full_decomposition(&series[..length]);

    // statistic[j]: log2 mean squared detail at octave j, finest first,
    // with ORDER coefficients dropped from each end.
    let mut statistic = Vec::with_capacity(usable);
    for detail in details.iter().take(usable) {
        let inner = &detail[ORDER..detail.len() - ORDER];
        let mean_square =
            inner.iter().map(|coefficient| coefficient * coefficient).sum::<f64>()
                / inner.len() as f64;
        if mean_square <= 0.0 {
            return Err(HurstError::ConstantSeries);
        }
        statistic.push(mean_square.log2());
    }

    let (octave_low, mut octave_high) = OCTAVE;
    if octave_high > usable {
        octave_high = usable;
    }
    if octave_high < octave_low + 2 {
        return Err(HurstError::SeriesTooShort {
            length: n,
            needed: 128,
        });
    }

    // X = 10^j, Y = 10^statistic[j]; fit log10(Y*X)/2 against log10(X).
    let xs: Vec<f64> = (octave_low..octave_high).map(|j| j as f64).collect();
    let ys: Vec<f64> = (octave_low..octave_high)
        .map(|j| (statistic[j] + j as f64) / 2.0)
        .collect();
    let (fit_h, _) = least_squares(&xs, &ys);
    Ok(fit_h)
}

/// Periodized DWT down to a single approximation coefficient, returning
/// detail coefficients per level, finest first.
fn full_decomposition(signal: &[f64]) -> Vec<Vec<f64>> {
    let mut approximation = signal.to_vec();
    let mut details = Vec::new();
    while approximation.len() >= 2 {
        let (next, detail) = decompose_step(&approximation);
        details.push(detail);
        approximation = next;
    }
    details
}

fn decompose_step(signal: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = signal.len();
    let half = n / 2;
    let mut approximation = Vec::with_capacity(half);
    let mut detail = Vec::with_capacity(half);
    for i in 0..half {
        let mut low = 0.0;
        let mut high = 0.0;
        for k in 0..DEC_LO.len() {
            let sample = signal[(2 * i + k) % n];
            low += DEC_LO[k] * sample;
            high += DEC_HI[k] * sample;
        }
        approximation.push(low);
        detail.push(high);
    }
    (approximation, detail)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::{decompose_step, estimate, full_decomposition};
    use crate::analysis::hurst::HurstError;
    use crate::analysis::hurst::testing::{fractional_gaussian_noise, standard_normal};

    #[test]
    fn decomposition_step_preserves_energy() {
        let mut rng = StdRng::seed_from_u64(3);
        let signal: Vec<f64> = (0..256).map(|_| standard_normal(&mut rng)).collect();
        let (approximation, detail) = decompose_step(&signal);
        let energy_in: f64 = signal.iter().map(|v| v * v).sum();
        let energy_out: f64 = approximation
            .iter()
            .chain(&detail)
            .map(|v| v * v)
            .sum();
        assert!((energy_in - energy_out).abs() < 1e-9 * energy_in);
    }

    #[test]
    fn decomposition_halves_each_level() {
        let signal = vec![1.0; 64];
        let details = full_decomposition(&signal);
        assert_eq!(details.len(), 6);
        assert_eq!(details[0].len(), 32);
        assert_eq!(details[5].len(), 1);
    }

    #[test]
    fn constant_series_is_rejected() {
        let series = vec![3.25; 1024];
        let err = estimate(&series).unwrap_err();
        assert!(matches!(err, HurstError::ConstantSeries));
    }

    #[test]
    fn short_series_is_rejected() {
        let series: Vec<f64> = (0..64).map(|v| v as f64).collect();
        let err = estimate(&series).unwrap_err();
        assert!(matches!(err, HurstError::SeriesTooShort { .. }));
    }

    #[test]
    fn white_noise_estimates_near_one_half() {
        let mut rng = StdRng::seed_from_u64(5);
        let series: Vec<f64> = (0..8192).map(|_| standard_normal(&mut rng)).collect();
        let hurst = estimate(&series).unwrap();
        assert!(hurst.is_finite());
        assert!((hurst - 0.5).abs() <= 0.2, "H estimate {hurst}");
    }

    #[test]
    fn persistent_noise_estimates_high() {
        let mut rng = StdRng::seed_from_u64(13);
        let series = fractional_gaussian_noise(&mut rng, 0.8, 13);
        let hurst = estimate(&series).unwrap();
        assert!(hurst.is_finite());
        assert!((hurst - 0.8).abs() <= 0.2, "H estimate {hurst}");
    }
}
