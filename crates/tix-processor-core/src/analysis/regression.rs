/// Ordinary-least-squares line fit, centered for numerical stability.
///
/// Returns `(slope, intercept)`. Callers guarantee at least two distinct
/// abscissae; a degenerate input yields a zero slope through the mean.
pub fn least_squares(xs: &[f64], ys: &[f64]) -> (f64, f64) {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len() as f64;
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = ys.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        covariance += (x - x_mean) * (y - y_mean);
        variance += (x - x_mean) * (x - x_mean);
    }

    if variance == 0.0 {
        return (0.0, y_mean);
    }
    let slope = covariance / variance;
    (slope, y_mean - slope * x_mean)
}
