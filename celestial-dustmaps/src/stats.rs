//! Reductions over per-sample reddening values.
//!
//! A NaN anywhere in the input makes the result NaN, so a partially covered
//! sightline never reports a misleading summary.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Percentile with linear interpolation between closest ranks.
///
/// `p` is in [0, 100]; rank `p / 100 * (n - 1)` is interpolated between
/// its neighbouring order statistics.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = libm::floor(rank) as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[1.0, 2.0, 3.0, 6.0]), 3.0);
        assert!(mean(&[]).is_nan());
        assert!(mean(&[1.0, f64::NAN]).is_nan());
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[0.7]), 0.7);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile(&values, 0.0), 10.0);
        assert_eq!(percentile(&values, 100.0), 50.0);
        assert_eq!(percentile(&values, 25.0), 20.0);
        assert!((percentile(&values, 90.0) - 46.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_nan_propagates() {
        assert!(percentile(&[1.0, f64::NAN, 3.0], 50.0).is_nan());
        assert!(percentile(&[], 50.0).is_nan());
    }
}
