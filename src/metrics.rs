/// Safe numeric primitives and normalization helpers shared across the
/// fingerprinting and target-generation modules.
///
/// Every fingerprint dimension and intermediate ratio in this crate routes
/// through these helpers instead of raw division/log/pow, so that silence,
/// clipping, and degenerate inputs never produce NaN/Inf in a published
/// fingerprint.

/// Fixed constants describing the fingerprint vector and the safe ranges
/// used to normalize individual dimensions.
pub struct FingerprintConstants;

impl FingerprintConstants {
    pub const FINGERPRINT_DIMENSIONS: usize = 25;
    pub const EPSILON: f64 = 1e-10;
    pub const SPECTRAL_CENTROID_MAX: f64 = 8000.0;
    pub const SPECTRAL_ROLLOFF_MAX: f64 = 10000.0;
    pub const CHROMA_ENERGY_MAX: f64 = 0.4;
    pub const ONSET_DENSITY_MAX: f64 = 10.0;
    pub const CV_HARMONIC_SCALE: f64 = 10.0;
    pub const CV_DEFAULT_SCALE: f64 = 1.0;

    /// A fingerprint vector is valid if it has the expected length and every
    /// entry is finite. Used as the last gate before a fingerprint is handed
    /// back to a caller.
    pub fn validate_vector(v: &[f64]) -> bool {
        v.len() == Self::FINGERPRINT_DIMENSIONS && v.iter().all(|x| x.is_finite())
    }
}

/// Division, log, and power operations that never propagate NaN/Inf.
pub struct SafeOperations;

impl SafeOperations {
    /// `numerator / denominator`, substituting `fallback` when the
    /// denominator's magnitude is at or below epsilon.
    pub fn safe_divide(numerator: f64, denominator: f64, fallback: f64) -> f64 {
        if denominator.abs() <= FingerprintConstants::EPSILON {
            fallback
        } else {
            numerator / denominator
        }
    }

    /// `value.ln()`, with the argument floored to epsilon, falling back when
    /// the input is non-positive.
    pub fn safe_log(value: f64, fallback: f64) -> f64 {
        if value <= 0.0 {
            fallback
        } else {
            value.max(FingerprintConstants::EPSILON).ln()
        }
    }

    /// `base.powf(exponent)`, with the base floored to epsilon when
    /// non-positive, falling back if the result is non-finite.
    pub fn safe_power(base: f64, exponent: f64, fallback: f64) -> f64 {
        let safe_base = if base <= 0.0 {
            FingerprintConstants::EPSILON
        } else {
            base
        };
        let result = safe_base.powf(exponent);
        if result.is_finite() {
            result
        } else {
            fallback
        }
    }
}

/// Normalization and scaling helpers used to turn raw acoustic measurements
/// into bounded, comparable fingerprint dimensions.
pub struct MetricUtils;

impl MetricUtils {
    /// Maps a coefficient of variation to a stability score in `[0, 1]`:
    /// `1 / (1 + cv * scale)`. CV=0 (perfectly stable) maps to 1.0; larger CV
    /// maps toward 0.0. A non-finite or degenerate CV (computed from a
    /// near-zero mean) maps to the neutral value 0.5.
    pub fn stability_from_cv(cv: f64, scale: f64) -> f64 {
        if !cv.is_finite() {
            return 0.5;
        }
        (1.0 / (1.0 + cv.abs() * scale)).clamp(0.0, 1.0)
    }

    /// Normalizes `value` against `max_val`, optionally clipping to `[0, 1]`.
    /// Falls back to the neutral value 0.5 when `max_val` is at or below
    /// epsilon.
    pub fn normalize_to_range(value: f64, max_val: f64, clip: bool) -> f64 {
        if max_val.abs() <= FingerprintConstants::EPSILON {
            return 0.5;
        }
        let normalized = value / max_val;
        if clip {
            normalized.clamp(0.0, 1.0)
        } else {
            normalized
        }
    }

    /// Clips `value` into `[min_val, max_val]`, swapping the bounds first if
    /// they were passed in reverse order.
    pub fn clip_to_range(value: f64, min_val: f64, max_val: f64) -> f64 {
        let (lo, hi) = if min_val <= max_val {
            (min_val, max_val)
        } else {
            (max_val, min_val)
        };
        value.clamp(lo, hi)
    }

    /// Linearly rescales `value` from `[src_min, src_max]` into
    /// `[dst_min, dst_max]`. Falls back to the destination midpoint when the
    /// source range is degenerate.
    pub fn scale_to_range(
        value: f64,
        src_min: f64,
        src_max: f64,
        dst_min: f64,
        dst_max: f64,
    ) -> f64 {
        let src_span = src_max - src_min;
        if src_span.abs() <= FingerprintConstants::EPSILON {
            return (dst_min + dst_max) / 2.0;
        }
        let t = (value - src_min) / src_span;
        dst_min + t * (dst_max - dst_min)
    }

    /// z-score normalization: `(x - mean) / std`. Returns all zeros when
    /// `std` is (near) zero, since every sample is then identical to the
    /// mean.
    pub fn normalize_with_zscore(values: &[f64]) -> Vec<f64> {
        if values.is_empty() {
            return Vec::new();
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        let std = variance.sqrt();
        if std <= FingerprintConstants::EPSILON {
            return vec![0.0; values.len()];
        }
        values.iter().map(|v| (v - mean) / std).collect()
    }

    /// Median absolute deviation scaling: centers on the median and scales
    /// by `1.4826 * MAD` (the constant that makes MAD a consistent estimator
    /// of the standard deviation for normally distributed data). Falls back
    /// to zeros when MAD is degenerate.
    pub fn mad_scaling(values: &[f64]) -> Vec<f64> {
        if values.is_empty() {
            return Vec::new();
        }
        let median = percentile(values, 50.0);
        let abs_devs: Vec<f64> = values.iter().map(|v| (v - median).abs()).collect();
        let mad = percentile(&abs_devs, 50.0);
        if mad <= FingerprintConstants::EPSILON {
            return vec![0.0; values.len()];
        }
        let scale = 1.4826 * mad;
        values.iter().map(|v| (v - median) / scale).collect()
    }

    /// Scales `values` to `[0, 1]` using the given lower/upper percentiles
    /// (Winsorized range) instead of the raw min/max, so a handful of
    /// outliers can't compress the rest of the distribution into a sliver.
    pub fn percentile_based_normalization(values: &[f64], low_pct: f64, high_pct: f64) -> Vec<f64> {
        if values.is_empty() {
            return Vec::new();
        }
        let lo = percentile(values, low_pct);
        let hi = percentile(values, high_pct);
        let span = hi - lo;
        if span.abs() <= FingerprintConstants::EPSILON {
            return vec![0.5; values.len()];
        }
        values
            .iter()
            .map(|v| ((v - lo) / span).clamp(0.0, 1.0))
            .collect()
    }

    /// Robust scaling: center on the median, scale by the interquartile
    /// range (P75 - P25).
    pub fn robust_scale(values: &[f64]) -> Vec<f64> {
        if values.is_empty() {
            return Vec::new();
        }
        let median = percentile(values, 50.0);
        let iqr = percentile(values, 75.0) - percentile(values, 25.0);
        if iqr.abs() <= FingerprintConstants::EPSILON {
            return vec![0.0; values.len()];
        }
        values.iter().map(|v| (v - median) / iqr).collect()
    }

    /// Robust scaling after clamping each value into the
    /// `[low_pct, high_pct]` percentile range (winsorization), which limits
    /// the influence of extreme outliers on the center/scale estimate itself.
    pub fn robust_scale_with_winsorization(
        values: &[f64],
        low_pct: f64,
        high_pct: f64,
    ) -> Vec<f64> {
        if values.is_empty() {
            return Vec::new();
        }
        let lo = percentile(values, low_pct);
        let hi = percentile(values, high_pct);
        let winsorized: Vec<f64> = values.iter().map(|v| v.clamp(lo, hi)).collect();
        Self::robust_scale(&winsorized)
    }

    /// Maps each value to its rank within its own quantile bucket (`n_quantiles`
    /// buckets spanning `[0, 1]`), a distribution-agnostic normalization.
    pub fn quantile_normalize(values: &[f64], n_quantiles: usize) -> Vec<f64> {
        if values.is_empty() || n_quantiles == 0 {
            return values.to_vec();
        }
        let mut indexed: Vec<(usize, f64)> =
            values.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let n = indexed.len();
        let mut result = vec![0.0; n];
        for (rank, (orig_idx, _)) in indexed.into_iter().enumerate() {
            let quantile = if n <= 1 {
                0.0
            } else {
                (rank as f64 / (n - 1) as f64 * (n_quantiles - 1) as f64).round()
                    / (n_quantiles - 1).max(1) as f64
            };
            result[orig_idx] = quantile;
        }
        result
    }

    /// Marks values as outliers when they fall more than `threshold` MADs
    /// from the median (a robust alternative to a z-score cutoff).
    pub fn outlier_mask(values: &[f64], threshold: f64) -> Vec<bool> {
        if values.is_empty() {
            return Vec::new();
        }
        let median = percentile(values, 50.0);
        let abs_devs: Vec<f64> = values.iter().map(|v| (v - median).abs()).collect();
        let mad = percentile(&abs_devs, 50.0);
        if mad <= FingerprintConstants::EPSILON {
            return vec![false; values.len()];
        }
        let scale = 1.4826 * mad;
        values
            .iter()
            .map(|v| ((v - median) / scale).abs() > threshold)
            .collect()
    }
}

/// Linear-interpolated percentile (numpy's default `linear` method).
fn percentile(values: &[f64], pct: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = (pct / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_divide_by_zero() {
        assert_eq!(SafeOperations::safe_divide(1.0, 0.0, 0.5), 0.5);
        assert_eq!(SafeOperations::safe_divide(4.0, 2.0, 0.5), 2.0);
    }

    #[test]
    fn test_safe_log_nonpositive() {
        assert_eq!(SafeOperations::safe_log(0.0, -1.0), -1.0);
        assert!(SafeOperations::safe_log(1.0, -1.0).abs() < 1e-9);
    }

    #[test]
    fn test_stability_from_cv_zero_is_perfectly_stable() {
        assert_eq!(MetricUtils::stability_from_cv(0.0, 1.0), 1.0);
    }

    #[test]
    fn test_stability_from_cv_large_approaches_zero() {
        assert!(MetricUtils::stability_from_cv(1000.0, 1.0) < 0.01);
    }

    #[test]
    fn test_normalize_to_range_degenerate_max() {
        assert_eq!(MetricUtils::normalize_to_range(5.0, 0.0, true), 0.5);
    }

    #[test]
    fn test_clip_to_range_swapped_bounds() {
        assert_eq!(MetricUtils::clip_to_range(5.0, 10.0, 0.0), 5.0);
        assert_eq!(MetricUtils::clip_to_range(-5.0, 10.0, 0.0), 0.0);
    }

    #[test]
    fn test_zscore_constant_signal_is_zero() {
        let out = MetricUtils::normalize_with_zscore(&[3.0, 3.0, 3.0]);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_validate_vector_rejects_nan() {
        let mut v = vec![0.0; FingerprintConstants::FINGERPRINT_DIMENSIONS];
        v[3] = f64::NAN;
        assert!(!FingerprintConstants::validate_vector(&v));
    }

    #[test]
    fn test_robust_scale_constant_is_zero() {
        let out = MetricUtils::robust_scale(&[2.0, 2.0, 2.0, 2.0]);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_outlier_mask_flags_spike() {
        let values = vec![1.0, 1.1, 0.9, 1.05, 50.0];
        let mask = MetricUtils::outlier_mask(&values, 3.0);
        assert!(mask[4]);
        assert!(!mask[0]);
    }
}
