/// YIN Fundamental Frequency Detection
///
/// Autocorrelation-based pitch detection using the YIN algorithm
///
/// Reference:
/// de Cheveigné, Alain & Kawahara, Hideki.
/// "YIN, a fundamental frequency estimator for speech and music."
/// JASA 111, 2002.

/// Detect fundamental frequency using YIN algorithm
///
/// # Arguments
/// * `y` - Audio signal [n_samples]
/// * `sr` - Sample rate (Hz)
/// * `fmin` - Minimum frequency (Hz)
/// * `fmax` - Maximum frequency (Hz)
///
/// # Returns
/// Fundamental frequency estimates [n_frames], 0 for unvoiced frames
pub fn yin(y: &[f64], sr: usize, fmin: f64, fmax: f64) -> Vec<f64> {
    const FRAME_LENGTH: usize = 2048;
    const HOP_LENGTH: usize = 512;
    const TROUGH_THRESHOLD: f64 = 0.1;

    if y.len() < FRAME_LENGTH {
        return vec![0.0; 0];
    }

    let n_frames = (y.len() - FRAME_LENGTH) / HOP_LENGTH + 1;
    let mut f0_contour = vec![0.0; n_frames];

    // Search range in lag (samples), derived from the requested frequency band.
    let tau_min = ((sr as f64 / fmax).floor() as usize).max(2);
    let tau_max = ((sr as f64 / fmin).ceil() as usize).min(FRAME_LENGTH / 2);

    if tau_min >= tau_max {
        return f0_contour;
    }

    let mut diff = vec![0.0; tau_max + 1];
    let mut cmndf = vec![0.0; tau_max + 1];

    for (frame_idx, f0) in f0_contour.iter_mut().enumerate() {
        let start = frame_idx * HOP_LENGTH;
        let frame = &y[start..start + FRAME_LENGTH];

        difference_function(frame, tau_max, &mut diff);
        cumulative_mean_normalized_difference(&diff, &mut cmndf);

        if let Some(tau) = absolute_threshold(&cmndf, tau_min, tau_max, TROUGH_THRESHOLD) {
            let refined_tau = parabolic_interpolation(&cmndf, tau);
            if refined_tau > 0.0 {
                let freq = sr as f64 / refined_tau;
                if freq >= fmin && freq <= fmax {
                    *f0 = freq;
                }
            }
        }
    }

    f0_contour
}

/// Difference function d(tau) = sum_j (x[j] - x[j+tau])^2 for j in [0, W - tau).
fn difference_function(frame: &[f64], tau_max: usize, diff: &mut [f64]) {
    let w = frame.len();
    diff[0] = 0.0;
    for tau in 1..=tau_max {
        let mut sum = 0.0;
        for j in 0..(w - tau) {
            let delta = frame[j] - frame[j + tau];
            sum += delta * delta;
        }
        diff[tau] = sum;
    }
}

/// Cumulative mean normalized difference function:
/// d'(0) = 1, d'(tau) = d(tau) / ((1/tau) * sum_{j=1..tau} d(j))
fn cumulative_mean_normalized_difference(diff: &[f64], cmndf: &mut [f64]) {
    cmndf[0] = 1.0;
    let mut running_sum = 0.0;
    for tau in 1..diff.len() {
        running_sum += diff[tau];
        cmndf[tau] = if running_sum > 0.0 {
            diff[tau] * tau as f64 / running_sum
        } else {
            1.0
        };
    }
}

/// First local minimum of the CMNDF below `threshold` within [tau_min, tau_max].
fn absolute_threshold(cmndf: &[f64], tau_min: usize, tau_max: usize, threshold: f64) -> Option<usize> {
    let mut tau = tau_min;
    while tau <= tau_max {
        if cmndf[tau] < threshold {
            while tau + 1 <= tau_max && cmndf[tau + 1] < cmndf[tau] {
                tau += 1;
            }
            return Some(tau);
        }
        tau += 1;
    }
    None
}

/// Parabolic interpolation around `tau` using its two neighbors for sub-sample precision.
fn parabolic_interpolation(cmndf: &[f64], tau: usize) -> f64 {
    if tau == 0 || tau + 1 >= cmndf.len() {
        return tau as f64;
    }

    let s0 = cmndf[tau - 1];
    let s1 = cmndf[tau];
    let s2 = cmndf[tau + 1];

    let denom = 2.0 * s1 - s2 - s0;
    if denom.abs() < 1e-12 {
        tau as f64
    } else {
        tau as f64 + (s2 - s0) / (2.0 * denom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, sr: usize, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / sr as f64).sin()).collect()
    }

    #[test]
    fn test_yin_shape_matches_frame_count() {
        let audio = vec![0.0; 44100];
        let f0 = yin(&audio, 44100, 50.0, 2000.0);
        assert_eq!(f0.len(), (audio.len() - 2048) / 512 + 1);
    }

    #[test]
    fn test_yin_silence_is_unvoiced() {
        let audio = vec![0.0; 44100];
        let f0 = yin(&audio, 44100, 50.0, 2000.0);
        assert!(f0.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_yin_detects_known_pitch() {
        let sr = 44100;
        let audio = sine(220.0, sr, sr);
        let f0 = yin(&audio, sr, 50.0, 2000.0);
        let voiced: Vec<f64> = f0.iter().copied().filter(|&f| f > 0.0).collect();
        assert!(!voiced.is_empty());
        let mean = voiced.iter().sum::<f64>() / voiced.len() as f64;
        assert!((mean - 220.0).abs() < 5.0, "mean f0 {} not close to 220", mean);
    }

    #[test]
    fn test_yin_too_short_returns_empty() {
        let audio = vec![0.0; 100];
        let f0 = yin(&audio, 44100, 50.0, 2000.0);
        assert!(f0.is_empty());
    }
}
