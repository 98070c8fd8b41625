/// 2D Median Filtering
///
/// Shared median-filter primitives used by harmonic/percussive separation
/// and any other spectrogram-domain smoothing.

use ndarray::Array2;

/// Apply median filter with vertical kernel (frequency-wise).
/// Separates content that is sustained across frequency bins (harmonic).
pub fn median_filter_vertical(data: &Array2<f64>, kernel_size: usize) -> Array2<f64> {
    let (n_freq, n_frames) = data.dim();
    let mut output = Array2::<f64>::zeros((n_freq, n_frames));
    let half_kernel = kernel_size / 2;

    for j in 0..n_frames {
        for i in 0..n_freq {
            let start = i.saturating_sub(half_kernel);
            let end = (i + half_kernel + 1).min(n_freq);
            output[[i, j]] = median_of(&data.slice(ndarray::s![start..end, j]).to_vec());
        }
    }

    output
}

/// Apply median filter with horizontal kernel (time-wise).
/// Separates content that is localized in time (percussive).
pub fn median_filter_horizontal(data: &Array2<f64>, kernel_size: usize) -> Array2<f64> {
    let (n_freq, n_frames) = data.dim();
    let mut output = Array2::<f64>::zeros((n_freq, n_frames));
    let half_kernel = kernel_size / 2;

    for i in 0..n_freq {
        for j in 0..n_frames {
            let start = j.saturating_sub(half_kernel);
            let end = (j + half_kernel + 1).min(n_frames);
            output[[i, j]] = median_of(&data.slice(ndarray::s![i, start..end]).to_vec());
        }
    }

    output
}

fn median_of(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted[sorted.len() / 2]
}
