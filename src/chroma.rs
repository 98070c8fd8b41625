/// Chroma Features
///
/// Extracts a 12-dimensional chromagram by projecting STFT magnitude bins
/// onto pitch classes (semitones), which is the standard approach when a
/// literal Constant-Q transform is unavailable: each FFT bin frequency maps
/// to a MIDI pitch number via `12*log2(f/440) + 69`, and bins with the same
/// `pitch mod 12` accumulate into the same chroma row.
///
/// Reference:
/// Brown, Judith C. "Calculation of a constant Q spectral transform." JASA 89, 1991.

use ndarray::Array2;
use rustfft::{num_complex::Complex64, FftPlanner};
use std::f64::consts::PI;

const N_FFT: usize = 4096;
const HOP_LENGTH: usize = 1024;
const MIN_FREQ: f64 = 32.70; // C1
const REFERENCE_FREQ: f64 = 440.0; // A4

/// Extract chromagram using pitch-class-binned STFT magnitude.
///
/// # Arguments
/// * `y` - Audio signal [n_samples]
/// * `sr` - Sample rate (Hz)
///
/// # Returns
/// Chromagram [12, n_frames] - energy per semitone, each frame normalized so
/// its max pitch class is 1.0 (or all zero for a silent frame).
pub fn chroma_cqt(y: &[f64], sr: usize) -> Array2<f64> {
    if y.len() < N_FFT {
        return Array2::zeros((12, 0));
    }

    let n_frames = (y.len() - N_FFT) / HOP_LENGTH + 1;
    let mut chroma = Array2::<f64>::zeros((12, n_frames));

    let window = hann_window(N_FFT);
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(N_FFT);
    let mut buffer = vec![Complex64::new(0.0, 0.0); N_FFT];

    // Pitch class for each FFT bin, precomputed once.
    let bin_classes: Vec<Option<usize>> = (0..N_FFT / 2 + 1)
        .map(|k| {
            let freq = k as f64 * sr as f64 / N_FFT as f64;
            if freq < MIN_FREQ {
                None
            } else {
                let midi = 69.0 + 12.0 * (freq / REFERENCE_FREQ).log2();
                Some(((midi.round() as i64).rem_euclid(12)) as usize)
            }
        })
        .collect();

    for frame_idx in 0..n_frames {
        let start = frame_idx * HOP_LENGTH;
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = Complex64::new(y[start + i] * window[i], 0.0);
        }
        fft.process(&mut buffer);

        let mut row = [0.0; 12];
        for (k, class) in bin_classes.iter().enumerate() {
            if let Some(c) = class {
                row[*c] += buffer[k].norm();
            }
        }

        let max = row.iter().cloned().fold(0.0_f64, f64::max);
        if max > 1e-10 {
            for c in 0..12 {
                chroma[[c, frame_idx]] = row[c] / max;
            }
        }
    }

    chroma
}

fn hann_window(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (n as f64 - 1.0)).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_chroma_cqt_shape() {
        let audio = vec![0.0; 44100];
        let chroma = chroma_cqt(&audio, 44100);
        assert_eq!(chroma.nrows(), 12);
        assert_eq!(chroma.ncols(), (44100 - N_FFT) / HOP_LENGTH + 1);
    }

    #[test]
    fn test_chroma_cqt_too_short() {
        let audio = vec![0.0; 100];
        let chroma = chroma_cqt(&audio, 44100);
        assert_eq!(chroma.ncols(), 0);
    }

    #[test]
    fn test_chroma_cqt_silence_is_zero() {
        let audio = vec![0.0; 44100];
        let chroma = chroma_cqt(&audio, 44100);
        assert!(chroma.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_chroma_cqt_pitch_peaks_at_expected_class() {
        let sr = 44100;
        let n = sr;
        // A4 = 440 Hz -> pitch class 9 (A).
        let audio: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * 440.0 * i as f64 / sr as f64).sin())
            .collect();
        let chroma = chroma_cqt(&audio, sr);
        let mut totals = [0.0; 12];
        for frame in 0..chroma.ncols() {
            for c in 0..12 {
                totals[c] += chroma[[c, frame]];
            }
        }
        let (argmax, _) = totals
            .iter()
            .enumerate()
            .fold((0, 0.0), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
        assert_eq!(argmax, 9);
    }
}
