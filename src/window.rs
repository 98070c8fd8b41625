/// Process-global window-function cache.
///
/// Window arrays are immutable once built and cheap to share, so the cache
/// holds `Arc<Vec<f64>>` behind a single `RwLock`. `get_window` reads under
/// a shared lock first (the common case, size already cached); only on a
/// miss does it take the write lock, and it rechecks the table once inside
/// that lock before computing — the double-checked-locking pattern that
/// keeps concurrent misses on the same size from both winning the race and
/// handing out two different arrays.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    Hann,
    Hamming,
    Blackman,
}

fn compute_window(window_type: WindowType, size: usize) -> Vec<f64> {
    if size == 0 {
        return Vec::new();
    }
    if size == 1 {
        return vec![1.0];
    }

    let n = size as f64 - 1.0;
    (0..size)
        .map(|i| {
            let x = i as f64;
            match window_type {
                WindowType::Hann => 0.5 * (1.0 - (2.0 * std::f64::consts::PI * x / n).cos()),
                WindowType::Hamming => {
                    0.54 - 0.46 * (2.0 * std::f64::consts::PI * x / n).cos()
                }
                WindowType::Blackman => {
                    0.42 - 0.5 * (2.0 * std::f64::consts::PI * x / n).cos()
                        + 0.08 * (4.0 * std::f64::consts::PI * x / n).cos()
                }
            }
        })
        .collect()
}

type WindowTable = RwLock<HashMap<(WindowType, usize), Arc<Vec<f64>>>>;

fn cache() -> &'static WindowTable {
    static CACHE: OnceLock<WindowTable> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Returns the canonical window of `window_type` and `size`, computing and
/// caching it on first request. Safe to call concurrently from any number
/// of threads for any number of distinct sizes.
pub fn get_window(window_type: WindowType, size: usize) -> Arc<Vec<f64>> {
    let key = (window_type, size);

    if let Some(window) = cache().read().unwrap().get(&key) {
        return Arc::clone(window);
    }

    let mut table = cache().write().unwrap();
    if let Some(window) = table.get(&key) {
        return Arc::clone(window);
    }

    let window = Arc::new(compute_window(window_type, size));
    table.insert(key, Arc::clone(&window));
    window
}

pub fn get_hann_window(size: usize) -> Arc<Vec<f64>> {
    get_window(WindowType::Hann, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_hann_window_is_zero_at_ends_and_peaks_at_center() {
        let window = get_hann_window(1024);
        assert!((window[0]).abs() < 1e-9);
        assert!((window[1023]).abs() < 1e-9);
        let mid = window[512];
        assert!(mid > 0.99);
    }

    #[test]
    fn test_same_size_returns_identical_values() {
        let a = get_hann_window(777);
        let b = get_hann_window(777);
        assert_eq!(*a, *b);
    }

    #[test]
    fn test_concurrent_misses_on_same_size_return_canonical_window() {
        let reference = compute_window(WindowType::Hann, 2049);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                thread::spawn(|| {
                    let mut results = Vec::with_capacity(2500);
                    for _ in 0..2500 {
                        results.push(get_window(WindowType::Hann, 2049));
                    }
                    results
                })
            })
            .collect();

        for handle in handles {
            let results = handle.join().unwrap();
            for result in results {
                assert_eq!(*result, reference);
            }
        }
    }

    #[test]
    fn test_single_sample_window_is_unity() {
        assert_eq!(*get_hann_window(1), vec![1.0]);
    }
}
