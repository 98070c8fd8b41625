/// Incremental, real-time counterparts to the batch fingerprint analyzers:
/// each one updates in O(1) (or bounded periodic cost) per frame instead of
/// re-scanning the whole buffer, at the cost of metrics that stabilize over
/// several seconds rather than being exact from frame one.
pub mod welford;
pub mod variation;
pub mod spectral;
pub mod temporal;
pub mod harmonic;
pub mod orchestrator;

pub use orchestrator::{StreamingFingerprint, StreamingFrame};
pub use welford::{RunningStatistics, WindowedBuffer};
