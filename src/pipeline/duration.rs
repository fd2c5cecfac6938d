//! Duration gate applied before any stream manifest is requested.

use std::time::Duration;

/// Outcome of the duration check for one video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationVerdict {
    Keep,
    /// No duration reported; treated as a live or upcoming broadcast.
    Live,
    TooShort { duration: Duration, minimum: Duration },
}

impl DurationVerdict {
    pub fn is_keep(&self) -> bool {
        matches!(self, DurationVerdict::Keep)
    }
}

/// Decide whether a video should be processed.
///
/// A missing duration always skips. With a minimum set, only videos strictly
/// shorter than it are skipped.
pub fn check_duration(duration: Option<Duration>, min_secs: Option<u64>) -> DurationVerdict {
    let Some(duration) = duration else {
        return DurationVerdict::Live;
    };

    match min_secs.map(Duration::from_secs) {
        Some(minimum) if duration < minimum => DurationVerdict::TooShort { duration, minimum },
        _ => DurationVerdict::Keep,
    }
}
