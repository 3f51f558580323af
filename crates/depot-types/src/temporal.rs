use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Wall-clock timestamp used for creation and update bookkeeping.
///
/// Millisecond resolution since the UNIX epoch. Ordering is numeric, so
/// stamps taken later on the same machine never compare below earlier ones.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    ms: u64,
}

impl Timestamp {
    /// A stamp for the current wall-clock time.
    pub fn now() -> Self {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self { ms }
    }

    /// A stamp from explicit milliseconds since the epoch.
    pub const fn from_millis(ms: u64) -> Self {
        Self { ms }
    }

    /// The epoch stamp.
    pub const fn zero() -> Self {
        Self { ms: 0 }
    }

    /// Milliseconds since the UNIX epoch.
    pub fn as_millis(&self) -> u64 {
        self.ms
    }

    /// Returns `true` if this stamp is strictly after `other`.
    pub fn is_after(&self, other: &Self) -> bool {
        self > other
    }

    /// Returns `true` if this stamp is strictly before `other`.
    pub fn is_before(&self, other: &Self) -> bool {
        self < other
    }

    /// Time-of-day rendering (`HH:MM:SS`, UTC) for log lines and dumps.
    pub fn clock_time(&self) -> String {
        let secs = self.ms / 1000;
        let h = (secs / 3600) % 24;
        let m = (secs / 60) % 60;
        let s = secs % 60;
        format!("{h:02}:{m:02}:{s:02}")
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ms)", self.ms)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_numeric() {
        let a = Timestamp::from_millis(100);
        let b = Timestamp::from_millis(200);
        assert!(a < b);
        assert!(b.is_after(&a));
        assert!(a.is_before(&b));
    }

    #[test]
    fn equal_stamps() {
        let a = Timestamp::from_millis(100);
        let b = Timestamp::from_millis(100);
        assert_eq!(a, b);
        assert!(!a.is_after(&b));
        assert!(!a.is_before(&b));
    }

    #[test]
    fn now_produces_reasonable_timestamp() {
        let stamp = Timestamp::now();
        // Should be after 2020-01-01 (1577836800000 ms)
        assert!(stamp.as_millis() > 1_577_836_800_000);
    }

    #[test]
    fn zero_is_smallest() {
        assert!(Timestamp::zero() < Timestamp::from_millis(1));
    }

    #[test]
    fn clock_time_format() {
        assert_eq!(Timestamp::zero().clock_time(), "00:00:00");
        // 12h 34m 56s into the day.
        assert_eq!(Timestamp::from_millis(45_296_000).clock_time(), "12:34:56");
        // Wraps at midnight.
        assert_eq!(Timestamp::from_millis(86_400_000).clock_time(), "00:00:00");
    }

    #[test]
    fn serde_roundtrip() {
        let stamp = Timestamp::from_millis(1_234_567_890);
        let json = serde_json::to_string(&stamp).unwrap();
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(stamp, parsed);
    }

    #[test]
    fn display_is_plain_millis() {
        assert_eq!(Timestamp::from_millis(1000).to_string(), "1000");
    }
}
