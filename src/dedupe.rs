//! Result deduplication.
//!
//! The session recognizes the same subject on many consecutive frames; the
//! deduper decides which of those recognitions the delegate actually hears
//! about. It keeps the last forwarded result and a consecutive-miss counter:
//! a result is forwarded only when it differs from the cache, and the cache
//! is cleared once misses reach a threshold so the same subject scans fresh
//! after it left the viewfinder. Resuming from pause flushes the cache
//! outright.

use crate::result::ScanResult;

/// Tracks the last forwarded result and the current miss streak.
#[derive(Debug)]
pub struct ResultDeduper {
    last: Option<ScanResult>,
    misses: u32,
    clear_after: u32,
}

impl ResultDeduper {
    /// `clear_after` is the number of consecutive misses after which the
    /// last-result cache is dropped. The default session config uses 1:
    /// a single miss makes the next identical match fresh again.
    pub fn new(clear_after: u32) -> Self {
        Self {
            last: None,
            misses: 0,
            clear_after: clear_after.max(1),
        }
    }

    /// Record a positive recognition. Returns true when the delegate should
    /// be notified, false when it is a repeat of the cached result.
    pub fn record(&mut self, result: &ScanResult) -> bool {
        self.misses = 0;
        if self.last.as_ref() == Some(result) {
            return false;
        }
        self.last = Some(result.clone());
        true
    }

    /// Record a frame with no recognition. Clears the cache once the streak
    /// reaches the threshold.
    pub fn miss(&mut self) {
        self.misses = self.misses.saturating_add(1);
        if self.misses >= self.clear_after {
            self.last = None;
        }
    }

    /// Drop the cache and the streak (pause/resume, reconfiguration).
    pub fn flush(&mut self) {
        self.last = None;
        self.misses = 0;
    }

    pub fn last(&self) -> Option<&ScanResult> {
        self.last.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ResultKind;

    fn qr(payload: &[u8]) -> ScanResult {
        ScanResult::new(ResultKind::QrCode, payload.to_vec())
    }

    #[test]
    fn consecutive_repeats_are_suppressed() {
        let mut deduper = ResultDeduper::new(1);
        assert!(deduper.record(&qr(b"a")));
        assert!(!deduper.record(&qr(b"a")));
        assert!(deduper.record(&qr(b"b")));
        assert!(!deduper.record(&qr(b"b")));
    }

    #[test]
    fn a_miss_makes_the_same_result_fresh() {
        let mut deduper = ResultDeduper::new(1);
        assert!(deduper.record(&qr(b"a")));
        deduper.miss();
        assert!(deduper.last().is_none());
        assert!(deduper.record(&qr(b"a")));
    }

    #[test]
    fn threshold_delays_the_clear() {
        let mut deduper = ResultDeduper::new(3);
        assert!(deduper.record(&qr(b"a")));
        deduper.miss();
        deduper.miss();
        // Streak below threshold: still a repeat.
        assert!(!deduper.record(&qr(b"a")));
        deduper.miss();
        deduper.miss();
        deduper.miss();
        assert!(deduper.record(&qr(b"a")));
    }

    #[test]
    fn a_match_resets_the_streak() {
        let mut deduper = ResultDeduper::new(2);
        assert!(deduper.record(&qr(b"a")));
        deduper.miss();
        assert!(!deduper.record(&qr(b"a")));
        deduper.miss();
        // Streak restarted above, so the cache survived.
        assert!(!deduper.record(&qr(b"a")));
    }

    #[test]
    fn flush_forgets_everything() {
        let mut deduper = ResultDeduper::new(5);
        assert!(deduper.record(&qr(b"a")));
        deduper.flush();
        assert!(deduper.last().is_none());
        assert!(deduper.record(&qr(b"a")));
    }
}
