// Time-windowed duplicate-content tracker backing the anti-spam check.
//
// Two independent clocks are at work here and must not be conflated:
// - MATCH_HORIZON is logical expiry; an older entry never produces a match.
// - SWEEP_INTERVAL is how often a background task physically evicts stale
//   entries, which only bounds memory.
//
// This is an injected state object owned by the automod service, not a
// process-wide singleton, so each test constructs an isolated instance.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Entries older than this never match.
pub const MATCH_HORIZON: Duration = Duration::from_millis(3000);

/// How often the background sweep evicts expired entries.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
struct AntiSpamEntry {
    channel_id: u64,
    content: String,
    at: Instant,
}

/// Detects the same content posted by the same author across different
/// channels within the match horizon.
#[derive(Default)]
pub struct AntiSpamTracker {
    entries: DashMap<(u64, u64), AntiSpamEntry>,
}

impl AntiSpamTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a message against the cache and record it if unseen.
    ///
    /// Returns `true` when this message matches a prior entry from the same
    /// (author, guild) with identical content in a *different* channel within
    /// the horizon. A first occurrence is recorded and never matches.
    pub fn observe(
        &self,
        author_id: u64,
        guild_id: u64,
        channel_id: u64,
        content: &str,
        now: Instant,
    ) -> bool {
        let key = (author_id, guild_id);
        if let Some(prev) = self.entries.get(&key) {
            prev.channel_id != channel_id
                && prev.content == content
                && now.duration_since(prev.at) < MATCH_HORIZON
        } else {
            self.entries.insert(
                key,
                AntiSpamEntry {
                    channel_id,
                    content: content.to_string(),
                    at: now,
                },
            );
            false
        }
    }

    /// Physically drop entries past the horizon. Memory bound only; logical
    /// expiry is already enforced in `observe`.
    pub fn sweep(&self, now: Instant) {
        self.entries
            .retain(|_, entry| now.duration_since(entry.at) < MATCH_HORIZON);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_never_matches() {
        let tracker = AntiSpamTracker::new();
        let now = Instant::now();
        assert!(!tracker.observe(1, 10, 100, "buy now", now));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn cross_channel_duplicate_matches_within_horizon() {
        let tracker = AntiSpamTracker::new();
        let now = Instant::now();
        tracker.observe(1, 10, 100, "spam text", now);
        assert!(tracker.observe(1, 10, 101, "spam text", now + Duration::from_millis(500)));
    }

    #[test]
    fn same_channel_never_matches() {
        let tracker = AntiSpamTracker::new();
        let now = Instant::now();
        tracker.observe(1, 10, 100, "spam text", now);
        assert!(!tracker.observe(1, 10, 100, "spam text", now + Duration::from_millis(500)));
    }

    #[test]
    fn different_content_never_matches() {
        let tracker = AntiSpamTracker::new();
        let now = Instant::now();
        tracker.observe(1, 10, 100, "one thing", now);
        assert!(!tracker.observe(1, 10, 101, "another thing", now));
    }

    #[test]
    fn expired_entry_never_matches() {
        let tracker = AntiSpamTracker::new();
        let now = Instant::now();
        tracker.observe(1, 10, 100, "spam text", now);
        // Just past the horizon.
        assert!(!tracker.observe(1, 10, 101, "spam text", now + MATCH_HORIZON));
    }

    #[test]
    fn sweep_only_affects_memory_not_matching() {
        let tracker = AntiSpamTracker::new();
        let now = Instant::now();
        tracker.observe(1, 10, 100, "spam text", now);
        tracker.observe(2, 10, 100, "other", now + MATCH_HORIZON + Duration::from_secs(1));

        tracker.sweep(now + MATCH_HORIZON + Duration::from_secs(1));
        // The stale entry is gone, the fresh one survives.
        assert_eq!(tracker.len(), 1);
    }
}
