use chrono::{DateTime, Duration, Utc};

/// Default age in hours after which a branch is reported as stale
pub const DEFAULT_STALE_AFTER_HOURS: i64 = 72;

/// Classifies HEAD commit timestamps against a fixed age threshold
#[derive(Debug, Clone, Copy)]
pub struct StalenessClassifier {
    threshold: Duration,
}

impl StalenessClassifier {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    /// True when the commit is strictly older than the threshold at `now`
    pub fn is_stale(&self, commit_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - commit_time > self.threshold
    }
}

impl Default for StalenessClassifier {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_STALE_AFTER_HOURS))
    }
}
