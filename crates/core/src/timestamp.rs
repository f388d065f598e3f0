//! Millisecond wall-clock timestamps
//!
//! Used for meta record bookkeeping (creation, last update, expiration).
//! Expiration only ever compares against wall-clock time, never against
//! commit versions.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch; also used as the "no expiration" sentinel in meta records
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Current wall-clock time
    ///
    /// Returns epoch if the system clock is before Unix epoch.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_millis() as u64)
    }

    /// Create from milliseconds since epoch
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    /// Milliseconds since epoch
    #[inline]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// True for the epoch sentinel
    #[inline]
    pub const fn is_epoch(&self) -> bool {
        self.0 == 0
    }

    /// Add a duration, saturating at `u64::MAX` milliseconds
    pub fn saturating_add(&self, d: Duration) -> Self {
        Timestamp(self.0.saturating_add(d.as_millis() as u64))
    }

    /// Milliseconds from `self` until `later`, or zero if `later` is earlier
    pub fn millis_until(&self, later: Timestamp) -> u64 {
        later.0.saturating_sub(self.0)
    }
}
