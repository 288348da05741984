//! Device clock values.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Nanoseconds since the Unix epoch, as reported by a device.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Convert to a [`SystemTime`].
    ///
    /// Returns `None` if the value does not fit a signed 64-bit nanosecond count,
    /// which no real device clock produces.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::{Duration, UNIX_EPOCH};
    /// use lifx_lan_rs::Timestamp;
    ///
    /// let ts = Timestamp(1_464_000_000_000_000_000);
    /// assert_eq!(ts.to_system_time(), Some(UNIX_EPOCH + Duration::from_nanos(1_464_000_000_000_000_000)));
    /// assert!(Timestamp(i64::MAX as u64 + 1).to_system_time().is_none());
    /// ```
    pub fn to_system_time(&self) -> Option<SystemTime> {
        if self.0 > i64::MAX as u64 {
            return None;
        }
        Some(UNIX_EPOCH + Duration::from_nanos(self.0))
    }

    pub fn nanos(&self) -> u64 {
        self.0
    }
}
