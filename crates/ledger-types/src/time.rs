//! Time point types.

use serde::{Deserialize, Serialize};

/// Microseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TimePoint(pub i64);

/// Whole seconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TimePointSec(pub u32);

/// Half-second slots since the chain epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockTimestamp(pub u32);

impl TimePoint {
    /// Truncate to whole seconds.
    pub fn to_seconds(&self) -> TimePointSec {
        TimePointSec((self.0 / 1_000_000).clamp(0, i64::from(u32::MAX)) as u32)
    }
}

impl From<TimePointSec> for TimePoint {
    fn from(sec: TimePointSec) -> Self {
        TimePoint(i64::from(sec.0) * 1_000_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_point_conversion() {
        let tp = TimePoint(1_500_000);
        assert_eq!(tp.to_seconds(), TimePointSec(1));
        assert_eq!(TimePoint::from(TimePointSec(2)), TimePoint(2_000_000));
    }
}
