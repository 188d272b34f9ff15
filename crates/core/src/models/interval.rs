use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{BookingError, BookingResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> BookingResult<Self> {
        if start >= end {
            return Err(BookingError::Validation(format!(
                "interval start {} must be before its end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Half-open overlap: `[s1,e1)` and `[s2,e2)` overlap iff `s1 < e2 && s2 < e1`.
    /// An interval ending exactly where another starts does not overlap it.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// The half-hour bucket containing `instant`, aligned to :00/:30 to
    /// match the availability grid's slot boundaries.
    pub fn enclosing_half_hour(instant: DateTime<Utc>) -> Self {
        let start = instant
            .duration_trunc(Duration::minutes(30))
            .unwrap_or(instant);
        Self {
            start,
            end: start + Duration::minutes(30),
        }
    }
}
