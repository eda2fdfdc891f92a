use std::fmt::Display;

use super::Time;

//Half-open daily window [start, end) in local time of day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTimeRange {
    start: Time,
    end: Time,
}

impl Display for DailyTimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl DailyTimeRange {
    pub fn new(start: Time, end: Time) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, time: Time) -> bool {
        if self.start <= self.end {
            //same-day scenario
            self.start <= time && time < self.end
        } else {
            //cross-day scenario
            self.start <= time || time < self.end
        }
    }
}
