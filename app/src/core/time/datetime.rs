use std::fmt::Display;

use tokio::task_local;

use super::{Duration, Time};

task_local! {
    pub static FIXED_NOW: DateTime;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DateTime {
    delegate: chrono::DateTime<chrono::Local>,
}

impl DateTime {
    fn new<T: chrono::TimeZone>(delegate: chrono::DateTime<T>) -> Self {
        Self {
            delegate: delegate.with_timezone(&chrono::Local),
        }
    }

    pub fn now() -> Self {
        FIXED_NOW
            .try_with(|t| *t)
            .unwrap_or_else(|_| chrono::Local::now().into())
    }

    #[cfg(test)]
    pub fn from_iso(iso8601: &str) -> anyhow::Result<Self> {
        Ok(chrono::DateTime::parse_from_rfc3339(iso8601)?.into())
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.delegate.timestamp_millis()
    }

    //local time of day, schedule windows are expressed in it
    pub fn time(&self) -> Time {
        Time::new(self.delegate.time())
    }

    #[cfg(test)]
    pub fn at(&self, time: Time) -> anyhow::Result<Self> {
        let dt = self
            .delegate
            .with_time(time.delegate)
            .earliest()
            .ok_or_else(|| anyhow::anyhow!("Error applying time {} to date-time {}", time, self))?;

        Ok(dt.into())
    }

    pub fn elapsed_since(&self, since: Self) -> Duration {
        Duration::new(self.delegate - since.delegate)
    }

    pub fn elapsed(&self) -> Duration {
        Self::now().elapsed_since(*self)
    }
}

impl Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.delegate.format("%Y-%m-%d %H:%M:%S"))
    }
}

#[cfg(test)]
impl std::ops::Add<Duration> for DateTime {
    type Output = DateTime;

    fn add(self, rhs: Duration) -> Self::Output {
        Self::new(self.delegate + rhs.delegate)
    }
}

impl<T: chrono::TimeZone> From<chrono::DateTime<T>> for DateTime {
    fn from(val: chrono::DateTime<T>) -> Self {
        DateTime::new(val)
    }
}
