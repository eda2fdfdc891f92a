use std::fmt::Display;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Deserializer, de};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Time {
    pub(super) delegate: chrono::NaiveTime,
}

impl Time {
    pub(super) fn new(delegate: chrono::NaiveTime) -> Self {
        Self { delegate }
    }

    #[cfg(test)]
    pub fn at(hour: u32, minute: u32) -> anyhow::Result<Self> {
        Ok(Self {
            delegate: chrono::NaiveTime::from_hms_opt(hour, minute, 0)
                .context(format!("Error parsing time {}:{}", hour, minute))?,
        })
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.delegate.format("%H:%M"))
    }
}

impl FromStr for Time {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let delegate = chrono::NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .with_context(|| format!("Invalid time of day {:?}, expected HH:MM", s))?;

        Ok(Self::new(delegate))
    }
}

impl<'de> Deserialize<'de> for Time {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(|e: anyhow::Error| de::Error::custom(format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_time_of_day() {
        let time: Time = "08:30".parse().unwrap();

        assert_eq!(time, Time::at(8, 30).unwrap());
    }

    #[test]
    fn rejects_invalid_time_of_day() {
        assert!("25:00".parse::<Time>().is_err());
        assert!("eight".parse::<Time>().is_err());
    }

    #[test]
    fn deserializes_from_string() {
        let time: Time = serde_json::from_str(r#""14:00""#).unwrap();

        assert_eq!(time.to_string(), "14:00");
    }
}
