use std::fmt::Display;

use derive_more::derive::AsRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsRef, Serialize, Deserialize)]
pub struct Percent(pub f64);

impl Percent {
    pub fn is_valid(&self) -> bool {
        (0.0..=100.0).contains(&self.0)
    }
}

impl From<f64> for Percent {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<Percent> for f64 {
    fn from(value: Percent) -> Self {
        value.0
    }
}

impl Display for Percent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} %", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_range() {
        assert!(Percent(0.0).is_valid());
        assert!(Percent(100.0).is_valid());
        assert!(!Percent(100.5).is_valid());
        assert!(!Percent(-1.0).is_valid());
        assert!(!Percent(f64::NAN).is_valid());
    }

    #[test]
    fn test_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&Percent(42.5)).unwrap(), "42.5");
    }
}
