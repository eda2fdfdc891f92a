#[macro_export]
macro_rules! t {
    (now) => {{
        $crate::core::time::DateTime::now()
    }};

    ($from_hour:literal : $from_minute:literal - $to_hour:literal : $to_minute:literal) => {{
        $crate::core::time::DailyTimeRange::new(t!($from_hour:$from_minute), t!($to_hour:$to_minute))
    }};

    ($hour:literal : $minute:literal) => {{
        $crate::core::time::Time::at($hour, $minute).unwrap()
    }};

    ($amount:literal seconds) => {{
        $crate::core::time::Duration::seconds($amount)
    }};
    ($amount:literal minutes) => {{
        $crate::core::time::Duration::minutes($amount)
    }};
    ($amount:literal hours) => {{
        $crate::core::time::Duration::hours($amount)
    }};
}

#[cfg(test)]
mod tests {
    use crate::core::time::*;

    #[test]
    fn test_now() {
        let now = t!(now);
        assert!(DateTime::now().elapsed_since(now) < Duration::seconds(1));
    }

    #[test]
    fn test_time() {
        let t = t!(5:34);

        assert_eq!(t, "05:34".parse::<Time>().unwrap());
    }

    #[test]
    fn test_range() {
        let range = t!(8:00 - 14:00);

        assert_eq!(range.to_string(), "08:00-14:00");
    }

    #[test]
    fn test_duration_minutes() {
        let duration = t!(10 minutes);

        assert_eq!(duration, Duration::seconds(600));
    }
}
