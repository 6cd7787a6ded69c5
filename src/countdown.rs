use chrono::{DateTime, Utc};

/// Countdown derived from the scheduled time; never stored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Countdown {
    Counting {
        days: i64,
        hours: i64,
        minutes: i64,
        seconds: i64,
        total_seconds: i64,
    },
    Elapsed,
}

impl Countdown {
    pub(crate) fn compute(t0: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let total_seconds = (t0 - now).num_seconds();
        if total_seconds < 0 {
            return Countdown::Elapsed;
        }
        let days = total_seconds / 86_400;
        let rem = total_seconds % 86_400;
        let hours = rem / 3_600;
        let rem = rem % 3_600;
        let minutes = rem / 60;
        let seconds = rem % 60;
        Countdown::Counting {
            days,
            hours,
            minutes,
            seconds,
            total_seconds,
        }
    }

    /// Signed seconds to T-0: positive before, negative after.
    pub(crate) fn seconds_to_zero(t0: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        (t0 - now).num_seconds()
    }

    pub(crate) fn readout(&self) -> String {
        match self {
            Countdown::Counting {
                days,
                hours,
                minutes,
                seconds,
                ..
            } => {
                if *days > 0 {
                    format!("T-{:02}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
                } else {
                    format!("T-{:02}:{:02}:{:02}", hours, minutes, seconds)
                }
            }
            Countdown::Elapsed => "LIFTOFF".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn at(secs: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap();
        (now + Duration::seconds(secs), now)
    }

    #[test]
    fn decomposition_is_exact() {
        let (t0, now) = at(90_061);
        assert_eq!(
            Countdown::compute(t0, now),
            Countdown::Counting {
                days: 1,
                hours: 1,
                minutes: 1,
                seconds: 1,
                total_seconds: 90_061,
            }
        );
    }

    #[test]
    fn past_schedule_is_elapsed() {
        let (t0, now) = at(-1);
        assert_eq!(Countdown::compute(t0, now), Countdown::Elapsed);
        assert_eq!(Countdown::seconds_to_zero(t0, now), -1);
    }

    #[test]
    fn zero_seconds_still_counts() {
        let (t0, now) = at(0);
        match Countdown::compute(t0, now) {
            Countdown::Counting { total_seconds, .. } => assert_eq!(total_seconds, 0),
            Countdown::Elapsed => panic!("T-0 exactly should not read as elapsed"),
        }
    }

    #[test]
    fn readout_formats() {
        let (t0, now) = at(90_061);
        assert_eq!(Countdown::compute(t0, now).readout(), "T-01d 01:01:01");
        let (t0, now) = at(59);
        assert_eq!(Countdown::compute(t0, now).readout(), "T-00:00:59");
        assert_eq!(Countdown::Elapsed.readout(), "LIFTOFF");
    }
}
