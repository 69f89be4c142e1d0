use chrono::{DateTime, Utc};

/// Source of the current time, injected so `created` stamps are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Freeze at `secs` seconds (plus `nanos`) after the UNIX epoch.
    ///
    /// Out-of-range inputs freeze at the epoch.
    pub fn from_unix(secs: i64, nanos: u32) -> Self {
        Self(DateTime::from_timestamp(secs, nanos).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Format a timestamp as an RFC 1123 HTTP-date, e.g. `Mon, 19 Sep 2011 16:21:30 GMT`.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_http_date() {
        let clock = FixedClock::from_unix(1_316_449_290, 594_553_000);
        assert_eq!(http_date(clock.now()), "Mon, 19 Sep 2011 16:21:30 GMT");
    }

    #[test]
    fn single_digit_day_is_zero_padded() {
        let clock = FixedClock::from_unix(0, 0);
        assert_eq!(http_date(clock.now()), "Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn system_clock_moves_forward() {
        let a = SystemClock.now();
        let b = SystemClock.now();
        assert!(b >= a);
    }
}
