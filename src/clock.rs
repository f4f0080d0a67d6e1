use std::fmt;
use serde::{Serialize, Deserialize};

/// Milliseconds since the Unix epoch.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        let ts = time::get_time();
        Self(ts.sec * 1_000 + ts.nsec as i64 / 1_000_000)
    }

    pub fn zero() -> Self {
        Self(0)
    }
}

impl From<libc::timeval> for Timestamp {
    fn from(tv: libc::timeval) -> Self {
        Self(tv.tv_sec as i64 * 1_000 + tv.tv_usec as i64 / 1_000)
    }
}

impl std::ops::Add<std::time::Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, d: std::time::Duration) -> Self {
        Self(self.0 + d.as_millis() as i64)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wall clock that never runs backwards for its owner.
#[derive(Debug, Default)]
pub struct Clock {
    last: Timestamp,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&mut self) -> Timestamp {
        self.observe(Timestamp::now())
    }

    pub fn observe(&mut self, ts: Timestamp) -> Timestamp {
        self.last = self.last.max(ts);
        self.last
    }
}

#[cfg(test)]
mod test {
    use super::{Clock, Timestamp};

    #[test]
    fn clock_never_decreases() {
        let mut clock = Clock::new();
        assert_eq!(clock.observe(Timestamp(2_000)), Timestamp(2_000));
        assert_eq!(clock.observe(Timestamp(1_000)), Timestamp(2_000));
        assert_eq!(clock.observe(Timestamp(3_000)), Timestamp(3_000));
        assert!(clock.now() >= Timestamp(3_000));
    }
}
