use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Whole milliseconds between two instants, clamped at zero.
pub fn elapsed_ms(started: DateTime<Utc>, finished: DateTime<Utc>) -> u64 {
    (finished - started).num_milliseconds().max(0) as u64
}
