use std::time::Instant;

use chrono::{DateTime, Utc};

/// Injectable clock so rotation policy is testable without real sleeps.
pub trait Clock: Send + Sync {
    fn monotonic_now(&self) -> Instant;
    fn utc_now(&self) -> DateTime<Utc>;
}

#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn monotonic_now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
