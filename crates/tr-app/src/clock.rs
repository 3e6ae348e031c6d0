//! Time source for the control loop.

use chrono::{DateTime, Local};
use std::thread;
use std::time::{Duration, Instant};

/// Run-relative time plus the wall clock used to stamp samples.
pub trait Clock {
    /// Time since the run started.
    fn elapsed(&self) -> Duration;

    fn wall_time(&self) -> DateTime<Local>;

    fn sleep(&mut self, period: Duration);
}

/// Real time.
#[derive(Debug, Clone)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn wall_time(&self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep(&mut self, period: Duration) {
        thread::sleep(period);
    }
}

/// Virtual time that only moves on `sleep` and `advance`.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: DateTime<Local>,
    elapsed: Duration,
}

impl ManualClock {
    pub fn new(origin: DateTime<Local>) -> Self {
        Self {
            origin,
            elapsed: Duration::ZERO,
        }
    }

    /// Simulate time spent outside `sleep`, e.g. slow device I/O.
    pub fn advance(&mut self, by: Duration) {
        self.elapsed += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Local::now())
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.elapsed
    }

    fn wall_time(&self) -> DateTime<Local> {
        let offset = chrono::Duration::from_std(self.elapsed).unwrap_or(chrono::Duration::MAX);
        self.origin.checked_add_signed(offset).unwrap_or(self.origin)
    }

    fn sleep(&mut self, period: Duration) {
        self.advance(period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_when_told() {
        let origin = Local::now();
        let mut clock = ManualClock::new(origin);
        assert_eq!(clock.elapsed(), Duration::ZERO);
        assert_eq!(clock.wall_time(), origin);

        clock.sleep(Duration::from_secs(1));
        clock.advance(Duration::from_millis(250));

        assert_eq!(clock.elapsed(), Duration::from_millis(1250));
        assert_eq!(
            clock.wall_time() - origin,
            chrono::Duration::milliseconds(1250)
        );
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::start();
        let a = clock.elapsed();
        let b = clock.elapsed();
        assert!(b >= a);
    }
}
