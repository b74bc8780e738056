//! Fixed-cadence loop pacing on the monotonic clock.

use std::thread;
use std::time::{Duration, Instant};

/// Sleeps until successive deadlines spaced `period` apart.
///
/// Work time inside an iteration is absorbed by the deadline, so the cadence
/// does not drift. An iteration that overruns re-bases the schedule at the
/// current instant instead of running catch-up iterations back to back.
pub struct Pacer {
    period: Duration,
    next: Instant,
}

impl Pacer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn wait(&mut self) {
        let now = Instant::now();
        match self.next.checked_duration_since(now) {
            Some(remaining) => {
                thread::sleep(remaining);
                self.next += self.period;
            }
            None => {
                log::debug!(
                    "pacer: iteration overran by {:.2}ms",
                    (now - self.next).as_secs_f64() * 1000.0
                );
                self.next = now + self.period;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_at_least_one_period_per_call() {
        let period = Duration::from_millis(5);
        let start = Instant::now();
        let mut pacer = Pacer::new(period);
        for _ in 0..4 {
            pacer.wait();
        }
        assert!(start.elapsed() >= period * 4);
    }

    #[test]
    fn overrun_rebases_instead_of_bursting() {
        let period = Duration::from_millis(2);
        let mut pacer = Pacer::new(period);
        thread::sleep(Duration::from_millis(20));

        pacer.wait();
        let after_overrun = Instant::now();
        pacer.wait();
        assert!(after_overrun.elapsed() >= Duration::from_millis(1));
    }
}
