use std::time::{Duration, Instant};

/// A repeating interval timer driven by the UI loop.
///
/// The owner keeps at most one `Ticker` per concern in an `Option`; dropping
/// it is cancellation.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    next_due: Instant,
}

impl Ticker {
    /// Starts a timer whose first tick is one interval after `now`.
    pub fn start(now: Instant, interval: Duration) -> Self {
        Ticker {
            interval,
            next_due: now + interval,
        }
    }

    /// Returns true when a tick is due and schedules the next one. Missed
    /// ticks collapse into one.
    pub fn fire(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.interval;
        true
    }

    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }
}

/// A one-shot deadline.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(now: Instant, delay: Duration) -> Self {
        Deadline { at: now + delay }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.at
    }

    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.at.saturating_duration_since(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_fires_once_per_interval() {
        let t0 = Instant::now();
        let mut ticker = Ticker::start(t0, Duration::from_millis(120));
        assert!(!ticker.fire(t0));
        assert!(!ticker.fire(t0 + Duration::from_millis(119)));
        assert!(ticker.fire(t0 + Duration::from_millis(120)));
        assert!(!ticker.fire(t0 + Duration::from_millis(200)));
        assert!(ticker.fire(t0 + Duration::from_millis(240)));
    }

    #[test]
    fn test_missed_ticks_collapse() {
        let t0 = Instant::now();
        let mut ticker = Ticker::start(t0, Duration::from_millis(100));
        let late = t0 + Duration::from_secs(5);
        assert!(ticker.fire(late));
        assert!(!ticker.fire(late + Duration::from_millis(50)));
        assert_eq!(
            ticker.time_until_due(late + Duration::from_millis(50)),
            Duration::from_millis(50)
        );
    }

    #[test]
    fn test_deadline() {
        let t0 = Instant::now();
        let deadline = Deadline::after(t0, Duration::from_millis(150));
        assert!(!deadline.is_due(t0 + Duration::from_millis(149)));
        assert!(deadline.is_due(t0 + Duration::from_millis(150)));
    }
}
