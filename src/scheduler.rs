use std::time::Duration;

/// Repeating timer advanced by the event loop's real elapsed time.
///
/// Replaces self-rescheduling one-shot callbacks: the loop feeds each ticker
/// the frame delta and runs the owning subsystem once per due tick. A
/// cancelled ticker accumulates nothing and never fires again until resumed,
/// so an in-flight chain terminates itself at its next check.
pub(crate) struct Ticker {
    period: Duration,
    accum: Duration,
    active: bool,
}

impl Ticker {
    pub(crate) fn new(period: Duration) -> Self {
        Self {
            period,
            accum: Duration::ZERO,
            active: true,
        }
    }

    /// Advance by `dt` and return how many ticks are due. Catch-up is capped
    /// at 4 periods so a stalled terminal doesn't unleash a burst.
    pub(crate) fn fire(&mut self, dt: Duration) -> u32 {
        if !self.active {
            self.accum = Duration::ZERO;
            return 0;
        }
        self.accum = self.accum.saturating_add(dt);
        let mut due = 0;
        while self.accum >= self.period && due < 4 {
            self.accum -= self.period;
            due += 1;
        }
        if due == 4 {
            self.accum = Duration::ZERO;
        }
        due
    }

    pub(crate) fn cancel(&mut self) {
        self.active = false;
        self.accum = Duration::ZERO;
    }

    pub(crate) fn resume(&mut self) {
        self.active = true;
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fires_once_per_period() {
        let mut t = Ticker::new(Duration::from_millis(100));
        assert_eq!(t.fire(Duration::from_millis(50)), 0);
        assert_eq!(t.fire(Duration::from_millis(50)), 1);
        assert_eq!(t.fire(Duration::from_millis(250)), 2);
    }

    #[test]
    fn catch_up_is_capped() {
        let mut t = Ticker::new(Duration::from_millis(10));
        assert_eq!(t.fire(Duration::from_secs(5)), 4);
        // backlog was discarded, not carried over
        assert_eq!(t.fire(Duration::from_millis(5)), 0);
    }

    #[test]
    fn cancelled_ticker_never_fires() {
        let mut t = Ticker::new(Duration::from_millis(10));
        t.cancel();
        assert_eq!(t.fire(Duration::from_secs(1)), 0);
        assert!(!t.is_active());
        t.resume();
        assert_eq!(t.fire(Duration::from_millis(10)), 1);
    }
}
