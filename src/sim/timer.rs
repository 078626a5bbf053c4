/// One-second countdown scheduler.
///
/// The schedule lives exactly as long as the `Playing` phase: armed on
/// entry, cancelled on exit (including pause and teardown). Once
/// cancelled, the deadline is gone, so a stale fire after a phase change
/// cannot happen. Slow frames catch up: `poll` reports every whole
/// second crossed since the last fire.

use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_secs(1);

pub struct Countdown {
    deadline: Option<Instant>,
}

impl Countdown {
    pub fn new() -> Self {
        Countdown { deadline: None }
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Schedule the first fire one second from `now`.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + TICK);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// How many one-second boundaries `now` has crossed. Advances the
    /// deadline past all of them. Returns 0 when disarmed.
    pub fn poll(&mut self, now: Instant) -> u32 {
        let mut deadline = match self.deadline {
            Some(d) => d,
            None => return 0,
        };
        let mut fired = 0;
        while now >= deadline {
            fired += 1;
            deadline += TICK;
        }
        if fired > 0 {
            self.deadline = Some(deadline);
        }
        fired
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disarmed_never_fires() {
        let mut c = Countdown::new();
        assert!(!c.is_armed());
        assert_eq!(c.poll(Instant::now()), 0);
    }

    #[test]
    fn fires_once_per_second() {
        let t0 = Instant::now();
        let mut c = Countdown::new();
        c.arm(t0);
        assert_eq!(c.poll(t0), 0);
        assert_eq!(c.poll(t0 + Duration::from_millis(999)), 0);
        assert_eq!(c.poll(t0 + Duration::from_secs(1)), 1);
        // same instant again: boundary already consumed
        assert_eq!(c.poll(t0 + Duration::from_secs(1)), 0);
        assert_eq!(c.poll(t0 + Duration::from_secs(2)), 1);
    }

    #[test]
    fn slow_frame_catches_up() {
        let t0 = Instant::now();
        let mut c = Countdown::new();
        c.arm(t0);
        assert_eq!(c.poll(t0 + Duration::from_millis(3500)), 3);
        assert_eq!(c.poll(t0 + Duration::from_secs(4)), 1);
    }

    #[test]
    fn cancel_discards_pending_fire() {
        let t0 = Instant::now();
        let mut c = Countdown::new();
        c.arm(t0);
        c.cancel();
        assert!(!c.is_armed());
        assert_eq!(c.poll(t0 + Duration::from_secs(10)), 0);
    }

    #[test]
    fn rearm_restarts_the_second() {
        let t0 = Instant::now();
        let mut c = Countdown::new();
        c.arm(t0);
        c.cancel();
        let t1 = t0 + Duration::from_millis(700);
        c.arm(t1);
        assert_eq!(c.poll(t0 + Duration::from_secs(1)), 0);
        assert_eq!(c.poll(t1 + Duration::from_secs(1)), 1);
    }
}
