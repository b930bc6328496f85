use std::time::{Duration, Instant};

/// Repeating display-refresh timer with cancellation.
///
/// The host drives the clock by calling [`FrameClock::poll`] from its event
/// loop; a `true` result means one refresh interval has elapsed and exactly
/// one tick is owed. `invalidate` takes effect before the next poll and may
/// be called when the clock is not running.
pub trait FrameClock {
    /// Arms the clock. Calling this on a running clock does nothing.
    fn start(&mut self, now: Instant);
    fn invalidate(&mut self);
    fn is_running(&self) -> bool;
    fn poll(&mut self, now: Instant) -> bool;
    /// When the host should next wake up to poll, if the clock is running.
    fn next_deadline(&self) -> Option<Instant>;
}

/// Fixed-period clock built on `Instant` deadlines.
///
/// Missed intervals are coalesced into a single firing, so a stalled event
/// loop never produces a burst of catch-up ticks.
#[derive(Debug, Clone)]
pub struct IntervalClock {
    interval: Duration,
    next: Option<Instant>,
}

impl IntervalClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_micros(1)),
            next: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl FrameClock for IntervalClock {
    fn start(&mut self, now: Instant) {
        if self.next.is_none() {
            self.next = Some(now + self.interval);
        }
    }

    fn invalidate(&mut self) {
        self.next = None;
    }

    fn is_running(&self) -> bool {
        self.next.is_some()
    }

    fn poll(&mut self, now: Instant) -> bool {
        match self.next {
            Some(deadline) if now >= deadline => {
                let mut next = deadline + self.interval;
                if next <= now {
                    next = now + self.interval;
                }
                self.next = Some(next);
                true
            }
            _ => false,
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.next
    }
}

/// Clock that fires on every poll while running, ignoring time.
///
/// Lets tests and scripted runs step the animation synchronously.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    running: bool,
    arm_count: usize,
    fired: usize,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the clock went from stopped to running.
    pub fn arm_count(&self) -> usize {
        self.arm_count
    }

    pub fn fired(&self) -> usize {
        self.fired
    }
}

impl FrameClock for ManualClock {
    fn start(&mut self, _now: Instant) {
        if !self.running {
            self.running = true;
            self.arm_count += 1;
        }
    }

    fn invalidate(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn poll(&mut self, _now: Instant) -> bool {
        if self.running {
            self.fired += 1;
        }
        self.running
    }

    fn next_deadline(&self) -> Option<Instant> {
        None
    }
}
