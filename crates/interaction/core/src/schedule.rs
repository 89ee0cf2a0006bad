/// Fixed-interval accumulator driven by simulation ticks.
///
/// Fires on the first advance, then once every `interval` seconds of
/// accumulated tick time. Missed intervals are dropped, not replayed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cadence {
    interval: f32,
    accumulated: f32,
}

impl Cadence {
    pub fn new(interval: f32) -> Self {
        let interval = interval.max(0.0);
        Self {
            interval,
            accumulated: interval,
        }
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Returns true when a pass is due.
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.interval <= 0.0 {
            return true;
        }
        self.accumulated += dt.max(0.0);
        if self.accumulated < self.interval {
            return false;
        }
        self.accumulated -= self.interval;
        if self.accumulated >= self.interval {
            self.accumulated = 0.0;
        }
        true
    }
}
