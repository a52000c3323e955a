use crate::prelude::{Duration, Instant};

/// Linear opacity ramp from a starting value up to fully opaque.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeIn {
    from: f32,
    started: Instant,
    duration: Duration,
}

impl FadeIn {
    pub fn new(from: f32, started: Instant, duration: Duration) -> Self {
        Self {
            from: from.clamp(0.0, 1.0),
            started,
            duration,
        }
    }

    /// Opacity at `now`; never decreases and reaches exactly 1.0 at the end
    pub fn opacity_at(&self, now: Instant) -> f32 {
        if self.is_done(now) {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        let t = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        self.from + (1.0 - self.from) * t.clamp(0.0, 1.0)
    }

    pub fn is_done(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= self.duration
    }
}
