use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Seconds as a floating point scalar.
///
/// Real timestamps are wall-clock seconds since the Unix epoch so they can be
/// compared directly with file modification times.
pub type Timestamp = f64;

/// Abstraction over where real time comes from.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        system_time_seconds(SystemTime::now())
    }
}

/// Converts a `SystemTime` into epoch seconds; times before the epoch map to 0.
pub fn system_time_seconds(time: SystemTime) -> Timestamp {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0)
}

/// Hand-driven clock. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.set(now);
    }

    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }
}

/// Animation time, decoupled from real time and freezable.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClock {
    seconds: f64,
    running: bool,
    /// Real time of the last accumulation; `None` forces a resync on the next tick.
    last_update: Option<Timestamp>,
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationClock {
    /// A running clock at zero seconds.
    pub fn new() -> Self {
        Self {
            seconds: 0.0,
            running: true,
            last_update: None,
        }
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Adds `real_dt` seconds of animation while running. Negative deltas are ignored.
    pub fn advance(&mut self, real_dt: f64) {
        if self.running {
            self.seconds += real_dt.max(0.0);
        }
    }

    /// Advances by the real time elapsed since the previous tick.
    pub fn tick(&mut self, now: Timestamp) {
        if !self.running {
            return;
        }
        if let Some(last) = self.last_update {
            self.advance(now - last);
        }
        self.last_update = Some(now);
    }

    /// Pauses or resumes. Resuming never counts the time spent paused.
    pub fn toggle(&mut self) {
        self.running = !self.running;
        if self.running {
            self.last_update = None;
        }
    }
}

/// Caps the loop at a target frame rate; the event loop waits out the rest of each interval.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Duration,
    tick_started: Option<Instant>,
}

impl FramePacer {
    /// A non-positive or non-finite FPS disables pacing, as does a rate so low
    /// that its interval overflows `Duration`.
    pub fn new(target_fps: f32) -> Self {
        let interval = if target_fps.is_finite() && target_fps > 0.0 {
            Duration::try_from_secs_f64(1.0 / f64::from(target_fps)).unwrap_or_else(|_| {
                tracing::warn!(target_fps, "frame interval out of range; pacing disabled");
                Duration::ZERO
            })
        } else {
            Duration::ZERO
        };
        Self {
            interval,
            tick_started: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn begin_tick(&mut self, now: Instant) {
        self.tick_started = Some(now);
    }

    /// Instant at which the current tick's budget runs out; `None` if it is not representable.
    pub fn deadline(&self) -> Option<Instant> {
        self.tick_started.and_then(|start| start.checked_add(self.interval))
    }

    /// Time left in the current tick's budget; `None` once it has overrun.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let deadline = self.deadline()?;
        let left = deadline.saturating_duration_since(now);
        if left.is_zero() {
            None
        } else {
            Some(left)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animation_clock_accumulates_real_time_while_running() {
        let mut clock = AnimationClock::new();
        clock.tick(100.0);
        assert_eq!(clock.seconds(), 0.0);
        clock.tick(100.5);
        clock.tick(101.25);
        assert!((clock.seconds() - 1.25).abs() < 1e-9);
    }

    #[test]
    fn paused_time_is_not_counted_after_resume() {
        let mut clock = AnimationClock::new();
        clock.tick(10.0);
        clock.tick(11.0);
        clock.toggle();
        assert!(!clock.is_running());
        clock.tick(20.0);
        clock.advance(5.0);
        assert!((clock.seconds() - 1.0).abs() < 1e-9);

        clock.toggle();
        clock.tick(30.0);
        clock.tick(30.5);
        assert!((clock.seconds() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn backwards_time_does_not_rewind_animation() {
        let mut clock = AnimationClock::new();
        clock.tick(5.0);
        clock.tick(4.0);
        assert_eq!(clock.seconds(), 0.0);
    }

    #[test]
    fn pacer_reports_remaining_budget_and_skips_overruns() {
        let mut pacer = FramePacer::new(60.0);
        let start = Instant::now();
        pacer.begin_tick(start);
        let left = pacer
            .remaining(start + Duration::from_millis(4))
            .expect("budget left");
        assert!(left > Duration::from_millis(12) && left < Duration::from_millis(13));
        assert!(pacer.remaining(start + Duration::from_millis(20)).is_none());
    }

    #[test]
    fn uncapped_pacer_never_waits() {
        let mut pacer = FramePacer::new(0.0);
        let start = Instant::now();
        pacer.begin_tick(start);
        assert_eq!(pacer.interval(), Duration::ZERO);
        assert!(pacer.remaining(start).is_none());
    }

    #[test]
    fn vanishing_frame_rate_disables_pacing() {
        let mut pacer = FramePacer::new(1e-30);
        let start = Instant::now();
        pacer.begin_tick(start);
        assert_eq!(pacer.interval(), Duration::ZERO);
        assert!(pacer.remaining(start).is_none());
        assert_eq!(FramePacer::new(f32::MIN_POSITIVE).interval(), Duration::ZERO);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(1.0);
        let shared = clock.clone();
        clock.advance(2.5);
        assert_eq!(shared.now(), 3.5);
    }
}
