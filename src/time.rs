//! Monotonic clock driving the field's time axis.
//!
//! A [`Clock`] runs either on wall time (interactive windows) or on a fixed
//! step (headless export, tests). In both modes `elapsed()` only moves
//! forward.
//!
//! # Example
//!
//! ```ignore
//! use flowfield::time::Clock;
//!
//! let mut clock = Clock::fixed(1.0 / 60.0);
//! for _ in 0..60 {
//!     let t = clock.tick();
//!     scene.frame(t, &spectrum);
//! }
//! assert!((clock.elapsed() - 1.0).abs() < 1e-4);
//! ```

use std::time::{Duration, Instant};

/// How the clock advances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockMode {
    /// Follow wall time.
    RealTime,
    /// Advance exactly this many seconds per tick.
    Fixed(f32),
}

/// Elapsed time, frame delta, frame count and a smoothed FPS estimate.
#[derive(Debug)]
pub struct Clock {
    mode: ClockMode,
    last_tick: Instant,
    elapsed_secs: f64,
    delta_secs: f32,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_window_start: Instant,
    fps_interval: Duration,
}

impl Clock {
    /// A wall-time clock starting now.
    pub fn new() -> Self {
        Self::with_mode(ClockMode::RealTime)
    }

    /// A fixed-step clock. Non-positive steps fall back to 1/60 s.
    pub fn fixed(step: f32) -> Self {
        let step = if step.is_finite() && step > 0.0 {
            step
        } else {
            1.0 / 60.0
        };
        Self::with_mode(ClockMode::Fixed(step))
    }

    fn with_mode(mode: ClockMode) -> Self {
        let now = Instant::now();
        Self {
            mode,
            last_tick: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_window_start: now,
            fps_interval: Duration::from_millis(500),
        }
    }

    /// Advance one frame. Returns elapsed seconds.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let wall_delta = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;

        self.delta_secs = match self.mode {
            ClockMode::RealTime => wall_delta,
            ClockMode::Fixed(step) => step,
        };
        self.elapsed_secs += self.delta_secs as f64;
        self.frame_count += 1;

        let window = now.duration_since(self.fps_window_start);
        if window >= self.fps_interval {
            let frames = self.frame_count - self.fps_frame_count;
            self.fps = frames as f32 / window.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_window_start = now;
        }

        self.elapsed()
    }

    /// Seconds since start.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs as f32
    }

    /// Seconds advanced by the last tick.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Ticks that advanced time.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per wall-clock second, refreshed twice a second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Advance mode.
    #[inline]
    pub fn mode(&self) -> ClockMode {
        self.mode
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clock_new() {
        let clock = Clock::new();
        assert_eq!(clock.frame(), 0);
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.mode(), ClockMode::RealTime);
    }

    #[test]
    fn test_realtime_tick() {
        let mut clock = Clock::new();
        thread::sleep(Duration::from_millis(10));
        let elapsed = clock.tick();
        assert!(elapsed > 0.0);
        assert!(clock.delta() > 0.0);
        assert_eq!(clock.frame(), 1);
    }

    #[test]
    fn test_fixed_step_accumulates() {
        let mut clock = Clock::fixed(1.0 / 60.0);
        thread::sleep(Duration::from_millis(20));
        for _ in 0..120 {
            clock.tick();
        }
        assert!((clock.elapsed() - 2.0).abs() < 1e-4);
        assert!((clock.delta() - 1.0 / 60.0).abs() < 1e-7);
        assert_eq!(clock.frame(), 120);
    }

    #[test]
    fn test_invalid_fixed_step() {
        assert_eq!(Clock::fixed(0.0).mode(), ClockMode::Fixed(1.0 / 60.0));
        assert_eq!(Clock::fixed(f32::NAN).mode(), ClockMode::Fixed(1.0 / 60.0));
    }
}
