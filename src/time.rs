//! Simulation clock.
//!
//! Two timelines run side by side:
//!
//! | Timeline | Advanced by | Used for |
//! |----------|-------------|----------|
//! | sim time | `delta * time_scale` | cooldowns, phase timeouts |
//! | animation time | `delta * time_scale * speed` | rotation, float motion |
//!
//! Gestures change the animation speed but never the sim timeline, so a
//! slowed-down scene still rearms its one-shots on schedule.
//!
//! # Example
//!
//! ```ignore
//! use gestura::time::Time;
//!
//! let mut time = Time::new();
//! time.set_fixed_delta(Some(1.0 / 60.0));
//!
//! // In the frame loop:
//! let delta = time.tick();
//! sim.step(delta);
//! ```

use std::time::{Duration, Instant};

/// Frame clock with pause, fixed delta and time scale.
#[derive(Debug, Clone)]
pub struct Time {
    /// Wall-clock instant of the previous [`tick`](Self::tick).
    last_tick: Option<Instant>,
    /// Unscaled-by-speed simulation time.
    sim_elapsed: Duration,
    /// Speed-scaled animation time in seconds.
    anim_elapsed: f32,
    /// Most recent delta in seconds, after time scale.
    delta_secs: f32,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_window: f32,
    paused: bool,
    /// Fixed delta for deterministic runs.
    fixed_delta: Option<f32>,
    /// Global multiplier, 1.0 = real time.
    time_scale: f32,
}

impl Time {
    pub fn new() -> Self {
        Self {
            last_tick: None,
            sim_elapsed: Duration::ZERO,
            anim_elapsed: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_window: 0.0,
            paused: false,
            fixed_delta: None,
            time_scale: 1.0,
        }
    }

    /// Measure the wall-clock time since the previous tick.
    ///
    /// Returns the fixed delta when one is set. Does not advance the clock;
    /// pass the result to [`advance`](Self::advance) (or `Simulation::step`).
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let raw = self
            .last_tick
            .map_or(0.0, |last| now.duration_since(last).as_secs_f32());
        self.last_tick = Some(now);

        self.fps_window += raw;
        let frames = self.frame_count - self.fps_frame_count;
        if self.fps_window >= 0.5 && frames > 0 {
            self.fps = frames as f32 / self.fps_window;
            self.fps_frame_count = self.frame_count;
            self.fps_window = 0.0;
        }

        self.fixed_delta.unwrap_or(raw)
    }

    /// Advance both timelines by `delta` seconds. `speed` only affects the
    /// animation timeline. Returns the scaled delta actually applied.
    pub fn advance(&mut self, delta: f32, speed: f32) -> f32 {
        if self.paused || !delta.is_finite() || delta <= 0.0 {
            self.delta_secs = 0.0;
            return 0.0;
        }
        let scaled = delta * self.time_scale;
        self.delta_secs = scaled;
        self.sim_elapsed += Duration::from_secs_f32(scaled);
        self.anim_elapsed += scaled * speed.max(0.0);
        self.frame_count += 1;
        scaled
    }

    /// Simulation time, the clock cooldowns compare against.
    #[inline]
    pub fn now(&self) -> Duration {
        self.sim_elapsed
    }

    /// Simulation time in seconds.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.sim_elapsed.as_secs_f32()
    }

    /// Speed-scaled animation time in seconds.
    #[inline]
    pub fn animation(&self) -> f32 {
        self.anim_elapsed
    }

    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second, refreshed every half second of wall time.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// While paused, `advance` is a no-op.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            // Don't count the pause as one long frame.
            self.last_tick = None;
            self.paused = false;
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Fixed step for deterministic runs; `None` uses wall time.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta;
    }

    /// Clamped to be non-negative.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn reset(&mut self) {
        let fixed_delta = self.fixed_delta;
        let time_scale = self.time_scale;
        *self = Self {
            fixed_delta,
            time_scale,
            ..Self::new()
        };
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
